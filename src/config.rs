/// Feed handler configuration
///
/// Read from a JSON file; every field has a default so `{}` is a valid config.
///
/// ```json
/// {
///   "feed_a": { "group": "239.0.0.1", "port": 5007 },
///   "feed_b": { "group": "239.0.0.1", "port": 5008 },
///   "arbitration": { "sequence_mode": "wrapping", "gap_timeout_ms": 500 },
///   "ingress": { "capacity": 65536, "poll_interval_ms": 10 },
///   "log_level": "info"
/// }
/// ```

use crate::arbitrator::{ArbitratorConfig, SequenceMode};
use crate::error::{FeedError, FeedResult};
use crate::ingress::FeedId;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 0, 0, 1);
pub const DEFAULT_PORT_A: u16 = 5007;
pub const DEFAULT_PORT_B: u16 = 5008;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub feed_a: FeedConfig,
    pub feed_b: FeedConfig,
    pub arbitration: ArbitrationConfig,
    pub ingress: IngressConfig,
    pub log_level: String,
    /// Directory for daily-rotated log files
    pub log_dir: Option<String>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfig {
            feed_a: FeedConfig::with_port(DEFAULT_PORT_A),
            feed_b: FeedConfig::with_port(DEFAULT_PORT_B),
            arbitration: ArbitrationConfig::default(),
            ingress: IngressConfig::default(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl HandlerConfig {
    pub fn feed(&self, feed: FeedId) -> &FeedConfig {
        match feed {
            FeedId::A => &self.feed_a,
            FeedId::B => &self.feed_b,
        }
    }

    pub fn validate(&self) -> FeedResult<()> {
        for feed in FeedId::BOTH {
            let f = self.feed(feed);
            if !f.group.is_multicast() {
                return Err(FeedError::Config(format!(
                    "feed {feed}: {} is not a multicast address",
                    f.group
                )));
            }
            if f.recv_buffer == 0 {
                return Err(FeedError::Config(format!("feed {feed}: recv_buffer must be > 0")));
            }
        }
        if self.feed_a.port == self.feed_b.port && self.feed_a.group == self.feed_b.group {
            return Err(FeedError::Config("feeds A and B share group and port".to_string()));
        }
        if self.ingress.capacity == Some(0) {
            return Err(FeedError::Config("ingress capacity must be > 0".to_string()));
        }
        if self.ingress.poll_interval_ms == 0 {
            return Err(FeedError::Config("poll_interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Transport settings for one feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    /// Local interface to join on; unspecified lets the OS choose
    pub interface: Ipv4Addr,
    /// Largest datagram accepted, in bytes
    pub recv_buffer: usize,
}

impl FeedConfig {
    pub fn with_port(port: u16) -> Self {
        FeedConfig {
            group: DEFAULT_GROUP,
            port,
            interface: Ipv4Addr::UNSPECIFIED,
            recv_buffer: 4096,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::with_port(DEFAULT_PORT_A)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    pub sequence_mode: SequenceMode,
    /// Skip a missing sequence after this long; absent means wait forever
    pub gap_timeout_ms: Option<u64>,
}

impl ArbitrationConfig {
    pub fn arbitrator_config(&self) -> ArbitratorConfig {
        ArbitratorConfig {
            sequence_mode: self.sequence_mode,
            gap_timeout: self.gap_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressConfig {
    /// Queue capacity in datagrams; absent means unbounded
    pub capacity: Option<usize>,
    /// Idle wait between polls of an empty queue
    pub poll_interval_ms: u64,
}

impl IngressConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for IngressConfig {
    fn default() -> Self {
        IngressConfig {
            capacity: Some(65536),
            poll_interval_ms: 10,
        }
    }
}

/// Load and validate a JSON config file
pub fn load_config(path: &Path) -> FeedResult<HandlerConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| FeedError::ConfigIo {
        path: path.display().to_string(),
        source,
    })?;
    let config: HandlerConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
