/// Errors outside the decode path
///
/// Decode faults live in `decoder::DecodeError`; these cover configuration and the
/// transport side, which are fatal to one feed at most.

use crate::ingress::FeedId;
use std::io;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config {path}: {source}")]
    ConfigIo { path: String, source: io::Error },

    #[error("invalid config json: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("feed {feed}: bind to {interface}:{port} failed: {source}")]
    Bind {
        feed: FeedId,
        interface: Ipv4Addr,
        port: u16,
        source: io::Error,
    },

    #[error("feed {feed}: join multicast group {group} failed: {source}")]
    Join {
        feed: FeedId,
        group: Ipv4Addr,
        source: io::Error,
    },

    #[error("feed {feed}: receive failed: {source}")]
    Receive { feed: FeedId, source: io::Error },

    #[error("feed {feed}: receiver thread panicked")]
    ReceiverPanicked { feed: FeedId },

    #[error("no feed could be started")]
    NoFeeds,
}

pub type FeedResult<T> = Result<T, FeedError>;
