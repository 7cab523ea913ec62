/// itch-feed-handler
///
/// Joins the A and B multicast feeds, arbitrates them into one ordered stream,
/// and prints each decoded message to stdout. Logs go to stderr.
///
/// ```bash
/// itch-feed-handler --config feed.json
/// itch-feed-handler --group 239.0.0.1 --port-a 5007 --port-b 5008 --gap-timeout-ms 500
/// ```

use anyhow::{Context, Result};
use clap::Parser;
use itch_feed_handler::config::{load_config, HandlerConfig};
use itch_feed_handler::logging::init_logging;
use itch_feed_handler::transport::{FeedReceivers, MulticastSource};
use itch_feed_handler::{
    ingress, run_arbitration_loop, FeedHandler, FeedId, SequenceMode, ShutdownToken, StdoutSink,
};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "itch-feed-handler", about = "ITCH 5.0 A/B feed arbitrator")]
struct Cli {
    /// Configuration file path (JSON); flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Multicast group for both feeds
    #[arg(long)]
    group: Option<Ipv4Addr>,

    #[arg(long)]
    port_a: Option<u16>,

    #[arg(long)]
    port_b: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Directory for daily-rotated log files
    #[arg(long)]
    log_dir: Option<String>,

    /// Skip a missing tracking number after this many milliseconds
    #[arg(long)]
    gap_timeout_ms: Option<u64>,

    /// Tracking number handling: wrapping or unbounded
    #[arg(long)]
    sequence_mode: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut HandlerConfig) -> Result<()> {
        if let Some(group) = self.group {
            config.feed_a.group = group;
            config.feed_b.group = group;
        }
        if let Some(port) = self.port_a {
            config.feed_a.port = port;
        }
        if let Some(port) = self.port_b {
            config.feed_b.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(ms) = self.gap_timeout_ms {
            config.arbitration.gap_timeout_ms = Some(ms);
        }
        if let Some(mode) = &self.sequence_mode {
            config.arbitration.sequence_mode = match mode.as_str() {
                "wrapping" => SequenceMode::Wrapping,
                "unbounded" => SequenceMode::Unbounded,
                other => anyhow::bail!("unknown sequence mode '{other}'"),
            };
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => HandlerConfig::default(),
    };
    cli.apply(&mut config)?;
    config.validate()?;

    init_logging(&config.log_level, config.log_dir.as_deref());
    info!(
        group_a = %config.feed_a.group,
        port_a = config.feed_a.port,
        group_b = %config.feed_b.group,
        port_b = config.feed_b.port,
        mode = ?config.arbitration.sequence_mode,
        gap_timeout_ms = ?config.arbitration.gap_timeout_ms,
        "itch-feed-handler starting"
    );

    let shutdown = ShutdownToken::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.trigger()).context("installing Ctrl+C handler")?;
    }

    let poll_interval = config.ingress.poll_interval();
    let (tx, rx) = ingress(config.ingress.capacity);

    // A feed that cannot bind or join is left out; the other one still runs
    let sources = FeedId::BOTH
        .into_iter()
        .map(|feed| (feed, MulticastSource::join(feed, config.feed(feed), poll_interval)))
        .collect();
    let recv_buffer = config.feed_a.recv_buffer.max(config.feed_b.recv_buffer);
    let receivers = FeedReceivers::spawn(sources, recv_buffer, tx, &shutdown)?;

    let live: Vec<String> = receivers.feeds().map(|f| f.to_string()).collect();
    info!(feeds = ?live, "receivers started, press Ctrl+C to stop");

    let mut handler = FeedHandler::new(config.arbitration.arbitrator_config(), StdoutSink);
    run_arbitration_loop(&mut handler, &rx, &shutdown, poll_interval);
    shutdown.trigger();

    for (feed, result) in receivers.join(rx) {
        if let Ok(forwarded) = result {
            info!(%feed, forwarded, "receiver joined");
        }
    }

    if handler.arbitrator().is_stalled() {
        warn!(
            expected = handler.arbitrator().expected(),
            buffered = handler.arbitrator().buffered_len(),
            "exiting with unfilled gap"
        );
    }
    handler.stats().log_summary();
    Ok(())
}
