/// ITCH 5.0 Feed Handler - Dual-Feed Market Data Arbitration
///
/// Receives the same ITCH 5.0 message stream on two redundant multicast feeds
/// (A and B) and turns them into a single, gap-free, duplicate-free sequence.
/// Features include:
/// - Length-table framing of packed datagrams
/// - Fixed-layout big-endian message decoding and encoding
/// - First-arrival-wins A/B arbitration with gap buffering
/// - 16-bit tracking number wraparound and optional gap timeout
/// - Per-feed and arbitration statistics

pub mod protocol;
pub mod decoder;
pub mod encoder;
pub mod framer;
pub mod arbitrator;
pub mod stats;
pub mod ingress;
pub mod error;
pub mod config;
pub mod transport;
pub mod pipeline;
pub mod logging;

pub use protocol::{length_of, Alpha, MessageType, Mpid, Price, Side, Symbol};
pub use decoder::{DecodeError, Decoder, Header, Message};
pub use framer::{FrameStop, Framer, RawMessage};
pub use arbitrator::{Arbitrator, ArbitratorConfig, Disposition, GapSkip, SequenceMode};
pub use stats::{FeedStats, LatencyStats};
pub use ingress::{ingress, Datagram, FeedId, ShutdownToken};
pub use error::{FeedError, FeedResult};
pub use config::{load_config, HandlerConfig};
pub use pipeline::{run_arbitration_loop, FeedHandler, MessageSink, StdoutSink};
