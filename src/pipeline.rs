/// Framing -> arbitration -> decoding -> sink
///
/// `FeedHandler` owns the arbitration state and applies one datagram at a time.
/// `run_arbitration_loop` is the single worker that drains the ingress queue.

use crate::arbitrator::{Arbitrator, ArbitratorConfig, Disposition, GapSkip};
use crate::decoder::Message;
use crate::framer::{FrameStop, Framer, RawMessage};
use crate::ingress::{FeedId, IngressReceiver, Poll, ShutdownToken};
use crate::stats::FeedStats;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Downstream consumer of decoded messages, called once per message in delivery order
pub trait MessageSink {
    fn on_message(&mut self, msg: Message);
}

impl<F: FnMut(Message)> MessageSink for F {
    fn on_message(&mut self, msg: Message) {
        self(msg)
    }
}

/// Writes one line per message to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn on_message(&mut self, msg: Message) {
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{msg}") {
            warn!(error = %e, "stdout write failed");
        }
    }
}

/// Result of processing one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatagramReport {
    /// Complete messages framed
    pub framed: usize,
    pub stop: FrameStop,
}

pub struct FeedHandler<S> {
    arbitrator: Arbitrator,
    sink: S,
    stats: FeedStats,
}

impl<S: MessageSink> FeedHandler<S> {
    pub fn new(config: ArbitratorConfig, sink: S) -> Self {
        FeedHandler {
            arbitrator: Arbitrator::with_config(config),
            sink,
            stats: FeedStats::new(),
        }
    }

    /// Frame a datagram and run every message through arbitration
    pub fn process_datagram(&mut self, feed: FeedId, datagram: &[u8]) -> DatagramReport {
        let FeedHandler { arbitrator, sink, stats } = self;
        let mut framer = Framer::new(datagram);
        let mut framed = 0;

        for (_, raw) in framer.by_ref() {
            framed += 1;
            let disposition = arbitrator.process(raw, |m| dispatch(&mut *sink, &mut *stats, m));
            if disposition == Disposition::Duplicate {
                debug!(%feed, tracking = raw.tracking_number(), "duplicate dropped");
            }
            stats.record_disposition(disposition);
        }

        let stop = framer.stop_reason().unwrap_or(FrameStop::Complete);
        if !stop.is_clean() {
            warn!(%feed, ?stop, discarded = stop.discarded(datagram.len()), "framing stopped early");
        }
        stats.record_datagram(feed, datagram.len(), framed);
        stats.record_frame_stop(stop);

        DatagramReport { framed, stop }
    }

    /// Apply the gap-timeout policy; a no-op unless a timeout is configured
    pub fn poll_idle(&mut self) -> Option<GapSkip> {
        self.arbitrator.config().gap_timeout?;
        let FeedHandler { arbitrator, sink, stats } = self;
        let skip = arbitrator.expire_gaps(Instant::now(), |m| dispatch(&mut *sink, &mut *stats, m))?;
        stats.record_gap_skip(&skip);
        Some(skip)
    }

    pub fn arbitrator(&self) -> &Arbitrator {
        &self.arbitrator
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

fn dispatch<S: MessageSink>(sink: &mut S, stats: &mut FeedStats, raw: RawMessage<'_>) {
    let start = Instant::now();
    match raw.decode() {
        Ok(msg) => {
            stats.record_decode_latency(start.elapsed().as_nanos() as u64);
            stats.record_delivery(raw.tracking_number());
            sink.on_message(msg);
        }
        Err(e) => {
            // framer and catalog disagree
            if cfg!(debug_assertions) {
                panic!("framed message failed to decode: {e}");
            }
            warn!(error = %e, "dropping undecodable message");
            stats.record_decode_error();
        }
    }
}

/// Single arbitration worker
///
/// Takes one datagram at a time and fully processes it before the next. Waits up
/// to `poll_interval` when the queue is empty. Exits on shutdown, or once every
/// sender has gone and the queue is drained. Returns datagrams processed.
pub fn run_arbitration_loop<S: MessageSink>(
    handler: &mut FeedHandler<S>,
    ingress: &IngressReceiver,
    shutdown: &ShutdownToken,
    poll_interval: Duration,
) -> u64 {
    info!("arbitration loop started");
    let mut processed = 0u64;

    while !shutdown.is_triggered() {
        match ingress.poll(poll_interval) {
            Poll::Datagram(d) => {
                handler.process_datagram(d.feed, &d.payload);
                processed += 1;
            }
            Poll::Idle => {}
            Poll::Closed => {
                info!("all feeds closed");
                break;
            }
        }
        handler.poll_idle();
    }

    info!(
        processed,
        expected = handler.arbitrator().expected(),
        buffered = handler.arbitrator().buffered_len(),
        "arbitration loop exited"
    );
    processed
}
