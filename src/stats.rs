/// Feed statistics tracking
///
/// Tracks datagrams and bytes per feed, arbitration outcomes, framing and decode
/// faults, gap skips, and a sliding window of decode latencies.

use crate::arbitrator::{Disposition, GapSkip};
use crate::framer::FrameStop;
use crate::ingress::FeedId;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

const WINDOW_SIZE: usize = 10000;

#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub p50_ns: u64,
    pub p99_ns: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedCounters {
    pub datagrams: u64,
    pub bytes: u64,
    pub messages: u64,
}

#[derive(Debug, Clone)]
pub struct FeedStats {
    start_time: Option<Instant>,
    feeds: [FeedCounters; 2],

    // Arbitration outcomes
    delivered: u64,
    replayed: u64,
    duplicates: u64,
    buffered: u64,
    already_buffered: u64,
    unsequenced: u64,
    gap_skips: u64,
    skipped_sequences: u64,

    // Faults
    unknown_tags: u64,
    truncated: u64,
    decode_errors: u64,

    // Decode latencies (in nanoseconds)
    decode_latencies: VecDeque<u64>,
}

impl FeedStats {
    pub fn new() -> Self {
        FeedStats {
            start_time: None,
            feeds: [FeedCounters::default(); 2],
            delivered: 0,
            replayed: 0,
            duplicates: 0,
            buffered: 0,
            already_buffered: 0,
            unsequenced: 0,
            gap_skips: 0,
            skipped_sequences: 0,
            unknown_tags: 0,
            truncated: 0,
            decode_errors: 0,
            decode_latencies: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    /// Record a datagram received on `feed` and the messages framed from it
    pub fn record_datagram(&mut self, feed: FeedId, size: usize, messages: usize) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        let c = &mut self.feeds[feed.index()];
        c.datagrams += 1;
        c.bytes += size as u64;
        c.messages += messages as u64;
    }

    pub fn record_frame_stop(&mut self, stop: FrameStop) {
        match stop {
            FrameStop::Complete => {}
            FrameStop::UnknownTag { .. } => self.unknown_tags += 1,
            FrameStop::Truncated { .. } => self.truncated += 1,
        }
    }

    /// Arbitration outcome of one framed message; deliveries are counted by `record_delivery`
    pub fn record_disposition(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Unsequenced => {}
            Disposition::Delivered { replayed } => self.replayed += replayed as u64,
            Disposition::Duplicate => self.duplicates += 1,
            Disposition::Buffered => self.buffered += 1,
            Disposition::AlreadyBuffered => self.already_buffered += 1,
        }
    }

    /// A message decoded and handed to the sink
    pub fn record_delivery(&mut self, tracking_number: u16) {
        if tracking_number == 0 {
            self.unsequenced += 1;
        } else {
            self.delivered += 1;
        }
    }

    pub fn record_gap_skip(&mut self, skip: &GapSkip) {
        self.gap_skips += 1;
        self.skipped_sequences += skip.missing();
        self.replayed += skip.replayed as u64;
    }

    pub fn record_decode_error(&mut self) {
        self.decode_errors += 1;
    }

    /// Record decode latency in nanoseconds
    pub fn record_decode_latency(&mut self, nanos: u64) {
        if self.decode_latencies.len() >= WINDOW_SIZE {
            self.decode_latencies.pop_front();
        }
        self.decode_latencies.push_back(nanos);
    }

    /// Sequenced messages delivered per second
    pub fn messages_per_sec(&self) -> f64 {
        match self.start_time {
            None => 0.0,
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    (self.delivered + self.unsequenced) as f64 / elapsed
                } else {
                    0.0
                }
            }
        }
    }

    /// Get decode latency statistics
    pub fn decode_latency_stats(&self) -> Option<LatencyStats> {
        if self.decode_latencies.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = self.decode_latencies.iter().copied().collect();
        sorted.sort_unstable();

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let mean = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        let p50 = sorted[sorted.len() / 2];
        let p99 = sorted[(sorted.len() * 99) / 100];

        Some(LatencyStats {
            min_ns: min,
            max_ns: max,
            mean_ns: mean,
            p50_ns: p50,
            p99_ns: p99,
        })
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|st| st.elapsed())
    }

    pub fn feed(&self, feed: FeedId) -> FeedCounters {
        self.feeds[feed.index()]
    }

    /// Messages handed to the sink, sequenced or not
    pub fn total_dispatched(&self) -> u64 {
        self.delivered + self.unsequenced
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Messages released from the gap buffer
    pub fn replayed(&self) -> u64 {
        self.replayed
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Messages copied into the gap buffer
    pub fn buffered(&self) -> u64 {
        self.buffered
    }

    pub fn already_buffered(&self) -> u64 {
        self.already_buffered
    }

    pub fn unsequenced(&self) -> u64 {
        self.unsequenced
    }

    pub fn gap_skips(&self) -> u64 {
        self.gap_skips
    }

    pub fn skipped_sequences(&self) -> u64 {
        self.skipped_sequences
    }

    pub fn framing_stops(&self) -> u64 {
        self.unknown_tags + self.truncated
    }

    pub fn unknown_tags(&self) -> u64 {
        self.unknown_tags
    }

    pub fn truncated(&self) -> u64 {
        self.truncated
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    /// Log a statistics summary
    pub fn log_summary(&self) {
        let a = self.feed(FeedId::A);
        let b = self.feed(FeedId::B);
        info!(
            elapsed = ?self.elapsed(),
            msgs_per_sec = self.messages_per_sec(),
            "feed statistics"
        );
        info!(datagrams = a.datagrams, bytes = a.bytes, messages = a.messages, "feed A");
        info!(datagrams = b.datagrams, bytes = b.bytes, messages = b.messages, "feed B");
        info!(
            delivered = self.delivered,
            replayed = self.replayed,
            duplicates = self.duplicates,
            buffered = self.buffered,
            already_buffered = self.already_buffered,
            unsequenced = self.unsequenced,
            "arbitration"
        );
        info!(
            gap_skips = self.gap_skips,
            skipped_sequences = self.skipped_sequences,
            unknown_tags = self.unknown_tags,
            truncated = self.truncated,
            decode_errors = self.decode_errors,
            "faults"
        );

        if let Some(stats) = self.decode_latency_stats() {
            info!(
                min = stats.min_ns,
                max = stats.max_ns,
                mean = stats.mean_ns,
                p50 = stats.p50_ns,
                p99 = stats.p99_ns,
                "decode latency (ns)"
            );
        }
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self::new()
    }
}
