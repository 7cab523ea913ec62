/// A/B feed sequence arbitration
///
/// Reconciles two redundant copies of one tracking-numbered stream into a single
/// in-order, exactly-once stream. Messages ahead of the expected sequence are
/// copied into a gap buffer and replayed as soon as the gap closes.
///
/// Delivery stalls for as long as a sequence number is missing from both feeds.
/// An optional gap timeout lets the caller skip ahead; it is off by default.

use crate::framer::RawMessage;
use crate::protocol::MessageType;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Distinct non-zero tracking numbers (0 is reserved for unsequenced messages)
const SEQUENCE_SPAN: u64 = u16::MAX as u64;
const HALF_WINDOW: u64 = SEQUENCE_SPAN / 2;

/// How 16-bit wire tracking numbers map onto the unbounded delivery sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceMode {
    /// 65535 is followed by 1; each wire value resolves to the nearest sequence
    /// within half the number space of the expected one
    #[default]
    Wrapping,
    /// Wire value compared directly with the counter; delivery stops after 65535
    Unbounded,
}

/// What the arbitrator did with one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Tracking number 0, dispatched without touching sequence state
    Unsequenced,
    /// Was the expected message; `replayed` buffered messages followed it
    Delivered { replayed: usize },
    /// Already delivered
    Duplicate,
    /// Ahead of the expected sequence, copied into the gap buffer
    Buffered,
    /// Ahead of the expected sequence and a copy is already buffered
    AlreadyBuffered,
}

/// A range of sequences given up on after the gap timeout expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapSkip {
    /// First missing sequence (inclusive)
    pub from: u64,
    /// Last missing sequence (inclusive)
    pub to: u64,
    /// Buffered messages dispatched after the skip
    pub replayed: usize,
}

impl GapSkip {
    pub fn missing(&self) -> u64 {
        self.to - self.from + 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArbitratorConfig {
    pub sequence_mode: SequenceMode,
    /// `None` buffers forever
    pub gap_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Buffered {
    msg_type: MessageType,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Arbitrator {
    expected: u64,
    buffer: BTreeMap<u64, Buffered>,
    config: ArbitratorConfig,
    stalled_since: Option<Instant>,
}

impl Arbitrator {
    pub fn new() -> Self {
        Self::with_config(ArbitratorConfig::default())
    }

    pub fn with_config(config: ArbitratorConfig) -> Self {
        Arbitrator {
            expected: 1,
            buffer: BTreeMap::new(),
            config,
            stalled_since: None,
        }
    }

    /// Apply one message; `dispatch` is called for every message released, in order
    pub fn process<F>(&mut self, raw: RawMessage<'_>, mut dispatch: F) -> Disposition
    where
        F: FnMut(RawMessage<'_>),
    {
        let wire = raw.tracking_number();
        if wire == 0 {
            dispatch(raw);
            return Disposition::Unsequenced;
        }

        let seq = self.resolve(wire);
        if seq < self.expected {
            return Disposition::Duplicate;
        }

        if seq > self.expected {
            let expected = self.expected;
            let now = self.clock();
            return match self.buffer.entry(seq) {
                Entry::Occupied(_) => Disposition::AlreadyBuffered,
                Entry::Vacant(slot) => {
                    debug!(seq, expected, "gap detected, buffering future message");
                    slot.insert(Buffered {
                        msg_type: raw.msg_type(),
                        bytes: raw.bytes().to_vec(),
                    });
                    if self.stalled_since.is_none() {
                        self.stalled_since = now;
                    }
                    Disposition::Buffered
                }
            };
        }

        dispatch(raw);
        self.expected += 1;
        let replayed = self.drain(&mut dispatch);
        self.stalled_since = if self.buffer.is_empty() { None } else { self.clock() };
        Disposition::Delivered { replayed }
    }

    /// Skip past a gap that has stalled delivery for longer than the configured timeout
    ///
    /// Jumps `expected` to the lowest buffered sequence and replays from there.
    /// Does nothing when no timeout is configured.
    pub fn expire_gaps<F>(&mut self, now: Instant, mut dispatch: F) -> Option<GapSkip>
    where
        F: FnMut(RawMessage<'_>),
    {
        let timeout = self.config.gap_timeout?;
        let since = self.stalled_since?;
        if now.saturating_duration_since(since) < timeout {
            return None;
        }
        let first = *self.buffer.keys().next()?;

        let from = self.expected;
        let to = first - 1;
        warn!(from, to, "gap timeout expired, skipping missing sequences");
        self.expected = first;
        let replayed = self.drain(&mut dispatch);
        self.stalled_since = if self.buffer.is_empty() { None } else { Some(now) };
        Some(GapSkip { from, to, replayed })
    }

    fn drain<F>(&mut self, dispatch: &mut F) -> usize
    where
        F: FnMut(RawMessage<'_>),
    {
        let mut replayed = 0;
        while let Some(entry) = self.buffer.remove(&self.expected) {
            debug!(seq = self.expected, "replaying buffered message");
            dispatch(RawMessage::new(entry.msg_type, 0, &entry.bytes));
            self.expected += 1;
            replayed += 1;
        }
        replayed
    }

    fn clock(&self) -> Option<Instant> {
        self.config.gap_timeout.map(|_| Instant::now())
    }

    /// Map a non-zero wire tracking number onto the delivery sequence
    pub fn resolve(&self, wire: u16) -> u64 {
        match self.config.sequence_mode {
            SequenceMode::Unbounded => u64::from(wire),
            SequenceMode::Wrapping => unwrap_sequence(self.expected, wire),
        }
    }

    /// Next sequence to be delivered
    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Buffered sequences in ascending order
    pub fn buffered_sequences(&self) -> impl Iterator<Item = u64> + '_ {
        self.buffer.keys().copied()
    }

    /// Messages are held back waiting for a missing sequence
    pub fn is_stalled(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn config(&self) -> &ArbitratorConfig {
        &self.config
    }
}

impl Default for Arbitrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Serial-number unwrapping over the sequence space 1..=65535
fn unwrap_sequence(expected: u64, wire: u16) -> u64 {
    let epoch_base = (expected - 1) / SEQUENCE_SPAN * SEQUENCE_SPAN;
    let candidate = epoch_base + u64::from(wire);
    if candidate + HALF_WINDOW < expected {
        candidate + SEQUENCE_SPAN
    } else if candidate > expected + HALF_WINDOW && candidate > SEQUENCE_SPAN {
        candidate - SEQUENCE_SPAN
    } else {
        candidate
    }
}
