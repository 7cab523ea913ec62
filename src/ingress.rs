/// Shared datagram ingress
///
/// Both feed receivers push whole datagrams into one MPSC queue; the single
/// arbitration worker pops them one at a time. A datagram is moved through the
/// queue as a unit, so the consumer never sees a partial one.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedId {
    A,
    B,
}

impl FeedId {
    pub const BOTH: [FeedId; 2] = [FeedId::A, FeedId::B];

    pub fn index(self) -> usize {
        match self {
            FeedId::A => 0,
            FeedId::B => 1,
        }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedId::A => f.write_str("A"),
            FeedId::B => f.write_str("B"),
        }
    }
}

/// One received datagram and the feed it arrived on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub feed: FeedId,
    pub payload: Vec<u8>,
}

impl Datagram {
    pub fn new(feed: FeedId, payload: impl Into<Vec<u8>>) -> Self {
        Datagram { feed, payload: payload.into() }
    }
}

/// Cooperative stop signal shared by every worker
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Producer half, one clone per feed receiver
#[derive(Debug, Clone)]
pub struct IngressSender {
    tx: Sender<Datagram>,
}

impl IngressSender {
    /// Blocks while a bounded queue is full. Returns `false` once the consumer is gone.
    pub fn push(&self, datagram: Datagram) -> bool {
        self.tx.send(datagram).is_ok()
    }
}

/// Outcome of one poll of the ingress queue
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    Datagram(Datagram),
    /// Nothing arrived within the poll interval
    Idle,
    /// Every sender is gone and the queue is drained
    Closed,
}

/// Consumer half, owned by the arbitration worker
#[derive(Debug)]
pub struct IngressReceiver {
    rx: Receiver<Datagram>,
}

impl IngressReceiver {
    /// Wait up to `interval` for the next datagram
    pub fn poll(&self, interval: Duration) -> Poll {
        match self.rx.recv_timeout(interval) {
            Ok(d) => Poll::Datagram(d),
            Err(RecvTimeoutError::Timeout) => Poll::Idle,
            Err(RecvTimeoutError::Disconnected) => Poll::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create the ingress queue; `None` capacity means unbounded
pub fn ingress(capacity: Option<usize>) -> (IngressSender, IngressReceiver) {
    let (tx, rx) = match capacity {
        Some(cap) => bounded(cap),
        None => unbounded(),
    };
    (IngressSender { tx }, IngressReceiver { rx })
}
