/// Feed transport
///
/// A `DatagramSource` yields raw datagrams for one feed. `MulticastSource` is the
/// UDP multicast implementation; tests substitute in-memory sources. Each feed
/// runs `run_feed_receiver` on its own thread, pushing into the shared ingress.
/// `FeedReceivers` owns those threads; a feed that fails to open is left out
/// and the other one keeps running.

use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::ingress::{Datagram, FeedId, IngressReceiver, IngressSender, ShutdownToken};
use std::io;
use std::net::{SocketAddrV4, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub trait DatagramSource {
    /// Receive one datagram into `buf`
    ///
    /// `Ok(None)` means nothing arrived before the source's own timeout; the caller
    /// re-checks shutdown and calls again. An `Err` is fatal to this feed.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}

/// UDP socket joined to one multicast group
pub struct MulticastSource {
    socket: UdpSocket,
}

impl MulticastSource {
    /// Bind to the feed's port and join its group. `read_timeout` bounds how long a
    /// receive may block before shutdown is checked again.
    pub fn join(feed: FeedId, config: &FeedConfig, read_timeout: Duration) -> FeedResult<Self> {
        let bind_addr = SocketAddrV4::new(config.interface, config.port);
        let socket = UdpSocket::bind(bind_addr).map_err(|source| FeedError::Bind {
            feed,
            interface: config.interface,
            port: config.port,
            source,
        })?;
        socket
            .join_multicast_v4(&config.group, &config.interface)
            .map_err(|source| FeedError::Join { feed, group: config.group, source })?;
        socket
            .set_read_timeout(Some(read_timeout))
            .map_err(|source| FeedError::Receive { feed, source })?;

        info!(%feed, group = %config.group, port = config.port, "listening");
        Ok(MulticastSource { socket })
    }
}

impl DatagramSource for MulticastSource {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Receive loop for one feed
///
/// Runs until shutdown, until the ingress consumer goes away, or until the source
/// fails. Empty datagrams are dropped. Returns the number of datagrams forwarded.
pub fn run_feed_receiver<S: DatagramSource>(
    feed: FeedId,
    mut source: S,
    recv_buffer: usize,
    ingress: IngressSender,
    shutdown: ShutdownToken,
) -> FeedResult<u64> {
    let mut buf = vec![0u8; recv_buffer];
    let mut forwarded = 0u64;

    while !shutdown.is_triggered() {
        let n = match source.recv(&mut buf) {
            Ok(Some(n)) => n,
            Ok(None) => continue,
            Err(e) => {
                error!(%feed, error = %e, "receive failed, feed stopped");
                return Err(FeedError::Receive { feed, source: e });
            }
        };
        if n == 0 {
            continue;
        }
        if !ingress.push(Datagram::new(feed, &buf[..n])) {
            debug!(%feed, "ingress closed");
            break;
        }
        forwarded += 1;
    }

    info!(%feed, forwarded, "receiver exited");
    Ok(forwarded)
}

/// Receiver threads for the feeds that came up
#[derive(Debug)]
pub struct FeedReceivers {
    handles: Vec<(FeedId, JoinHandle<FeedResult<u64>>)>,
}

impl FeedReceivers {
    /// Start one receiver thread per opened source
    ///
    /// A source that failed to open is logged and skipped. Fails only when no
    /// feed could be started. Takes `ingress` so the queue closes once every
    /// started receiver has exited.
    pub fn spawn<S>(
        sources: Vec<(FeedId, FeedResult<S>)>,
        recv_buffer: usize,
        ingress: IngressSender,
        shutdown: &ShutdownToken,
    ) -> FeedResult<Self>
    where
        S: DatagramSource + Send + 'static,
    {
        let mut handles = Vec::with_capacity(sources.len());
        for (feed, source) in sources {
            let source = match source {
                Ok(s) => s,
                Err(e) => {
                    error!(%feed, error = %e, "feed unavailable, continuing without it");
                    continue;
                }
            };
            let (tx, shutdown) = (ingress.clone(), shutdown.clone());
            let spawned = thread::Builder::new()
                .name(format!("feed-{feed}"))
                .spawn(move || run_feed_receiver(feed, source, recv_buffer, tx, shutdown));
            match spawned {
                Ok(handle) => handles.push((feed, handle)),
                Err(e) => error!(%feed, error = %e, "failed to spawn receiver"),
            }
        }

        if handles.is_empty() {
            return Err(FeedError::NoFeeds);
        }
        Ok(FeedReceivers { handles })
    }

    pub fn feeds(&self) -> impl Iterator<Item = FeedId> + '_ {
        self.handles.iter().map(|(feed, _)| *feed)
    }

    /// Join every receiver; trigger shutdown first
    ///
    /// Drops the ingress consumer before joining, which releases a receiver
    /// blocked pushing into a full queue.
    pub fn join(self, ingress: IngressReceiver) -> Vec<(FeedId, FeedResult<u64>)> {
        drop(ingress);
        self.handles
            .into_iter()
            .map(|(feed, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    warn!(%feed, "receiver thread panicked");
                    Err(FeedError::ReceiverPanicked { feed })
                });
                (feed, result)
            })
            .collect()
    }
}
