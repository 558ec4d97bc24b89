//! The relay loop.
//!
//! One listening endpoint and a growing set of accepted peers, all serviced
//! from a single task. Each [`Relay::cycle`] waits once on the whole
//! [`WatchedSet`], then accepts a pending connection or reads one message unit
//! from each ready peer and writes it to every other peer.

use std::{
    future::Future,
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
};

use tokio::select;
use tracing::{debug, info, warn};

use crate::{
    config::{RelayConfig, WriteFailurePolicy},
    error::RelayError,
    mux::{Handle, Multiplexer, PollMultiplexer},
    watched::WatchedSet,
};

/// One accepted connection.
#[derive(Debug)]
pub struct Peer {
    stream: TcpStream,
    addr: SocketAddr,
}

impl Peer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

pub struct Relay<M = PollMultiplexer> {
    // Declared first so registrations are dropped before the sockets close.
    mux: M,
    listener: TcpListener,
    watched: WatchedSet<Peer>,
    buffer: Box<[u8]>,
    write_failure: WriteFailurePolicy,
}

impl Relay<PollMultiplexer> {
    pub fn new(listener: TcpListener, config: RelayConfig) -> Result<Self, RelayError> {
        Self::with_multiplexer(listener, config, PollMultiplexer::new())
    }
}

impl<M: Multiplexer> Relay<M> {
    pub fn with_multiplexer(
        listener: TcpListener,
        config: RelayConfig,
        mut mux: M,
    ) -> Result<Self, RelayError> {
        listener.set_nonblocking(true).map_err(RelayError::Listener)?;
        let handle = Handle::of(&listener);
        mux.register(handle).map_err(RelayError::Listener)?;

        Ok(Self {
            mux,
            listener,
            watched: WatchedSet::new(handle),
            buffer: vec![0; config.buffer_size.get()].into_boxed_slice(),
            write_failure: config.write_failure,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn watched(&self) -> &WatchedSet<Peer> {
        &self.watched
    }

    pub fn peer_count(&self) -> usize {
        self.watched.len()
    }

    /// Runs cycles until `shutdown` resolves or the wait fails.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => break,
                result = self.cycle() => result?,
            }
        }

        info!(peers = self.watched.len(), "relay shutting down");
        Ok(())
    }

    pub async fn run_until_ctrl_c(&mut self) -> Result<(), RelayError> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// One wait followed by dispatch of every ready handle.
    ///
    /// An interrupted wait returns `Ok` without touching any state. The only
    /// await point is the wait itself, so dropping this future never leaves a
    /// unit half relayed.
    pub async fn cycle(&mut self) -> Result<(), RelayError> {
        let interest = self.watched.interest();
        let ready = match self.mux.wait(&interest).await {
            Ok(ready) => ready,
            Err(err) if err.is_recoverable() => {
                debug!(error = %err, "wait interrupted; retrying");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        for handle in ready {
            if handle == self.watched.listener() {
                self.accept_connection();
            } else if self.watched.contains(handle) {
                self.service_peer(handle);
            }
        }

        Ok(())
    }

    fn accept_connection(&mut self) {
        let listener = &self.listener;
        match self.mux.attempt(self.watched.listener(), || listener.accept()) {
            Ok((stream, addr)) => self.admit(stream, addr),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                debug!("listener readiness was spurious");
            }
            Err(err) => warn!(error = ?err, "failed to accept connection"),
        }
    }

    fn admit(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(err) = stream.set_nonblocking(true) {
            warn!(peer = %addr, error = ?err, "failed to configure connection; dropping it");
            return;
        }

        let handle = Handle::of(&stream);
        if let Err(err) = self.mux.register(handle) {
            warn!(peer = %addr, error = ?err, "failed to watch connection; dropping it");
            return;
        }

        self.watched.insert(handle, Peer { stream, addr });
        info!(
            peer = %addr,
            %handle,
            max_handle = %self.watched.max_handle(),
            "new connection"
        );
    }

    fn service_peer(&mut self, handle: Handle) {
        let Some(peer) = self.watched.get(handle) else {
            return;
        };
        let addr = peer.addr;
        let mut stream = &peer.stream;
        let buffer = &mut self.buffer;

        match self.mux.attempt(handle, || stream.read(buffer)) {
            Ok(0) => {
                info!(peer = %addr, %handle, "peer hung up");
                self.retire(handle);
            }
            Ok(len) => self.broadcast(handle, len),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                debug!(%handle, "peer readiness was spurious");
            }
            Err(err) => {
                warn!(peer = %addr, %handle, error = ?err, "read failed; retiring connection");
                self.retire(handle);
            }
        }
    }

    /// Writes the first `len` bytes of the buffer to every peer but `sender`.
    ///
    /// A recipient whose send buffer is full misses the unit but stays
    /// connected; only real write errors count as failures.
    fn broadcast(&mut self, sender: Handle, len: usize) {
        let unit = &self.buffer[..len];
        let mut delivered = 0usize;
        let mut skipped = 0usize;
        let mut failed = Vec::new();

        for (handle, peer) in self.watched.recipients(sender) {
            match (&peer.stream).write(unit) {
                Ok(written) => {
                    if written < len {
                        debug!(%handle, written, len, "short write treated as complete");
                    }
                    delivered += 1;
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    debug!(peer = %peer.addr, %handle, len, "recipient not keeping up; unit dropped for it");
                    skipped += 1;
                }
                Err(err) => {
                    warn!(peer = %peer.addr, %handle, error = ?err, "failed to relay message unit");
                    failed.push(handle);
                }
            }
        }

        debug!(%sender, len, delivered, skipped, failed = failed.len(), "relayed message unit");

        if self.write_failure == WriteFailurePolicy::Retire {
            for handle in failed {
                info!(%handle, "retiring connection after failed write");
                self.retire(handle);
            }
        }
    }

    fn retire(&mut self, handle: Handle) {
        self.mux.deregister(handle);
        if let Some(peer) = self.watched.remove(handle) {
            debug!(peer = %peer.addr, %handle, remaining = self.watched.len(), "connection retired");
        }
    }
}
