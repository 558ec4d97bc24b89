//! Readiness multiplexing shared by the relay and session loops.
//!
//! A [`Multiplexer`] is the only place either loop blocks: it is handed the set
//! of handles the loop currently cares about and resolves once at least one of
//! them is readable. Everything after the wait runs non-blocking against the
//! handles it reported.
//!
//! [`PollMultiplexer`] is the production backend. It registers raw descriptors
//! with Tokio's reactor through [`AsyncFd`], so a wait is a single
//! epoll/kqueue round trip no matter how many handles are watched.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    io,
    os::fd::{AsRawFd, RawFd},
};

use futures::{FutureExt, future::select_all};
use tokio::io::{Interest, unix::AsyncFd};

use crate::error::WaitError;

/// Identifier of one registered source.
///
/// Backed by the descriptor number, so ordering handles matches the order in
/// which a descriptor scan would visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(RawFd);

impl Handle {
    pub fn of<S: AsRawFd>(source: &S) -> Self {
        Self(source.as_raw_fd())
    }

    pub fn raw(self) -> RawFd {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-readiness wait over a dynamic set of handles.
pub trait Multiplexer {
    /// Starts tracking `handle`. Must happen before it appears in an interest set.
    fn register(&mut self, handle: Handle) -> io::Result<()>;

    /// Stops tracking `handle`. Call before the underlying descriptor is closed.
    fn deregister(&mut self, handle: Handle);

    /// Waits without a timeout until at least one handle in `interest` is
    /// readable and returns the ready ones in ascending order.
    fn wait(
        &mut self,
        interest: &[Handle],
    ) -> impl Future<Output = Result<Vec<Handle>, WaitError>>;

    /// Runs a non-blocking operation against a handle reported ready.
    ///
    /// If `op` fails with [`io::ErrorKind::WouldBlock`] the cached readiness of
    /// `handle` is cleared, so the next wait only reports it once new data
    /// arrives. Readiness that is not cleared survives into the next wait.
    fn attempt<T, F>(&mut self, handle: Handle, op: F) -> io::Result<T>
    where
        F: FnOnce() -> io::Result<T>;
}

/// [`Multiplexer`] backed by the Tokio reactor.
///
/// Requires a running Tokio runtime with the I/O driver enabled.
#[derive(Default)]
pub struct PollMultiplexer {
    sources: HashMap<Handle, AsyncFd<RawFd>>,
}

impl PollMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Multiplexer for PollMultiplexer {
    fn register(&mut self, handle: Handle) -> io::Result<()> {
        // A descriptor number can be reused after close; drop any stale
        // registration first so the reactor does not see it twice.
        self.sources.remove(&handle);
        let source = AsyncFd::with_interest(handle.raw(), Interest::READABLE)?;
        self.sources.insert(handle, source);
        Ok(())
    }

    fn deregister(&mut self, handle: Handle) {
        self.sources.remove(&handle);
    }

    async fn wait(&mut self, interest: &[Handle]) -> Result<Vec<Handle>, WaitError> {
        if interest.is_empty() {
            return Err(WaitError::EmptyInterest);
        }

        // Readiness cached from an earlier wait resolves without the reactor
        // being polled. Yield once so descriptors that became readable since
        // then are picked up by this wait too.
        tokio::task::yield_now().await;

        let mut pending = Vec::with_capacity(interest.len());
        for &handle in interest {
            let source = self
                .sources
                .get(&handle)
                .ok_or(WaitError::UnknownHandle(handle))?;
            pending.push(async move { (handle, source.readable().await.map(drop)) }.boxed_local());
        }

        let ((first, outcome), _, rest) = select_all(pending).await;
        outcome?;

        // Collect everything else that is already ready without waiting again.
        let mut ready = vec![first];
        for readiness in rest {
            if let Some((handle, outcome)) = readiness.now_or_never() {
                outcome?;
                ready.push(handle);
            }
        }

        ready.sort_unstable();
        ready.dedup();
        Ok(ready)
    }

    fn attempt<T, F>(&mut self, handle: Handle, op: F) -> io::Result<T>
    where
        F: FnOnce() -> io::Result<T>,
    {
        let Some(source) = self.sources.get(&handle) else {
            return op();
        };

        match source.readable().now_or_never() {
            Some(Ok(mut guard)) => guard
                .try_io(|_| op())
                .unwrap_or_else(|_would_block| Err(io::ErrorKind::WouldBlock.into())),
            _ => op(),
        }
    }
}
