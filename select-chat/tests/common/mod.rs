#![allow(dead_code)]

use std::{collections::VecDeque, io};

use select_chat::{
    error::WaitError,
    mux::{Handle, Multiplexer, PollMultiplexer},
};

/// Fails the next waits with scripted errors, then behaves like the reactor.
pub struct ScriptedMultiplexer {
    inner: PollMultiplexer,
    script: VecDeque<WaitError>,
}

impl ScriptedMultiplexer {
    pub fn new(script: impl IntoIterator<Item = WaitError>) -> Self {
        Self {
            inner: PollMultiplexer::new(),
            script: script.into_iter().collect(),
        }
    }

    pub fn interrupted(times: usize) -> Self {
        Self::new((0..times).map(|_| WaitError::Interrupted))
    }

    pub fn broken() -> Self {
        Self::new([WaitError::Io(io::Error::other("reactor gone"))])
    }
}

impl Multiplexer for ScriptedMultiplexer {
    fn register(&mut self, handle: Handle) -> io::Result<()> {
        self.inner.register(handle)
    }

    fn deregister(&mut self, handle: Handle) {
        self.inner.deregister(handle)
    }

    async fn wait(&mut self, interest: &[Handle]) -> Result<Vec<Handle>, WaitError> {
        if let Some(err) = self.script.pop_front() {
            return Err(err);
        }
        self.inner.wait(interest).await
    }

    fn attempt<T, F>(&mut self, handle: Handle, op: F) -> io::Result<T>
    where
        F: FnOnce() -> io::Result<T>,
    {
        self.inner.attempt(handle, op)
    }
}
