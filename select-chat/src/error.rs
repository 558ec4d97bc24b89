use std::io;

use thiserror::Error;

use crate::mux::Handle;

/// Failure of a [`Multiplexer::wait`](crate::mux::Multiplexer::wait).
#[derive(Debug, Error)]
pub enum WaitError {
    /// The wait was cut short by a signal. Retry it unchanged.
    #[error("wait interrupted")]
    Interrupted,
    #[error("handle {0} is not registered with the multiplexer")]
    UnknownHandle(Handle),
    #[error("wait called with an empty interest set")]
    EmptyInterest,
    #[error("readiness wait failed")]
    Io(#[source] io::Error),
}

impl WaitError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WaitError::Interrupted)
    }
}

impl From<io::Error> for WaitError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            WaitError::Interrupted
        } else {
            WaitError::Io(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to prepare listening endpoint")]
    Listener(#[source] io::Error),
    #[error(transparent)]
    Wait(#[from] WaitError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to register session source")]
    Register(#[source] io::Error),
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error("failed to read keyboard input")]
    KeyboardRead(#[source] io::Error),
    #[error("failed to read from server")]
    ServerRead(#[source] io::Error),
    #[error("failed to write to server")]
    ServerWrite(#[source] io::Error),
    #[error("failed to write operator output")]
    Display(#[source] io::Error),
}

/// Setup failures while turning a host and port into a socket.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to resolve {host}:{port}")]
    Lookup {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("{host}:{port} did not resolve to any address")]
    NoAddresses { host: String, port: u16 },
    #[error("failed to bind {host}:{port}")]
    Bind {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
}
