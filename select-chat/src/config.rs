use std::num::NonZeroUsize;

use crate::cli::{RelayArgs, SessionArgs};

pub const DEFAULT_PORT: u16 = 5777;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const RELAY_BUFFER_SIZE: NonZeroUsize = NonZeroUsize::new(256).unwrap();
pub const SESSION_BUFFER_SIZE: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

/// What the relay does with a recipient whose broadcast write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Log and keep the recipient watched. It is only dropped once a read on
    /// it reports end-of-stream or an error.
    #[default]
    Keep,
    /// Retire the recipient once the broadcast has visited everyone.
    Retire,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub buffer_size: NonZeroUsize,
    pub write_failure: WriteFailurePolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_size: RELAY_BUFFER_SIZE,
            write_failure: WriteFailurePolicy::Keep,
        }
    }
}

impl From<&RelayArgs> for RelayConfig {
    fn from(args: &RelayArgs) -> Self {
        let write_failure = if args.retire_on_write_failure {
            WriteFailurePolicy::Retire
        } else {
            WriteFailurePolicy::Keep
        };
        Self {
            buffer_size: args.buffer_size,
            write_failure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub buffer_size: NonZeroUsize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: SESSION_BUFFER_SIZE,
        }
    }
}

impl From<&SessionArgs> for SessionConfig {
    fn from(args: &SessionArgs) -> Self {
        Self {
            buffer_size: args.buffer_size,
        }
    }
}
