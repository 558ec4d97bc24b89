//! Standard input as a waitable, unbuffered source.

use std::{
    fs::File,
    io::{self, Read},
    os::fd::{AsFd, AsRawFd, OwnedFd, RawFd},
};

use nix::fcntl::{FcntlArg, OFlag, fcntl};
use tracing::warn;

/// Keyboard input for the session loop.
///
/// Reads go straight to the descriptor; `std::io::Stdin` keeps its own buffer,
/// which would hide data from the readiness wait. The descriptor is switched
/// to non-blocking mode and its original flags come back on drop.
pub struct Keyboard {
    file: File,
    original: OFlag,
}

impl Keyboard {
    /// Duplicates standard input. It must be a terminal or a pipe.
    pub fn stdin() -> io::Result<Self> {
        let fd = io::stdin().as_fd().try_clone_to_owned()?;
        Self::from_fd(fd)
    }

    pub fn from_fd(fd: OwnedFd) -> io::Result<Self> {
        let raw = fd.as_raw_fd();
        let original = OFlag::from_bits_truncate(fcntl(raw, FcntlArg::F_GETFL)?);
        fcntl(raw, FcntlArg::F_SETFL(original | OFlag::O_NONBLOCK))?;
        Ok(Self {
            file: File::from(fd),
            original,
        })
    }
}

impl Read for Keyboard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl AsRawFd for Keyboard {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        // The flags live on the shared file description, so this also
        // restores the terminal the process inherited.
        if let Err(errno) = fcntl(self.file.as_raw_fd(), FcntlArg::F_SETFL(self.original)) {
            warn!(error = %errno, "failed to restore keyboard descriptor flags");
        }
    }
}
