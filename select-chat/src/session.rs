//! The session loop.
//!
//! Exactly two sources are watched: keyboard input and the relay connection.
//! Keyboard content is checked against the local commands in
//! [`LocalCommand`] and otherwise forwarded as is; content from the relay is
//! shown to the operator untouched.

use std::{
    io::{self, Read, Write},
    os::fd::AsRawFd,
};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    cli::SessionArgs,
    command::LocalCommand,
    config::SessionConfig,
    error::SessionError,
    keyboard::Keyboard,
    mux::{Handle, Multiplexer, PollMultiplexer},
    resolve,
};

pub const BANNER: &str = "Enter a message or type \"quit\" to exit.";
const CLIENT_CLOSED: &str = "*** client closed connection";
const SERVER_CLOSED: &str = "*** server closed connection";

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The operator typed `quit`.
    Quit,
    /// An `atugpib exit` line was forwarded.
    ExitForwarded,
    /// The relay closed the connection.
    ServerClosed,
    /// Keyboard input reached end-of-file.
    KeyboardClosed,
}

/// Connects to the relay named in `args` and runs a session on the process's
/// standard input and output.
pub async fn run(args: SessionArgs) -> Result<SessionEnd> {
    let server = resolve::connect(&args.address, args.port)
        .await
        .with_context(|| format!("failed to connect to {}:{}", args.address, args.port))?;
    info!("connected to {}:{}", args.address, args.port);

    let keyboard = Keyboard::stdin().context("failed to prepare standard input")?;
    let mut stdout = io::stdout();
    writeln!(stdout, "{BANNER}")?;
    stdout.flush()?;

    let mut session = Session::new(keyboard, server, stdout, SessionConfig::from(&args))?;
    let end = session.run().await?;
    Ok(end)
}

/// Sources must already be in non-blocking mode.
pub struct Session<K, S, O, M = PollMultiplexer> {
    mux: M,
    keyboard: K,
    server: S,
    out: O,
    buffer: Box<[u8]>,
    keyboard_handle: Handle,
    server_handle: Handle,
}

impl<K, S, O> Session<K, S, O, PollMultiplexer>
where
    K: Read + AsRawFd,
    S: Read + Write + AsRawFd,
    O: Write,
{
    pub fn new(keyboard: K, server: S, out: O, config: SessionConfig) -> Result<Self, SessionError> {
        Self::with_multiplexer(keyboard, server, out, config, PollMultiplexer::new())
    }
}

impl<K, S, O, M> Session<K, S, O, M>
where
    K: Read + AsRawFd,
    S: Read + Write + AsRawFd,
    O: Write,
    M: Multiplexer,
{
    pub fn with_multiplexer(
        keyboard: K,
        server: S,
        out: O,
        config: SessionConfig,
        mut mux: M,
    ) -> Result<Self, SessionError> {
        let keyboard_handle = Handle::of(&keyboard);
        let server_handle = Handle::of(&server);
        mux.register(keyboard_handle).map_err(SessionError::Register)?;
        mux.register(server_handle).map_err(SessionError::Register)?;

        Ok(Self {
            mux,
            keyboard,
            server,
            out,
            buffer: vec![0; config.buffer_size.get()].into_boxed_slice(),
            keyboard_handle,
            server_handle,
        })
    }

    pub fn output(&self) -> &O {
        &self.out
    }

    pub async fn run(&mut self) -> Result<SessionEnd, SessionError> {
        loop {
            if let Some(end) = self.cycle().await? {
                debug!(?end, "session loop finished");
                return Ok(end);
            }
        }
    }

    /// One wait followed by dispatch. Keyboard input is handled before server
    /// input; if it ends the session the server is not read this cycle.
    pub async fn cycle(&mut self) -> Result<Option<SessionEnd>, SessionError> {
        let interest = [self.keyboard_handle, self.server_handle];
        let ready = match self.mux.wait(&interest).await {
            Ok(ready) => ready,
            Err(err) if err.is_recoverable() => {
                debug!(error = %err, "wait interrupted; retrying");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if ready.contains(&self.keyboard_handle) {
            if let Some(end) = self.on_keyboard()? {
                return Ok(Some(end));
            }
        }
        if ready.contains(&self.server_handle) {
            if let Some(end) = self.on_server()? {
                return Ok(Some(end));
            }
        }

        Ok(None)
    }

    fn on_keyboard(&mut self) -> Result<Option<SessionEnd>, SessionError> {
        let keyboard = &mut self.keyboard;
        let buffer = &mut self.buffer;
        let len = match self.mux.attempt(self.keyboard_handle, || keyboard.read(buffer)) {
            Ok(0) => {
                debug!("keyboard input closed");
                return Ok(Some(SessionEnd::KeyboardClosed));
            }
            Ok(len) => len,
            Err(err) if is_spurious(&err) => return Ok(None),
            Err(err) => return Err(SessionError::KeyboardRead(err)),
        };

        let unit = &self.buffer[..len];
        let command = LocalCommand::classify(unit);
        if command.forwards() {
            forward(&mut self.server, &mut self.out, unit)?;
        }

        match command {
            LocalCommand::Quit => {
                announce(&mut self.out, CLIENT_CLOSED)?;
                Ok(Some(SessionEnd::Quit))
            }
            LocalCommand::Reserved => {
                debug!(len, "reserved command prefix without exit; nothing forwarded");
                Ok(None)
            }
            _ if command.ends_session() => Ok(Some(SessionEnd::ExitForwarded)),
            _ => Ok(None),
        }
    }

    fn on_server(&mut self) -> Result<Option<SessionEnd>, SessionError> {
        let server = &mut self.server;
        let buffer = &mut self.buffer;
        match self.mux.attempt(self.server_handle, || server.read(buffer)) {
            Ok(0) => {
                announce(&mut self.out, SERVER_CLOSED)?;
                Ok(Some(SessionEnd::ServerClosed))
            }
            Ok(len) => {
                show(&mut self.out, b"Rcvd: ", &self.buffer[..len])?;
                Ok(None)
            }
            Err(err) if is_spurious(&err) => Ok(None),
            Err(err) => Err(SessionError::ServerRead(err)),
        }
    }
}

fn is_spurious(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Writes `unit` to the relay in one attempt, then echoes it to the operator.
///
/// A full send buffer drops the unit with a warning instead of ending the
/// session; the wait only tracks read readiness.
fn forward<S: Write, O: Write>(server: &mut S, out: &mut O, unit: &[u8]) -> Result<(), SessionError> {
    let written = match server.write(unit) {
        Ok(written) => written,
        Err(err) if is_spurious(&err) => {
            warn!(len = unit.len(), "relay is not accepting data; unit dropped");
            return Ok(());
        }
        Err(err) => return Err(SessionError::ServerWrite(err)),
    };
    if written < unit.len() {
        debug!(written, len = unit.len(), "short write treated as complete");
    }
    show(out, b"Sent: ", unit)
}

fn show<O: Write>(out: &mut O, label: &[u8], unit: &[u8]) -> Result<(), SessionError> {
    out.write_all(label)
        .and_then(|()| out.write_all(unit))
        .and_then(|()| {
            if unit.ends_with(b"\n") {
                Ok(())
            } else {
                out.write_all(b"\n")
            }
        })
        .and_then(|()| out.flush())
        .map_err(SessionError::Display)
}

fn announce<O: Write>(out: &mut O, notice: &str) -> Result<(), SessionError> {
    writeln!(out, "{notice}")
        .and_then(|()| out.flush())
        .map_err(SessionError::Display)
}
