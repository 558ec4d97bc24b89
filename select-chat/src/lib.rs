//! Readiness-driven chat relay and terminal session.
//!
//! Both halves run the same wait-dispatch-repeat cycle on a single thread:
//! one [`mux::Multiplexer`] wait per cycle, then non-blocking I/O on exactly
//! the handles it reported ready.
//!
//! - [`cli`] parses the command line for relay and session modes.
//! - [`config`] turns parsed arguments into loop configuration.
//! - [`mux`] defines the multiplexer capability and its Tokio-reactor backend.
//! - [`watched`] holds the relay's set of watched handles.
//! - [`relay`] accepts connections and broadcasts each message unit to every
//!   other peer.
//! - [`session`] multiplexes keyboard input and the relay connection for an
//!   operator.
//! - [`command`] classifies keyboard input into local commands.
//! - [`keyboard`] exposes standard input as a waitable source.
//! - [`resolve`] resolves, binds and connects at startup.
//!
//! There is no framing: whatever one read returns is relayed or displayed as
//! one unit.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod keyboard;
pub mod mux;
pub mod relay;
pub mod resolve;
pub mod session;
pub mod watched;
