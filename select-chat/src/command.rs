//! Local meta-commands the session intercepts before forwarding keyboard input.

const QUIT: &[u8] = b"quit";
const RESERVED_PREFIX: &[u8] = b"atugpib";
const EXIT_PREFIX: &[u8] = b"atugpib exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCommand {
    /// The `quit` line. Ends the session locally and never reaches the wire.
    Quit,
    /// Anything starting with `atugpib exit`. Forwarded verbatim for the relay
    /// to interpret, then the session ends.
    Exit,
    /// The `atugpib` prefix without the exit form. Nothing is forwarded.
    Reserved,
    /// Ordinary content, forwarded verbatim.
    Message,
}

impl LocalCommand {
    pub fn classify(unit: &[u8]) -> Self {
        if strip_line_ending(unit) == QUIT {
            LocalCommand::Quit
        } else if unit.starts_with(EXIT_PREFIX) {
            LocalCommand::Exit
        } else if unit.starts_with(RESERVED_PREFIX) {
            LocalCommand::Reserved
        } else {
            LocalCommand::Message
        }
    }

    pub fn forwards(self) -> bool {
        matches!(self, LocalCommand::Exit | LocalCommand::Message)
    }

    pub fn ends_session(self) -> bool {
        matches!(self, LocalCommand::Quit | LocalCommand::Exit)
    }
}

fn strip_line_ending(unit: &[u8]) -> &[u8] {
    match unit.strip_suffix(b"\n") {
        Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
        None => unit,
    }
}
