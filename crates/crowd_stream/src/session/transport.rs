use std::time::Duration;

use tracing::debug;

use super::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    Graceful,
    Error,
}

/// Result of one bounded wait for client input. Silence is an ordinary outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Message(String),
    NoMessage,
    Closed(CloseKind),
}

/// Duplex text channel to one client.
pub trait SessionTransport {
    /// Waits at most `window` for the next inbound message.
    fn poll(&mut self, window: Duration) -> Result<PollOutcome, SessionError>;
    fn send(&mut self, text: String) -> Result<(), SessionError>;
    fn close(&mut self) -> Result<(), SessionError>;
}

/// Lets any number of exit paths ask for a close while only the first one acts.
#[derive(Debug, Default)]
pub struct CloseGuard {
    closed: bool,
}

impl CloseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns `true` if this call performed the close attempt. A failing close
    /// still counts as the one attempt.
    pub fn close_once<T>(&mut self, transport: &mut T) -> bool
    where
        T: SessionTransport + ?Sized,
    {
        if self.closed {
            return false;
        }
        self.closed = true;
        if let Err(err) = transport.close() {
            debug!(%err, "closing connection failed");
        }
        true
    }
}
