//! Per-connection control loop: decode a command, apply it, maybe step, maybe emit.

mod command;
mod encoder;
mod error;
mod runner;
mod scheduler;
mod state;
mod transport;

pub use command::{CommandDecoder, ValidationError};
pub use encoder::{encode_snapshot, geometry_message, to_wire};
pub use error::SessionError;
pub use runner::{run_session, SessionConfig, SessionExit, SessionLoop, SessionReport, TickFlow};
pub use scheduler::{should_step, step_once};
pub use state::{Lifecycle, SessionState, Transition, DEFAULT_TARGET_STEPS};
pub use transport::{CloseGuard, CloseKind, PollOutcome, SessionTransport};
