use crate::simulator::SimulationError;

use super::transport::CloseKind;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The peer went away while we were talking to it.
    #[error("connection closed ({0:?})")]
    ConnectionClosed(CloseKind),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("encode failure: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("simulation failure: {0}")]
    Simulation(#[from] SimulationError),
}
