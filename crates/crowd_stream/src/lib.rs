pub mod geometry;
pub mod server;
pub mod session;
pub mod simulator;

pub use crowd_stream_proto::{
    AgentPosition, ClientCommand, CommandSchema, CommandSchemaVersion, GeometryDescription,
    GeometryMessage, Polygon, ServerMessage, SnapshotMessage,
};

pub use geometry::{distance, point_in_polygon, polygon_bounds, polygon_centroid};
pub use server::{
    check_agent_count, StreamConfigError, StreamServer, StreamServerConfig, StreamServerError,
    WebSocketTransport,
};
pub use session::{
    run_session, CloseGuard, CloseKind, CommandDecoder, Lifecycle, PollOutcome, SessionConfig,
    SessionError, SessionExit, SessionLoop, SessionReport, SessionState, SessionTransport,
    TickFlow, Transition, ValidationError, DEFAULT_TARGET_STEPS,
};
pub use simulator::{
    AgentSnapshot, EvacuationSimulation, GeometryProvider, OrbitSimulation, ScenarioBuilder,
    SimScenario, Simulation, SimulationBuilder, SimulationError,
};
