mod geometry;
mod stream;

pub use geometry::{GeometryDescription, Polygon};
pub use stream::{
    AgentPosition, ClientCommand, CommandSchema, CommandSchemaVersion, GeometryMessage,
    ServerMessage, SnapshotMessage, COUNT_COMMAND_SCHEMA, RESET_KEY, SPEED_COMMAND_SCHEMA,
    TARGET_COMMAND_SCHEMA,
};
