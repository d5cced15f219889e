use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryDescription;

pub const RESET_KEY: &str = "reset";

/// Key layout of an inbound control message. Deployments differ only in how
/// the run-state and step-target fields are spelled and which of them must be
/// present, so the difference is kept here as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSchema {
    pub running_key: &'static str,
    pub target_key: &'static str,
    pub required: &'static [&'static str],
}

pub const TARGET_COMMAND_SCHEMA: CommandSchema = CommandSchema {
    running_key: "isRunning",
    target_key: "target",
    required: &["isRunning", "target"],
};

pub const SPEED_COMMAND_SCHEMA: CommandSchema = CommandSchema {
    running_key: "is_running",
    target_key: "speed",
    required: &["is_running", "speed"],
};

pub const COUNT_COMMAND_SCHEMA: CommandSchema = CommandSchema {
    running_key: "is_running",
    target_key: "count",
    required: &["is_running", "count"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSchemaVersion {
    #[default]
    Target,
    Speed,
    Count,
}

impl CommandSchemaVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandSchemaVersion::Target => "target",
            CommandSchemaVersion::Speed => "speed",
            CommandSchemaVersion::Count => "count",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "target" | "camel" | "is_running_target" => Some(CommandSchemaVersion::Target),
            "speed" | "legacy" => Some(CommandSchemaVersion::Speed),
            "count" => Some(CommandSchemaVersion::Count),
            _ => None,
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["target", "speed", "count"]
    }

    pub fn schema(&self) -> CommandSchema {
        match self {
            CommandSchemaVersion::Target => TARGET_COMMAND_SCHEMA,
            CommandSchemaVersion::Speed => SPEED_COMMAND_SCHEMA,
            CommandSchemaVersion::Count => COUNT_COMMAND_SCHEMA,
        }
    }
}

/// One decoded inbound control message, independent of the schema it was spelled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientCommand {
    pub reset: Option<bool>,
    pub is_running: Option<bool>,
    pub target: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    pub positions: BTreeMap<u64, AgentPosition>,
    pub iteration_count: u64,
    pub remaining_agents: usize,
    pub target: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryMessage {
    Geometry { geometry: GeometryDescription },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Geometry(GeometryMessage),
    Snapshot(SnapshotMessage),
}

#[derive(Deserialize)]
struct MessageKindProbe {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl ServerMessage {
    /// Snapshots carry no `type` tag, so the tag is probed first and the body
    /// decoded directly from text (keeps integer map keys intact).
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let probe: MessageKindProbe = serde_json::from_str(text)?;
        match probe.kind.as_deref() {
            Some("geometry") => serde_json::from_str(text).map(ServerMessage::Geometry),
            _ => serde_json::from_str(text).map(ServerMessage::Snapshot),
        }
    }
}
