use std::fs;
use std::path::Path;
use std::time::Duration;

use crowd_stream_proto::CommandSchemaVersion;

use crate::session::{SessionConfig, DEFAULT_TARGET_STEPS};
use crate::simulator::{ScenarioBuilder, SimScenario, MAX_EVACUATION_AGENTS};

pub const ENV_BIND_ADDR: &str = "CROWD_STREAM_BIND";
pub const ENV_TICK_MS: &str = "CROWD_STREAM_TICK_MS";
pub const ENV_POLL_MS: &str = "CROWD_STREAM_POLL_MS";
pub const ENV_SCENARIO: &str = "CROWD_STREAM_SCENARIO";
pub const ENV_SCHEMA: &str = "CROWD_STREAM_SCHEMA";
pub const ENV_DEFAULT_TARGET: &str = "CROWD_STREAM_DEFAULT_TARGET";
pub const ENV_AGENT_SPEED: &str = "CROWD_STREAM_AGENT_SPEED";
pub const ENV_AGENT_COUNT: &str = "CROWD_STREAM_AGENT_COUNT";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "crowd_stream.toml";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_TICK_MS: u64 = 100;
pub const DEFAULT_POLL_MS: u64 = 100;
pub const DEFAULT_AGENT_COUNT: usize = crate::simulator::DEFAULT_EVACUATION_AGENTS;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("read config file failed ({path}): {message}")]
    ReadConfigFile { path: String, message: String },
    #[error("parse config file failed ({path}): {message}")]
    ParseConfigFile { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamServerConfig {
    pub bind_addr: String,
    pub tick_interval: Duration,
    pub poll_window: Duration,
    pub scenario: SimScenario,
    pub schema: CommandSchemaVersion,
    pub default_target: u64,
    /// `None` means the scenario's own default speed.
    pub agent_speed: Option<f64>,
    pub agent_count: usize,
}

impl Default for StreamServerConfig {
    fn default() -> Self {
        Self::new(SimScenario::default())
    }
}

impl StreamServerConfig {
    pub fn new(scenario: SimScenario) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            poll_window: Duration::from_millis(DEFAULT_POLL_MS),
            scenario,
            schema: CommandSchemaVersion::default(),
            default_target: DEFAULT_TARGET_STEPS,
            agent_speed: None,
            agent_count: DEFAULT_AGENT_COUNT,
        }
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_poll_window(mut self, window: Duration) -> Self {
        self.poll_window = window;
        self
    }

    pub fn with_scenario(mut self, scenario: SimScenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_schema(mut self, schema: CommandSchemaVersion) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_default_target(mut self, target: u64) -> Self {
        self.default_target = target;
        self
    }

    pub fn with_agent_speed(mut self, speed: f64) -> Self {
        self.agent_speed = Some(speed);
        self
    }

    pub fn with_agent_count(mut self, count: usize) -> Self {
        self.agent_count = count;
        self
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_interval: self.tick_interval,
            poll_window: self.poll_window,
            schema: self.schema.schema(),
            default_target: self.default_target,
        }
    }

    /// A fresh builder for one session.
    pub fn scenario_builder(&self) -> ScenarioBuilder {
        let builder = ScenarioBuilder::new(self.scenario).with_agent_count(self.agent_count);
        match self.agent_speed {
            Some(speed) => builder.with_agent_speed(speed),
            None => builder,
        }
    }

    /// `crowd_stream.toml` in the working directory when it exists, otherwise the environment.
    pub fn from_default_sources() -> Result<Self, StreamConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::from_config_file(config_path);
        }
        Self::from_env()
    }

    /// File keys use the environment variable names; anything the file omits
    /// falls back to the environment.
    pub fn from_config_file(path: &Path) -> Result<Self, StreamConfigError> {
        let content = fs::read_to_string(path).map_err(|err| StreamConfigError::ReadConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let value: toml::Value =
            toml::from_str(&content).map_err(|err| StreamConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        let table = value
            .as_table()
            .ok_or_else(|| StreamConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: "root is not a TOML table".to_string(),
            })?;

        Self::from_env_with(|key| {
            table
                .get(key)
                .and_then(toml_value_to_string)
                .or_else(|| std::env::var(key).ok())
        })
    }

    pub fn from_env() -> Result<Self, StreamConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(mut getter: F) -> Result<Self, StreamConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = non_empty(getter(ENV_BIND_ADDR)) {
            config.bind_addr = addr;
        }
        if let Some(raw) = non_empty(getter(ENV_TICK_MS)) {
            config.tick_interval = Duration::from_millis(parse_positive(ENV_TICK_MS, &raw)?);
        }
        if let Some(raw) = non_empty(getter(ENV_POLL_MS)) {
            config.poll_window = Duration::from_millis(parse_positive(ENV_POLL_MS, &raw)?);
        }
        if let Some(raw) = non_empty(getter(ENV_SCENARIO)) {
            config.scenario = SimScenario::parse(&raw).ok_or(StreamConfigError::InvalidValue {
                key: ENV_SCENARIO,
                value: raw,
            })?;
        }
        if let Some(raw) = non_empty(getter(ENV_SCHEMA)) {
            config.schema =
                CommandSchemaVersion::parse(&raw).ok_or(StreamConfigError::InvalidValue {
                    key: ENV_SCHEMA,
                    value: raw,
                })?;
        }
        if let Some(raw) = non_empty(getter(ENV_DEFAULT_TARGET)) {
            config.default_target =
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| StreamConfigError::InvalidValue {
                        key: ENV_DEFAULT_TARGET,
                        value: raw.clone(),
                    })?;
        }
        if let Some(raw) = non_empty(getter(ENV_AGENT_SPEED)) {
            config.agent_speed = Some(
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|speed| speed.is_finite() && *speed > 0.0)
                    .ok_or(StreamConfigError::InvalidValue {
                        key: ENV_AGENT_SPEED,
                        value: raw.clone(),
                    })?,
            );
        }
        if let Some(raw) = non_empty(getter(ENV_AGENT_COUNT)) {
            let count =
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| StreamConfigError::InvalidValue {
                        key: ENV_AGENT_COUNT,
                        value: raw.clone(),
                    })?;
            config.agent_count = check_agent_count(ENV_AGENT_COUNT, count)?;
        }

        Ok(config)
    }
}

/// Rejects crowds larger than the evacuation engine will place.
pub fn check_agent_count(key: &'static str, count: usize) -> Result<usize, StreamConfigError> {
    if count > MAX_EVACUATION_AGENTS {
        return Err(StreamConfigError::InvalidValue {
            key,
            value: count.to_string(),
        });
    }
    Ok(count)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, StreamConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| StreamConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        })
}

fn toml_value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        toml::Value::Float(value) => Some(value.to_string()),
        toml::Value::Boolean(value) => Some(value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn getter(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_sources_give_defaults() {
        let config = StreamServerConfig::from_env_with(getter(&[])).expect("defaults");
        assert_eq!(config, StreamServerConfig::default());
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.default_target, DEFAULT_TARGET_STEPS);
        assert_eq!(config.session_config().schema.target_key, "target");
    }

    #[test]
    fn values_override_defaults() {
        let config = StreamServerConfig::from_env_with(getter(&[
            (ENV_BIND_ADDR, "0.0.0.0:9100"),
            (ENV_TICK_MS, "25"),
            (ENV_POLL_MS, "40"),
            (ENV_SCENARIO, "evacuation"),
            (ENV_SCHEMA, "count"),
            (ENV_DEFAULT_TARGET, "12"),
            (ENV_AGENT_SPEED, "0.75"),
            (ENV_AGENT_COUNT, "9"),
        ]))
        .expect("config");
        assert_eq!(config.bind_addr, "0.0.0.0:9100");
        assert_eq!(config.tick_interval, Duration::from_millis(25));
        assert_eq!(config.poll_window, Duration::from_millis(40));
        assert_eq!(config.scenario, SimScenario::Evacuation);
        assert_eq!(config.schema, CommandSchemaVersion::Count);
        assert_eq!(config.default_target, 12);
        assert_eq!(config.agent_speed, Some(0.75));
        assert_eq!(config.agent_count, 9);
        assert_eq!(config.session_config().schema.running_key, "is_running");
    }

    #[test]
    fn bad_values_are_reported_with_their_key() {
        let err = StreamServerConfig::from_env_with(getter(&[(ENV_TICK_MS, "0")]))
            .expect_err("zero tick");
        assert_eq!(
            err,
            StreamConfigError::InvalidValue {
                key: ENV_TICK_MS,
                value: "0".to_string(),
            }
        );
        assert!(StreamServerConfig::from_env_with(getter(&[(ENV_SCENARIO, "maze")])).is_err());
        assert!(StreamServerConfig::from_env_with(getter(&[(ENV_AGENT_SPEED, "-1")])).is_err());
    }

    #[test]
    fn oversized_agent_count_is_rejected() {
        let huge = usize::MAX.to_string();
        let err = StreamServerConfig::from_env_with(getter(&[(ENV_AGENT_COUNT, huge.as_str())]))
            .expect_err("huge crowd");
        assert_eq!(
            err,
            StreamConfigError::InvalidValue {
                key: ENV_AGENT_COUNT,
                value: huge,
            }
        );
        let limit = MAX_EVACUATION_AGENTS.to_string();
        let config =
            StreamServerConfig::from_env_with(getter(&[(ENV_AGENT_COUNT, limit.as_str())]))
                .expect("limit accepted");
        assert_eq!(config.agent_count, MAX_EVACUATION_AGENTS);
    }

    #[test]
    fn config_file_keys_are_read() {
        let dir = std::env::temp_dir().join(format!(
            "crowd-stream-config-file-keys-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(DEFAULT_CONFIG_FILE_NAME);
        fs::write(
            &path,
            "CROWD_STREAM_SCENARIO = \"evacuation\"\nCROWD_STREAM_DEFAULT_TARGET = 30\n",
        )
        .expect("write config");

        let config = StreamServerConfig::from_config_file(&path).expect("load config");
        assert_eq!(config.scenario, SimScenario::Evacuation);
        assert_eq!(config.default_target, 30);

        fs::write(&path, "not = [valid").expect("write broken config");
        assert!(matches!(
            StreamServerConfig::from_config_file(&path),
            Err(StreamConfigError::ParseConfigFile { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn scenario_builder_honours_speed_override() {
        use crate::simulator::SimulationBuilder;

        let config = StreamServerConfig::new(SimScenario::Evacuation)
            .with_agent_count(4)
            .with_agent_speed(2.0);
        let mut builder = config.scenario_builder();
        assert_eq!(builder.scenario(), SimScenario::Evacuation);
        let simulation = builder.build().expect("build");
        assert_eq!(simulation.agent_count(), 4);
    }
}
