use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use crowd_stream::{
    check_agent_count, CommandSchemaVersion, SimScenario, StreamConfigError, StreamServer,
    StreamServerConfig,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "crowd_stream_server",
    about = "Stream crowd simulation snapshots to WebSocket clients"
)]
struct Cli {
    /// TOML file keyed by the CROWD_STREAM_* variable names.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    tick_ms: Option<u64>,
    #[arg(long)]
    poll_ms: Option<u64>,
    /// orbit | evacuation
    #[arg(long)]
    scenario: Option<String>,
    /// target | speed | count
    #[arg(long)]
    schema: Option<String>,
    #[arg(long)]
    default_target: Option<u64>,
    #[arg(long)]
    agent_speed: Option<f64>,
    #[arg(long)]
    agent_count: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            process::exit(1);
        }
    };

    if let Err(err) = StreamServer::new(config).run() {
        error!(%err, "stream server failed");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<StreamServerConfig, StreamConfigError> {
    let base = match &cli.config {
        Some(path) => StreamServerConfig::from_config_file(path)?,
        None => StreamServerConfig::from_default_sources()?,
    };
    apply_overrides(base, cli)
}

fn apply_overrides(
    mut config: StreamServerConfig,
    cli: &Cli,
) -> Result<StreamServerConfig, StreamConfigError> {
    if let Some(bind) = &cli.bind {
        config = config.with_bind_addr(bind.clone());
    }
    if let Some(tick_ms) = cli.tick_ms {
        config = config.with_tick_interval(Duration::from_millis(positive("--tick-ms", tick_ms)?));
    }
    if let Some(poll_ms) = cli.poll_ms {
        config = config.with_poll_window(Duration::from_millis(positive("--poll-ms", poll_ms)?));
    }
    if let Some(raw) = &cli.scenario {
        let scenario = SimScenario::parse(raw).ok_or_else(|| StreamConfigError::InvalidValue {
            key: "--scenario",
            value: unknown_choice(raw, SimScenario::variants()),
        })?;
        config = config.with_scenario(scenario);
    }
    if let Some(raw) = &cli.schema {
        let schema =
            CommandSchemaVersion::parse(raw).ok_or_else(|| StreamConfigError::InvalidValue {
                key: "--schema",
                value: unknown_choice(raw, CommandSchemaVersion::variants()),
            })?;
        config = config.with_schema(schema);
    }
    if let Some(target) = cli.default_target {
        config = config.with_default_target(target);
    }
    if let Some(speed) = cli.agent_speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(StreamConfigError::InvalidValue {
                key: "--agent-speed",
                value: speed.to_string(),
            });
        }
        config = config.with_agent_speed(speed);
    }
    if let Some(count) = cli.agent_count {
        config = config.with_agent_count(check_agent_count("--agent-count", count)?);
    }
    Ok(config)
}

fn unknown_choice(raw: &str, choices: &[&str]) -> String {
    format!("{raw} (expected one of: {})", choices.join(", "))
}

fn positive(key: &'static str, value: u64) -> Result<u64, StreamConfigError> {
    if value == 0 {
        return Err(StreamConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}
