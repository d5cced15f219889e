//! TCP listener that upgrades each connection to a WebSocket and runs one
//! independent session per client on its own thread.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::thread;

use tracing::{info, warn};

use crate::session::{run_session, SessionExit, SessionReport};

mod config;
mod websocket;

pub use config::{
    check_agent_count, StreamConfigError, StreamServerConfig, DEFAULT_BIND_ADDR,
    DEFAULT_CONFIG_FILE_NAME, DEFAULT_POLL_MS, DEFAULT_TICK_MS, ENV_AGENT_COUNT, ENV_AGENT_SPEED,
    ENV_BIND_ADDR, ENV_DEFAULT_TARGET, ENV_POLL_MS, ENV_SCENARIO, ENV_SCHEMA, ENV_TICK_MS,
};
pub use websocket::WebSocketTransport;

#[derive(Debug, thiserror::Error)]
pub enum StreamServerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error(transparent)]
    Config(#[from] StreamConfigError),
}

pub struct StreamServer {
    config: StreamServerConfig,
}

impl StreamServer {
    pub fn new(config: StreamServerConfig) -> Self {
        Self { config }
    }

    /// Accepts forever. A failing session is logged and never takes the listener down.
    pub fn run(&self) -> Result<(), StreamServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr)?;
        info!(
            bind = %self.config.bind_addr,
            scenario = self.config.scenario.as_str(),
            schema = self.config.schema.as_str(),
            "stream server listening"
        );
        for incoming in listener.incoming() {
            let stream = match incoming {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(%err, "accept failed");
                    continue;
                }
            };
            let config = self.config.clone();
            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            let spawned = thread::Builder::new()
                .name(format!("crowd-stream-{peer}"))
                .spawn(move || {
                    if let Err(err) = serve_stream(&config, stream) {
                        warn!(%err, "stream session error");
                    }
                });
            if let Err(err) = spawned {
                warn!(%err, "spawn session thread failed");
            }
        }
        Ok(())
    }

    /// Serves exactly one connection on the calling thread.
    pub fn run_once(&self) -> Result<SessionReport, StreamServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr)?;
        let (stream, _) = listener.accept()?;
        serve_stream(&self.config, stream)
    }
}

fn serve_stream(
    config: &StreamServerConfig,
    stream: TcpStream,
) -> Result<SessionReport, StreamServerError> {
    let mut transport = WebSocketTransport::accept(stream)?;
    let peer = transport.peer();
    info!(?peer, "client connected");

    let mut builder = config.scenario_builder();
    let report = run_session(&mut transport, &mut builder, config.session_config());

    match &report.exit {
        SessionExit::Disconnected(kind) => info!(
            ?peer,
            ?kind,
            ticks = report.ticks,
            steps = report.steps,
            rejected = report.rejected_commands,
            builds = report.builds,
            halts = report.halts,
            "session ended"
        ),
        SessionExit::Failed(err) => warn!(
            ?peer,
            %err,
            ticks = report.ticks,
            steps = report.steps,
            "session failed"
        ),
    }
    Ok(report)
}
