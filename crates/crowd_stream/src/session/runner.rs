use std::thread;
use std::time::Duration;

use crowd_stream_proto::{CommandSchema, TARGET_COMMAND_SCHEMA};
use tracing::{debug, error, info, warn};

use crate::simulator::SimulationBuilder;

use super::command::CommandDecoder;
use super::encoder::{geometry_message, to_wire};
use super::error::SessionError;
use super::scheduler::step_once;
use super::state::{Lifecycle, SessionState, DEFAULT_TARGET_STEPS};
use super::transport::{CloseGuard, CloseKind, PollOutcome, SessionTransport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Pause after every tick that was not a rejected command.
    pub tick_interval: Duration,
    /// Upper bound on how long one tick waits for client input.
    pub poll_window: Duration,
    pub schema: CommandSchema,
    pub default_target: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            poll_window: Duration::from_millis(100),
            schema: TARGET_COMMAND_SCHEMA,
            default_target: DEFAULT_TARGET_STEPS,
        }
    }
}

#[derive(Debug)]
pub enum SessionExit {
    Disconnected(CloseKind),
    Failed(SessionError),
}

#[derive(Debug)]
pub struct SessionReport {
    pub exit: SessionExit,
    pub ticks: u64,
    pub steps: u64,
    pub rejected_commands: u64,
    pub builds: u64,
    /// Times a running simulation stopped stepping at its target or ran out of agents.
    pub halts: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    /// Tick ran to the end; sleep before the next one.
    Continue,
    /// Inbound message failed validation; poll again right away.
    Rejected,
    Closed(CloseKind),
}

/// One connection's tick driver. Owns the session state; borrows the builder
/// so callers can inspect it afterwards.
pub struct SessionLoop<'a, B: SimulationBuilder + ?Sized> {
    builder: &'a mut B,
    decoder: CommandDecoder,
    state: SessionState,
    config: SessionConfig,
    ticks: u64,
    steps: u64,
    rejected: u64,
    builds: u64,
    halts: u64,
    halt_reported: bool,
}

impl<'a, B: SimulationBuilder + ?Sized> SessionLoop<'a, B> {
    pub fn new(builder: &'a mut B, config: SessionConfig) -> Self {
        Self {
            builder,
            decoder: CommandDecoder::new(config.schema),
            state: SessionState::new(config.default_target),
            config,
            ticks: 0,
            steps: 0,
            rejected: 0,
            builds: 0,
            halts: 0,
            halt_reported: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// poll -> decode -> apply -> maybe step -> maybe emit. Sleeping is left to the caller.
    pub fn tick<T>(&mut self, transport: &mut T) -> Result<TickFlow, SessionError>
    where
        T: SessionTransport + ?Sized,
    {
        self.ticks += 1;

        let command = match transport.poll(self.config.poll_window)? {
            PollOutcome::Closed(kind) => return Ok(TickFlow::Closed(kind)),
            PollOutcome::NoMessage => None,
            PollOutcome::Message(raw) => match self.decoder.decode(&raw) {
                Ok(command) => Some(command),
                Err(err) => {
                    warn!(%err, "discarding invalid command");
                    self.rejected += 1;
                    return Ok(TickFlow::Rejected);
                }
            },
        };

        if let Some(command) = command {
            debug!(?command, "applying command");
            let transition = self.state.apply(&command, &mut *self.builder)?;
            if transition.built {
                self.builds += 1;
                self.halt_reported = false;
                if let Some(geometry) = self.builder.geometry() {
                    transport.send(to_wire(&geometry_message(geometry))?)?;
                }
            }
        }

        match step_once(&mut self.state)? {
            Some(snapshot) => {
                self.steps += 1;
                self.halt_reported = false;
                debug!(
                    iteration = snapshot.iteration_count,
                    target = snapshot.target,
                    remaining = snapshot.remaining_agents,
                    "simulation step"
                );
                transport.send(to_wire(&snapshot)?)?;
            }
            None => {
                if self.state.lifecycle() == Lifecycle::Running && !self.halt_reported {
                    self.halt_reported = true;
                    self.halts += 1;
                    if let Some(simulation) = self.state.simulation() {
                        info!(
                            iteration = simulation.iteration_count(),
                            target = self.state.target_steps(),
                            remaining = simulation.agent_count(),
                            "stepping halted"
                        );
                    }
                }
            }
        }

        Ok(TickFlow::Continue)
    }

    /// Ticks until the connection ends or something fails, then closes exactly once.
    pub fn run<T>(mut self, transport: &mut T) -> SessionReport
    where
        T: SessionTransport + ?Sized,
    {
        let mut guard = CloseGuard::new();
        let exit = loop {
            match self.tick(transport) {
                Ok(TickFlow::Continue) => {
                    if !self.config.tick_interval.is_zero() {
                        thread::sleep(self.config.tick_interval);
                    }
                }
                Ok(TickFlow::Rejected) => {}
                Ok(TickFlow::Closed(kind)) | Err(SessionError::ConnectionClosed(kind)) => {
                    match kind {
                        CloseKind::Graceful => info!("client disconnected"),
                        CloseKind::Error => info!("connection closed with error"),
                    }
                    break SessionExit::Disconnected(kind);
                }
                Err(err) => {
                    error!(%err, "session failed");
                    break SessionExit::Failed(err);
                }
            }
        };
        guard.close_once(transport);

        SessionReport {
            exit,
            ticks: self.ticks,
            steps: self.steps,
            rejected_commands: self.rejected,
            builds: self.builds,
            halts: self.halts,
        }
    }
}

pub fn run_session<T, B>(transport: &mut T, builder: &mut B, config: SessionConfig) -> SessionReport
where
    T: SessionTransport + ?Sized,
    B: SimulationBuilder + ?Sized,
{
    SessionLoop::new(builder, config).run(transport)
}
