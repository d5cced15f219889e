use std::fmt;

use crowd_stream_proto::ClientCommand;
use tracing::info;

use crate::simulator::{Simulation, SimulationBuilder, SimulationError};

pub const DEFAULT_TARGET_STEPS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Idle,
    Running,
    Paused,
}

/// What applying one command did beyond mutating the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// A new simulation instance replaced whatever was there before.
    pub built: bool,
}

/// Everything one connection remembers between ticks. The simulation handle
/// is owned here and nowhere else.
///
/// Invariants: no simulation implies `Uninitialized` or `Idle`; `Running`
/// implies a simulation.
pub struct SessionState {
    lifecycle: Lifecycle,
    simulation: Option<Box<dyn Simulation>>,
    target_steps: u64,
    generation: u64,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("lifecycle", &self.lifecycle)
            .field("has_simulation", &self.simulation.is_some())
            .field("target_steps", &self.target_steps)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_STEPS)
    }
}

impl SessionState {
    pub fn new(target_steps: u64) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            simulation: None,
            target_steps,
            generation: 0,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn target_steps(&self) -> u64 {
        self.target_steps
    }

    /// Bumped on every build, so two handles with the same generation are the same instance.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn simulation(&self) -> Option<&dyn Simulation> {
        self.simulation.as_deref()
    }

    pub fn simulation_mut(&mut self) -> Option<&mut (dyn Simulation + 'static)> {
        self.simulation.as_deref_mut()
    }

    /// Applies one validated command. Rules run in order: `reset` rebuilds and
    /// idles; `isRunning` then starts (building only if nothing exists yet) or
    /// pauses, and carries the new step target.
    pub fn apply<B>(
        &mut self,
        command: &ClientCommand,
        builder: &mut B,
    ) -> Result<Transition, SimulationError>
    where
        B: SimulationBuilder + ?Sized,
    {
        let mut transition = Transition::default();

        if command.reset == Some(true) {
            self.rebuild(builder)?;
            self.lifecycle = Lifecycle::Idle;
            transition.built = true;
            info!(generation = self.generation, "simulation reset");
        }

        if let Some(running) = command.is_running {
            if running {
                if self.simulation.is_none() {
                    self.rebuild(builder)?;
                    transition.built = true;
                    info!(generation = self.generation, "simulation initialised on start");
                }
                self.lifecycle = Lifecycle::Running;
            } else if self.simulation.is_some() {
                self.lifecycle = Lifecycle::Paused;
                info!("simulation paused");
            }
            if let Some(target) = command.target {
                self.target_steps = target;
            }
        }

        Ok(transition)
    }

    fn rebuild<B>(&mut self, builder: &mut B) -> Result<(), SimulationError>
    where
        B: SimulationBuilder + ?Sized,
    {
        self.simulation = None;
        match builder.build() {
            Ok(simulation) => {
                self.simulation = Some(simulation);
                self.generation += 1;
                Ok(())
            }
            Err(err) => {
                self.lifecycle = Lifecycle::Uninitialized;
                Err(err)
            }
        }
    }
}
