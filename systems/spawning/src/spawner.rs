//! Timed emitter of a single spawnable kind.

use std::{
    f32::consts::{PI, TAU},
    time::Duration,
};

use glam::Vec3;
use log::debug;
use rand::Rng;
use ringfire_core::{Command, Placement, SpawnConfig, SpawnableKind, SpawnerId};
use thiserror::Error;

/// Errors raised when a spawner is driven out of order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SpawnerError {
    /// The spawner must be idle for the requested operation.
    #[error("{spawner} is already spawning")]
    AlreadySpawning {
        /// Offending spawner.
        spawner: SpawnerId,
    },
    /// The spawner was started before receiving a configuration.
    #[error("{spawner} has no configuration")]
    Unconfigured {
        /// Offending spawner.
        spawner: SpawnerId,
    },
}

/// Lifecycle phase of a [`Spawner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnerPhase {
    /// Not emitting.
    Idle,
    /// Emitting; the next attempt happens once the spawner clock reaches
    /// `wake_at`.
    Spawning {
        /// Spawner clock value of the next emission attempt.
        wake_at: Duration,
    },
}

/// Shared allowance of emissions within one tick.
///
/// Starts at the global spawn limit minus the actors already alive and
/// shrinks with every emission granted during the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnBudget {
    remaining: u32,
}

impl SpawnBudget {
    /// Creates a budget for a scene holding `alive` of at most `limit` actors.
    #[must_use]
    pub const fn new(limit: u32, alive: u32) -> Self {
        Self {
            remaining: limit.saturating_sub(alive),
        }
    }

    /// Emissions still allowed.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consumes one emission, reporting whether any was left.
    pub fn try_take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Emission produced by a spawner tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Spawner that emitted.
    pub spawner: SpawnerId,
    /// Kind to place into the scene.
    pub kind: SpawnableKind,
    /// Where the instance appears.
    pub placement: Placement,
}

impl SpawnRequest {
    /// Converts the request into the command the world executes.
    #[must_use]
    pub const fn into_command(self) -> Command {
        Command::SpawnInstance {
            spawner: self.spawner,
            kind: self.kind,
            placement: self.placement,
        }
    }
}

/// Emits one kind at a fixed rate around an anchor point.
#[derive(Clone, Debug)]
pub struct Spawner {
    id: SpawnerId,
    config: Option<SpawnConfig>,
    spawn_count: u32,
    phase: SpawnerPhase,
    clock: Duration,
    anchor: Vec3,
    placement: Placement,
}

impl Spawner {
    /// Creates an idle, unconfigured spawner emitting around `anchor`.
    #[must_use]
    pub fn new(id: SpawnerId, anchor: Vec3) -> Self {
        Self {
            id,
            config: None,
            spawn_count: 0,
            phase: SpawnerPhase::Idle,
            clock: Duration::ZERO,
            anchor,
            placement: Placement::new(anchor, glam::Quat::IDENTITY),
        }
    }

    /// Identifier of the spawner.
    #[must_use]
    pub const fn id(&self) -> SpawnerId {
        self.id
    }

    /// Latest configuration applied.
    #[must_use]
    pub const fn config(&self) -> Option<&SpawnConfig> {
        self.config.as_ref()
    }

    /// Kind the spawner emits, once configured.
    #[must_use]
    pub fn kind(&self) -> Option<SpawnableKind> {
        self.config.map(|config| config.kind())
    }

    /// Emissions performed since the last start.
    #[must_use]
    pub const fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SpawnerPhase {
        self.phase
    }

    /// Reports whether a wake-up is armed.
    #[must_use]
    pub const fn is_spawning(&self) -> bool {
        matches!(self.phase, SpawnerPhase::Spawning { .. })
    }

    /// Point emissions are scattered around.
    #[must_use]
    pub const fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Moves the point emissions are scattered around.
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
    }

    /// Placement of the most recent emission.
    #[must_use]
    pub const fn placement(&self) -> Placement {
        self.placement
    }

    /// Applies a new configuration. The spawner must be idle.
    pub fn configure(&mut self, config: SpawnConfig) -> Result<(), SpawnerError> {
        if self.is_spawning() {
            return Err(SpawnerError::AlreadySpawning { spawner: self.id });
        }
        debug!(
            "{} configured for {} (limit {:?}, rate {:?})",
            self.id,
            config.kind(),
            config.limit(),
            config.rate()
        );
        self.config = Some(config);
        Ok(())
    }

    /// Starts emitting: the first attempt happens after the initial delay
    /// plus one interval, then once per interval.
    pub fn start(&mut self) -> Result<(), SpawnerError> {
        if self.is_spawning() {
            return Err(SpawnerError::AlreadySpawning { spawner: self.id });
        }
        let config = self
            .config
            .ok_or(SpawnerError::Unconfigured { spawner: self.id })?;

        self.spawn_count = 0;
        if config.limit().is_reached(0) {
            debug!("{} has nothing to spawn", self.id);
            return Ok(());
        }

        let wake_at = self
            .clock
            .saturating_add(config.initial_delay())
            .saturating_add(config.rate());
        self.phase = SpawnerPhase::Spawning { wake_at };
        Ok(())
    }

    /// Cancels any pending emission. Idempotent.
    pub fn stop(&mut self) {
        if self.is_spawning() {
            debug!("{} stopped after {} emissions", self.id, self.spawn_count);
        }
        self.phase = SpawnerPhase::Idle;
    }

    /// Advances the spawner clock by `dt` and performs every attempt that
    /// came due.
    ///
    /// An attempt is skipped without counting when the budget is spent. A
    /// zero rate allows at most one attempt per tick.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: Duration,
        budget: &mut SpawnBudget,
        rng: &mut R,
        out: &mut Vec<SpawnRequest>,
    ) {
        self.clock = self.clock.saturating_add(dt);
        let Some(config) = self.config else {
            return;
        };

        while let SpawnerPhase::Spawning { wake_at } = self.phase {
            if self.clock < wake_at {
                break;
            }
            self.phase = SpawnerPhase::Spawning {
                wake_at: wake_at.saturating_add(config.rate()),
            };

            if budget.try_take() {
                self.placement = self.sample_placement(&config, rng);
                self.spawn_count += 1;
                out.push(SpawnRequest {
                    spawner: self.id,
                    kind: config.kind(),
                    placement: self.placement,
                });
                if config.limit().is_reached(self.spawn_count) {
                    debug!("{} reached its limit of {}", self.id, self.spawn_count);
                    self.phase = SpawnerPhase::Idle;
                }
            }

            if config.rate().is_zero() {
                break;
            }
        }
    }

    fn sample_placement<R: Rng + ?Sized>(&self, config: &SpawnConfig, rng: &mut R) -> Placement {
        let radius = rng.gen_range(config.min_distance()..=config.max_distance());
        let polar = rng.gen_range(0.0..=PI);
        let azimuth = rng.gen_range(0.0..=TAU);

        let offset = Vec3::new(
            radius * polar.sin() * azimuth.cos(),
            radius * polar.sin() * azimuth.sin(),
            radius * polar.cos(),
        );
        Placement::facing(self.anchor + offset, self.anchor)
    }
}
