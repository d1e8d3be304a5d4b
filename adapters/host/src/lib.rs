#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lifecycle adapter hosting a Ringfire session inside a game loop.
//!
//! The host owns the world and every system, converts frame time into fixed
//! simulation steps and mirrors world events onto a scene through
//! [`SceneHooks`]. Engines call [`Host::on_create`] once, [`Host::on_tick`]
//! every frame and [`Host::on_destroy`] when the scene unloads.

mod config;
mod hooks;
mod time;

use std::{collections::HashMap, time::Duration};

use anyhow::{anyhow, Context, Error, Result};
use glam::Vec3;
use log::{debug, info, warn};
use ringfire_core::{
    Command, DestroyCause, Event, InstanceId, KindMap, Placement, PrefabId, RoundPhase,
    SceneCensus,
};
use ringfire_system_round::{LevelSource, RoundControl};
use ringfire_system_spawning::Spawning;
use ringfire_world::{self as world, query, World};

pub use config::{DifficultyConfig, HostConfig};
pub use hooks::{Effect, Label, SceneHooks};
pub use time::FixedTimestep;

/// Message shown once a round is cleared.
pub const ROUND_CLEAR_MESSAGE: &str = "Round Clear!";

/// What the primary input did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimaryAction {
    /// A projectile left the muzzle.
    Fired,
    /// The shot was refused, for lack of ammo or of a free projectile.
    Empty,
    /// The next level started after a won round.
    Advanced,
    /// A new session started after game over.
    Restarted,
}

/// Runs one session and keeps a scene in sync with it.
pub struct Host<H: SceneHooks, S> {
    world: World,
    spawning: Spawning,
    round: RoundControl<S>,
    timestep: FixedTimestep,
    prefabs: KindMap<PrefabId>,
    hooks: H,
    handles: HashMap<InstanceId, H::Handle>,
}

impl<H: SceneHooks> Host<H, Box<dyn LevelSource>> {
    /// Creates a host whose levels come from the source `config` selects.
    pub fn from_config(config: &HostConfig, hooks: H) -> Result<Self> {
        Self::new(config, config.level_source(), hooks)
    }
}

impl<H: SceneHooks, S: LevelSource> Host<H, S> {
    /// Creates a host reading levels from `source`.
    pub fn new(config: &HostConfig, source: S, hooks: H) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            world: World::new(),
            spawning: Spawning::new(config.spawning_config()),
            round: RoundControl::new(config.round_config(), source),
            timestep: FixedTimestep::new(config.fixed_timestep(), config.max_steps_per_frame),
            prefabs: config.prefab_table()?,
            hooks,
            handles: HashMap::new(),
        })
    }

    /// Registers prefabs and starts the first session.
    pub fn on_create(&mut self) -> Result<()> {
        let registrations = self
            .prefabs
            .iter()
            .map(|(kind, prefab)| Command::RegisterPrefab {
                kind,
                prefab: *prefab,
            })
            .collect();
        let _ = self
            .pump(registrations)
            .context("failed to register prefabs")?;
        self.begin_session()
    }

    /// Advances the simulation by the time elapsed since the last frame.
    /// Returns the number of fixed steps that ran.
    ///
    /// Nothing runs once the session is over; time resumes with the next
    /// session.
    pub fn on_tick(&mut self, frame_dt: Duration) -> Result<u32> {
        if self.phase() == RoundPhase::GameOver {
            return Ok(0);
        }
        let steps = self.timestep.accumulate(frame_dt);
        let dt = self.timestep.step();
        for ran in 0..steps {
            let _ = self.pump(vec![Command::Tick { dt }]).with_context(|| {
                format!("simulation step {} failed", query::tick_index(&self.world))
            })?;
            if self.phase() == RoundPhase::GameOver {
                self.timestep.reset();
                return Ok(ran + 1);
            }
        }
        Ok(steps)
    }

    /// Ends the session and destroys every pooled object.
    pub fn on_destroy(&mut self) -> Result<()> {
        info!("host shutting down");
        let _ = self
            .pump(vec![
                Command::DeclareGameOver,
                Command::ClearScene,
                Command::EmptyPools,
            ])
            .context("failed to tear down the scene")?;
        Ok(())
    }

    /// Fires one projectile from `muzzle`. Returns `false` when the shot was
    /// refused.
    pub fn fire(&mut self, muzzle: Placement) -> Result<bool> {
        let events = self.pump(vec![Command::FireBullet { placement: muzzle }])?;
        Ok(!events.contains(&Event::FireRejected))
    }

    /// Reports that `instance` left play.
    pub fn destroy(&mut self, instance: InstanceId, cause: DestroyCause) -> Result<()> {
        let _ = self.pump(vec![Command::DestroyInstance { instance, cause }])?;
        Ok(())
    }

    /// Handles the primary input: restarts after game over, advances after a
    /// won round and shoots otherwise.
    pub fn primary_action(&mut self, muzzle: Placement) -> Result<PrimaryAction> {
        match self.phase() {
            RoundPhase::GameOver => {
                self.begin_session()?;
                Ok(PrimaryAction::Restarted)
            }
            RoundPhase::RoundWon => {
                let census = self.census();
                let mut commands = Vec::new();
                let advanced = match self.round.request_advance(&census, &mut commands) {
                    Ok(advanced) => advanced,
                    Err(error) => {
                        let error = Error::new(error).context("failed to start the next level");
                        return Err(self.halt(error));
                    }
                };
                let _ = self.pump(commands)?;
                if advanced {
                    Ok(PrimaryAction::Advanced)
                } else {
                    Ok(PrimaryAction::Empty)
                }
            }
            RoundPhase::Active => {
                if self.fire(muzzle)? {
                    Ok(PrimaryAction::Fired)
                } else {
                    Ok(PrimaryAction::Empty)
                }
            }
        }
    }

    /// Moves the point spawners scatter around.
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.spawning.set_anchor(anchor);
    }

    /// Snapshot of the scene.
    #[must_use]
    pub fn census(&self) -> SceneCensus {
        query::census(&self.world)
    }

    /// World owned by the host.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Spawning system owned by the host.
    #[must_use]
    pub fn spawning(&self) -> &Spawning {
        &self.spawning
    }

    /// Scene hooks.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Scene hooks, mutably.
    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Scene handle of `instance`, if it exists.
    #[must_use]
    pub fn handle(&self, instance: InstanceId) -> Option<&H::Handle> {
        self.handles.get(&instance)
    }

    fn phase(&self) -> RoundPhase {
        query::game_state(&self.world).phase()
    }

    fn begin_session(&mut self) -> Result<()> {
        self.timestep.reset();
        let mut commands = Vec::new();
        self.round.begin_session(&mut commands);
        let _ = self.pump(commands).context("failed to start a session")?;
        Ok(())
    }

    /// Applies `commands` and every command they cause until the world
    /// settles, mirroring each event onto the scene. Returns all events.
    ///
    /// A level that cannot be set up halts the session instead of leaving it
    /// half started.
    fn pump(&mut self, commands: Vec<Command>) -> Result<Vec<Event>> {
        let mut log = Vec::new();
        let mut pending = commands;
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }

            let census = query::census(&self.world);
            let mut spawns = Vec::new();
            let configured = self.spawning.handle(&events, &census, &mut spawns);
            for command in spawns {
                world::apply(&mut self.world, command, &mut events);
            }
            for event in &events {
                self.dispatch(event);
            }

            if let Err(error) = configured {
                let error = Error::new(error).context("failed to configure spawners");
                return Err(self.halt(error));
            }
            let rejected = events.iter().find_map(|event| match event {
                Event::PopulateRejected { kind, reason } => {
                    Some(anyhow!("cannot populate the {kind} pool: {reason}"))
                }
                _ => None,
            });
            if let Some(error) = rejected {
                return Err(self.halt(error));
            }

            let census = query::census(&self.world);
            let enemy_spawning = self.spawning.enemy_spawning();
            if let Err(error) = self
                .round
                .handle(&events, &census, enemy_spawning, &mut pending)
            {
                let level = census.state.level();
                let error = Error::new(error)
                    .context(format!("round handling failed at level {level}"));
                return Err(self.halt(error));
            }
            log.extend(events);
        }
        Ok(log)
    }

    /// Ends the session after a failure so nothing keeps running, then hands
    /// `error` back.
    fn halt(&mut self, error: Error) -> Error {
        warn!("halting session: {error:#}");
        self.spawning.stop_all();
        let mut events = Vec::new();
        for command in [Command::DeclareGameOver, Command::ClearScene] {
            world::apply(&mut self.world, command, &mut events);
        }
        for event in &events {
            self.dispatch(event);
        }
        error
    }

    fn dispatch(&mut self, event: &Event) {
        match event {
            Event::InstanceCreated { instance, prefab } => {
                let handle = self.hooks.instantiate(*prefab, instance.kind());
                let _ = self.handles.insert(*instance, handle);
            }
            Event::InstanceActivated {
                instance,
                placement,
                spawner,
            } => {
                if let Some(handle) = self.handles.get_mut(instance) {
                    self.hooks.activate(handle, *placement);
                } else {
                    warn!("activated {instance:?} has no scene handle");
                }
                if spawner.is_some() {
                    self.hooks.play_effect(Effect::SpawnPortal(*placement));
                }
            }
            Event::InstanceReleased { instance, .. } => {
                if let Some(handle) = self.handles.get_mut(instance) {
                    self.hooks.deactivate(handle);
                }
            }
            Event::PoolsEmptied { destroyed } => {
                for instance in destroyed {
                    if let Some(handle) = self.handles.remove(instance) {
                        self.hooks.destroy(handle);
                    }
                }
            }
            Event::PopulateRejected { kind, reason } => {
                warn!("{kind} pool not populated: {reason}");
            }
            Event::SpawnRejected { kind, reason, .. } => {
                debug!("{kind} spawn skipped: {reason}");
            }
            Event::AmmoChanged { ammo } => {
                self.hooks.update_label(Label::Ammo, &ammo.to_string());
            }
            Event::ScoreChanged { score } => {
                self.hooks.update_label(Label::Score, &score.to_string());
            }
            Event::LevelStarted { level, .. } => {
                self.hooks.update_label(Label::Round, &level.to_string());
                self.hooks.update_label(Label::Message, "");
            }
            Event::RoundWon { .. } => {
                self.hooks.update_label(Label::Message, ROUND_CLEAR_MESSAGE);
                self.hooks.play_effect(Effect::Victory);
            }
            Event::GameOver { level } => {
                let survived = level.saturating_sub(self.round.starting_level());
                let message = format!("Game Over\n\nRounds Survived : {survived}");
                self.hooks.update_label(Label::Message, &message);
                self.hooks.play_effect(Effect::Defeat);
            }
            Event::TimeAdvanced { .. }
            | Event::FireRejected
            | Event::SceneCleared { .. }
            | Event::SessionReset => {}
        }
    }
}
