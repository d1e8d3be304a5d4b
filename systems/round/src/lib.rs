#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round controller that arbitrates round outcomes and drives level
//! progression.
//!
//! Every fixed tick the controller inspects the scene census: a round is won
//! once no enemy spawner is emitting and no enemy is alive, and lost once
//! enemies remain while the player has neither ammo nor a projectile in
//! flight. Either outcome clears the scene; a won round then advances to the
//! next level, whose pattern comes from a [`LevelSource`] and travels to the
//! spawning system inside `Command::StartLevel`.

mod source;

use log::{info, warn};
use ringfire_core::{
    Command, ConfigError, Event, LevelPattern, RoundPhase, SceneCensus, SpawnableKind,
    DEFAULT_POOL_SIZE,
};
use ringfire_system_patterns::PatternError;
use thiserror::Error;

pub use source::{DifficultyCurve, LevelSource};

/// Extra starting ammo granted for every level skipped by the starting level.
pub const AMMO_PER_SKIPPED_LEVEL: u32 = 15;

/// Errors that abort a level start.
#[derive(Debug, Error)]
pub enum RoundError {
    /// The pattern document could not be read.
    #[error("failed to read level pattern")]
    Pattern(#[from] PatternError),
    /// A generated configuration is invalid.
    #[error("invalid spawn configuration")]
    Config(#[from] ConfigError),
    /// The level needs a pool that has no prefab to grow from.
    #[error("level {level} needs {kind} instances but no {kind} prefab is registered")]
    MissingPrefab {
        /// Level that could not start.
        level: u32,
        /// Kind without a prefab.
        kind: SpawnableKind,
    },
}

/// Terminal result of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundOutcome {
    /// Every enemy is gone and no enemy spawner is emitting.
    RoundWon,
    /// Enemies remain but the player cannot shoot anymore.
    GameOver,
}

impl RoundOutcome {
    /// Command that ends the round with this outcome.
    #[must_use]
    pub const fn into_command(self) -> Command {
        match self {
            Self::RoundWon => Command::DeclareRoundWon,
            Self::GameOver => Command::DeclareGameOver,
        }
    }
}

/// Decides whether the active round just ended.
///
/// Round-won is evaluated first, so a last shot that kills the last enemy
/// wins the round even though the player is out of ammo. Pickup spawners
/// never keep a round open.
#[must_use]
pub fn arbitrate(census: &SceneCensus, enemy_spawning: bool) -> Option<RoundOutcome> {
    if census.state.phase() != RoundPhase::Active {
        return None;
    }
    if !enemy_spawning && census.enemies_alive == 0 {
        return Some(RoundOutcome::RoundWon);
    }
    if census.enemies_alive > 0 && census.player_projectiles_alive == 0 && census.ammo == 0 {
        return Some(RoundOutcome::GameOver);
    }
    None
}

/// When a won round moves on to the next level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvancePolicy {
    /// The next level starts as soon as the scene is cleared.
    Immediate,
    /// The next level waits for [`RoundControl::request_advance`].
    OnRequest,
}

/// Configuration parameters required to construct the round controller.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    starting_level: u32,
    starting_ammo: u32,
    advance: AdvancePolicy,
    projectile_pool_size: u32,
}

impl Config {
    /// Creates a configuration starting sessions at `starting_level` with
    /// `starting_ammo`.
    #[must_use]
    pub const fn new(starting_level: u32, starting_ammo: u32) -> Self {
        Self {
            starting_level,
            starting_ammo,
            advance: AdvancePolicy::Immediate,
            projectile_pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Selects when won rounds advance.
    #[must_use]
    pub const fn with_advance_policy(mut self, advance: AdvancePolicy) -> Self {
        self.advance = advance;
        self
    }

    /// Number of player projectiles pre-warmed at session start.
    #[must_use]
    pub const fn with_projectile_pool_size(mut self, size: u32) -> Self {
        self.projectile_pool_size = size;
        self
    }
}

/// Drives sessions through their levels.
#[derive(Debug)]
pub struct RoundControl<S> {
    source: S,
    starting_level: u32,
    starting_ammo: u32,
    advance: AdvancePolicy,
    projectile_pool_size: u32,
}

impl<S: LevelSource> RoundControl<S> {
    /// Creates a controller reading level patterns from `source`.
    #[must_use]
    pub fn new(config: Config, source: S) -> Self {
        Self {
            source,
            starting_level: config.starting_level,
            starting_ammo: config.starting_ammo,
            advance: config.advance,
            projectile_pool_size: config.projectile_pool_size,
        }
    }

    /// Ammo a fresh session starts with.
    #[must_use]
    pub const fn session_ammo(&self) -> u32 {
        let skipped = self.starting_level.saturating_sub(1);
        self.starting_ammo
            .saturating_add(skipped.saturating_mul(AMMO_PER_SKIPPED_LEVEL))
    }

    /// Level a fresh session starts at.
    #[must_use]
    pub const fn starting_level(&self) -> u32 {
        self.starting_level
    }

    /// Level source in use.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Requests a fresh session. The starting level begins once the world
    /// reports `SessionReset`.
    pub fn begin_session(&mut self, out: &mut Vec<Command>) {
        self.source.rewind();
        out.push(Command::ResetSession {
            ammo: self.session_ammo(),
        });
    }

    /// Consumes world events and the scene census to emit round commands.
    /// `enemy_spawning` reports whether any enemy spawner is still emitting.
    ///
    /// A level whose prefabs are missing fails before its `StartLevel` is
    /// emitted.
    pub fn handle(
        &mut self,
        events: &[Event],
        census: &SceneCensus,
        enemy_spawning: bool,
        out: &mut Vec<Command>,
    ) -> Result<(), RoundError> {
        let mut ticked = false;
        for event in events {
            match event {
                Event::SessionReset => {
                    out.push(Command::PopulatePool {
                        kind: SpawnableKind::Bullet,
                        prefab: None,
                        count: self.projectile_pool_size,
                    });
                    self.start_level(self.starting_level, census, out)?;
                }
                Event::RoundWon { level } => {
                    out.push(Command::ClearScene);
                    if self.advance == AdvancePolicy::Immediate {
                        self.start_level(level + 1, census, out)?;
                    }
                }
                Event::GameOver { level } => {
                    info!("session over after reaching level {level}");
                    out.push(Command::ClearScene);
                }
                Event::TimeAdvanced { .. } => ticked = true,
                _ => {}
            }
        }

        if ticked {
            if let Some(outcome) = arbitrate(census, enemy_spawning) {
                out.push(outcome.into_command());
            }
        }
        Ok(())
    }

    /// Starts the next level after a won round. Returns `false` when the
    /// current round has not been won.
    pub fn request_advance(
        &mut self,
        census: &SceneCensus,
        out: &mut Vec<Command>,
    ) -> Result<bool, RoundError> {
        if census.state.phase() != RoundPhase::RoundWon {
            warn!(
                "ignoring advance request during {:?}",
                census.state.phase()
            );
            return Ok(false);
        }
        self.start_level(census.state.level() + 1, census, out)?;
        Ok(true)
    }

    fn start_level(
        &mut self,
        level: u32,
        census: &SceneCensus,
        out: &mut Vec<Command>,
    ) -> Result<(), RoundError> {
        let pattern = self.source.level_pattern(level)?;
        if let Some(kind) = missing_prefab(&pattern, census) {
            return Err(RoundError::MissingPrefab { level, kind });
        }
        info!("starting level {level} with {} spawn groups", pattern.len());
        out.push(Command::StartLevel { level, pattern });
        Ok(())
    }
}

/// First kind `pattern` would instantiate, player projectiles included, that
/// has no registered prefab.
fn missing_prefab(pattern: &LevelPattern, census: &SceneCensus) -> Option<SpawnableKind> {
    pattern
        .groups()
        .iter()
        .flat_map(|group| {
            let kind = group.kind();
            std::iter::once(kind).chain(kind.dependencies().iter().copied())
        })
        .chain(std::iter::once(SpawnableKind::Bullet))
        .find(|kind| !census.has_prefab(*kind))
}
