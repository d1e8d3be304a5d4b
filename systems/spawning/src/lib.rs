#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawning system that turns level patterns into timed spawn commands.
//!
//! The system owns every [`Spawner`] through a [`SpawnerAllocator`]. The
//! pattern carried by each `LevelStarted` event is mapped onto spawners by
//! [`Spawning::configure_level`]; each `TimeAdvanced` event then advances the
//! spawners and emits `Command::SpawnInstance` for every emission that fits
//! under the global spawn limit. Round-over events stop every spawner.

mod allocator;
mod spawner;

use glam::Vec3;
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ringfire_core::{Command, Event, LevelPattern, RoundPhase, SceneCensus, DEFAULT_POOL_SIZE};

pub use allocator::{AllocationReport, SpawnerAllocator, BASE_AMMO_REWARD, SURPLUS_AMMO_POINTS};
pub use spawner::{SpawnBudget, SpawnRequest, Spawner, SpawnerError, SpawnerPhase};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    spawn_limit: u32,
    anchor: Vec3,
    pool_size: u32,
}

impl Config {
    /// Creates a configuration with the provided seed and global spawn limit.
    #[must_use]
    pub const fn new(rng_seed: u64, spawn_limit: u32) -> Self {
        Self {
            rng_seed,
            spawn_limit,
            anchor: Vec3::ZERO,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Point spawners scatter their emissions around.
    #[must_use]
    pub const fn with_anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }

    /// Number of instances an empty pool is pre-warmed with.
    #[must_use]
    pub const fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }
}

/// Pure system that emits spawn commands for the active level pattern.
#[derive(Debug)]
pub struct Spawning {
    allocator: SpawnerAllocator,
    rng: ChaCha8Rng,
    spawn_limit: u32,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            allocator: SpawnerAllocator::new(config.anchor, config.pool_size),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            spawn_limit: config.spawn_limit,
        }
    }

    /// Consumes world events and the scene census to emit spawn commands.
    ///
    /// A started level replaces whatever the spawners were doing with the
    /// level's pattern; pool warm-up and the round's rewards are emitted
    /// alongside the spawn commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        census: &SceneCensus,
        out: &mut Vec<Command>,
    ) -> Result<(), SpawnerError> {
        let mut budget = SpawnBudget::new(self.spawn_limit, census.spawned_alive);
        let mut requests = Vec::new();

        for event in events {
            match event {
                Event::RoundWon { .. } | Event::GameOver { .. } | Event::SessionReset => {
                    self.allocator.stop_all();
                }
                Event::LevelStarted { level, pattern } => {
                    debug!("configuring spawners for level {level}");
                    self.allocator.stop_all();
                    let _ = self.configure_level(pattern.clone(), census, out)?;
                }
                Event::TimeAdvanced { dt } if census.state.phase() == RoundPhase::Active => {
                    self.allocator
                        .tick(*dt, &mut budget, &mut self.rng, &mut requests);
                }
                _ => {}
            }
        }

        out.extend(requests.into_iter().map(SpawnRequest::into_command));
        Ok(())
    }

    /// Maps `pattern` onto spawners and starts them. See
    /// [`SpawnerAllocator::allocate`].
    pub fn configure_level(
        &mut self,
        pattern: LevelPattern,
        census: &SceneCensus,
        out: &mut Vec<Command>,
    ) -> Result<AllocationReport, SpawnerError> {
        self.allocator.allocate(pattern, census, out)
    }

    /// Stops every active spawner.
    pub fn stop_all(&mut self) {
        self.allocator.stop_all();
    }

    /// Reports whether any enemy spawner is still emitting.
    #[must_use]
    pub fn enemy_spawning(&self) -> bool {
        self.allocator.enemy_spawning()
    }

    /// Moves the point spawners scatter their emissions around.
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.allocator.set_anchor(anchor);
    }

    /// Spawner ownership, for inspection.
    #[must_use]
    pub fn allocator(&self) -> &SpawnerAllocator {
        &self.allocator
    }
}
