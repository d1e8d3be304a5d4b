#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative scene state for Ringfire.
//!
//! The world owns every pooled actor, the player's ammo and score, and the
//! round phase. It is mutated exclusively through [`apply`] and inspected
//! through the [`query`] module.

pub mod pool;

use log::{debug, info, warn};
use ringfire_core::{
    Command, DestroyCause, Event, GameState, InstanceId, Placement, PrefabId, RoundPhase,
    SceneCensus, SpawnableKind, SpawnerId, BULLET_CAPSULE_AMMO, CAPSULE_BONUS_POINTS,
    GLOBAL_SPAWN_LIMIT,
};

use crate::pool::{PoolRegistry, Poolable};

/// Pooled actor backing one scene object.
#[derive(Clone, Copy, Debug)]
struct Actor {
    prefab: PrefabId,
    placement: Placement,
    spawner: Option<SpawnerId>,
}

impl Poolable for Actor {
    fn instantiate(prefab: PrefabId) -> Self {
        Self {
            prefab,
            placement: Placement::IDENTITY,
            spawner: None,
        }
    }

    fn reset(&mut self) {
        self.placement = Placement::IDENTITY;
        self.spawner = None;
    }
}

/// Represents the authoritative Ringfire scene.
#[derive(Debug)]
pub struct World {
    pools: PoolRegistry<Actor>,
    state: GameState,
    ammo: u32,
    score: u32,
    tick_index: u64,
}

impl World {
    /// Creates an empty scene whose pools are capped at [`GLOBAL_SPAWN_LIMIT`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool_cap(GLOBAL_SPAWN_LIMIT)
    }

    /// Creates an empty scene whose pools never exceed `cap` instances.
    #[must_use]
    pub fn with_pool_cap(cap: u32) -> Self {
        Self {
            pools: PoolRegistry::new(cap),
            state: GameState::new(0, RoundPhase::Active),
            ammo: 0,
            score: 0,
            tick_index: 0,
        }
    }

    fn activate(
        &mut self,
        kind: SpawnableKind,
        placement: Placement,
        spawner: Option<SpawnerId>,
        out_events: &mut Vec<Event>,
    ) -> bool {
        match self.pools.acquire(kind) {
            Ok((instance, created)) => {
                if let Some(prefab) = created {
                    out_events.push(Event::InstanceCreated { instance, prefab });
                }
                if let Some(actor) = self.pools.get_mut(instance) {
                    actor.placement = placement;
                    actor.spawner = spawner;
                }
                out_events.push(Event::InstanceActivated {
                    instance,
                    placement,
                    spawner,
                });
                true
            }
            Err(reason) => {
                warn!("skipping {kind} emission: {reason}");
                out_events.push(Event::SpawnRejected {
                    spawner,
                    kind,
                    reason,
                });
                false
            }
        }
    }

    fn destroy(&mut self, instance: InstanceId, cause: DestroyCause, out_events: &mut Vec<Event>) {
        if !self.pools.release(instance) {
            debug!("ignoring release of dormant instance {instance:?}");
            return;
        }
        out_events.push(Event::InstanceReleased {
            instance,
            cause: Some(cause),
        });

        let kind = instance.kind();
        match cause {
            DestroyCause::ShotDown if self.state.phase() != RoundPhase::GameOver => {
                self.add_score(kind.points(), out_events);
            }
            DestroyCause::Collected if kind == SpawnableKind::BulletCapsule => {
                self.credit_ammo(BULLET_CAPSULE_AMMO, out_events);
            }
            _ => {}
        }
    }

    fn clear_scene(&mut self, out_events: &mut Vec<Event>) {
        let active = self.pools.active_instances();
        let capsule_bonus = if self.state.phase() == RoundPhase::RoundWon {
            let capsules = active.iter().filter(|instance| instance.kind().is_capsule());
            capsules.count() as u32 * CAPSULE_BONUS_POINTS
        } else {
            0
        };

        let mut released = 0;
        for instance in active {
            if self.pools.release(instance) {
                released += 1;
                out_events.push(Event::InstanceReleased {
                    instance,
                    cause: None,
                });
            }
        }

        debug!("scene cleared: {released} released, {capsule_bonus} capsule bonus");
        out_events.push(Event::SceneCleared {
            released,
            capsule_bonus,
        });
        self.add_score(capsule_bonus, out_events);
    }

    fn credit_ammo(&mut self, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        self.ammo = self.ammo.saturating_add(amount);
        out_events.push(Event::AmmoChanged { ammo: self.ammo });
    }

    fn add_score(&mut self, points: u32, out_events: &mut Vec<Event>) {
        if points == 0 {
            return;
        }
        self.score = self.score.saturating_add(points);
        out_events.push(Event::ScoreChanged { score: self.score });
    }

    fn end_round(&mut self, phase: RoundPhase, out_events: &mut Vec<Event>) {
        if self.state.phase() != RoundPhase::Active {
            debug!(
                "ignoring {phase:?} declaration during {:?}",
                self.state.phase()
            );
            return;
        }

        let level = self.state.level();
        self.state = GameState::new(level, phase);
        match phase {
            RoundPhase::RoundWon => {
                info!("round won at level {level}");
                out_events.push(Event::RoundWon { level });
            }
            RoundPhase::GameOver => {
                info!("player defeated at level {level}");
                out_events.push(Event::GameOver { level });
            }
            RoundPhase::Active => {}
        }
    }

    fn census(&self) -> SceneCensus {
        let pools = self.pools.census();
        let mut enemies_alive = 0;
        let mut player_projectiles_alive = 0;
        let mut spawned_alive = 0;
        for (kind, census) in pools.iter() {
            if kind.is_enemy() {
                enemies_alive += census.active;
            }
            if kind.is_player_projectile() {
                player_projectiles_alive += census.active;
            }
            if kind.counts_toward_spawn_limit() {
                spawned_alive += census.active;
            }
        }

        SceneCensus {
            state: self.state,
            ammo: self.ammo,
            score: self.score,
            enemies_alive,
            player_projectiles_alive,
            spawned_alive,
            pools,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::RegisterPrefab { kind, prefab } => {
            world.pools.register_prefab(kind, prefab);
        }
        Command::PopulatePool {
            kind,
            prefab,
            count,
        } => match world.pools.populate(kind, prefab, count) {
            Ok(created) => {
                debug!("populated {kind} pool with {} instances", created.len());
                out_events.extend(
                    created
                        .into_iter()
                        .map(|(instance, prefab)| Event::InstanceCreated { instance, prefab }),
                );
            }
            Err(reason) => {
                warn!("failed to populate {kind} pool: {reason}");
                out_events.push(Event::PopulateRejected { kind, reason });
            }
        },
        Command::EmptyPools => {
            let destroyed = world.pools.empty_all();
            debug!("emptied every pool, destroying {} instances", destroyed.len());
            out_events.push(Event::PoolsEmptied { destroyed });
        }
        Command::SpawnInstance {
            spawner,
            kind,
            placement,
        } => {
            if world.state.phase() != RoundPhase::Active {
                debug!("dropping {kind} emission from {spawner} outside an active round");
                return;
            }
            let _ = world.activate(kind, placement, Some(spawner), out_events);
        }
        Command::FireBullet { placement } => {
            if world.state.phase() != RoundPhase::Active || world.ammo == 0 {
                out_events.push(Event::FireRejected);
                return;
            }
            if world.activate(SpawnableKind::Bullet, placement, None, out_events) {
                world.ammo -= 1;
                out_events.push(Event::AmmoChanged { ammo: world.ammo });
            } else {
                out_events.push(Event::FireRejected);
            }
        }
        Command::DestroyInstance { instance, cause } => {
            world.destroy(instance, cause, out_events);
        }
        Command::CreditAmmo { amount } => world.credit_ammo(amount, out_events),
        Command::AddScore { points } => world.add_score(points, out_events),
        Command::DeclareRoundWon => world.end_round(RoundPhase::RoundWon, out_events),
        Command::DeclareGameOver => world.end_round(RoundPhase::GameOver, out_events),
        Command::ClearScene => world.clear_scene(out_events),
        Command::StartLevel { level, pattern } => {
            if world.state.phase() == RoundPhase::GameOver {
                warn!("ignoring start of level {level} after game over");
                return;
            }
            info!("advancing to level {level}");
            world.state = GameState::new(level, RoundPhase::Active);
            out_events.push(Event::LevelStarted { level, pattern });
        }
        Command::ResetSession { ammo } => {
            let destroyed = world.pools.empty_all();
            out_events.push(Event::PoolsEmptied { destroyed });
            world.state = GameState::new(0, RoundPhase::Active);
            world.ammo = ammo;
            world.score = 0;
            info!("session reset with {ammo} ammo");
            out_events.push(Event::AmmoChanged { ammo });
            out_events.push(Event::ScoreChanged { score: 0 });
            out_events.push(Event::SessionReset);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use ringfire_core::{
        GameState, InstanceId, Placement, PoolCensus, PrefabId, SceneCensus, SpawnableKind,
        SpawnerId,
    };

    use super::World;

    /// Captures the counts systems use for spawning and round arbitration.
    #[must_use]
    pub fn census(world: &World) -> SceneCensus {
        world.census()
    }

    /// Current level and phase.
    #[must_use]
    pub fn game_state(world: &World) -> GameState {
        world.state
    }

    /// Ammo left in the player's stock.
    #[must_use]
    pub fn ammo(world: &World) -> u32 {
        world.ammo
    }

    /// Player score.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }

    /// Number of ticks applied since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Counts for the `kind` pool; zero when the pool does not exist yet.
    #[must_use]
    pub fn pool_census(world: &World, kind: SpawnableKind) -> PoolCensus {
        world
            .pools
            .pool(kind)
            .map(|pool| pool.census())
            .unwrap_or_default()
    }

    /// Every instance in play, ordered by kind then slot.
    #[must_use]
    pub fn active_instances(world: &World) -> Vec<InstanceId> {
        world.pools.active_instances()
    }

    /// Active instances of `kind`, ordered by slot.
    #[must_use]
    pub fn active_of_kind(world: &World, kind: SpawnableKind) -> Vec<InstanceId> {
        world
            .pools
            .active_instances()
            .into_iter()
            .filter(|instance| instance.kind() == kind)
            .collect()
    }

    /// Snapshot of an instance currently in play.
    #[must_use]
    pub fn actor(world: &World, instance: InstanceId) -> Option<ActorSnapshot> {
        if !world.pools.is_active(instance) {
            return None;
        }
        world.pools.get(instance).map(|actor| ActorSnapshot {
            instance,
            prefab: actor.prefab,
            placement: actor.placement,
            spawner: actor.spawner,
        })
    }

    /// Immutable representation of an actor in play.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ActorSnapshot {
        /// Identity of the instance.
        pub instance: InstanceId,
        /// Template it was cloned from.
        pub prefab: PrefabId,
        /// Where it was placed when activated.
        pub placement: Placement,
        /// Spawner that emitted it, if any.
        pub spawner: Option<SpawnerId>,
    }
}
