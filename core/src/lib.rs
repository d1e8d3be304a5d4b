#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Ringfire engine.
//!
//! This crate defines the message surface that connects the host adapter, the
//! authoritative world, and the pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems and the host to react to. Systems read immutable
//! [`SceneCensus`] snapshots and respond exclusively with new command batches.

use std::{fmt, str::FromStr, time::Duration};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on simultaneously live spawner-driven actors, and on the size of
/// any single pool.
pub const GLOBAL_SPAWN_LIMIT: u32 = 50;

/// Score awarded for every capsule still in play when a round is won.
pub const CAPSULE_BONUS_POINTS: u32 = 50;

/// Number of instances a pool is pre-warmed with when no size is requested.
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Ammo granted when the player collects a bullet capsule.
pub const BULLET_CAPSULE_AMMO: u32 = 4;

/// Closed set of actor kinds managed through pooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpawnableKind {
    /// Enemy that flies straight at the player.
    Crasher,
    /// Ranged enemy that orbits the player and fires [`SpawnableKind::EnemyBullet`]s.
    Drone,
    /// Projectile fired by drones.
    EnemyBullet,
    /// Pickup that restocks the player's ammo.
    BulletCapsule,
    /// Pickup that grants armor.
    ArmorCapsule,
    /// Pickup that restores health.
    HealthCapsule,
    /// Pickup that grants a temporary power-up.
    PowerUpCapsule,
    /// Projectile fired by the player.
    Bullet,
}

impl SpawnableKind {
    /// Number of distinct kinds.
    pub const COUNT: usize = 8;

    /// Every kind in tag order.
    pub const ALL: [SpawnableKind; Self::COUNT] = [
        Self::Crasher,
        Self::Drone,
        Self::EnemyBullet,
        Self::BulletCapsule,
        Self::ArmorCapsule,
        Self::HealthCapsule,
        Self::PowerUpCapsule,
        Self::Bullet,
    ];

    /// Dense index of the tag, used by [`KindMap`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Canonical name used by spawn pattern documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crasher => "Crasher",
            Self::Drone => "Drone",
            Self::EnemyBullet => "EnemyBullet",
            Self::BulletCapsule => "BulletCapsule",
            Self::ArmorCapsule => "ArmorCapsule",
            Self::HealthCapsule => "HealthCapsule",
            Self::PowerUpCapsule => "PowerUpCapsule",
            Self::Bullet => "Bullet",
        }
    }

    /// Reports whether live instances of this kind keep a round from being won.
    #[must_use]
    pub const fn is_enemy(self) -> bool {
        matches!(self, Self::Crasher | Self::Drone)
    }

    /// Reports whether the kind is a collectible pickup.
    #[must_use]
    pub const fn is_capsule(self) -> bool {
        matches!(
            self,
            Self::BulletCapsule | Self::ArmorCapsule | Self::HealthCapsule | Self::PowerUpCapsule
        )
    }

    /// Reports whether the kind is a projectile fired by the player.
    #[must_use]
    pub const fn is_player_projectile(self) -> bool {
        matches!(self, Self::Bullet)
    }

    /// Reports whether spawners may emit this kind. Live instances of these
    /// kinds count against [`GLOBAL_SPAWN_LIMIT`].
    #[must_use]
    pub const fn counts_toward_spawn_limit(self) -> bool {
        self.is_enemy() || self.is_capsule()
    }

    /// Kinds whose pools must be warm before this kind may spawn.
    #[must_use]
    pub const fn dependencies(self) -> &'static [SpawnableKind] {
        match self {
            Self::Drone => &[Self::EnemyBullet],
            _ => &[],
        }
    }

    /// Score awarded when the player shoots down an instance of this kind.
    #[must_use]
    pub const fn points(self) -> u32 {
        match self {
            Self::Crasher => 10,
            Self::Drone => 20,
            Self::EnemyBullet => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for SpawnableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a name does not match any [`SpawnableKind`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown spawnable kind `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for SpawnableKind {
    type Err = UnknownKind;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| UnknownKind(name.to_owned()))
    }
}

/// Dispatch table keyed by [`SpawnableKind`] tags.
#[derive(Clone, Debug, PartialEq)]
pub struct KindMap<T> {
    slots: [Option<T>; SpawnableKind::COUNT],
}

impl<T> KindMap<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Returns the entry stored for `kind`.
    #[must_use]
    pub fn get(&self, kind: SpawnableKind) -> Option<&T> {
        self.slots[kind.index()].as_ref()
    }

    /// Returns the entry stored for `kind` mutably.
    pub fn get_mut(&mut self, kind: SpawnableKind) -> Option<&mut T> {
        self.slots[kind.index()].as_mut()
    }

    /// Returns the entry for `kind`, inserting the result of `make` when vacant.
    pub fn get_or_insert_with(&mut self, kind: SpawnableKind, make: impl FnOnce() -> T) -> &mut T {
        self.slots[kind.index()].get_or_insert_with(make)
    }

    /// Stores `value` for `kind`, returning the previous entry.
    pub fn insert(&mut self, kind: SpawnableKind, value: T) -> Option<T> {
        self.slots[kind.index()].replace(value)
    }

    /// Removes and returns the entry for `kind`.
    pub fn remove(&mut self, kind: SpawnableKind) -> Option<T> {
        self.slots[kind.index()].take()
    }

    /// Reports whether an entry exists for `kind`.
    #[must_use]
    pub fn contains(&self, kind: SpawnableKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    /// Iterates over occupied entries in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (SpawnableKind, &T)> {
        SpawnableKind::ALL
            .into_iter()
            .zip(self.slots.iter())
            .filter_map(|(kind, slot)| slot.as_ref().map(|value| (kind, value)))
    }

    /// Iterates mutably over occupied entries in tag order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SpawnableKind, &mut T)> {
        SpawnableKind::ALL
            .into_iter()
            .zip(self.slots.iter_mut())
            .filter_map(|(kind, slot)| slot.as_mut().map(|value| (kind, value)))
    }

    /// Iterates over the kinds that hold an entry.
    pub fn keys(&self) -> impl Iterator<Item = SpawnableKind> + '_ {
        self.iter().map(|(kind, _)| kind)
    }

    /// Number of occupied entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Reports whether no entry is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl<T> Default for KindMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier assigned to a spawner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnerId(u32);

impl SpawnerId {
    /// Creates a new spawner identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpawnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spawner#{}", self.0)
    }
}

/// Host-side template an instance is cloned from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrefabId(u32);

impl PrefabId {
    /// Creates a new prefab identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identity of a pooled instance. Stable until its pool is emptied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId {
    kind: SpawnableKind,
    slot: u32,
}

impl InstanceId {
    /// Creates an identifier for the given slot of the `kind` pool.
    #[must_use]
    pub const fn new(kind: SpawnableKind, slot: u32) -> Self {
        Self { kind, slot }
    }

    /// Kind of pool that owns the instance.
    #[must_use]
    pub const fn kind(&self) -> SpawnableKind {
        self.kind
    }

    /// Slot index inside the owning pool.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }
}

/// Position and orientation of an actor relative to the player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Position in world units.
    pub position: Vec3,
    /// Orientation; the local +Z axis is the facing direction.
    pub rotation: Quat,
}

impl Placement {
    /// Placement at the origin with no rotation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Creates a placement from explicit components.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Places an actor at `position`, facing `target`.
    ///
    /// When both points coincide the rotation is the identity.
    #[must_use]
    pub fn facing(position: Vec3, target: Vec3) -> Self {
        let forward = (target - position).normalize_or_zero();
        let rotation = if forward == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::Z, forward)
        };
        Self { position, rotation }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Number of emissions a spawner performs before stopping on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnLimit {
    /// No limit configured; the spawner runs until stopped. Pattern documents
    /// spell this `-1`.
    Unbounded,
    /// Stop after the given number of emissions.
    Finite(u32),
}

impl SpawnLimit {
    /// Converts a raw pattern value, where `-1` means unbounded.
    pub fn from_raw(raw: i64) -> Result<Self, ConfigError> {
        match raw {
            -1 => Ok(Self::Unbounded),
            value => u32::try_from(value)
                .map(Self::Finite)
                .map_err(|_| ConfigError::InvalidLimit(raw)),
        }
    }

    /// Finite number of emissions, if any.
    #[must_use]
    pub const fn get(self) -> Option<u32> {
        match self {
            Self::Unbounded => None,
            Self::Finite(limit) => Some(limit),
        }
    }

    /// Reports whether `count` emissions exhaust the limit.
    #[must_use]
    pub const fn is_reached(self, count: u32) -> bool {
        match self {
            Self::Unbounded => false,
            Self::Finite(limit) => count >= limit,
        }
    }
}

/// Reasons a spawn configuration is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Limits below the `-1` sentinel are meaningless.
    #[error("spawn limit {0} is outside the accepted range (-1 or a non-negative count)")]
    InvalidLimit(i64),
    /// Rates and delays must be finite and non-negative.
    #[error("`{field}` must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// Distance bounds must satisfy `0 <= min <= max`.
    #[error("spawn distances must satisfy 0 <= min <= max (got min {min}, max {max})")]
    InvalidDistance {
        /// Supplied minimum distance.
        min: f32,
        /// Supplied maximum distance.
        max: f32,
    },
}

/// Immutable description of how one spawner emits one kind.
///
/// Deserialized values pass through [`SpawnConfig::new`] and are rejected
/// when they violate its invariants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpawnConfigFields")]
pub struct SpawnConfig {
    kind: SpawnableKind,
    limit: SpawnLimit,
    rate: Duration,
    initial_delay: Duration,
    min_distance: f32,
    max_distance: f32,
}

#[derive(Deserialize)]
struct SpawnConfigFields {
    kind: SpawnableKind,
    limit: SpawnLimit,
    rate: Duration,
    initial_delay: Duration,
    min_distance: f32,
    max_distance: f32,
}

impl TryFrom<SpawnConfigFields> for SpawnConfig {
    type Error = ConfigError;

    fn try_from(fields: SpawnConfigFields) -> Result<Self, Self::Error> {
        Self::new(
            fields.kind,
            fields.limit,
            fields.rate,
            fields.initial_delay,
            fields.min_distance,
            fields.max_distance,
        )
    }
}

impl SpawnConfig {
    /// Validates and builds a configuration.
    pub fn new(
        kind: SpawnableKind,
        limit: SpawnLimit,
        rate: Duration,
        initial_delay: Duration,
        min_distance: f32,
        max_distance: f32,
    ) -> Result<Self, ConfigError> {
        let distances_valid = min_distance.is_finite()
            && max_distance.is_finite()
            && min_distance >= 0.0
            && min_distance <= max_distance;
        if !distances_valid {
            return Err(ConfigError::InvalidDistance {
                min: min_distance,
                max: max_distance,
            });
        }

        Ok(Self {
            kind,
            limit,
            rate,
            initial_delay,
            min_distance,
            max_distance,
        })
    }

    /// Builds a configuration from fractional seconds, as written in pattern
    /// documents.
    pub fn from_seconds(
        kind: SpawnableKind,
        limit: SpawnLimit,
        rate: f32,
        initial_delay: f32,
        min_distance: f32,
        max_distance: f32,
    ) -> Result<Self, ConfigError> {
        Self::new(
            kind,
            limit,
            seconds("rate", rate)?,
            seconds("delay", initial_delay)?,
            min_distance,
            max_distance,
        )
    }

    /// Kind the spawner emits.
    #[must_use]
    pub const fn kind(&self) -> SpawnableKind {
        self.kind
    }

    /// Number of emissions before the spawner stops.
    #[must_use]
    pub const fn limit(&self) -> SpawnLimit {
        self.limit
    }

    /// Interval between emissions.
    #[must_use]
    pub const fn rate(&self) -> Duration {
        self.rate
    }

    /// Wait before the first interval starts.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Closest distance from the anchor an emission may land.
    #[must_use]
    pub const fn min_distance(&self) -> f32 {
        self.min_distance
    }

    /// Farthest distance from the anchor an emission may land.
    #[must_use]
    pub const fn max_distance(&self) -> f32 {
        self.max_distance
    }
}

fn seconds(field: &'static str, value: f32) -> Result<Duration, ConfigError> {
    if value < 0.0 {
        return Err(ConfigError::InvalidDuration { field, value });
    }
    Duration::try_from_secs_f32(value).map_err(|_| ConfigError::InvalidDuration { field, value })
}

/// Every configuration one kind needs within a round. Popping yields the most
/// recently pushed configuration first.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternGroup {
    kind: SpawnableKind,
    configs: Vec<SpawnConfig>,
}

impl PatternGroup {
    /// Creates an empty group for `kind`.
    #[must_use]
    pub const fn new(kind: SpawnableKind) -> Self {
        Self {
            kind,
            configs: Vec::new(),
        }
    }

    /// Kind shared by every configuration in the group.
    #[must_use]
    pub const fn kind(&self) -> SpawnableKind {
        self.kind
    }

    /// Pushes a configuration on top of the group.
    pub fn push(&mut self, config: SpawnConfig) {
        debug_assert_eq!(config.kind(), self.kind, "pattern groups hold one kind");
        self.configs.push(config);
    }

    /// Moves every configuration of `other` on top of this group.
    pub fn append(&mut self, other: &mut PatternGroup) {
        debug_assert_eq!(other.kind, self.kind, "pattern groups hold one kind");
        self.configs.append(&mut other.configs);
    }

    /// Removes the most recently pushed configuration.
    pub fn pop(&mut self) -> Option<SpawnConfig> {
        self.configs.pop()
    }

    /// Returns the configuration that [`PatternGroup::pop`] would yield next.
    #[must_use]
    pub fn peek(&self) -> Option<&SpawnConfig> {
        self.configs.last()
    }

    /// Configurations from bottom to top.
    #[must_use]
    pub fn configs(&self) -> &[SpawnConfig] {
        &self.configs
    }

    /// Number of spawners the group requires.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Reports whether the group holds no configuration.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Spawn schedule for a single round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelPattern {
    groups: Vec<PatternGroup>,
}

impl LevelPattern {
    /// Creates an empty pattern.
    #[must_use]
    pub const fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Adds a group. Groups of a kind already present are merged on top of
    /// the existing group.
    pub fn push_group(&mut self, mut group: PatternGroup) {
        if group.is_empty() {
            return;
        }
        match self.groups.iter_mut().find(|existing| existing.kind() == group.kind()) {
            Some(existing) => existing.append(&mut group),
            None => self.groups.push(group),
        }
    }

    /// Groups in push order.
    #[must_use]
    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    /// Consumes the pattern, yielding groups in push order.
    #[must_use]
    pub fn into_groups(self) -> Vec<PatternGroup> {
        self.groups
    }

    /// Number of spawners the pattern requires for `kind`.
    #[must_use]
    pub fn required(&self, kind: SpawnableKind) -> usize {
        self.groups
            .iter()
            .find(|group| group.kind() == kind)
            .map_or(0, PatternGroup::len)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Reports whether the pattern spawns nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Round-level state machine phase. Round-won and game-over are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// The round is in progress.
    Active,
    /// Every enemy was defeated; the next level has not started yet.
    RoundWon,
    /// The player ran out of ammo while enemies remained.
    GameOver,
}

/// Current level and phase of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GameState {
    level: u32,
    phase: RoundPhase,
}

impl GameState {
    /// Creates a game state.
    #[must_use]
    pub const fn new(level: u32, phase: RoundPhase) -> Self {
        Self { level, phase }
    }

    /// Level currently being played.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Phase of the current round.
    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }
}

/// How an active instance left play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Destroyed by a player projectile.
    ShotDown,
    /// Picked up by the player.
    Collected,
    /// Left play on its own (lifetime elapsed, reached the player, flew away).
    Expired,
}

/// Reasons a pool cannot hand out an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PoolError {
    /// Every instance is active and the pool reached its cap.
    #[error("{kind} pool exhausted at {cap} instances")]
    Exhausted {
        /// Kind of the exhausted pool.
        kind: SpawnableKind,
        /// Cap the pool reached.
        cap: u32,
    },
    /// The pool needs to grow but no prefab was supplied or registered.
    #[error("no prefab registered for {kind}")]
    MissingPrefab {
        /// Kind of the pool lacking a prefab.
        kind: SpawnableKind,
    },
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Records the default prefab used when the `kind` pool grows.
    RegisterPrefab {
        /// Pool the prefab belongs to.
        kind: SpawnableKind,
        /// Template to clone.
        prefab: PrefabId,
    },
    /// Pre-warms the `kind` pool so it holds at least `count` free instances.
    PopulatePool {
        /// Pool to populate.
        kind: SpawnableKind,
        /// Template to clone; the registered default when absent.
        prefab: Option<PrefabId>,
        /// Desired number of free instances.
        count: u32,
    },
    /// Destroys every pooled instance of every kind.
    EmptyPools,
    /// Requests that a spawner's emission be placed into the scene.
    SpawnInstance {
        /// Spawner that requested the instance.
        spawner: SpawnerId,
        /// Kind to acquire.
        kind: SpawnableKind,
        /// Where the instance appears.
        placement: Placement,
    },
    /// Fires one player projectile, consuming one round of ammo.
    FireBullet {
        /// Muzzle placement.
        placement: Placement,
    },
    /// Returns an active instance to its pool.
    DestroyInstance {
        /// Instance leaving play.
        instance: InstanceId,
        /// Why it left play.
        cause: DestroyCause,
    },
    /// Adds ammo to the player's stock.
    CreditAmmo {
        /// Rounds to add.
        amount: u32,
    },
    /// Adds points to the player's score.
    AddScore {
        /// Points to add.
        points: u32,
    },
    /// Ends the active round as won.
    DeclareRoundWon,
    /// Ends the active session as lost.
    DeclareGameOver,
    /// Returns every active instance to its pool, awarding leftover capsules
    /// when the round was won.
    ClearScene,
    /// Enters `level` and resumes play.
    StartLevel {
        /// Level to enter.
        level: u32,
        /// Spawn schedule of the level.
        pattern: LevelPattern,
    },
    /// Destroys every pool and restores the session to its initial resources.
    ResetSession {
        /// Ammo the player starts with.
        ammo: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// A pool created a new dormant instance.
    InstanceCreated {
        /// Identity of the new instance.
        instance: InstanceId,
        /// Template it was cloned from.
        prefab: PrefabId,
    },
    /// A dormant instance entered play.
    InstanceActivated {
        /// Instance entering play.
        instance: InstanceId,
        /// Where it appears.
        placement: Placement,
        /// Spawner that requested it, if any.
        spawner: Option<SpawnerId>,
    },
    /// An active instance returned to its pool.
    InstanceReleased {
        /// Instance leaving play.
        instance: InstanceId,
        /// Reported cause; absent when the scene was cleared.
        cause: Option<DestroyCause>,
    },
    /// An instance could not be acquired and the request was dropped.
    SpawnRejected {
        /// Spawner whose emission was skipped, if any.
        spawner: Option<SpawnerId>,
        /// Kind that was requested.
        kind: SpawnableKind,
        /// Why the pool refused.
        reason: PoolError,
    },
    /// A pool could not be pre-warmed.
    PopulateRejected {
        /// Pool that failed.
        kind: SpawnableKind,
        /// Why it failed.
        reason: PoolError,
    },
    /// The player tried to fire without ammo or outside an active round.
    FireRejected,
    /// Every pool was emptied and the listed instances destroyed.
    PoolsEmptied {
        /// Instances that no longer exist.
        destroyed: Vec<InstanceId>,
    },
    /// The player's ammo changed.
    AmmoChanged {
        /// New ammo count.
        ammo: u32,
    },
    /// The player's score changed.
    ScoreChanged {
        /// New score.
        score: u32,
    },
    /// The active round was won.
    RoundWon {
        /// Level that was cleared.
        level: u32,
    },
    /// The session was lost.
    GameOver {
        /// Level the player reached.
        level: u32,
    },
    /// Every active instance was returned to its pool.
    SceneCleared {
        /// Number of instances released.
        released: u32,
        /// Points awarded for leftover capsules.
        capsule_bonus: u32,
    },
    /// A level began.
    LevelStarted {
        /// Level that began.
        level: u32,
        /// Spawn schedule the spawners are allocated from.
        pattern: LevelPattern,
    },
    /// The session returned to its initial state.
    SessionReset,
}

/// Free and active instance counts of one pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PoolCensus {
    /// Dormant instances ready for reuse.
    pub free: u32,
    /// Instances currently in play.
    pub active: u32,
    /// Template the pool grows from, once one is known.
    pub prefab: Option<PrefabId>,
}

impl PoolCensus {
    /// Total number of instances owned by the pool.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.free + self.active
    }

    /// Reports whether the pool owns no instance at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Read-only snapshot of the scene used by systems for arbitration.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneCensus {
    /// Level and phase of the session.
    pub state: GameState,
    /// Ammo left in the player's stock.
    pub ammo: u32,
    /// Player score.
    pub score: u32,
    /// Live enemies.
    pub enemies_alive: u32,
    /// Player projectiles still in flight.
    pub player_projectiles_alive: u32,
    /// Live actors that count against [`GLOBAL_SPAWN_LIMIT`].
    pub spawned_alive: u32,
    /// Per-kind pool counts for pools that exist.
    pub pools: KindMap<PoolCensus>,
}

impl SceneCensus {
    /// Counts for the `kind` pool; zero when the pool does not exist yet.
    #[must_use]
    pub fn pool(&self, kind: SpawnableKind) -> PoolCensus {
        self.pools.get(kind).copied().unwrap_or_default()
    }

    /// Reports whether the `kind` pool can grow, that is whether a prefab is
    /// registered for it.
    #[must_use]
    pub fn has_prefab(&self, kind: SpawnableKind) -> bool {
        self.pool(kind).prefab.is_some()
    }
}
