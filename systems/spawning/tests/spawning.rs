use std::{collections::HashSet, time::Duration};

use ringfire_core::{
    Command, DestroyCause, Event, LevelPattern, PatternGroup, Placement, PrefabId, SpawnConfig,
    SpawnLimit, SpawnableKind, SpawnerId, GLOBAL_SPAWN_LIMIT,
};
use ringfire_system_spawning::{Config, SpawnerError, SpawnerPhase, Spawning};
use ringfire_world::{self as world, query, World};

const STEP: Duration = Duration::from_millis(20);

struct Harness {
    world: World,
    spawning: Spawning,
}

impl Harness {
    fn new(seed: u64, spawn_limit: u32, ammo: u32) -> Self {
        let mut world = World::new();
        let mut events = Vec::new();
        for (index, kind) in SpawnableKind::ALL.into_iter().enumerate() {
            world::apply(
                &mut world,
                Command::RegisterPrefab {
                    kind,
                    prefab: PrefabId::new(index as u32),
                },
                &mut events,
            );
        }
        world::apply(&mut world, Command::ResetSession { ammo }, &mut events);
        world::apply(
            &mut world,
            Command::StartLevel {
                level: 1,
                pattern: LevelPattern::new(),
            },
            &mut events,
        );

        Self {
            world,
            spawning: Spawning::new(Config::new(seed, spawn_limit)),
        }
    }

    fn configure(&mut self, pattern: LevelPattern) -> Vec<Command> {
        let census = query::census(&self.world);
        let mut commands = Vec::new();
        let _ = self
            .spawning
            .configure_level(pattern, &census, &mut commands)
            .expect("allocation succeeds");
        self.apply_all(commands.clone());
        commands
    }

    fn apply_all(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        events
    }

    fn step(&mut self, dt: Duration) -> Vec<Event> {
        let mut events = self.apply_all(vec![Command::Tick { dt }]);
        process_spawning(&mut self.world, &mut self.spawning, &mut events);
        events
    }

    fn run(&mut self, steps: usize) -> Vec<Event> {
        (0..steps).flat_map(|_| self.step(STEP)).collect()
    }
}

fn process_spawning(world: &mut World, spawning: &mut Spawning, events: &mut Vec<Event>) {
    let census = query::census(world);
    let mut commands = Vec::new();
    spawning
        .handle(events, &census, &mut commands)
        .expect("spawning succeeds");
    for command in commands {
        world::apply(world, command, events);
    }
}

fn config(kind: SpawnableKind, limit: SpawnLimit, rate: f32, delay: f32) -> SpawnConfig {
    SpawnConfig::from_seconds(kind, limit, rate, delay, 2.0, 6.0).expect("valid config")
}

fn level(groups: Vec<(SpawnableKind, Vec<SpawnConfig>)>) -> LevelPattern {
    let mut pattern = LevelPattern::new();
    for (kind, configs) in groups {
        let mut group = PatternGroup::new(kind);
        for config in configs {
            group.push(config);
        }
        pattern.push_group(group);
    }
    pattern
}

fn repeat(kind: SpawnableKind, count: usize) -> (SpawnableKind, Vec<SpawnConfig>) {
    let configs = vec![config(kind, SpawnLimit::Finite(1), 1.0, 0.0); count];
    (kind, configs)
}

fn activations(events: &[Event]) -> Vec<SpawnerId> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::InstanceActivated {
                spawner: Some(spawner),
                ..
            } => Some(*spawner),
            _ => None,
        })
        .collect()
}

#[test]
fn drone_pattern_completes_after_three_and_a_half_seconds() {
    let mut harness = Harness::new(0x5eed, GLOBAL_SPAWN_LIMIT, 10);
    let drone = config(SpawnableKind::Drone, SpawnLimit::Finite(3), 1.0, 0.5);
    let _ = harness.configure(level(vec![(SpawnableKind::Drone, vec![drone])]));

    let _ = harness.run(174);
    assert_eq!(query::pool_census(&harness.world, SpawnableKind::Drone).active, 2);

    let _ = harness.run(1);
    let drones = query::pool_census(&harness.world, SpawnableKind::Drone);
    assert_eq!(drones.active, 3);
    let spawner = &harness.spawning.allocator().active(SpawnableKind::Drone)[0];
    assert_eq!(spawner.phase(), SpawnerPhase::Idle);
    assert_eq!(spawner.spawn_count(), 3);
    assert!(!harness.spawning.enemy_spawning());
}

#[test]
fn finite_limit_emits_exactly_on_schedule() {
    let mut harness = Harness::new(1, GLOBAL_SPAWN_LIMIT, 10);
    let crasher = config(SpawnableKind::Crasher, SpawnLimit::Finite(4), 0.5, 1.0);
    let _ = harness.configure(level(vec![(SpawnableKind::Crasher, vec![crasher])]));

    let step = Duration::from_millis(100);
    let mut emitted_at = Vec::new();
    for index in 1..=60 {
        if !activations(&harness.step(step)).is_empty() {
            emitted_at.push(index);
        }
    }
    assert_eq!(emitted_at, vec![15, 20, 25, 30]);
}

#[test]
fn global_limit_skips_emissions_until_space_frees_up() {
    let mut harness = Harness::new(2, 2, 10);
    let crasher = config(SpawnableKind::Crasher, SpawnLimit::Unbounded, 0.1, 0.0);
    let _ = harness.configure(level(vec![(SpawnableKind::Crasher, vec![crasher])]));

    let _ = harness.run(50);
    let census = query::census(&harness.world);
    assert_eq!(census.enemies_alive, 2);
    let spawner = &harness.spawning.allocator().active(SpawnableKind::Crasher)[0];
    assert_eq!(spawner.spawn_count(), 2, "skipped emissions must not count");

    let victim = query::active_of_kind(&harness.world, SpawnableKind::Crasher)[0];
    let _ = harness.apply_all(vec![Command::DestroyInstance {
        instance: victim,
        cause: DestroyCause::Expired,
    }]);
    let _ = harness.run(10);

    assert_eq!(query::census(&harness.world).enemies_alive, 2);
    let spawner = &harness.spawning.allocator().active(SpawnableKind::Crasher)[0];
    assert_eq!(spawner.spawn_count(), 3);
}

#[test]
fn round_over_stops_spawners_mid_wait() {
    let mut harness = Harness::new(3, GLOBAL_SPAWN_LIMIT, 10);
    let crasher = config(SpawnableKind::Crasher, SpawnLimit::Finite(5), 1.0, 1.0);
    let _ = harness.configure(level(vec![(SpawnableKind::Crasher, vec![crasher])]));
    let _ = harness.run(50);
    assert!(harness.spawning.enemy_spawning());

    let mut events = harness.apply_all(vec![Command::DeclareRoundWon]);
    process_spawning(&mut harness.world, &mut harness.spawning, &mut events);
    assert!(!harness.spawning.enemy_spawning());

    let later = harness.run(200);
    assert!(activations(&later).is_empty());
}

#[test]
fn allocation_reuses_stash_before_creating() {
    let mut harness = Harness::new(4, GLOBAL_SPAWN_LIMIT, 10);
    let _ = harness.configure(level(vec![
        repeat(SpawnableKind::Crasher, 3),
        repeat(SpawnableKind::Drone, 2),
    ]));
    let allocator = harness.spawning.allocator();
    assert_eq!(allocator.active(SpawnableKind::Crasher).len(), 3);
    assert_eq!(allocator.active(SpawnableKind::Drone).len(), 2);
    assert!(allocator.stash().is_empty());

    harness.spawning.stop_all();
    let census = query::census(&harness.world);
    let mut commands = Vec::new();
    let report = harness
        .spawning
        .configure_level(
            level(vec![
                repeat(SpawnableKind::Crasher, 1),
                repeat(SpawnableKind::HealthCapsule, 2),
            ]),
            &census,
            &mut commands,
        )
        .expect("allocation succeeds");

    assert_eq!(report.created, 0);
    assert_eq!(report.stashed, 4);
    assert_eq!(report.reused, 2);

    let allocator = harness.spawning.allocator();
    assert_eq!(allocator.active(SpawnableKind::Crasher).len(), 1);
    assert_eq!(allocator.active(SpawnableKind::HealthCapsule).len(), 2);
    assert!(allocator.active(SpawnableKind::Drone).is_empty());
    assert_eq!(allocator.stash().len(), 2);

    let active: HashSet<SpawnerId> = allocator.active_spawners().map(|s| s.id()).collect();
    let stashed: HashSet<SpawnerId> = allocator.stash().iter().map(|s| s.id()).collect();
    assert_eq!(active.len(), 3);
    assert!(active.is_disjoint(&stashed));
    assert!(allocator.stash().iter().all(|spawner| !spawner.is_spawning()));
}

#[test]
fn shortfall_creates_new_spawners_after_stash_runs_dry() {
    let mut harness = Harness::new(5, GLOBAL_SPAWN_LIMIT, 10);
    let _ = harness.configure(level(vec![repeat(SpawnableKind::Drone, 2)]));
    harness.spawning.stop_all();

    let census = query::census(&harness.world);
    let mut commands = Vec::new();
    let report = harness
        .spawning
        .configure_level(
            level(vec![
                repeat(SpawnableKind::Crasher, 3),
                repeat(SpawnableKind::BulletCapsule, 1),
            ]),
            &census,
            &mut commands,
        )
        .expect("allocation succeeds");

    assert_eq!(report.stashed, 2);
    assert_eq!(report.reused, 2);
    assert_eq!(report.created, 2);
    let allocator = harness.spawning.allocator();
    assert_eq!(allocator.active(SpawnableKind::Crasher).len(), 3);
    assert_eq!(allocator.active(SpawnableKind::BulletCapsule).len(), 1);
    assert!(allocator.stash().is_empty());
    assert!(allocator
        .active_spawners()
        .all(|spawner| spawner.is_spawning()));
}

#[test]
fn allocation_while_spawning_is_rejected() {
    let mut harness = Harness::new(6, GLOBAL_SPAWN_LIMIT, 10);
    let _ = harness.configure(level(vec![repeat(SpawnableKind::Crasher, 1)]));

    let census = query::census(&harness.world);
    let mut commands = Vec::new();
    let error = harness
        .spawning
        .configure_level(
            level(vec![repeat(SpawnableKind::Crasher, 1)]),
            &census,
            &mut commands,
        )
        .unwrap_err();
    assert!(matches!(error, SpawnerError::AlreadySpawning { .. }));
}

#[test]
fn empty_pools_are_warmed_once_with_dependencies() {
    let mut harness = Harness::new(7, GLOBAL_SPAWN_LIMIT, 10);
    let commands = harness.configure(level(vec![repeat(SpawnableKind::Drone, 2)]));
    let warmed: Vec<SpawnableKind> = commands
        .iter()
        .filter_map(|command| match command {
            Command::PopulatePool { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(warmed, vec![SpawnableKind::Drone, SpawnableKind::EnemyBullet]);
    assert_eq!(
        query::pool_census(&harness.world, SpawnableKind::EnemyBullet).free,
        10
    );

    harness.spawning.stop_all();
    let commands = harness.configure(level(vec![repeat(SpawnableKind::Drone, 2)]));
    assert!(commands
        .iter()
        .all(|command| !matches!(command, Command::PopulatePool { .. })));
}

#[test]
fn configured_limits_credit_ammo_and_score() {
    let mut harness = Harness::new(8, GLOBAL_SPAWN_LIMIT, 10);
    let commands = harness.configure(level(vec![(
        SpawnableKind::Crasher,
        vec![config(SpawnableKind::Crasher, SpawnLimit::Finite(4), 1.0, 0.0)],
    )]));

    assert!(commands.contains(&Command::CreditAmmo { amount: 6 }));
    assert!(commands.contains(&Command::AddScore { points: 60 }));
    assert_eq!(query::ammo(&harness.world), 16);
    assert_eq!(query::score(&harness.world), 60);
}

#[test]
fn same_seed_replays_identical_placements() {
    fn placements(seed: u64) -> Vec<Placement> {
        let mut harness = Harness::new(seed, GLOBAL_SPAWN_LIMIT, 10);
        let _ = harness.configure(level(vec![
            (
                SpawnableKind::Crasher,
                vec![config(SpawnableKind::Crasher, SpawnLimit::Finite(5), 0.2, 0.0)],
            ),
            (
                SpawnableKind::ArmorCapsule,
                vec![config(SpawnableKind::ArmorCapsule, SpawnLimit::Finite(2), 0.5, 0.0)],
            ),
        ]));
        harness
            .run(100)
            .into_iter()
            .filter_map(|event| match event {
                Event::InstanceActivated { placement, .. } => Some(placement),
                _ => None,
            })
            .collect()
    }

    let first = placements(0x4d59_5df4_d0f3_3173);
    assert_eq!(first.len(), 7);
    assert_eq!(first, placements(0x4d59_5df4_d0f3_3173));
    assert_ne!(first, placements(42));
}

#[test]
fn started_level_configures_spawners_from_its_pattern() {
    let mut harness = Harness::new(3, GLOBAL_SPAWN_LIMIT, 0);
    let pattern = level(vec![repeat(SpawnableKind::Crasher, 2)]);
    let mut events = harness.apply_all(vec![Command::StartLevel {
        level: 2,
        pattern,
    }]);
    process_spawning(&mut harness.world, &mut harness.spawning, &mut events);

    assert!(harness.spawning.enemy_spawning());
    assert_eq!(harness.spawning.allocator().active(SpawnableKind::Crasher).len(), 2);
    assert_eq!(
        query::pool_census(&harness.world, SpawnableKind::Crasher).free,
        10
    );
    // 7 for the first shortfall, 6 plus 60 points for the second.
    assert_eq!(query::ammo(&harness.world), 13);
    assert_eq!(query::score(&harness.world), 60);

    let events = harness.run(60);
    assert_eq!(activations(&events).len(), 2);

    let mut events = harness.apply_all(vec![Command::StartLevel {
        level: 3,
        pattern: LevelPattern::new(),
    }]);
    process_spawning(&mut harness.world, &mut harness.spawning, &mut events);
    assert!(harness.spawning.allocator().active(SpawnableKind::Crasher).is_empty());
    assert_eq!(harness.spawning.allocator().stash().len(), 2);
}
