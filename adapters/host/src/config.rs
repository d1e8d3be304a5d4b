//! TOML-backed host configuration.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use glam::Vec3;
use ringfire_core::{KindMap, PrefabId, SpawnableKind, DEFAULT_POOL_SIZE, GLOBAL_SPAWN_LIMIT};
use ringfire_system_patterns::PatternReader;
use ringfire_system_round::{self as round, AdvancePolicy, DifficultyCurve, LevelSource};
use ringfire_system_spawning as spawning;
use serde::Deserialize;

/// Settings of a Ringfire session. Every field has a default, so an empty
/// document is a valid configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Length of one simulation step, in milliseconds.
    pub fixed_timestep_ms: u64,
    /// Most simulation steps run for a single frame.
    pub max_steps_per_frame: u32,
    /// Level new sessions start at.
    pub starting_level: u32,
    /// Ammo new sessions start with at level 1.
    pub starting_ammo: u32,
    /// Start the next level as soon as a round is won instead of waiting for
    /// the primary action.
    pub auto_advance: bool,
    /// Seed of the spawn placement generator.
    pub rng_seed: u64,
    /// Most spawner-driven actors alive at once.
    pub spawn_limit: u32,
    /// Instances an empty pool is pre-warmed with.
    pub pool_size: u32,
    /// Player projectiles pre-warmed at session start.
    pub projectile_pool_size: u32,
    /// Pattern document to read levels from; levels are generated when unset.
    pub pattern: Option<PathBuf>,
    /// Point spawners scatter emissions around.
    pub anchor: [f32; 3],
    /// Prefab registered for each kind, keyed by kind name.
    pub prefabs: BTreeMap<String, u32>,
    /// Tuning of generated levels.
    pub difficulty: DifficultyConfig,
}

/// Tuning of the procedural difficulty curve.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DifficultyConfig {
    /// Shortest enemy spawn interval, in seconds.
    pub min_rate: f32,
    /// Closest emission distance.
    pub min_distance: f32,
    /// Farthest emission distance.
    pub max_distance: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            min_rate: 0.5,
            min_distance: 5.0,
            max_distance: 15.0,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fixed_timestep_ms: 20,
            max_steps_per_frame: 10,
            starting_level: 1,
            starting_ammo: 10,
            auto_advance: false,
            rng_seed: 0x5eed_0f_f1fe,
            spawn_limit: GLOBAL_SPAWN_LIMIT,
            pool_size: DEFAULT_POOL_SIZE,
            projectile_pool_size: DEFAULT_POOL_SIZE,
            pattern: None,
            anchor: [0.0; 3],
            prefabs: SpawnableKind::ALL
                .into_iter()
                .map(|kind| (kind.name().to_owned(), kind.index() as u32))
                .collect(),
            difficulty: DifficultyConfig::default(),
        }
    }
}

impl HostConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse host configuration toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read host configuration at {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid host configuration at {}", path.display()))
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.fixed_timestep_ms == 0 {
            bail!("fixed_timestep_ms must be positive");
        }
        if self.max_steps_per_frame == 0 {
            bail!("max_steps_per_frame must be positive");
        }
        if self.starting_level == 0 {
            bail!("starting_level must be at least 1");
        }
        if self.spawn_limit > GLOBAL_SPAWN_LIMIT {
            bail!(
                "spawn_limit {} exceeds the pool cap of {GLOBAL_SPAWN_LIMIT}",
                self.spawn_limit
            );
        }
        let _ = self.prefab_table()?;
        Ok(())
    }

    /// Length of one simulation step.
    #[must_use]
    pub fn fixed_timestep(&self) -> Duration {
        Duration::from_millis(self.fixed_timestep_ms)
    }

    /// Anchor as a vector.
    #[must_use]
    pub fn anchor(&self) -> Vec3 {
        Vec3::from_array(self.anchor)
    }

    /// Prefabs keyed by kind.
    pub fn prefab_table(&self) -> Result<KindMap<PrefabId>> {
        let mut table = KindMap::new();
        for (name, prefab) in &self.prefabs {
            let kind: SpawnableKind = name
                .parse()
                .with_context(|| format!("unknown kind `{name}` in prefab table"))?;
            let _ = table.insert(kind, PrefabId::new(*prefab));
        }
        Ok(table)
    }

    /// Settings of the spawning system.
    #[must_use]
    pub fn spawning_config(&self) -> spawning::Config {
        spawning::Config::new(self.rng_seed, self.spawn_limit)
            .with_anchor(self.anchor())
            .with_pool_size(self.pool_size)
    }

    /// Settings of the round controller.
    #[must_use]
    pub fn round_config(&self) -> round::Config {
        let advance = if self.auto_advance {
            AdvancePolicy::Immediate
        } else {
            AdvancePolicy::OnRequest
        };
        round::Config::new(self.starting_level, self.starting_ammo)
            .with_advance_policy(advance)
            .with_projectile_pool_size(self.projectile_pool_size)
    }

    /// Level source selected by the configuration: the pattern document when
    /// one is set, the difficulty curve otherwise.
    #[must_use]
    pub fn level_source(&self) -> Box<dyn LevelSource> {
        match &self.pattern {
            Some(path) => Box::new(PatternReader::from_path(path)),
            None => Box::new(
                DifficultyCurve::new()
                    .with_min_rate(self.difficulty.min_rate)
                    .with_distances(self.difficulty.min_distance, self.difficulty.max_distance),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = HostConfig::from_toml_str("").expect("defaults");
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.fixed_timestep(), Duration::from_millis(20));
        assert_eq!(config.prefab_table().expect("table").len(), SpawnableKind::COUNT);
    }

    #[test]
    fn overrides_are_applied() {
        let config = HostConfig::from_toml_str(
            r#"
            starting_level = 3
            auto_advance = true
            pattern = "levels/patterns.xml"
            anchor = [0.0, 1.5, 0.0]

            [prefabs]
            Crasher = 40

            [difficulty]
            min_rate = 1.0
            "#,
        )
        .expect("config");

        assert_eq!(config.starting_level, 3);
        assert!(config.auto_advance);
        assert_eq!(config.pattern, Some(PathBuf::from("levels/patterns.xml")));
        assert_eq!(config.anchor(), Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(config.difficulty.min_rate, 1.0);
        assert_eq!(config.difficulty.max_distance, 15.0);

        let table = config.prefab_table().expect("table");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(SpawnableKind::Crasher), Some(&PrefabId::new(40)));
    }

    #[test]
    fn unknown_prefab_kind_is_rejected() {
        let error = HostConfig::from_toml_str("[prefabs]\nMothership = 1\n").unwrap_err();
        assert!(format!("{error:#}").contains("Mothership"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(HostConfig::from_toml_str("fixed_timestep_ms = 0").is_err());
        assert!(HostConfig::from_toml_str("starting_level = 0").is_err());
        assert!(HostConfig::from_toml_str("spawn_limit = 51").is_err());
        assert!(HostConfig::from_toml_str("typo = 1").is_err());
    }
}
