//! Providers of per-level spawn patterns.

use ringfire_core::{
    ConfigError, LevelPattern, PatternGroup, SpawnConfig, SpawnLimit, SpawnableKind,
};
use ringfire_system_patterns::PatternReader;

use crate::RoundError;

/// Supplies the spawn pattern of each level.
pub trait LevelSource {
    /// Produces the pattern for `level`.
    fn level_pattern(&mut self, level: u32) -> Result<LevelPattern, RoundError>;

    /// Returns to the first level when a session restarts.
    fn rewind(&mut self) {}
}

impl LevelSource for PatternReader {
    fn level_pattern(&mut self, _level: u32) -> Result<LevelPattern, RoundError> {
        Ok(self.next_level()?)
    }

    fn rewind(&mut self) {
        PatternReader::rewind(self);
    }
}

impl<S: LevelSource + ?Sized> LevelSource for Box<S> {
    fn level_pattern(&mut self, level: u32) -> Result<LevelPattern, RoundError> {
        (**self).level_pattern(level)
    }

    fn rewind(&mut self) {
        (**self).rewind();
    }
}

/// Procedural difficulty ramp: one crasher, one drone and one bullet capsule
/// spawner per level, each growing with the level number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyCurve {
    min_rate: f32,
    min_distance: f32,
    max_distance: f32,
}

impl DifficultyCurve {
    /// Creates the default curve.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_rate: 0.5,
            min_distance: 5.0,
            max_distance: 15.0,
        }
    }

    /// Shortest interval, in seconds, enemy spawners may ramp down to.
    #[must_use]
    pub const fn with_min_rate(mut self, min_rate: f32) -> Self {
        self.min_rate = min_rate;
        self
    }

    /// Distance band emissions land in.
    #[must_use]
    pub const fn with_distances(mut self, min_distance: f32, max_distance: f32) -> Self {
        self.min_distance = min_distance;
        self.max_distance = max_distance;
        self
    }

    /// Builds the pattern for `level`.
    pub fn pattern(&self, level: u32) -> Result<LevelPattern, ConfigError> {
        let step = level as f32;
        let enemy_rate = (3.0 - 0.1 * step).max(self.min_rate);

        let mut pattern = LevelPattern::new();
        for (kind, limit, rate, delay) in [
            (SpawnableKind::Crasher, 4 * level + 8, enemy_rate, 3.0),
            (SpawnableKind::Drone, 3 * level + 6, enemy_rate, 4.0),
            (SpawnableKind::BulletCapsule, level + 2, 3.0 + 0.5 * step, 10.0),
        ] {
            let mut group = PatternGroup::new(kind);
            group.push(SpawnConfig::from_seconds(
                kind,
                SpawnLimit::Finite(limit),
                rate,
                delay,
                self.min_distance,
                self.max_distance,
            )?);
            pattern.push_group(group);
        }
        Ok(pattern)
    }
}

impl Default for DifficultyCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelSource for DifficultyCurve {
    fn level_pattern(&mut self, level: u32) -> Result<LevelPattern, RoundError> {
        Ok(self.pattern(level)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(pattern: &LevelPattern, kind: SpawnableKind) -> SpawnConfig {
        pattern
            .groups()
            .iter()
            .find(|group| group.kind() == kind)
            .and_then(|group| group.peek().copied())
            .expect("kind present")
    }

    #[test]
    fn curve_scales_limits_with_level() {
        let pattern = DifficultyCurve::new().pattern(2).expect("pattern");
        assert_eq!(pattern.len(), 3);

        let crasher = config(&pattern, SpawnableKind::Crasher);
        assert_eq!(crasher.limit(), SpawnLimit::Finite(16));
        assert_eq!(crasher.initial_delay(), Duration::from_secs(3));

        let drone = config(&pattern, SpawnableKind::Drone);
        assert_eq!(drone.limit(), SpawnLimit::Finite(12));
        assert_eq!(drone.initial_delay(), Duration::from_secs(4));

        let capsule = config(&pattern, SpawnableKind::BulletCapsule);
        assert_eq!(capsule.limit(), SpawnLimit::Finite(4));
        assert_eq!(capsule.rate(), Duration::from_secs(4));
        assert_eq!(capsule.initial_delay(), Duration::from_secs(10));
    }

    #[test]
    fn enemy_rate_never_drops_below_floor() {
        let pattern = DifficultyCurve::new()
            .with_min_rate(1.0)
            .pattern(40)
            .expect("pattern");
        assert_eq!(
            config(&pattern, SpawnableKind::Crasher).rate(),
            Duration::from_secs(1)
        );
        assert_eq!(
            config(&pattern, SpawnableKind::Drone).rate(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn inverted_distance_band_is_rejected() {
        let curve = DifficultyCurve::new().with_distances(10.0, 2.0);
        assert!(matches!(
            curve.pattern(1),
            Err(ConfigError::InvalidDistance { .. })
        ));
    }
}
