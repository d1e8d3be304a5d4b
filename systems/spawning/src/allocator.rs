//! Assignment of level patterns onto a reusable set of spawners.

use std::time::Duration;

use glam::Vec3;
use log::{debug, info};
use rand::Rng;
use ringfire_core::{
    Command, KindMap, LevelPattern, PatternGroup, SceneCensus, SpawnLimit, SpawnableKind,
    SpawnerId,
};

use crate::spawner::{SpawnBudget, SpawnRequest, Spawner, SpawnerError};

/// Ammo granted for every finite spawner configured in a round.
pub const BASE_AMMO_REWARD: u32 = 6;

/// Points granted per round of ammo the player holds beyond a spawner's limit.
pub const SURPLUS_AMMO_POINTS: u32 = 10;

/// Summary of one allocation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationReport {
    /// Spawners taken back from the stash.
    pub reused: u32,
    /// Spawners created because the stash ran dry.
    pub created: u32,
    /// Spawners moved into the stash.
    pub stashed: u32,
    /// Ammo credited to the player for the round.
    pub ammo_credited: u32,
    /// Points awarded for ammo surplus.
    pub score_awarded: u32,
}

/// Owns every spawner, either active under a kind or idle in the stash.
#[derive(Debug)]
pub struct SpawnerAllocator {
    active: KindMap<Vec<Spawner>>,
    stash: Vec<Spawner>,
    next_id: u32,
    anchor: Vec3,
    pool_size: u32,
}

impl SpawnerAllocator {
    /// Creates an allocator without spawners. New spawners emit around
    /// `anchor`; pools are pre-warmed with `pool_size` instances.
    #[must_use]
    pub fn new(anchor: Vec3, pool_size: u32) -> Self {
        Self {
            active: KindMap::new(),
            stash: Vec::new(),
            next_id: 0,
            anchor,
            pool_size,
        }
    }

    /// Spawners assigned to `kind`.
    #[must_use]
    pub fn active(&self, kind: SpawnableKind) -> &[Spawner] {
        self.active
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every active spawner, ordered by kind.
    pub fn active_spawners(&self) -> impl Iterator<Item = &Spawner> {
        self.active.iter().flat_map(|(_, spawners)| spawners.iter())
    }

    /// Idle spawners waiting for reuse, most recently stashed last.
    #[must_use]
    pub fn stash(&self) -> &[Spawner] {
        &self.stash
    }

    /// Looks up a spawner wherever it lives.
    #[must_use]
    pub fn spawner(&self, id: SpawnerId) -> Option<&Spawner> {
        self.active_spawners()
            .chain(self.stash.iter())
            .find(|spawner| spawner.id() == id)
    }

    /// Reports whether any spawner of an enemy kind has a wake-up armed.
    #[must_use]
    pub fn enemy_spawning(&self) -> bool {
        self.active
            .iter()
            .filter(|(kind, _)| kind.is_enemy())
            .any(|(_, spawners)| spawners.iter().any(Spawner::is_spawning))
    }

    /// Moves the point new and existing spawners emit around.
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
        for (_, spawners) in self.active.iter_mut() {
            for spawner in spawners {
                spawner.set_anchor(anchor);
            }
        }
        for spawner in &mut self.stash {
            spawner.set_anchor(anchor);
        }
    }

    /// Stops every active spawner.
    pub fn stop_all(&mut self) {
        for (_, spawners) in self.active.iter_mut() {
            for spawner in spawners {
                spawner.stop();
            }
        }
    }

    /// Advances every active spawner, in kind order, against one shared budget.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: Duration,
        budget: &mut SpawnBudget,
        rng: &mut R,
        out: &mut Vec<SpawnRequest>,
    ) {
        for (_, spawners) in self.active.iter_mut() {
            for spawner in spawners {
                spawner.tick(dt, budget, rng, out);
            }
        }
    }

    /// Assigns `pattern` to spawners, configures and starts them, and queues
    /// pool pre-warming and the round's ammo reward.
    ///
    /// Groups are handled newest first. A group that cannot be staffed from
    /// its own spawners and the stash waits until every other group has been
    /// handled, since those may stash more; only then are new spawners
    /// created. Kinds absent from the pattern are stashed wholesale.
    pub fn allocate(
        &mut self,
        pattern: LevelPattern,
        census: &SceneCensus,
        out: &mut Vec<Command>,
    ) -> Result<AllocationReport, SpawnerError> {
        let mut report = AllocationReport::default();
        let mut round = RoundSetup {
            ledger: RewardLedger::new(census.ammo),
            warmed: Vec::new(),
            census,
            pool_size: self.pool_size,
        };

        let mut queue = pattern.into_groups();
        let unused: Vec<SpawnableKind> = self
            .active
            .keys()
            .filter(|kind| queue.iter().all(|group| group.kind() != *kind))
            .collect();
        let mut deferred = Vec::new();

        while let Some(group) = queue.pop() {
            let required = group.len();
            let spawners = self.active.get_or_insert_with(group.kind(), Vec::new);

            if spawners.len() > required {
                for mut spawner in spawners.drain(required..) {
                    spawner.stop();
                    self.stash.push(spawner);
                    report.stashed += 1;
                }
            }
            while spawners.len() < required {
                let Some(spawner) = self.stash.pop() else {
                    break;
                };
                spawners.push(spawner);
                report.reused += 1;
            }

            if spawners.len() < required {
                debug!(
                    "deferring {} group: {} of {required} spawners available",
                    group.kind(),
                    spawners.len()
                );
                deferred.push(group);
                continue;
            }
            round.start_group(spawners, group, out)?;
        }

        for kind in unused {
            if let Some(spawners) = self.active.remove(kind) {
                for mut spawner in spawners {
                    spawner.stop();
                    self.stash.push(spawner);
                    report.stashed += 1;
                }
            }
        }

        while let Some(group) = deferred.pop() {
            let required = group.len();
            let spawners = self.active.get_or_insert_with(group.kind(), Vec::new);
            while spawners.len() < required {
                match self.stash.pop() {
                    Some(spawner) => {
                        spawners.push(spawner);
                        report.reused += 1;
                    }
                    None => {
                        let id = SpawnerId::new(self.next_id);
                        self.next_id += 1;
                        spawners.push(Spawner::new(id, self.anchor));
                        report.created += 1;
                    }
                }
            }
            round.start_group(spawners, group, out)?;
        }

        let (ammo, score) = round.ledger.totals();
        report.ammo_credited = ammo;
        report.score_awarded = score;
        out.push(Command::CreditAmmo { amount: ammo });
        out.push(Command::AddScore { points: score });

        info!(
            "allocated spawners: {} reused, {} created, {} stashed, {} ammo credited",
            report.reused, report.created, report.stashed, report.ammo_credited
        );
        Ok(report)
    }
}

struct RoundSetup<'a> {
    ledger: RewardLedger,
    warmed: Vec<SpawnableKind>,
    census: &'a SceneCensus,
    pool_size: u32,
}

impl RoundSetup<'_> {
    fn start_group(
        &mut self,
        spawners: &mut [Spawner],
        mut group: PatternGroup,
        out: &mut Vec<Command>,
    ) -> Result<(), SpawnerError> {
        let kind = group.kind();
        for spawner in spawners.iter_mut() {
            let Some(config) = group.pop() else {
                break;
            };
            spawner.configure(config)?;
            spawner.start()?;
            self.ledger.record(config.limit());
        }

        for kind in std::iter::once(kind).chain(kind.dependencies().iter().copied()) {
            if self.census.pool(kind).is_empty() && !self.warmed.contains(&kind) {
                self.warmed.push(kind);
                out.push(Command::PopulatePool {
                    kind,
                    prefab: None,
                    count: self.pool_size,
                });
            }
        }
        Ok(())
    }
}

/// Running ammo balance used to price a round's spawners.
#[derive(Debug)]
struct RewardLedger {
    ammo: u32,
    credited: u32,
    score: u32,
}

impl RewardLedger {
    const fn new(ammo: u32) -> Self {
        Self {
            ammo,
            credited: 0,
            score: 0,
        }
    }

    fn record(&mut self, limit: SpawnLimit) {
        let Some(limit) = limit.get() else {
            return;
        };

        let mut reward = BASE_AMMO_REWARD;
        if self.ammo > limit {
            let surplus = (self.ammo - limit).saturating_mul(SURPLUS_AMMO_POINTS);
            self.score = self.score.saturating_add(surplus);
        } else {
            reward = reward.saturating_add(limit - self.ammo);
        }
        self.ammo = self.ammo.saturating_add(reward);
        self.credited = self.credited.saturating_add(reward);
    }

    const fn totals(&self) -> (u32, u32) {
        (self.credited, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_rewards_shortfall_and_scores_surplus() {
        let mut ledger = RewardLedger::new(10);
        ledger.record(SpawnLimit::Finite(4));
        assert_eq!(ledger.totals(), (6, 60));

        // Running ammo is now 16.
        ledger.record(SpawnLimit::Finite(20));
        assert_eq!(ledger.totals(), (6 + 10, 60));

        ledger.record(SpawnLimit::Unbounded);
        assert_eq!(ledger.totals(), (16, 60));
    }

    #[test]
    fn matching_ammo_earns_base_reward_only() {
        let mut ledger = RewardLedger::new(5);
        ledger.record(SpawnLimit::Finite(5));
        assert_eq!(ledger.totals(), (BASE_AMMO_REWARD, 0));
    }
}
