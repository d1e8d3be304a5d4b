//! Reusable instance caches, one per spawnable kind.
//!
//! Instances are never destroyed individually. Releasing an instance only
//! marks its slot dormant and pushes it onto the free list; the slot is handed
//! out again by the next [`Pool::acquire`]. Instances disappear only when the
//! whole pool is emptied.

use ringfire_core::{InstanceId, KindMap, PoolCensus, PoolError, PrefabId, SpawnableKind};

/// Values that can live in a [`Pool`].
pub trait Poolable {
    /// Creates a dormant value cloned from `prefab`.
    fn instantiate(prefab: PrefabId) -> Self;

    /// Clears transient state before the value re-enters play.
    fn reset(&mut self);
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    active: bool,
}

/// Cache of reusable instances of a single kind.
#[derive(Debug)]
pub struct Pool<T> {
    kind: SpawnableKind,
    cap: u32,
    prefab: Option<PrefabId>,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    active: u32,
}

impl<T: Poolable> Pool<T> {
    /// Creates an empty pool that never grows beyond `cap` instances.
    #[must_use]
    pub fn new(kind: SpawnableKind, cap: u32) -> Self {
        Self {
            kind,
            cap,
            prefab: None,
            slots: Vec::new(),
            free: Vec::new(),
            active: 0,
        }
    }

    /// Kind of instance the pool holds.
    #[must_use]
    pub const fn kind(&self) -> SpawnableKind {
        self.kind
    }

    /// Default prefab used when the pool grows.
    #[must_use]
    pub const fn prefab(&self) -> Option<PrefabId> {
        self.prefab
    }

    /// Replaces the default prefab used when the pool grows.
    pub fn set_prefab(&mut self, prefab: PrefabId) {
        self.prefab = Some(prefab);
    }

    /// Hands out a dormant instance, creating one when none is free.
    ///
    /// Returns the slot and, when the slot was freshly created, the prefab it
    /// was cloned from. The instance is reset before it is returned.
    pub fn acquire(&mut self) -> Result<(u32, Option<PrefabId>), PoolError> {
        let (slot, created) = match self.free.pop() {
            Some(slot) => (slot, None),
            None => {
                if self.len() >= self.cap {
                    return Err(PoolError::Exhausted {
                        kind: self.kind,
                        cap: self.cap,
                    });
                }
                let prefab = self
                    .prefab
                    .ok_or(PoolError::MissingPrefab { kind: self.kind })?;
                (self.create(prefab), Some(prefab))
            }
        };

        let entry = &mut self.slots[slot as usize];
        entry.value.reset();
        entry.active = true;
        self.active += 1;
        Ok((slot, created))
    }

    /// Returns an active instance to the free list.
    ///
    /// Releasing a dormant or unknown slot does nothing and returns `false`.
    pub fn release(&mut self, slot: u32) -> bool {
        match self.slots.get_mut(slot as usize) {
            Some(entry) if entry.active => {
                entry.active = false;
                self.free.push(slot);
                self.active -= 1;
                true
            }
            _ => false,
        }
    }

    /// Grows the free list to at least `count` instances, bounded by the cap.
    ///
    /// Uses `prefab` when supplied, else the registered default; a supplied
    /// prefab becomes the default when none was registered. Returns the slots
    /// created together with their prefab.
    pub fn populate(
        &mut self,
        prefab: Option<PrefabId>,
        count: u32,
    ) -> Result<Vec<(u32, PrefabId)>, PoolError> {
        let prefab = prefab
            .or(self.prefab)
            .ok_or(PoolError::MissingPrefab { kind: self.kind })?;
        if self.prefab.is_none() {
            self.prefab = Some(prefab);
        }

        let mut created = Vec::new();
        while self.free_count() < count && self.len() < self.cap {
            let slot = self.create(prefab);
            self.free.push(slot);
            created.push((slot, prefab));
        }
        Ok(created)
    }

    /// Destroys every instance, active or free, returning the slots that
    /// existed.
    pub fn empty(&mut self) -> Vec<u32> {
        let destroyed = (0..self.len()).collect();
        self.slots.clear();
        self.free.clear();
        self.active = 0;
        destroyed
    }

    /// Value stored in `slot`, whether active or not.
    #[must_use]
    pub fn get(&self, slot: u32) -> Option<&T> {
        self.slots.get(slot as usize).map(|entry| &entry.value)
    }

    /// Mutable value stored in `slot`, whether active or not.
    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.slots.get_mut(slot as usize).map(|entry| &mut entry.value)
    }

    /// Reports whether `slot` is currently in play.
    #[must_use]
    pub fn is_active(&self, slot: u32) -> bool {
        self.slots
            .get(slot as usize)
            .map_or(false, |entry| entry.active)
    }

    /// Slots currently in play, in ascending order.
    pub fn active_slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .zip(0..)
            .filter_map(|(entry, slot)| entry.active.then_some(slot))
    }

    /// Number of dormant instances.
    #[must_use]
    pub fn free_count(&self) -> u32 {
        self.free.len() as u32
    }

    /// Number of instances in play.
    #[must_use]
    pub const fn active_count(&self) -> u32 {
        self.active
    }

    /// Total number of instances owned by the pool.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Reports whether the pool owns no instance.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Free and active counts.
    #[must_use]
    pub fn census(&self) -> PoolCensus {
        PoolCensus {
            free: self.free_count(),
            active: self.active,
            prefab: self.prefab,
        }
    }

    fn create(&mut self, prefab: PrefabId) -> u32 {
        let slot = self.len();
        self.slots.push(Slot {
            value: T::instantiate(prefab),
            active: false,
        });
        slot
    }
}

/// Registry holding one lazily created [`Pool`] per kind.
#[derive(Debug)]
pub struct PoolRegistry<T> {
    pools: KindMap<Pool<T>>,
    cap: u32,
}

impl<T: Poolable> PoolRegistry<T> {
    /// Creates a registry whose pools never grow beyond `cap` instances.
    #[must_use]
    pub fn new(cap: u32) -> Self {
        Self {
            pools: KindMap::new(),
            cap,
        }
    }

    /// Pool for `kind`, if it was created.
    #[must_use]
    pub fn pool(&self, kind: SpawnableKind) -> Option<&Pool<T>> {
        self.pools.get(kind)
    }

    /// Pool for `kind`, created on first use.
    pub fn pool_mut(&mut self, kind: SpawnableKind) -> &mut Pool<T> {
        let cap = self.cap;
        self.pools.get_or_insert_with(kind, || Pool::new(kind, cap))
    }

    /// Records the default prefab of the `kind` pool.
    pub fn register_prefab(&mut self, kind: SpawnableKind, prefab: PrefabId) {
        self.pool_mut(kind).set_prefab(prefab);
    }

    /// Pre-warms the `kind` pool. See [`Pool::populate`].
    pub fn populate(
        &mut self,
        kind: SpawnableKind,
        prefab: Option<PrefabId>,
        count: u32,
    ) -> Result<Vec<(InstanceId, PrefabId)>, PoolError> {
        let created = self.pool_mut(kind).populate(prefab, count)?;
        Ok(created
            .into_iter()
            .map(|(slot, prefab)| (InstanceId::new(kind, slot), prefab))
            .collect())
    }

    /// Hands out an instance of `kind`. See [`Pool::acquire`].
    pub fn acquire(
        &mut self,
        kind: SpawnableKind,
    ) -> Result<(InstanceId, Option<PrefabId>), PoolError> {
        let (slot, created) = self.pool_mut(kind).acquire()?;
        Ok((InstanceId::new(kind, slot), created))
    }

    /// Returns an instance to its pool. Idempotent.
    pub fn release(&mut self, instance: InstanceId) -> bool {
        self.pools
            .get_mut(instance.kind())
            .map_or(false, |pool| pool.release(instance.slot()))
    }

    /// Value behind `instance`.
    #[must_use]
    pub fn get(&self, instance: InstanceId) -> Option<&T> {
        self.pool(instance.kind())
            .and_then(|pool| pool.get(instance.slot()))
    }

    /// Mutable value behind `instance`.
    pub fn get_mut(&mut self, instance: InstanceId) -> Option<&mut T> {
        self.pools
            .get_mut(instance.kind())
            .and_then(|pool| pool.get_mut(instance.slot()))
    }

    /// Reports whether `instance` is in play.
    #[must_use]
    pub fn is_active(&self, instance: InstanceId) -> bool {
        self.pool(instance.kind())
            .map_or(false, |pool| pool.is_active(instance.slot()))
    }

    /// Every instance in play, ordered by kind then slot.
    #[must_use]
    pub fn active_instances(&self) -> Vec<InstanceId> {
        self.pools
            .iter()
            .flat_map(|(kind, pool)| {
                pool.active_slots()
                    .map(move |slot| InstanceId::new(kind, slot))
            })
            .collect()
    }

    /// Empties every pool, returning the destroyed instances. Registered
    /// prefabs survive.
    pub fn empty_all(&mut self) -> Vec<InstanceId> {
        let mut destroyed = Vec::new();
        for (kind, pool) in self.pools.iter_mut() {
            destroyed.extend(
                pool.empty()
                    .into_iter()
                    .map(|slot| InstanceId::new(kind, slot)),
            );
        }
        destroyed
    }

    /// Free and active counts of every existing pool.
    #[must_use]
    pub fn census(&self) -> KindMap<PoolCensus> {
        let mut census = KindMap::new();
        for (kind, pool) in self.pools.iter() {
            let _ = census.insert(kind, pool.census());
        }
        census
    }
}
