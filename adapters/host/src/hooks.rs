//! Seam between the simulation and the scene that displays it.

use ringfire_core::{Placement, PrefabId, SpawnableKind};

/// One-shot audiovisual effect requested by the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Portal flash where a spawner placed an instance.
    SpawnPortal(Placement),
    /// Round cleared.
    Victory,
    /// Session lost.
    Defeat,
}

/// On-screen text slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    /// Ammo counter.
    Ammo,
    /// Score counter.
    Score,
    /// Current level.
    Round,
    /// Centered status message.
    Message,
}

/// Scene operations the host drives from world events.
///
/// Handles are owned by the host between `instantiate` and `destroy`;
/// implementations never see a handle after it was destroyed.
pub trait SceneHooks {
    /// Scene-side object mirroring one pooled instance.
    type Handle;

    /// Clones `prefab` into a dormant scene object.
    fn instantiate(&mut self, prefab: PrefabId, kind: SpawnableKind) -> Self::Handle;

    /// Shows the object at `placement`.
    fn activate(&mut self, handle: &mut Self::Handle, placement: Placement);

    /// Hides the object so it can be reused.
    fn deactivate(&mut self, handle: &mut Self::Handle);

    /// Removes the object from the scene for good.
    fn destroy(&mut self, handle: Self::Handle);

    /// Plays a one-shot effect.
    fn play_effect(&mut self, effect: Effect);

    /// Replaces the text of `label`.
    fn update_label(&mut self, label: Label, text: &str);
}
