use bitflags::bitflags;
use glam::{Quat, Vec3};

/// Stable per-object instance id supplied by the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneObjectId(pub u64);

bitflags! {
    /// Transform components an animation overrides on a scene object.
    /// Components not set keep the object's own authored value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PoseOverride: u8 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const SCALE    = 1 << 2;
    }
}

/// Pose computed for a curve-mapped scene object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneObjectPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub overrides: PoseOverride,
}

impl Default for SceneObjectPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            overrides: PoseOverride::empty(),
        }
    }
}

impl SceneObjectPose {
    /// The animated position, or `None` when the object keeps its own.
    #[must_use]
    pub fn position(&self) -> Option<Vec3> {
        self.overrides
            .contains(PoseOverride::POSITION)
            .then_some(self.position)
    }

    #[must_use]
    pub fn rotation(&self) -> Option<Quat> {
        self.overrides
            .contains(PoseOverride::ROTATION)
            .then_some(self.rotation)
    }

    #[must_use]
    pub fn scale(&self) -> Option<Vec3> {
        self.overrides
            .contains(PoseOverride::SCALE)
            .then_some(self.scale)
    }
}
