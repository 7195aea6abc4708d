//! Skeleton Module
//!
//! An immutable bone hierarchy plus its bind pose.
//!
//! - [`Skeleton`]: flat bone array in parent-before-child order
//! - [`SkeletonMask`]: per-bone enable bits, built by name with
//!   [`SkeletonMaskBuilder`]
//! - [`BoneTransform`]: bone-local translation / rotation / scale
//!
//! Skeletons are shared through `Arc` by every animation that drives them.
//! Pose composition lives in [`pose`].

pub mod mask;
pub mod pose;
pub mod transform;

use glam::Mat4;

use crate::errors::{AnimationError, Result};

pub use mask::{SkeletonMask, SkeletonMaskBuilder};
pub use transform::BoneTransform;

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// `None` for a root bone.
    pub parent: Option<usize>,
    pub local_bind: BoneTransform,
    /// Transforms mesh space into this bone's bind space.
    pub inverse_bind: Mat4,
}

impl Bone {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        parent: Option<usize>,
        local_bind: BoneTransform,
        inverse_bind: Mat4,
    ) -> Self {
        Self {
            name: name.into(),
            parent,
            local_bind,
            inverse_bind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,
    bones: Vec<Bone>,
}

impl Skeleton {
    /// Builds a skeleton from bones stored parent-before-child.
    pub fn new(name: impl Into<String>, bones: Vec<Bone>) -> Result<Self> {
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent
                && parent >= index
            {
                return Err(AnimationError::BoneOrder {
                    name: bone.name.clone(),
                    index,
                    parent,
                });
            }
        }
        Ok(Self {
            name: name.into(),
            bones,
        })
    }

    /// Builds a skeleton from `(name, parent, local bind transform)` triples,
    /// deriving inverse bind matrices from the composed bind pose.
    pub fn from_bind_pose(
        name: impl Into<String>,
        bones: impl IntoIterator<Item = (String, Option<usize>, BoneTransform)>,
    ) -> Result<Self> {
        let bones = bones
            .into_iter()
            .map(|(name, parent, local)| Bone::new(name, parent, local, Mat4::IDENTITY))
            .collect();
        let mut skeleton = Self::new(name, bones)?;

        let mut world: Vec<Mat4> = Vec::with_capacity(skeleton.bones.len());
        for bone in &skeleton.bones {
            let local = bone.local_bind.to_mat4();
            let matrix = match bone.parent {
                Some(parent) => world[parent] * local,
                None => local,
            };
            world.push(matrix);
        }
        for (bone, matrix) in skeleton.bones.iter_mut().zip(world) {
            bone.inverse_bind = matrix.inverse();
        }
        Ok(skeleton)
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// First bone named `name`.
    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// First bone without a parent. Later roots are not reported.
    #[must_use]
    pub fn root_bone_index(&self) -> Option<usize> {
        self.bones.iter().position(|b| b.parent.is_none())
    }

    /// Bind-pose matrix of bone `index` in skeleton space, composed by
    /// walking the parent chain.
    #[must_use]
    pub fn compute_bone_transform(&self, index: usize) -> Option<Mat4> {
        let bone = self.bones.get(index)?;
        let mut matrix = bone.local_bind.to_mat4();
        let mut parent = bone.parent;
        while let Some(p) = parent {
            let ancestor = self.bones.get(p)?;
            matrix = ancestor.local_bind.to_mat4() * matrix;
            parent = ancestor.parent;
        }
        Some(matrix)
    }

    /// Multiplies a pose by the inverse bind matrices, producing the
    /// matrices a skinning shader expects.
    pub fn skinning_matrices(&self, pose: &[Mat4], out: &mut Vec<Mat4>) -> Result<()> {
        if pose.len() < self.bones.len() {
            return Err(AnimationError::BufferTooSmall {
                context: "skinning pose",
                required: self.bones.len(),
                actual: pose.len(),
            });
        }
        out.clear();
        out.extend(
            self.bones
                .iter()
                .zip(pose)
                .map(|(bone, matrix)| *matrix * bone.inverse_bind),
        );
        Ok(())
    }
}
