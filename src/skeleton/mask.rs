use smallvec::{SmallVec, smallvec};

use crate::errors::{AnimationError, Result};
use crate::skeleton::Skeleton;

const BITS: usize = u64::BITS as usize;

/// Per-bone enable bits for one skeleton.
///
/// Indices outside the mask are reported as enabled, so a mask never hides
/// bones it does not know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonMask {
    bits: SmallVec<[u64; 4]>,
    bone_count: usize,
}

impl SkeletonMask {
    /// A mask with every bone enabled.
    #[must_use]
    pub fn all_enabled(bone_count: usize) -> Self {
        let words = bone_count.div_ceil(BITS);
        let mut bits: SmallVec<[u64; 4]> = smallvec![u64::MAX; words];
        let tail = bone_count % BITS;
        if tail != 0
            && let Some(last) = bits.last_mut()
        {
            *last = (1u64 << tail) - 1;
        }
        Self { bits, bone_count }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bone_count
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bone_count == 0
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self, index: usize) -> bool {
        if index >= self.bone_count {
            return true;
        }
        self.bits[index / BITS] & (1u64 << (index % BITS)) != 0
    }

    /// Sets one bone's bit. Out-of-range indices are ignored.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        if index >= self.bone_count {
            return;
        }
        let word = &mut self.bits[index / BITS];
        let bit = 1u64 << (index % BITS);
        if enabled {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn check_compatible(&self, skeleton: &Skeleton) -> Result<()> {
        if self.bone_count == skeleton.bone_count() {
            Ok(())
        } else {
            Err(AnimationError::MaskSizeMismatch {
                mask: self.bone_count,
                skeleton: skeleton.bone_count(),
            })
        }
    }
}

/// Builds a [`SkeletonMask`] by bone name.
#[derive(Debug)]
pub struct SkeletonMaskBuilder<'a> {
    skeleton: &'a Skeleton,
    mask: SkeletonMask,
}

impl<'a> SkeletonMaskBuilder<'a> {
    #[must_use]
    pub fn new(skeleton: &'a Skeleton) -> Self {
        Self {
            skeleton,
            mask: SkeletonMask::all_enabled(skeleton.bone_count()),
        }
    }

    /// Enables or disables the first bone named `name`. Returns `false` when
    /// no bone has that name.
    pub fn set_bone_state(&mut self, name: &str, enabled: bool) -> bool {
        match self.skeleton.find_bone(name) {
            Some(index) => {
                self.mask.set_enabled(index, enabled);
                true
            }
            None => {
                log::debug!(
                    "SkeletonMaskBuilder: no bone named '{name}' in '{}'",
                    self.skeleton.name
                );
                false
            }
        }
    }

    /// Sets the state of a bone and all of its descendants.
    pub fn set_branch_state(&mut self, name: &str, enabled: bool) -> bool {
        let Some(root) = self.skeleton.find_bone(name) else {
            return false;
        };
        // Parent-before-child order lets a single forward pass reach every
        // descendant.
        self.mask.set_enabled(root, enabled);
        let mut in_branch = vec![false; self.skeleton.bone_count()];
        in_branch[root] = true;
        for (index, bone) in self.skeleton.bones().iter().enumerate().skip(root + 1) {
            if bone.parent.is_some_and(|p| in_branch[p]) {
                in_branch[index] = true;
                self.mask.set_enabled(index, enabled);
            }
        }
        true
    }

    #[must_use]
    pub fn build(self) -> SkeletonMask {
        self.mask
    }
}
