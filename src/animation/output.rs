use std::ops::Range;

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::animation::player::AnimationId;

/// A contiguous slice of the shared bone buffer owned by one animation for
/// one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoneRange {
    pub offset: usize,
    pub count: usize,
}

impl BoneRange {
    #[inline]
    #[must_use]
    pub fn as_range(&self) -> Range<usize> {
        self.offset..self.offset + self.count
    }
}

/// Pose matrices of every evaluated animation, packed into one buffer.
///
/// The buffer is rewritten as a whole on every evaluated tick and left
/// untouched on skipped ticks, so consumers may keep reading it until the
/// next call to [`AnimationManager::update`](super::AnimationManager::update).
#[derive(Debug, Default)]
pub struct AnimationOutput {
    transforms: Vec<Mat4>,
    ranges: FxHashMap<AnimationId, BoneRange>,
    tick: u64,
}

impl AnimationOutput {
    #[inline]
    #[must_use]
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Raw bytes of the whole buffer, ready for a GPU upload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    #[inline]
    #[must_use]
    pub fn range(&self, id: AnimationId) -> Option<BoneRange> {
        self.ranges.get(&id).copied()
    }

    /// Pose matrices written for `id` on the last evaluated tick.
    #[must_use]
    pub fn pose(&self, id: AnimationId) -> Option<&[Mat4]> {
        let range = self.ranges.get(&id)?;
        self.transforms.get(range.as_range())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Number of evaluated ticks so far.
    #[inline]
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Resets the buffer for a new tick. Capacity is kept.
    pub(crate) fn begin(&mut self, bone_count: usize) {
        self.transforms.clear();
        self.transforms.resize(bone_count, Mat4::IDENTITY);
        self.ranges.clear();
        self.tick += 1;
    }

    pub(crate) fn slice_mut(&mut self, range: BoneRange) -> &mut [Mat4] {
        &mut self.transforms[range.as_range()]
    }

    pub(crate) fn publish(&mut self, id: AnimationId, range: BoneRange) {
        debug_assert!(range.offset + range.count <= self.transforms.len());
        self.ranges.insert(id, range);
    }
}
