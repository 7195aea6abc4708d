use bitflags::bitflags;

bitflags! {
    /// What an [`Animation`](super::Animation) changed since its proxy was
    /// last refreshed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Playback parameters (speed, weight, wrap mode, time).
        const VALUE         = 1 << 0;
        /// The set of playing states or their layers.
        const LAYOUT        = 1 << 1;
        /// Culling bounds or the culling switch.
        const CULLING       = 1 << 2;
        /// The generic-curve output layout.
        const MORPH_WEIGHTS = 1 << 3;
        /// Everything, including the skeleton and scene-object mapping tables.
        const ALL = Self::VALUE.bits()
            | Self::LAYOUT.bits()
            | Self::CULLING.bits()
            | Self::MORPH_WEIGHTS.bits();
    }
}

impl DirtyFlags {
    /// Flags that require the proxy's flattened arrays to be rebuilt.
    pub const STRUCTURAL: Self = Self::LAYOUT.union(Self::MORPH_WEIGHTS);
}

/// Accumulates dirty flags between ticks.
///
/// Mutators may only OR flags in; the evaluation phase consumes them with
/// [`take`](Self::take), which is the only way to clear them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirtyTracker {
    flags: DirtyFlags,
}

impl DirtyTracker {
    #[inline]
    pub fn mark(&mut self, flags: DirtyFlags) {
        self.flags |= flags;
    }

    #[inline]
    #[must_use]
    pub fn pending(&self) -> DirtyFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Returns the accumulated flags and clears them.
    #[inline]
    pub fn take(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.flags)
    }
}
