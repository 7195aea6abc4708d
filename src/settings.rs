//! Animation Settings
//!
//! Runtime configuration for the [`AnimationManager`](crate::animation::AnimationManager).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_anim::{AnimationManager, AnimationSettings, WrapMode};
//!
//! // Default: evaluate every tick
//! let manager = AnimationManager::new(AnimationSettings::default());
//!
//! // Throttled to 30 Hz, clamped playback by default
//! let settings = AnimationSettings {
//!     default_wrap_mode: WrapMode::Clamp,
//!     ..AnimationSettings::with_update_rate(30.0)
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::animation::state::WrapMode;

/// Global configuration of the animation subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Master switch. When `false` every tick is skipped and the previous
    /// output is kept.
    pub enabled: bool,

    /// Minimum simulation time between two evaluations, in seconds.
    ///
    /// `0.0` evaluates on every call to `update`.
    pub update_interval: f32,

    /// Speed assigned to animations created through the manager.
    pub default_speed: f32,

    /// Wrap mode assigned to animations created through the manager.
    pub default_wrap_mode: WrapMode,

    /// Whether animations created through the manager start with frustum
    /// culling enabled.
    pub cull_by_default: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            update_interval: 0.0,
            default_speed: 1.0,
            default_wrap_mode: WrapMode::Loop,
            cull_by_default: false,
        }
    }
}

impl AnimationSettings {
    /// Settings that throttle evaluation to `hz` updates per second of
    /// simulation time. A non-positive rate disables throttling.
    #[must_use]
    pub fn with_update_rate(hz: f32) -> Self {
        let update_interval = if hz > 0.0 { 1.0 / hz } else { 0.0 };
        Self {
            update_interval,
            ..Self::default()
        }
    }

    /// Returns `true` when evaluation is throttled to a fixed interval.
    #[inline]
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.update_interval > 0.0
    }
}
