//! Playback state records.
//!
//! [`AnimationClipInfo`] pairs a shared clip with the mutable
//! [`AnimationState`] describing how it is currently playing. The flattened
//! [`AnimationStateLayer`] / [`ProxyState`] arrays are the evaluation-side
//! view built by the proxy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::animation::clip::{AnimationClip, TransformCurves};

/// Identifies a blend layer. Layers are evaluated in ascending order.
pub type LayerId = u32;

/// The implicit layer used by `play`, `cross_fade` and the blend spaces.
pub const DEFAULT_LAYER: LayerId = 0;

/// Upper bound on whole clip cycles reported as crossed in one tick.
const MAX_EVENT_CYCLES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WrapMode {
    /// Wrap modulo the clip length.
    #[default]
    Loop,
    /// Hold at the clip boundary.
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerBlendMode {
    /// States' weights are normalized and blended over the layers below.
    #[default]
    Normalized,
    /// Each state's weighted delta from the bind pose is added on top.
    Additive,
}

/// One-shot sampling step machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleStep {
    /// Regular playback.
    #[default]
    None,
    /// A sample was requested and has not been evaluated yet.
    Frame,
    /// The sampled pose has been evaluated and is reused as-is.
    Done,
}

/// Linear weight ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightFade {
    pub from: f32,
    pub to: f32,
    pub duration: f32,
    pub elapsed: f32,
}

impl WeightFade {
    #[must_use]
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: 0.0,
        }
    }

    /// Advances the ramp and returns the current weight.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        self.weight()
    }

    #[must_use]
    pub fn weight(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub layer: LayerId,
    /// Clip-relative time in seconds.
    pub time: f32,
    pub speed: f32,
    pub weight: f32,
    pub wrap_mode: WrapMode,
    pub stopped: bool,
    pub fade: Option<WeightFade>,
}

impl AnimationState {
    #[must_use]
    pub fn new(layer: LayerId, speed: f32, wrap_mode: WrapMode) -> Self {
        Self {
            layer,
            time: 0.0,
            speed,
            weight: 1.0,
            wrap_mode,
            stopped: false,
            fade: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn looped(&self) -> bool {
        self.wrap_mode == WrapMode::Loop
    }

    /// Advances the weight fade. Returns `true` when a fade-out completed
    /// and the state should be dropped.
    pub(crate) fn advance_fade(&mut self, dt: f32) -> bool {
        let Some(fade) = self.fade.as_mut() else {
            return false;
        };
        self.weight = fade.advance(dt);
        if !fade.is_finished() {
            return false;
        }
        let faded_out = fade.to <= 0.0;
        self.fade = None;
        faded_out
    }

    /// Advances `time` by `dt * speed`, queuing every clip event crossed.
    pub(crate) fn advance_time(
        &mut self,
        dt: f32,
        clip: &AnimationClip,
        events: &mut Vec<AnimationEvent>,
    ) {
        let delta = dt * self.speed;
        if delta == 0.0 {
            return;
        }
        let length = clip.duration;
        if length <= 0.0 {
            self.time = 0.0;
            return;
        }

        let prev = self.time;
        let raw = prev + delta;
        let mut emit = |lo: f32, hi: f32, forward: bool| {
            for event in &clip.events {
                let hit = if forward {
                    event.time > lo && event.time <= hi
                } else {
                    event.time >= lo && event.time < hi
                };
                if hit {
                    events.push(AnimationEvent {
                        clip: clip.name.clone(),
                        name: event.name.clone(),
                        time: event.time,
                    });
                }
            }
        };

        match self.wrap_mode {
            WrapMode::Clamp => {
                let next = raw.clamp(0.0, length);
                if delta > 0.0 {
                    emit(prev, next, true);
                } else {
                    emit(next, prev, false);
                }
                self.time = next;
            }
            WrapMode::Loop => {
                let next = raw.rem_euclid(length);
                let cycles = (raw / length).floor();
                if cycles == 0.0 {
                    if delta > 0.0 {
                        emit(prev, next, true);
                    } else {
                        emit(next, prev, false);
                    }
                } else if delta > 0.0 {
                    emit(prev, length, true);
                    let full = (cycles as usize).saturating_sub(1).min(MAX_EVENT_CYCLES);
                    for _ in 0..full {
                        emit(f32::NEG_INFINITY, length, true);
                    }
                    emit(f32::NEG_INFINITY, next, true);
                } else {
                    emit(0.0, prev, false);
                    let full = ((-cycles) as usize).saturating_sub(1).min(MAX_EVENT_CYCLES);
                    for _ in 0..full {
                        emit(0.0, f32::INFINITY, false);
                    }
                    emit(next, f32::INFINITY, false);
                }
                // rem_euclid of a tiny negative time can round up to `length`.
                self.time = if next >= length { 0.0 } else { next };
            }
        }
    }
}

/// A clip paired with its playback state.
#[derive(Debug, Clone)]
pub struct AnimationClipInfo {
    pub clip: Arc<AnimationClip>,
    pub state: AnimationState,
}

impl AnimationClipInfo {
    #[inline]
    #[must_use]
    pub fn is(&self, clip: &Arc<AnimationClip>, layer: LayerId) -> bool {
        self.state.layer == layer && Arc::ptr_eq(&self.clip, clip)
    }
}

/// A clip event crossed during playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationEvent {
    pub clip: String,
    pub name: String,
    pub time: f32,
}

// ============================================================================
// Flattened evaluation view
// ============================================================================

/// Evaluation-side copy of one playing state.
#[derive(Debug, Clone)]
pub struct ProxyState {
    pub clip: Arc<AnimationClip>,
    /// Index into the owning animation's clip list.
    pub source: usize,
    pub time: f32,
    pub weight: f32,
    pub looped: bool,
    /// Per bone: index of the clip's transform curves driving it.
    pub bone_curves: Vec<Option<usize>>,
    /// Per mapped scene object: index of the clip's transform curves.
    pub object_curves: Vec<Option<usize>>,
}

impl ProxyState {
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>, source: usize) -> Self {
        Self {
            clip,
            source,
            time: 0.0,
            weight: 1.0,
            looped: true,
            bone_curves: Vec::new(),
            object_curves: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn bone_curves(&self, bone: usize) -> Option<&TransformCurves> {
        let index = (*self.bone_curves.get(bone)?)?;
        self.clip.transform_curves.get(index)
    }

    #[inline]
    #[must_use]
    pub fn object_curves(&self, object: usize) -> Option<&TransformCurves> {
        let index = (*self.object_curves.get(object)?)?;
        self.clip.transform_curves.get(index)
    }
}

/// An ordered set of states evaluated together.
#[derive(Debug, Clone, Default)]
pub struct AnimationStateLayer {
    pub id: LayerId,
    pub blend_mode: LayerBlendMode,
    pub states: Vec<ProxyState>,
}

impl AnimationStateLayer {
    #[inline]
    #[must_use]
    pub fn is_additive(&self) -> bool {
        self.blend_mode == LayerBlendMode::Additive
    }
}
