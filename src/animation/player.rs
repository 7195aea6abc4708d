//! Per-entity animation player.
//!
//! An [`Animation`] owns the list of clips it is playing, their playback
//! states, the optional skeleton and mask they drive, and the proxy used to
//! evaluate them. All mutation happens between ticks through `&mut self`;
//! the manager then calls [`update_anim_proxy`](Animation::update_anim_proxy),
//! evaluates the proxy, and pushes results back with
//! [`update_from_proxy`](Animation::update_from_proxy).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::animation::blend::{BlendSpace1D, BlendSpace2D};
use crate::animation::clip::AnimationClip;
use crate::animation::dirty::{DirtyFlags, DirtyTracker};
use crate::animation::proxy::AnimationProxy;
use crate::animation::state::{
    AnimationClipInfo, AnimationEvent, AnimationState, DEFAULT_LAYER, LayerBlendMode, LayerId,
    SampleStep, WeightFade, WrapMode,
};
use crate::scene::{BoundingBox, SceneObjectId, SceneObjectPose};
use crate::skeleton::{Skeleton, SkeletonMask};

static NEXT_ANIMATION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique animation id. Ids increase monotonically and are never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

impl AnimationId {
    fn next() -> Self {
        Self(NEXT_ANIMATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct Animation {
    id: AnimationId,
    clips: Vec<AnimationClipInfo>,
    layer_modes: BTreeMap<LayerId, LayerBlendMode>,

    skeleton: Option<Arc<Skeleton>>,
    mask: Option<Arc<SkeletonMask>>,
    scene_object_curves: FxHashMap<SceneObjectId, String>,

    default_speed: f32,
    default_wrap_mode: WrapMode,
    bounds: BoundingBox,
    culling: bool,
    culled: bool,
    sample_step: SampleStep,

    dirty: DirtyTracker,
    proxy: AnimationProxy,

    scene_object_poses: FxHashMap<SceneObjectId, SceneObjectPose>,
    generic_values: Option<Vec<f32>>,

    pending_events: Vec<AnimationEvent>,
    fired_events: Vec<AnimationEvent>,
}

impl Default for Animation {
    fn default() -> Self {
        Self::new()
    }
}

impl Animation {
    #[must_use]
    pub fn new() -> Self {
        Self::with_defaults(1.0, WrapMode::Loop)
    }

    /// An animation whose new states start with `speed` and `wrap_mode`.
    #[must_use]
    pub fn with_defaults(speed: f32, wrap_mode: WrapMode) -> Self {
        Self {
            id: AnimationId::next(),
            clips: Vec::new(),
            layer_modes: BTreeMap::new(),
            skeleton: None,
            mask: None,
            scene_object_curves: FxHashMap::default(),
            default_speed: speed,
            default_wrap_mode: wrap_mode,
            bounds: BoundingBox::default(),
            culling: false,
            culled: false,
            sample_step: SampleStep::None,
            dirty: DirtyTracker::default(),
            proxy: AnimationProxy::default(),
            scene_object_poses: FxHashMap::default(),
            generic_values: None,
            pending_events: Vec::new(),
            fired_events: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> AnimationId {
        self.id
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Plays `clip` from the start on the default layer, replacing whatever
    /// that layer was playing.
    pub fn play(&mut self, clip: &Arc<AnimationClip>) {
        self.play_on_layer(clip, DEFAULT_LAYER);
    }

    pub fn play_on_layer(&mut self, clip: &Arc<AnimationClip>, layer: LayerId) {
        self.clips.retain(|info| info.state.layer != layer);
        let state = self.new_state(layer);
        self.clips.push(AnimationClipInfo {
            clip: Arc::clone(clip),
            state,
        });
        self.sample_step = SampleStep::None;
        self.dirty.mark(DirtyFlags::STRUCTURAL);
    }

    /// Evaluates `clip` once at `time` and holds the resulting pose until
    /// the next `play` or `sample`.
    pub fn sample(&mut self, clip: &Arc<AnimationClip>, time: f32) {
        self.clips.retain(|info| info.state.layer != DEFAULT_LAYER);
        let mut state = self.new_state(DEFAULT_LAYER);
        state.time = time.clamp(0.0, clip.duration.max(0.0));
        self.clips.push(AnimationClipInfo {
            clip: Arc::clone(clip),
            state,
        });
        self.sample_step = SampleStep::Frame;
        self.dirty.mark(DirtyFlags::STRUCTURAL);
    }

    /// Fades `clip` in over `fade_length` seconds while every other state
    /// on the default layer fades out. Faded-out states are dropped once
    /// their weight reaches zero.
    pub fn cross_fade(&mut self, clip: &Arc<AnimationClip>, fade_length: f32) {
        if fade_length <= 0.0 {
            self.play(clip);
            return;
        }

        for info in &mut self.clips {
            if info.state.layer == DEFAULT_LAYER
                && !info.state.stopped
                && !Arc::ptr_eq(&info.clip, clip)
            {
                info.state.fade = Some(WeightFade::new(info.state.weight, 0.0, fade_length));
            }
        }

        match self.find(clip, DEFAULT_LAYER) {
            Some(index) => {
                let state = &mut self.clips[index].state;
                let from = if state.stopped { 0.0 } else { state.weight };
                if state.stopped {
                    state.stopped = false;
                    state.time = 0.0;
                }
                state.weight = from;
                state.fade = Some(WeightFade::new(from, 1.0, fade_length));
            }
            None => {
                let mut state = self.new_state(DEFAULT_LAYER);
                state.weight = 0.0;
                state.fade = Some(WeightFade::new(0.0, 1.0, fade_length));
                self.clips.push(AnimationClipInfo {
                    clip: Arc::clone(clip),
                    state,
                });
            }
        }

        self.sample_step = SampleStep::None;
        self.dirty.mark(DirtyFlags::STRUCTURAL);
    }

    pub fn blend_1d(&mut self, space: &BlendSpace1D, value: f32) {
        let weights = space.weights(value);
        self.apply_blend(space.clips(), &weights);
    }

    pub fn blend_2d(&mut self, space: &BlendSpace2D, value: Vec2) {
        let weights = space.weights(value);
        self.apply_blend(space.clips(), &weights);
    }

    /// Drives the default layer with one state per distinct clip. States of
    /// clips already playing keep their time.
    fn apply_blend(&mut self, clips: &[Arc<AnimationClip>], weights: &[f32]) {
        let mut merged: SmallVec<[(&Arc<AnimationClip>, f32); 8]> = SmallVec::new();
        for (clip, &weight) in clips.iter().zip(weights) {
            match merged.iter_mut().find(|entry| Arc::ptr_eq(entry.0, clip)) {
                Some(entry) => entry.1 += weight,
                None => merged.push((clip, weight)),
            }
        }

        let before = self.clips.len();
        self.clips.retain(|info| {
            info.state.layer != DEFAULT_LAYER
                || merged.iter().any(|entry| Arc::ptr_eq(entry.0, &info.clip))
        });
        let mut layout_changed = self.clips.len() != before;

        for (clip, weight) in merged {
            match self.find(clip, DEFAULT_LAYER) {
                Some(index) => {
                    let state = &mut self.clips[index].state;
                    if state.stopped {
                        state.stopped = false;
                        layout_changed = true;
                    }
                    state.weight = weight;
                    state.fade = None;
                }
                None => {
                    let mut state = self.new_state(DEFAULT_LAYER);
                    state.weight = weight;
                    self.clips.push(AnimationClipInfo {
                        clip: Arc::clone(clip),
                        state,
                    });
                    layout_changed = true;
                }
            }
        }

        self.sample_step = SampleStep::None;
        self.dirty.mark(if layout_changed {
            DirtyFlags::STRUCTURAL | DirtyFlags::VALUE
        } else {
            DirtyFlags::VALUE
        });
    }

    /// Stops every state playing `clip`, on any layer.
    pub fn stop(&mut self, clip: &Arc<AnimationClip>) {
        let mut found = false;
        for info in self.clips.iter_mut().filter(|i| Arc::ptr_eq(&i.clip, clip)) {
            info.state.stopped = true;
            info.state.fade = None;
            found = true;
        }
        if found {
            self.dirty.mark(DirtyFlags::STRUCTURAL);
        }
    }

    pub fn stop_all(&mut self) {
        for info in &mut self.clips {
            info.state.stopped = true;
            info.state.fade = None;
        }
        self.dirty.mark(DirtyFlags::STRUCTURAL);
    }

    #[must_use]
    pub fn is_playing(&self, clip: &Arc<AnimationClip>) -> bool {
        self.clips
            .iter()
            .any(|info| Arc::ptr_eq(&info.clip, clip) && !info.state.stopped)
    }

    #[inline]
    #[must_use]
    pub fn clip(&self, index: usize) -> Option<&AnimationClipInfo> {
        self.clips.get(index)
    }

    #[inline]
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    #[inline]
    #[must_use]
    pub fn clips(&self) -> &[AnimationClipInfo] {
        &self.clips
    }

    /// State of the first record playing `clip`.
    #[must_use]
    pub fn state(&self, clip: &Arc<AnimationClip>) -> Option<&AnimationState> {
        self.clips
            .iter()
            .find(|info| Arc::ptr_eq(&info.clip, clip))
            .map(|info| &info.state)
    }

    pub fn set_clip_weight(&mut self, clip: &Arc<AnimationClip>, weight: f32) {
        self.update_states(clip, |state| {
            state.weight = weight.max(0.0);
            state.fade = None;
        });
    }

    pub fn set_clip_speed(&mut self, clip: &Arc<AnimationClip>, speed: f32) {
        self.update_states(clip, |state| state.speed = speed);
    }

    pub fn set_clip_time(&mut self, clip: &Arc<AnimationClip>, time: f32) {
        let length = clip.duration.max(0.0);
        self.update_states(clip, |state| {
            state.time = match state.wrap_mode {
                WrapMode::Loop if length > 0.0 => time.rem_euclid(length),
                _ => time.clamp(0.0, length),
            };
        });
    }

    pub fn set_layer_blend_mode(&mut self, layer: LayerId, mode: LayerBlendMode) {
        self.layer_modes.insert(layer, mode);
        self.dirty.mark(DirtyFlags::LAYOUT);
    }

    #[must_use]
    pub fn layer_blend_mode(&self, layer: LayerId) -> LayerBlendMode {
        self.layer_modes.get(&layer).copied().unwrap_or_default()
    }

    fn update_states(
        &mut self,
        clip: &Arc<AnimationClip>,
        mut apply: impl FnMut(&mut AnimationState),
    ) {
        let mut found = false;
        for info in self.clips.iter_mut().filter(|i| Arc::ptr_eq(&i.clip, clip)) {
            apply(&mut info.state);
            found = true;
        }
        if found {
            self.dirty.mark(DirtyFlags::VALUE);
        }
    }

    fn find(&self, clip: &Arc<AnimationClip>, layer: LayerId) -> Option<usize> {
        self.clips.iter().position(|info| info.is(clip, layer))
    }

    fn new_state(&self, layer: LayerId) -> AnimationState {
        AnimationState::new(layer, self.default_speed, self.default_wrap_mode)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn set_skeleton(&mut self, skeleton: Option<Arc<Skeleton>>) {
        self.skeleton = skeleton;
        self.dirty.mark(DirtyFlags::ALL);
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.skeleton.as_ref()
    }

    pub fn set_mask(&mut self, mask: Option<Arc<SkeletonMask>>) {
        self.mask = mask;
        self.dirty.mark(DirtyFlags::LAYOUT);
    }

    #[inline]
    #[must_use]
    pub fn mask(&self) -> Option<&Arc<SkeletonMask>> {
        self.mask.as_ref()
    }

    /// Sets the wrap mode of new and existing states. Stopped states stay
    /// stopped.
    pub fn set_wrap_mode(&mut self, wrap_mode: WrapMode) {
        self.default_wrap_mode = wrap_mode;
        for info in &mut self.clips {
            info.state.wrap_mode = wrap_mode;
        }
        self.dirty.mark(DirtyFlags::VALUE);
    }

    #[inline]
    #[must_use]
    pub fn wrap_mode(&self) -> WrapMode {
        self.default_wrap_mode
    }

    /// Sets the speed of new and existing states. Stopped states stay
    /// stopped.
    pub fn set_speed(&mut self, speed: f32) {
        self.default_speed = speed;
        for info in &mut self.clips {
            info.state.speed = speed;
        }
        self.dirty.mark(DirtyFlags::VALUE);
    }

    #[inline]
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.default_speed
    }

    /// World-space bounds used for frustum culling.
    pub fn set_bounds(&mut self, bounds: BoundingBox) {
        self.bounds = bounds;
        self.dirty.mark(DirtyFlags::CULLING);
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn set_culling(&mut self, enabled: bool) {
        self.culling = enabled;
        self.dirty.mark(DirtyFlags::CULLING);
    }

    #[inline]
    #[must_use]
    pub fn culling(&self) -> bool {
        self.culling
    }

    /// Whether the last evaluated tick skipped this animation as invisible.
    #[inline]
    #[must_use]
    pub fn is_culled(&self) -> bool {
        self.culled
    }

    #[inline]
    #[must_use]
    pub fn sample_step(&self) -> SampleStep {
        self.sample_step
    }

    #[inline]
    #[must_use]
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty.pending()
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    // ========================================================================
    // Scene objects and generic curves
    // ========================================================================

    /// Drives `object` with the transform curves named `curve`.
    pub fn map_curve_to_scene_object(&mut self, curve: impl Into<String>, object: SceneObjectId) {
        self.scene_object_curves.insert(object, curve.into());
        self.dirty.mark(DirtyFlags::ALL);
    }

    pub fn unmap_scene_object(&mut self, object: SceneObjectId) {
        self.scene_object_curves.remove(&object);
        self.scene_object_poses.remove(&object);
        self.dirty.mark(DirtyFlags::ALL);
    }

    /// Pose applied to `object` on the last evaluated tick.
    #[must_use]
    pub fn scene_object_pose(&self, object: SceneObjectId) -> Option<&SceneObjectPose> {
        self.scene_object_poses.get(&object)
    }

    /// Last evaluated value of the generic curve at `index`.
    #[must_use]
    pub fn generic_curve_value(&self, index: usize) -> Option<f32> {
        self.generic_values.as_ref()?.get(index).copied()
    }

    #[inline]
    #[must_use]
    pub fn proxy(&self) -> &AnimationProxy {
        &self.proxy
    }

    #[inline]
    pub(crate) fn proxy_mut(&mut self) -> &mut AnimationProxy {
        &mut self.proxy
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advances playback by `dt` seconds and refreshes the proxy.
    ///
    /// Returns `true` when the proxy has at least one state to evaluate.
    pub fn update_anim_proxy(&mut self, dt: f32) -> bool {
        self.advance(dt);

        let flags = self.dirty.take();
        let rebuild = flags.intersects(DirtyFlags::STRUCTURAL) || !self.proxy.is_built();
        if rebuild {
            self.proxy.rebuild(
                &self.clips,
                &self.layer_modes,
                self.skeleton.as_ref(),
                self.mask.as_ref(),
                &self.scene_object_curves,
            );
        }
        if rebuild || flags.contains(DirtyFlags::CULLING) {
            self.proxy.bounds = self.bounds;
            self.proxy.culling_enabled = self.culling;
        }
        self.proxy.sample_step = self.sample_step;
        self.proxy.culled = false;
        self.proxy.sync_values(&self.clips);

        !self.proxy.is_empty()
    }

    /// Drops pending changes without touching the proxy.
    pub(crate) fn discard_changes(&mut self) {
        let _ = self.dirty.take();
    }

    fn advance(&mut self, dt: f32) {
        let sampling = self.sample_step != SampleStep::None;
        let mut faded_out: SmallVec<[usize; 4]> = SmallVec::new();

        for (index, info) in self.clips.iter_mut().enumerate() {
            let state = &mut info.state;
            if state.stopped {
                continue;
            }
            if !sampling {
                state.advance_time(dt, &info.clip, &mut self.pending_events);
            }
            if state.advance_fade(dt) {
                faded_out.push(index);
            }
        }

        if !faded_out.is_empty() {
            for index in faded_out.into_iter().rev() {
                let info = self.clips.remove(index);
                log::trace!("Animation {:?}: '{}' faded out", self.id, info.clip.name);
            }
            self.dirty.mark(DirtyFlags::LAYOUT);
        }
    }

    /// Pulls evaluated scene-object poses and generic values out of the
    /// proxy. Does nothing when the proxy was not evaluated this tick.
    pub fn update_from_proxy(&mut self) {
        self.culled = self.proxy.culled;
        if !std::mem::take(&mut self.proxy.fresh) {
            return;
        }

        self.scene_object_poses.clear();
        for (index, object) in self.proxy.scene_objects.iter().enumerate() {
            if let Some(pose) = self.proxy.object_poses.get(index) {
                self.scene_object_poses.insert(*object, pose);
            }
        }

        self.generic_values
            .get_or_insert_with(Vec::new)
            .clone_from(&self.proxy.generic_values);

        if self.sample_step == SampleStep::Frame {
            self.sample_step = SampleStep::Done;
        }
    }

    /// Moves events crossed during the last time advance to the outbox read
    /// by [`drain_events`](Self::drain_events).
    pub fn fire_events(&mut self) {
        for event in &self.pending_events {
            log::trace!(
                "Animation {:?}: event '{}' of '{}' at {:.3}s",
                self.id,
                event.name,
                event.clip,
                event.time
            );
        }
        self.fired_events.append(&mut self.pending_events);
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, AnimationEvent> {
        self.fired_events.drain(..)
    }
}
