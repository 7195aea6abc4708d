//! Animation Manager
//!
//! Owns every registered [`Animation`], the cameras used for culling, and
//! the shared pose buffer. One call to [`AnimationManager::update`] runs a
//! complete tick:
//!
//! 1. Decide whether this tick executes (pause, master switch, throttle,
//!    pending changes)
//! 2. Advance playback and refresh proxies
//! 3. Collect frustums of cameras rendering this tick
//! 4. Size the output buffer and hand out disjoint bone ranges
//! 5. Cull and evaluate each proxy into its range
//! 6. Push results back and fire clip events
//!
//! ```rust,ignore
//! let mut manager = AnimationManager::new(AnimationSettings::with_update_rate(30.0));
//! let mut animation = manager.create_animation();
//! animation.set_skeleton(Some(skeleton));
//! animation.play(&walk);
//! let handle = manager.register(animation);
//!
//! let output = manager.update(elapsed_seconds);
//! let pose = output.pose(manager.get(handle).unwrap().id());
//! ```

use slotmap::{SlotMap, new_key_type};

use crate::animation::output::{AnimationOutput, BoneRange};
use crate::animation::player::Animation;
use crate::scene::{CullCamera, Frustum};
use crate::settings::AnimationSettings;

new_key_type! {
    pub struct AnimationHandle;
}

/// Counters describing the most recent call to [`AnimationManager::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// `false` when the tick was skipped and the previous output kept.
    pub executed: bool,
    /// Proxies evaluated into the output buffer.
    pub evaluated: usize,
    /// Proxies skipped by frustum culling.
    pub culled: usize,
    /// Bone matrices written.
    pub bones_written: usize,
}

pub struct AnimationManager {
    settings: AnimationSettings,
    animations: SlotMap<AnimationHandle, Animation>,
    /// Registration order, which is also evaluation order.
    order: Vec<AnimationHandle>,
    cameras: Vec<CullCamera>,
    cull_frustums: Vec<Frustum>,
    output: AnimationOutput,
    active: Vec<AnimationHandle>,
    paused: bool,
    dirty: bool,
    last_update_time: f64,
    next_update_time: f64,
    stats: UpdateStats,
}

impl AnimationManager {
    #[must_use]
    pub fn new(settings: AnimationSettings) -> Self {
        Self {
            settings,
            animations: SlotMap::with_key(),
            order: Vec::new(),
            cameras: Vec::new(),
            cull_frustums: Vec::new(),
            output: AnimationOutput::default(),
            active: Vec::new(),
            paused: false,
            dirty: true,
            last_update_time: 0.0,
            next_update_time: 0.0,
            stats: UpdateStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AnimationSettings) {
        self.settings = settings;
        self.dirty = true;
    }

    /// A new, unregistered animation carrying the configured defaults.
    #[must_use]
    pub fn create_animation(&self) -> Animation {
        let mut animation =
            Animation::with_defaults(self.settings.default_speed, self.settings.default_wrap_mode);
        if self.settings.cull_by_default {
            animation.set_culling(true);
        }
        animation
    }

    // ========================================================================
    // Registry
    // ========================================================================

    pub fn register(&mut self, animation: Animation) -> AnimationHandle {
        let id = animation.id();
        let handle = self.animations.insert(animation);
        self.order.push(handle);
        self.dirty = true;
        log::debug!("Registered animation {id:?} ({} total)", self.order.len());
        handle
    }

    /// Removes an animation. Its bone range disappears from the output on
    /// the next evaluated tick.
    pub fn unregister(&mut self, handle: AnimationHandle) -> Option<Animation> {
        let animation = self.animations.remove(handle)?;
        self.order.retain(|h| *h != handle);
        self.dirty = true;
        log::debug!("Unregistered animation {:?}", animation.id());
        Some(animation)
    }

    #[must_use]
    pub fn get(&self, handle: AnimationHandle) -> Option<&Animation> {
        self.animations.get(handle)
    }

    pub fn get_mut(&mut self, handle: AnimationHandle) -> Option<&mut Animation> {
        self.animations.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: AnimationHandle) -> bool {
        self.animations.contains_key(handle)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Registered animations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (AnimationHandle, &Animation)> {
        self.order
            .iter()
            .filter_map(|&h| self.animations.get(h).map(|a| (h, a)))
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// While paused, ticks are skipped and elapsed time is discarded.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_cameras(&mut self, cameras: Vec<CullCamera>) {
        self.cameras = cameras;
        self.dirty = true;
    }

    #[inline]
    #[must_use]
    pub fn cameras(&self) -> &[CullCamera] {
        &self.cameras
    }

    /// Mutable access to the camera list. Forces a refresh on the next tick.
    pub fn cameras_mut(&mut self) -> &mut Vec<CullCamera> {
        self.dirty = true;
        &mut self.cameras
    }

    /// Forces the next tick to execute regardless of throttling.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    #[must_use]
    pub fn output(&self) -> &AnimationOutput {
        &self.output
    }

    #[inline]
    #[must_use]
    pub fn last_stats(&self) -> UpdateStats {
        self.stats
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Runs one tick at accumulated simulation time `time` (seconds).
    ///
    /// Skipped ticks return the previous output unchanged.
    pub fn update(&mut self, time: f64) -> &AnimationOutput {
        self.stats = UpdateStats::default();

        if self.paused || !self.settings.enabled {
            self.last_update_time = time;
            log::trace!("Animation tick at {time:.4}s skipped: paused or disabled");
            return &self.output;
        }

        let forced = self.dirty || self.animations.values().any(Animation::is_dirty);
        if !forced && time < self.next_update_time {
            log::trace!(
                "Animation tick at {time:.4}s throttled until {:.4}s",
                self.next_update_time
            );
            return &self.output;
        }

        let dt = (time - self.last_update_time).max(0.0) as f32;
        self.last_update_time = time;
        self.next_update_time = if self.settings.is_throttled() {
            let rate = f64::from(self.settings.update_interval);
            (time / rate).floor() * rate + rate
        } else {
            time
        };
        self.stats.executed = true;

        // Advance playback and refresh proxies.
        self.active.clear();
        for &handle in &self.order {
            let Some(animation) = self.animations.get_mut(handle) else {
                continue;
            };
            if animation.clip_count() == 0 {
                animation.discard_changes();
                continue;
            }
            if animation.update_anim_proxy(dt) {
                self.active.push(handle);
            }
        }

        self.cull_frustums.clear();
        self.cull_frustums
            .extend(self.cameras.iter().filter(|c| c.is_due()).map(|c| c.frustum));

        let total: usize = self
            .active
            .iter()
            .filter_map(|&h| self.animations.get(h))
            .map(|a| a.proxy().bone_count())
            .sum();
        self.output.begin(total);

        let mut offset = 0;
        for &handle in &self.active {
            let Some(animation) = self.animations.get_mut(handle) else {
                continue;
            };
            let id = animation.id();
            let proxy = animation.proxy_mut();
            let range = BoneRange {
                offset,
                count: proxy.bone_count(),
            };
            offset += range.count;

            if !proxy.is_visible(&self.cull_frustums) {
                proxy.culled = true;
                self.stats.culled += 1;
                continue;
            }

            let written = proxy.evaluate(self.output.slice_mut(range));
            self.stats.evaluated += 1;
            self.stats.bones_written += written;
            if written > 0 {
                self.output.publish(
                    id,
                    BoneRange {
                        offset: range.offset,
                        count: written,
                    },
                );
            }
        }

        // Culled animations still deliver their events.
        for &handle in &self.order {
            if let Some(animation) = self.animations.get_mut(handle) {
                animation.update_from_proxy();
                animation.fire_events();
            }
        }

        self.dirty = false;
        log::trace!(
            "Animation tick at {time:.4}s: {} evaluated, {} culled, {} bones",
            self.stats.evaluated,
            self.stats.culled,
            self.stats.bones_written
        );
        &self.output
    }
}

impl Default for AnimationManager {
    fn default() -> Self {
        Self::new(AnimationSettings::default())
    }
}
