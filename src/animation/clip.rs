use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::tracks::KeyframeTrack;

/// Position/rotation/scale curves driving one named target (a bone or a
/// mapped scene object). Any component may be absent.
#[derive(Debug, Clone, Default)]
pub struct TransformCurves {
    pub target: String,
    pub position: Option<KeyframeTrack<Vec3>>,
    pub rotation: Option<KeyframeTrack<Quat>>,
    pub scale: Option<KeyframeTrack<Vec3>>,
}

/// One sample of a [`TransformCurves`] set. Components without a curve are
/// `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformSample {
    pub position: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
}

impl TransformCurves {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_position(mut self, track: KeyframeTrack<Vec3>) -> Self {
        self.position = Some(track);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, track: KeyframeTrack<Quat>) -> Self {
        self.rotation = Some(track);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, track: KeyframeTrack<Vec3>) -> Self {
        self.scale = Some(track);
        self
    }

    #[must_use]
    pub fn evaluate(&self, time: f32, looped: bool) -> TransformSample {
        TransformSample {
            position: self.position.as_ref().and_then(|t| t.evaluate(time, looped)),
            rotation: self.rotation.as_ref().and_then(|t| t.evaluate(time, looped)),
            scale: self.scale.as_ref().and_then(|t| t.evaluate(time, looped)),
        }
    }

    fn end_time(&self) -> f32 {
        [
            self.position.as_ref().map(KeyframeTrack::end_time),
            self.rotation.as_ref().map(KeyframeTrack::end_time),
            self.scale.as_ref().map(KeyframeTrack::end_time),
        ]
        .into_iter()
        .flatten()
        .fold(0.0_f32, f32::max)
    }
}

/// A scalar curve bound to an arbitrary property rather than a transform.
#[derive(Debug, Clone)]
pub struct GenericCurve {
    pub name: String,
    pub track: KeyframeTrack<f32>,
}

/// A named marker on the clip timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipEvent {
    pub time: f32,
    pub name: String,
}

/// Immutable curve set shared by every animation playing it.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub transform_curves: Vec<TransformCurves>,
    pub generic_curves: Vec<GenericCurve>,
    /// Sorted by time.
    pub events: Vec<ClipEvent>,
    target_index: FxHashMap<String, usize>,
}

impl AnimationClip {
    /// Builds a clip whose duration is the latest keyframe across all curves.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        transform_curves: Vec<TransformCurves>,
        generic_curves: Vec<GenericCurve>,
    ) -> Self {
        let duration = transform_curves
            .iter()
            .map(TransformCurves::end_time)
            .chain(generic_curves.iter().map(|c| c.track.end_time()))
            .fold(0.0_f32, f32::max);

        let mut target_index = FxHashMap::default();
        for (i, curves) in transform_curves.iter().enumerate() {
            // First definition of a target wins.
            target_index.entry(curves.target.clone()).or_insert(i);
        }

        Self {
            name: name.into(),
            duration,
            transform_curves,
            generic_curves,
            events: Vec::new(),
            target_index,
        }
    }

    /// Overrides the computed duration.
    #[must_use]
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    #[must_use]
    pub fn with_events(mut self, mut events: Vec<ClipEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.events = events;
        self
    }

    /// Index of the transform curves targeting `name`.
    #[inline]
    #[must_use]
    pub fn find_transform_curves(&self, name: &str) -> Option<usize> {
        self.target_index.get(name).copied()
    }

    #[must_use]
    pub fn find_generic_curve(&self, name: &str) -> Option<usize> {
        self.generic_curves.iter().position(|c| c.name == name)
    }
}
