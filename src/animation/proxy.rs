//! Evaluation-side snapshot of an [`Animation`](super::Animation).
//!
//! The proxy flattens the animation's playing states into per-layer arrays,
//! resolves which curves drive which bone or scene object, and owns the
//! buffers evaluation writes into. It is rebuilt only when the animation
//! reports a structural change; per-state time and weight are re-synced
//! every tick.
//!
//! During evaluation a proxy touches nothing but its own fields and the
//! slice of the shared output buffer it was handed, so proxies can be
//! evaluated independently of each other.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::state::{
    AnimationClipInfo, AnimationStateLayer, LayerBlendMode, LayerId, ProxyState, SampleStep,
};
use crate::scene::{BoundingBox, Frustum, PoseOverride, SceneObjectId, SceneObjectPose};
use crate::skeleton::pose::accumulate_layers;
use crate::skeleton::{BoneTransform, Skeleton, SkeletonMask};

/// Poses of curve-mapped scene objects, one entry per mapped object.
#[derive(Debug, Clone, Default)]
pub struct SceneObjectPoses {
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub scales: Vec<Vec3>,
    pub overrides: Vec<PoseOverride>,
}

impl SceneObjectPoses {
    fn resize(&mut self, len: usize) {
        self.positions.resize(len, Vec3::ZERO);
        self.rotations.resize(len, Quat::IDENTITY);
        self.scales.resize(len, Vec3::ONE);
        self.overrides.resize(len, PoseOverride::empty());
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<SceneObjectPose> {
        Some(SceneObjectPose {
            position: *self.positions.get(index)?,
            rotation: *self.rotations.get(index)?,
            scale: *self.scales.get(index)?,
            overrides: *self.overrides.get(index)?,
        })
    }

    fn set(&mut self, index: usize, transform: &BoneTransform, overrides: PoseOverride) {
        // Components without curves keep their defaults.
        self.positions[index] = if overrides.contains(PoseOverride::POSITION) {
            transform.position
        } else {
            Vec3::ZERO
        };
        self.rotations[index] = if overrides.contains(PoseOverride::ROTATION) {
            transform.rotation
        } else {
            Quat::IDENTITY
        };
        self.scales[index] = if overrides.contains(PoseOverride::SCALE) {
            transform.scale
        } else {
            Vec3::ONE
        };
        self.overrides[index] = overrides;
    }
}

#[derive(Debug, Default)]
pub struct AnimationProxy {
    pub(crate) layers: Vec<AnimationStateLayer>,
    pub(crate) skeleton: Option<Arc<Skeleton>>,
    pub(crate) mask: Option<Arc<SkeletonMask>>,
    pub(crate) scene_objects: Vec<SceneObjectId>,
    pub(crate) object_poses: SceneObjectPoses,
    pub(crate) local_pose: Vec<BoneTransform>,
    /// World pose kept for one-shot samples.
    pub(crate) cached_pose: Vec<Mat4>,
    pub(crate) generic_values: Vec<f32>,
    pub(crate) bounds: BoundingBox,
    pub(crate) culling_enabled: bool,
    pub(crate) culled: bool,
    pub(crate) sample_step: SampleStep,
    /// Set by `evaluate`, consumed when results are pushed back.
    pub(crate) fresh: bool,
    evaluated: bool,
    built: bool,
}

impl AnimationProxy {
    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[AnimationStateLayer] {
        &self.layers
    }

    #[inline]
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.states.is_empty())
    }

    #[inline]
    #[must_use]
    pub fn is_culled(&self) -> bool {
        self.culled
    }

    /// Bones this proxy writes when evaluated.
    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.skeleton.as_ref().map_or(0, |s| s.bone_count())
    }

    #[inline]
    #[must_use]
    pub fn local_pose(&self) -> &[BoneTransform] {
        &self.local_pose
    }

    #[inline]
    #[must_use]
    pub fn scene_object_poses(&self) -> &SceneObjectPoses {
        &self.object_poses
    }

    /// Rebuilds the flattened layer arrays and curve lookup tables.
    pub(crate) fn rebuild(
        &mut self,
        clips: &[AnimationClipInfo],
        layer_modes: &BTreeMap<LayerId, LayerBlendMode>,
        skeleton: Option<&Arc<Skeleton>>,
        mask: Option<&Arc<SkeletonMask>>,
        scene_object_curves: &FxHashMap<SceneObjectId, String>,
    ) {
        self.skeleton = skeleton.cloned();
        self.mask = match (mask, skeleton) {
            (Some(mask), Some(skeleton)) => match mask.check_compatible(skeleton) {
                Ok(()) => Some(Arc::clone(mask)),
                Err(err) => {
                    log::warn!("Ignoring skeleton mask for '{}': {err}", skeleton.name);
                    None
                }
            },
            _ => None,
        };

        let mut objects: Vec<(&SceneObjectId, &String)> = scene_object_curves.iter().collect();
        objects.sort_unstable_by_key(|(id, _)| **id);
        self.scene_objects = objects.iter().map(|(id, _)| **id).collect();
        self.object_poses.resize(self.scene_objects.len());

        let mut grouped: BTreeMap<LayerId, Vec<ProxyState>> = BTreeMap::new();
        for (source, info) in clips.iter().enumerate() {
            if info.state.stopped {
                continue;
            }
            let clip = &info.clip;
            let mut state = ProxyState::new(Arc::clone(clip), source);
            if let Some(skeleton) = skeleton {
                state.bone_curves = skeleton
                    .bones()
                    .iter()
                    .map(|bone| clip.find_transform_curves(&bone.name))
                    .collect();
            }
            state.object_curves = objects
                .iter()
                .map(|(_, curve)| clip.find_transform_curves(curve))
                .collect();
            grouped.entry(info.state.layer).or_default().push(state);
        }

        self.layers = grouped
            .into_iter()
            .map(|(id, states)| AnimationStateLayer {
                id,
                blend_mode: layer_modes.get(&id).copied().unwrap_or_default(),
                states,
            })
            .collect();

        let generic_count = self
            .layers
            .first()
            .and_then(|layer| layer.states.first())
            .map_or(0, |state| state.clip.generic_curves.len());
        self.generic_values.clear();
        self.generic_values.resize(generic_count, 0.0);

        self.evaluated = false;
        self.built = true;
        log::debug!(
            "Rebuilt animation proxy: {} layer(s), {} scene object(s)",
            self.layers.len(),
            self.scene_objects.len()
        );
    }

    /// Copies per-state playback values from the animation.
    pub(crate) fn sync_values(&mut self, clips: &[AnimationClipInfo]) {
        for state in self.layers.iter_mut().flat_map(|l| l.states.iter_mut()) {
            if let Some(info) = clips.get(state.source) {
                state.time = info.state.time;
                state.weight = info.state.weight;
                state.looped = info.state.looped();
            }
        }
    }

    /// Visible when culling is off or the bounds touch any frustum.
    #[must_use]
    pub fn is_visible(&self, frustums: &[Frustum]) -> bool {
        !self.culling_enabled || frustums.iter().any(|f| f.intersects_box(&self.bounds))
    }

    /// Evaluates bones into `out`, then scene objects and generic curves.
    /// Returns the number of bone matrices written.
    pub(crate) fn evaluate(&mut self, out: &mut [Mat4]) -> usize {
        if self.sample_step == SampleStep::Done && self.evaluated {
            let count = self.cached_pose.len().min(out.len());
            out[..count].copy_from_slice(&self.cached_pose[..count]);
            self.fresh = true;
            return count;
        }

        let written = self.evaluate_skeleton(out);
        self.evaluate_scene_objects();
        self.evaluate_generic_curves();

        if self.sample_step == SampleStep::Frame {
            self.cached_pose.clear();
            self.cached_pose.extend_from_slice(&out[..written]);
        }
        self.evaluated = true;
        self.fresh = true;
        written
    }

    fn evaluate_skeleton(&mut self, out: &mut [Mat4]) -> usize {
        let Some(skeleton) = self.skeleton.as_ref() else {
            return 0;
        };
        let count = skeleton.bone_count();
        self.local_pose.resize(count, BoneTransform::IDENTITY);
        match skeleton.get_pose(out, &mut self.local_pose, self.mask.as_deref(), &self.layers) {
            Ok(()) => count,
            Err(err) => {
                log::warn!("Skipping pose of '{}': {err}", skeleton.name);
                0
            }
        }
    }

    fn evaluate_scene_objects(&mut self) {
        for index in 0..self.scene_objects.len() {
            let (transform, overrides) = accumulate_layers(
                BoneTransform::IDENTITY,
                &self.layers,
                |state| state.object_curves(index),
            );
            self.object_poses.set(index, &transform, overrides);
        }
    }

    /// Generic curves come from the first state of the first layer only;
    /// they are not blended across states or layers.
    fn evaluate_generic_curves(&mut self) {
        let Some(state) = self.layers.first().and_then(|layer| layer.states.first()) else {
            return;
        };
        for (value, curve) in self.generic_values.iter_mut().zip(&state.clip.generic_curves) {
            *value = curve.track.evaluate(state.time, state.looped).unwrap_or(0.0);
        }
    }
}
