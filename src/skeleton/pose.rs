//! Layered pose composition.
//!
//! Each bone starts from its bind-local transform and folds every layer in
//! order:
//!
//! - **Normalized** layers blend their states with weights normalized to 1
//!   per transform component, then mix the result over the running pose by
//!   the layer's coverage (`min(total weight, 1)`). A single full-weight
//!   state therefore replaces the pose outright.
//! - **Additive** layers add each state's weighted delta from the reference
//!   transform on top of the running pose.
//!
//! A state without curves for a target contributes nothing to it.

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::animation::clip::{TransformCurves, TransformSample};
use crate::animation::state::{AnimationStateLayer, LayerBlendMode, ProxyState};
use crate::errors::{AnimationError, Result};
use crate::scene::PoseOverride;
use crate::skeleton::{BoneTransform, Skeleton, SkeletonMask};

/// Folds all layers over `base` for one target.
///
/// `curves_for` selects the curves driving this target in a state. Returns
/// the resulting local transform and the components any state touched.
pub(crate) fn accumulate_layers<F>(
    base: BoneTransform,
    layers: &[AnimationStateLayer],
    mut curves_for: F,
) -> (BoneTransform, PoseOverride)
where
    F: FnMut(&ProxyState) -> Option<&TransformCurves>,
{
    let mut pose = base;
    let mut touched = PoseOverride::empty();

    for layer in layers {
        match layer.blend_mode {
            LayerBlendMode::Normalized => {
                touched |= blend_normalized(&mut pose, layer, &mut curves_for);
            }
            LayerBlendMode::Additive => {
                for state in &layer.states {
                    if state.weight <= 0.0 {
                        continue;
                    }
                    let Some(curves) = curves_for(state) else {
                        continue;
                    };
                    let sample = curves.evaluate(state.time, state.looped);
                    touched |= apply_additive(&mut pose, &base, &sample, state.weight);
                }
            }
        }
    }

    (pose, touched)
}

fn blend_normalized<F>(
    pose: &mut BoneTransform,
    layer: &AnimationStateLayer,
    curves_for: &mut F,
) -> PoseOverride
where
    F: FnMut(&ProxyState) -> Option<&TransformCurves>,
{
    let mut position_sum = Vec3::ZERO;
    let mut position_weight = 0.0;
    let mut rotation_sum = Vec4::ZERO;
    let mut rotation_weight = 0.0;
    let mut rotation_reference: Option<Quat> = None;
    let mut scale_sum = Vec3::ZERO;
    let mut scale_weight = 0.0;

    for state in &layer.states {
        let weight = state.weight;
        if weight <= 0.0 {
            continue;
        }
        let Some(curves) = curves_for(state) else {
            continue;
        };
        let sample = curves.evaluate(state.time, state.looped);

        if let Some(position) = sample.position {
            position_sum += position * weight;
            position_weight += weight;
        }
        if let Some(rotation) = sample.rotation {
            // Keep every contribution in the same hemisphere as the first.
            let reference = *rotation_reference.get_or_insert(rotation);
            let aligned = if reference.dot(rotation) < 0.0 {
                -rotation
            } else {
                rotation
            };
            rotation_sum += Vec4::from(aligned) * weight;
            rotation_weight += weight;
        }
        if let Some(scale) = sample.scale {
            scale_sum += scale * weight;
            scale_weight += weight;
        }
    }

    let mut touched = PoseOverride::empty();
    if position_weight > 0.0 {
        let blended = position_sum / position_weight;
        pose.position = mix_vec3(pose.position, blended, position_weight);
        touched |= PoseOverride::POSITION;
    }
    if rotation_weight > 0.0 {
        let blended = Quat::from_vec4(rotation_sum / rotation_weight).normalize();
        pose.rotation = if rotation_weight >= 1.0 {
            blended
        } else {
            pose.rotation.slerp(blended, rotation_weight)
        };
        touched |= PoseOverride::ROTATION;
    }
    if scale_weight > 0.0 {
        let blended = scale_sum / scale_weight;
        pose.scale = mix_vec3(pose.scale, blended, scale_weight);
        touched |= PoseOverride::SCALE;
    }
    touched
}

#[inline]
fn mix_vec3(current: Vec3, blended: Vec3, coverage: f32) -> Vec3 {
    if coverage >= 1.0 {
        blended
    } else {
        current.lerp(blended, coverage)
    }
}

fn apply_additive(
    pose: &mut BoneTransform,
    reference: &BoneTransform,
    sample: &TransformSample,
    weight: f32,
) -> PoseOverride {
    let mut touched = PoseOverride::empty();
    if let Some(position) = sample.position {
        pose.position += (position - reference.position) * weight;
        touched |= PoseOverride::POSITION;
    }
    if let Some(rotation) = sample.rotation {
        let delta = reference.rotation.inverse() * rotation;
        pose.rotation = (pose.rotation * Quat::IDENTITY.slerp(delta, weight)).normalize();
        touched |= PoseOverride::ROTATION;
    }
    if let Some(scale) = sample.scale {
        let ratio = Vec3::new(
            safe_ratio(scale.x, reference.scale.x),
            safe_ratio(scale.y, reference.scale.y),
            safe_ratio(scale.z, reference.scale.z),
        );
        pose.scale *= Vec3::ONE.lerp(ratio, weight);
        touched |= PoseOverride::SCALE;
    }
    touched
}

#[inline]
fn safe_ratio(value: f32, reference: f32) -> f32 {
    if reference.abs() > f32::EPSILON {
        value / reference
    } else {
        1.0
    }
}

impl Skeleton {
    /// Evaluates `layers` for every bone.
    ///
    /// Bones disabled by `mask` keep their bind-local transform. Local
    /// results go to `out_local`, skeleton-space matrices to `out_world`;
    /// both must hold at least [`bone_count`](Self::bone_count) entries.
    pub fn get_pose(
        &self,
        out_world: &mut [Mat4],
        out_local: &mut [BoneTransform],
        mask: Option<&SkeletonMask>,
        layers: &[AnimationStateLayer],
    ) -> Result<()> {
        let count = self.bone_count();
        if out_world.len() < count {
            return Err(AnimationError::BufferTooSmall {
                context: "world pose",
                required: count,
                actual: out_world.len(),
            });
        }
        if out_local.len() < count {
            return Err(AnimationError::BufferTooSmall {
                context: "local pose",
                required: count,
                actual: out_local.len(),
            });
        }

        for (index, bone) in self.bones().iter().enumerate() {
            let local = if mask.is_none_or(|m| m.is_enabled(index)) {
                accumulate_layers(bone.local_bind, layers, |state| state.bone_curves(index)).0
            } else {
                bone.local_bind
            };
            out_local[index] = local;

            let matrix = local.to_mat4();
            out_world[index] = match bone.parent {
                Some(parent) => out_world[parent] * matrix,
                None => matrix,
            };
        }
        Ok(())
    }
}
