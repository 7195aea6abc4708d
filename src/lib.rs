#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Skeletal and curve animation runtime.
//!
//! Clips of keyframe curves drive skeletons and scene objects through
//! layered, weighted playback states. An [`AnimationManager`] advances every
//! registered [`Animation`], culls it against the active cameras, and packs
//! the resulting poses into one contiguous matrix buffer per tick.

pub mod animation;
pub mod errors;
pub mod scene;
pub mod settings;
pub mod skeleton;

pub use animation::{
    Animation, AnimationClip, AnimationEvent, AnimationHandle, AnimationId, AnimationManager,
    AnimationOutput, BlendSpace1D, BlendSpace2D, InterpolationMode, KeyframeTrack,
    LayerBlendMode, TransformCurves, WrapMode,
};
pub use errors::{AnimationError, Result};
pub use scene::{BoundingBox, CullCamera, Frustum, SceneObjectId};
pub use settings::AnimationSettings;
pub use skeleton::{Bone, BoneTransform, Skeleton, SkeletonMask, SkeletonMaskBuilder};
