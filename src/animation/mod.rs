//! Animation Module
//!
//! Keyframe curves, clips, per-entity playback and the per-tick evaluation
//! pipeline.
//!
//! - [`KeyframeTrack`] / [`AnimationClip`]: immutable, shareable curve data
//! - [`Animation`]: plays clips on layers, owns its [`AnimationProxy`]
//! - [`AnimationManager`]: registry that evaluates every animation into one
//!   [`AnimationOutput`] buffer per tick

pub mod blend;
pub mod clip;
pub mod dirty;
pub mod manager;
pub mod output;
pub mod player;
pub mod proxy;
pub mod state;
pub mod tracks;
pub mod values;

pub use blend::{BlendSpace1D, BlendSpace2D};
pub use clip::{AnimationClip, ClipEvent, GenericCurve, TransformCurves, TransformSample};
pub use dirty::{DirtyFlags, DirtyTracker};
pub use manager::{AnimationHandle, AnimationManager, UpdateStats};
pub use output::{AnimationOutput, BoneRange};
pub use player::{Animation, AnimationId};
pub use proxy::{AnimationProxy, SceneObjectPoses};
pub use state::{
    AnimationClipInfo, AnimationEvent, AnimationState, AnimationStateLayer, DEFAULT_LAYER,
    LayerBlendMode, LayerId, ProxyState, SampleStep, WeightFade, WrapMode,
};
pub use tracks::{InterpolationMode, KeyframeTrack};
