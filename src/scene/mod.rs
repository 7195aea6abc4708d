//! Scene-side collaborators of the animation runtime.
//!
//! The animation runtime does not own a scene graph. It only needs:
//!
//! - [`BoundingBox`]: world-space bounds used for visibility culling
//! - [`CullCamera`] / [`Frustum`]: the cameras that decide visibility
//! - [`SceneObjectId`] / [`SceneObjectPose`]: stable ids for curve-driven
//!   child objects and the pose overrides computed for them

pub mod bounds;
pub mod camera;
pub mod object;

pub use bounds::BoundingBox;
pub use camera::{CullCamera, Frustum, RenderMode};
pub use object::{PoseOverride, SceneObjectId, SceneObjectPose};
