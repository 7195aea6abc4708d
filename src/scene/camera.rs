use std::borrow::Cow;

use glam::{Affine3A, Mat4, Vec3, Vec4};

use crate::scene::bounds::BoundingBox;

/// How often a camera renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Renders every frame.
    #[default]
    Continuous,
    /// Renders only when flagged for redraw.
    OnDemand,
}

/// The renderer-facing description of a camera, as far as culling is
/// concerned.
#[derive(Debug, Clone)]
pub struct CullCamera {
    pub name: Cow<'static, str>,
    pub frustum: Frustum,
    pub active: bool,
    /// Overlay cameras draw UI on top of other cameras and never cull.
    pub overlay: bool,
    pub render_mode: RenderMode,
    pub needs_redraw: bool,
}

impl CullCamera {
    #[must_use]
    pub fn new(view_projection: Mat4) -> Self {
        Self {
            name: Cow::Borrowed("Camera"),
            frustum: Frustum::from_matrix(view_projection),
            active: true,
            overlay: false,
            render_mode: RenderMode::Continuous,
            needs_redraw: false,
        }
    }

    /// Perspective camera placed at `world_transform`, looking down -Z.
    #[must_use]
    pub fn perspective(
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
        world_transform: &Affine3A,
    ) -> Self {
        let projection = Mat4::perspective_rh(fov_degrees.to_radians(), aspect, near, far);
        let view = Mat4::from(*world_transform).inverse();
        Self::new(projection * view)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether this camera's frustum takes part in animation culling this
    /// tick.
    #[must_use]
    pub fn is_due(&self) -> bool {
        if !self.active || self.overlay {
            return false;
        }
        match self.render_mode {
            RenderMode::Continuous => true,
            RenderMode::OnDemand => self.needs_redraw,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Extracts the planes of a view-projection matrix with a `[0, 1]` depth
    /// range (Gribb-Hartmann).
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[2],
            rows[3] - rows[2],
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }

    /// Conservative box test: rejects a box only if it lies entirely behind
    /// one plane.
    #[must_use]
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            // The corner furthest along the plane normal.
            let positive = Vec3::select(normal.cmpge(Vec3::ZERO), bounds.max, bounds.min);
            normal.dot(positive) + plane.w >= 0.0
        })
    }
}
