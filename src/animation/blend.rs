//! Parameterized blend spaces.
//!
//! A blend space maps a 1-D or 2-D control value to a set of clip weights.
//! [`Animation::blend_1d`](crate::animation::Animation::blend_1d) and
//! [`Animation::blend_2d`](crate::animation::Animation::blend_2d) apply those
//! weights to states on the default layer.

use std::sync::Arc;

use glam::Vec2;

use crate::animation::clip::AnimationClip;
use crate::errors::{AnimationError, Result};

/// Locates `value` on a sorted axis. Returns the two bracketing indices and
/// the fractional position between them, clamped to the axis ends. NaN
/// resolves to the first entry.
fn bracket(axis: &[f32], value: f32) -> (usize, usize, f32) {
    let last = axis.len() - 1;
    if value.is_nan() || value <= axis[0] {
        return (0, 0, 0.0);
    }
    if value >= axis[last] {
        return (last, last, 0.0);
    }
    let upper = axis.partition_point(|&p| p <= value).min(last);
    let lower = upper - 1;
    let span = axis[upper] - axis[lower];
    let t = if span > f32::EPSILON {
        (value - axis[lower]) / span
    } else {
        0.0
    };
    (lower, upper, t)
}

/// Weights for a sorted 1-D parameter list. At most two entries are
/// non-zero and the weights always sum to 1.
///
/// Returns an empty vector for an empty parameter list.
#[must_use]
pub fn blend_1d_weights(params: &[f32], value: f32) -> Vec<f32> {
    let mut weights = vec![0.0; params.len()];
    if params.is_empty() {
        return weights;
    }
    let (lower, upper, t) = bracket(params, value);
    weights[lower] += 1.0 - t;
    weights[upper] += t;
    weights
}

/// Bilinear weights over a row-major grid with `xs.len()` columns and
/// `ys.len()` rows.
#[must_use]
pub fn blend_2d_weights(xs: &[f32], ys: &[f32], value: Vec2) -> Vec<f32> {
    let mut weights = vec![0.0; xs.len() * ys.len()];
    if weights.is_empty() {
        return weights;
    }
    let columns = xs.len();
    let (x0, x1, fx) = bracket(xs, value.x);
    let (y0, y1, fy) = bracket(ys, value.y);
    weights[y0 * columns + x0] += (1.0 - fx) * (1.0 - fy);
    weights[y0 * columns + x1] += fx * (1.0 - fy);
    weights[y1 * columns + x0] += (1.0 - fx) * fy;
    weights[y1 * columns + x1] += fx * fy;
    weights
}

fn validate_axis(axis: &[f32], label: &str) -> Result<()> {
    if axis.is_empty() {
        return Err(AnimationError::InvalidBlendSpace(format!(
            "{label} has no parameters"
        )));
    }
    if axis.iter().any(|p| !p.is_finite()) {
        return Err(AnimationError::InvalidBlendSpace(format!(
            "{label} contains a non-finite parameter"
        )));
    }
    Ok(())
}

/// Clips placed along a single parameter axis.
#[derive(Debug, Clone)]
pub struct BlendSpace1D {
    clips: Vec<Arc<AnimationClip>>,
    params: Vec<f32>,
}

impl BlendSpace1D {
    /// Builds a blend space from `(clip, parameter)` pairs in any order.
    pub fn new(entries: Vec<(Arc<AnimationClip>, f32)>) -> Result<Self> {
        let mut entries = entries;
        entries.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (clips, params): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        validate_axis(&params, "1D blend space")?;
        Ok(Self { clips, params })
    }

    #[inline]
    #[must_use]
    pub fn clips(&self) -> &[Arc<AnimationClip>] {
        &self.clips
    }

    /// Sorted parameters, parallel to [`clips`](Self::clips).
    #[inline]
    #[must_use]
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    #[must_use]
    pub fn weights(&self, value: f32) -> Vec<f32> {
        blend_1d_weights(&self.params, value)
    }
}

/// Clips placed on a rectangular parameter grid.
#[derive(Debug, Clone)]
pub struct BlendSpace2D {
    xs: Vec<f32>,
    ys: Vec<f32>,
    /// Row-major: `clips[row * xs.len() + column]`.
    clips: Vec<Arc<AnimationClip>>,
}

impl BlendSpace2D {
    /// `xs` and `ys` must be sorted ascending; `clips` is row-major.
    pub fn new(xs: Vec<f32>, ys: Vec<f32>, clips: Vec<Arc<AnimationClip>>) -> Result<Self> {
        validate_axis(&xs, "2D blend space x axis")?;
        validate_axis(&ys, "2D blend space y axis")?;
        if xs.windows(2).any(|w| w[0] > w[1]) || ys.windows(2).any(|w| w[0] > w[1]) {
            return Err(AnimationError::InvalidBlendSpace(
                "grid axes must be sorted ascending".to_string(),
            ));
        }
        if clips.len() != xs.len() * ys.len() {
            return Err(AnimationError::InvalidBlendSpace(format!(
                "expected {} clips for a {}x{} grid, got {}",
                xs.len() * ys.len(),
                xs.len(),
                ys.len(),
                clips.len()
            )));
        }
        Ok(Self { xs, ys, clips })
    }

    #[inline]
    #[must_use]
    pub fn clips(&self) -> &[Arc<AnimationClip>] {
        &self.clips
    }

    #[must_use]
    pub fn weights(&self, value: Vec2) -> Vec<f32> {
        blend_2d_weights(&self.xs, &self.ys, value)
    }
}
