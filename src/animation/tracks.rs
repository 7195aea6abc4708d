use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
    CubicSpline,
}

/// A time-sampled curve.
///
/// `times` must be sorted ascending. For [`InterpolationMode::CubicSpline`]
/// `values` holds `[in_tangent, value, out_tangent]` per keyframe.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// A track holding a single value for all time.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self::new(vec![0.0], vec![value], InterpolationMode::Step)
    }

    /// `true` when the track has no keyframes, or when its value count does
    /// not match its keyframe count for the interpolation mode. Such tracks
    /// never produce a sample.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty() || self.values.len() != self.expected_value_count()
    }

    /// Values required for the current keyframe count.
    #[inline]
    #[must_use]
    pub fn expected_value_count(&self) -> usize {
        match self.interpolation {
            InterpolationMode::CubicSpline => self.times.len() * 3,
            _ => self.times.len(),
        }
    }

    /// Time of the last keyframe, `0.0` for an empty track.
    #[inline]
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Samples the track, clamping outside the keyframe range.
    ///
    /// Returns `None` for an empty track.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // partition_point finds the first keyframe after `time`
        let next_idx = self.times.partition_point(|&t| t <= time);
        let idx = next_idx.saturating_sub(1);
        Some(self.sample_at_frame(idx, time))
    }

    /// Samples the track at `time`, wrapping past the last keyframe when
    /// `looped` is set.
    #[must_use]
    pub fn evaluate(&self, time: f32, looped: bool) -> Option<T> {
        let end = self.end_time();
        if looped && end > 0.0 && (time > end || time < 0.0) {
            return self.sample(time.rem_euclid(end));
        }
        self.sample(time)
    }

    fn value_at(&self, index: usize) -> &T {
        match self.interpolation {
            InterpolationMode::CubicSpline => &self.values[index * 3 + 1],
            _ => &self.values[index],
        }
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.times.len();

        if index >= len - 1 {
            return *self.value_at(len - 1);
        }

        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;

        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Step => *self.value_at(index),
            InterpolationMode::Linear => {
                T::interpolate_linear(self.value_at(index), self.value_at(next_idx), t)
            }
            InterpolationMode::CubicSpline => {
                let i_prev = index * 3;
                let i_next = next_idx * 3;
                T::interpolate_cubic(
                    &self.values[i_prev + 1],
                    &self.values[i_prev + 2],
                    &self.values[i_next],
                    &self.values[i_next + 1],
                    t,
                    dt,
                )
            }
        }
    }
}
