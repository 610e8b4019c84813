use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
    CubicSpline,
}

const MAX_SCAN_OFFSET: usize = 3;

/// Remembers the last sampled keyframe interval so that sequential playback
/// samples in O(1) instead of a binary search per frame.
#[derive(Debug, Clone, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>, // For CubicSpline, length is times.len() * 3
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

    /// Last keyframe time, or 0 for an empty track.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// One-shot sampling via binary search.
    #[must_use]
    pub fn sample(&self, time: f32) -> T {
        assert!(!self.times.is_empty(), "Track is empty");

        // partition_point finds the first index where t > time, i.e. next_index
        let next_idx = self.times.partition_point(|&t| t <= time);
        let idx = next_idx.saturating_sub(1);

        self.sample_at_frame(idx, time)
    }

    /// Sampling with a cursor.
    ///
    /// Sequential playback (forward or backward) is resolved by a short
    /// linear scan around the cursor; large jumps (scrubbing, loop reset)
    /// fall back to a global binary search.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> T {
        assert!(!self.times.is_empty(), "Track is empty");

        let len = self.times.len();
        // Fast path: static data (single keyframe)
        if len == 1 {
            return *self.get_value_at(0);
        }

        let i = cursor.last_index;

        // If the cursor is out of bounds (e.g. the clip was switched), fall
        // back to the first frame's time so the scan below self-corrects.
        let t_curr = *self.times.get(i).unwrap_or(&self.times[0]);

        let found_index = if time >= t_curr {
            // Forward playback: scan up to MAX_SCAN_OFFSET intervals ahead
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                let idx = i + offset;
                if idx >= len - 1 {
                    if time >= self.times[len - 1] {
                        res = Some(len - 1); // Clamp to end
                    }
                    break;
                }

                // We know time >= times[i], so only the right boundary of
                // interval [times[idx], times[idx+1]) needs checking.
                if time < self.times[idx + 1] {
                    res = Some(idx);
                    break;
                }
            }
            res
        } else {
            // Backward playback: scan toward the beginning
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                if i < offset {
                    break;
                }
                let idx = i - offset;

                if time >= self.times[idx] {
                    res = Some(idx);
                    break;
                }
            }
            res
        };

        let final_index = if let Some(idx) = found_index {
            cursor.last_index = idx;
            idx
        } else {
            // Large jump: global binary search (O(log N))
            let next_idx = self.times.partition_point(|&t| t <= time);
            let idx = next_idx.saturating_sub(1);

            cursor.last_index = idx;
            idx
        };

        self.sample_at_frame(final_index, time)
    }

    /// Unified value accessor.
    /// For Linear/Step the index is used directly; for CubicSpline the
    /// in-tangent/value/out-tangent triplets put the value at index * 3 + 1.
    fn get_value_at(&self, index: usize) -> &T {
        match self.interpolation {
            InterpolationMode::CubicSpline => &self.values[index * 3 + 1],
            _ => &self.values[index],
        }
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.times.len();

        // Boundary case: no next frame available
        if index >= len - 1 {
            return *self.get_value_at(len - 1);
        }
        // Before the first keyframe: clamp to first value
        if time < self.times[0] {
            return *self.get_value_at(0);
        }

        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;

        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Step => *self.get_value_at(index),
            InterpolationMode::Linear => {
                let v0 = self.get_value_at(index);
                let v1 = self.get_value_at(next_idx);
                T::interpolate_linear(*v0, *v1, t)
            }
            InterpolationMode::CubicSpline => {
                let i_prev = index * 3;
                let i_next = next_idx * 3;

                let v0 = &self.values[i_prev + 1];
                let out_tangent0 = &self.values[i_prev + 2];
                let in_tangent1 = &self.values[i_next];
                let v1 = &self.values[i_next + 1];

                T::interpolate_cubic(*v0, *out_tangent0, *in_tangent1, *v1, t, dt)
            }
        }
    }
}

// ============================================================================
// Key range queries (trigger-style tracks: method / audio / animation)
// ============================================================================

/// Index of the last key with `times[i] <= time`, if any.
#[must_use]
pub fn key_index_at_or_before(times: &[f32], time: f32) -> Option<usize> {
    let next = times.partition_point(|&t| t <= time);
    next.checked_sub(1)
}

/// Appends indices of keys with `from < times[i] <= to`, ascending.
pub fn keys_in_range(times: &[f32], from: f32, to: f32, out: &mut Vec<usize>) {
    let start = times.partition_point(|&t| t <= from);
    let end = times.partition_point(|&t| t <= to);
    out.extend(start..end);
}

/// Appends indices of keys with `from <= times[i] < to`, descending.
/// Used for backward playback where keys fire in reverse order.
pub fn keys_in_range_reverse(times: &[f32], from: f32, to: f32, out: &mut Vec<usize>) {
    let start = times.partition_point(|&t| t < from);
    let end = times.partition_point(|&t| t < to);
    out.extend((start..end).rev());
}
