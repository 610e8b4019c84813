use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::animation::clip::{AnimationClip, TrackPath};

/// Index into the per-evaluation arena of per-track blend weight vectors.
///
/// Every node invocation owns one weight vector (its contribution scale for
/// each resolved track); children receive derived slots with the parent's
/// weights scaled and filtered. Slots replace pointer aliasing into node
/// internals: the arena lives on [`BlendState`] and is discarded after the
/// commit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendSlot(pub(crate) usize);

/// One leaf sample appended by `blend_animation`: a clip at a local time,
/// with the weight vector scaling each of its tracks.
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub clip: Arc<AnimationClip>,
    pub time: f32,
    /// Signed step applied to the leaf cursor this tick, before wrapping.
    pub delta: f32,
    pub slot: BlendSlot,
    /// Scalar node weight; per-track weights come from `slot`.
    pub blend: f32,
    pub seeked: bool,
    pub seek_root: bool,
    /// -1 bounce at start, 0 none, +1 bounce at end (ping-pong loops only).
    pub pingponged: i8,
}

/// Per-evaluation-pass accumulator threaded through the recursive node
/// processing.
///
/// Rebuilt on every structural change (`setup_pass`) and refreshed on every
/// evaluation (`process_pass`): `animation_states` and the weight arena are
/// cleared each tick, while `track_map`/`track_paths` stay stable as long as
/// the state is valid.
#[derive(Debug, Default)]
pub struct BlendState {
    pub track_count: usize,
    /// Output path -> track index, stable while `valid`.
    pub track_map: FxHashMap<TrackPath, usize>,
    /// Inverse of `track_map`, used to apply per-node path filters.
    pub track_paths: Vec<TrackPath>,
    pub animation_states: Vec<AnimationState>,
    pub valid: bool,
    pub invalid_reasons: String,
    /// Process pass of the last completed evaluation, for staleness checks.
    pub last_pass: u64,

    pub(crate) track_weights: Vec<Vec<f32>>,
}

impl BlendState {
    /// Clears per-tick data while keeping the resolved track map.
    pub(crate) fn reset_pass(&mut self) {
        self.animation_states.clear();
        self.track_weights.clear();
    }

    /// Allocates a weight vector, returning its slot.
    pub(crate) fn push_weights(&mut self, weights: Vec<f32>) -> BlendSlot {
        debug_assert_eq!(weights.len(), self.track_count);
        self.track_weights.push(weights);
        BlendSlot(self.track_weights.len() - 1)
    }

    #[must_use]
    pub(crate) fn weights(&self, slot: BlendSlot) -> &[f32] {
        &self.track_weights[slot.0]
    }

    /// Flags the state invalid, accumulating the reason string.
    pub(crate) fn make_invalid(&mut self, reason: &str) {
        self.valid = false;
        if !self.invalid_reasons.is_empty() {
            self.invalid_reasons.push('\n');
        }
        self.invalid_reasons.push_str(reason);
    }

    /// Drops the resolved track map entirely (structural change pending).
    pub(crate) fn clear_tracks(&mut self) {
        self.track_count = 0;
        self.track_map.clear();
        self.track_paths.clear();
        self.reset_pass();
        self.valid = false;
    }
}

/// Per-input-connection liveness record, exposed for diagnostics and
/// graph-editor visualization.
#[derive(Debug, Clone, Copy, Default)]
pub struct Activity {
    pub last_pass: u64,
    /// Contribution weight of the connection in `[0, 1]`.
    pub activity: f32,
}
