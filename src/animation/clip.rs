use std::fmt;

use glam::{Quat, Vec2, Vec3};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::animation::tracks::{self, KeyframeTrack};
use crate::animation::values::PropertyValue;

/// Marker key in an animation track meaning "stop the nested animation".
pub const ANIMATION_STOP_KEY: &str = "[stop]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Loop,
    PingPong,
}

/// Address of one animatable output channel.
///
/// `node` is a slash-separated path resolved relative to the animation
/// player's root; `subname` addresses a component inside the node: a bone
/// name for skeleton transform tracks, a morph channel for blend-shape
/// tracks, or a property name for value/bezier tracks.
///
/// Rendered as `node/path:subname`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackPath {
    pub node: String,
    pub subname: Option<String>,
}

impl TrackPath {
    #[must_use]
    pub fn node(path: &str) -> Self {
        Self {
            node: path.to_string(),
            subname: None,
        }
    }

    #[must_use]
    pub fn sub(path: &str, subname: &str) -> Self {
        Self {
            node: path.to_string(),
            subname: Some(subname.to_string()),
        }
    }

    /// Parses `node/path:subname` (the subname is optional).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((node, sub)) => Self::sub(node, sub),
            None => Self::node(s),
        }
    }
}

impl fmt::Display for TrackPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subname {
            Some(sub) => write!(f, "{}:{}", self.node, sub),
            None => write!(f, "{}", self.node),
        }
    }
}

// ============================================================================
// Track payloads
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueUpdateMode {
    /// Sampled and blended every frame.
    Continuous,
    /// Set only when a key is crossed (or on seek); last writer wins.
    Discrete,
}

/// Generic property track over dynamically typed values.
#[derive(Debug, Clone)]
pub struct ValueTrack {
    pub times: Vec<f32>,
    pub values: Vec<PropertyValue>,
    pub update: ValueUpdateMode,
}

impl ValueTrack {
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<PropertyValue> {
        let idx = tracks::key_index_at_or_before(&self.times, time).unwrap_or(0);
        let a = self.values.get(idx)?;

        if self.update == ValueUpdateMode::Discrete || idx + 1 >= self.times.len() {
            return Some(a.clone());
        }

        let t0 = self.times[idx];
        let t1 = self.times[idx + 1];
        let dt = t1 - t0;
        let t = if dt > 1e-6 {
            ((time - t0) / dt).clamp(0.0, 1.0)
        } else {
            0.0
        };
        // Before the first key: hold the first value
        let t = if time < self.times[0] { 0.0 } else { t };
        Some(PropertyValue::interpolate(a, &self.values[idx + 1], t))
    }
}

/// One method-call key.
#[derive(Debug, Clone)]
pub struct MethodKey {
    pub method: String,
    pub args: SmallVec<[PropertyValue; 4]>,
}

#[derive(Debug, Clone)]
pub struct MethodTrack {
    pub times: Vec<f32>,
    pub keys: Vec<MethodKey>,
}

/// One bezier scalar key: a value plus free in/out handles expressed as
/// (time, value) offsets from the key point.
#[derive(Debug, Clone, Copy)]
pub struct BezierKey {
    pub value: f32,
    /// Handle toward the previous key; `x <= 0`.
    pub in_handle: Vec2,
    /// Handle toward the next key; `x >= 0`.
    pub out_handle: Vec2,
}

#[derive(Debug, Clone)]
pub struct BezierTrack {
    pub times: Vec<f32>,
    pub keys: Vec<BezierKey>,
}

impl BezierTrack {
    /// Samples the curve at `time`, solving the cubic on the time axis by
    /// bisection (the curve is assumed monotonic in time, which holds for
    /// handles respecting the sign convention).
    #[must_use]
    pub fn sample(&self, time: f32) -> f32 {
        assert!(!self.times.is_empty(), "Track is empty");

        let Some(idx) = tracks::key_index_at_or_before(&self.times, time) else {
            return self.keys[0].value;
        };
        if idx + 1 >= self.times.len() {
            return self.keys[self.times.len() - 1].value;
        }

        let t0 = self.times[idx];
        let t1 = self.times[idx + 1];
        let k0 = &self.keys[idx];
        let k1 = &self.keys[idx + 1];

        let p0 = Vec2::new(t0, k0.value);
        let p1 = p0 + k0.out_handle;
        let p3 = Vec2::new(t1, k1.value);
        let p2 = p3 + k1.in_handle;

        // Bisect the curve parameter until the x coordinate matches `time`.
        let mut low = 0.0_f32;
        let mut high = 1.0_f32;
        let mut point = p0;
        for _ in 0..24 {
            let mid = (low + high) * 0.5;
            point = bezier_point(p0, p1, p2, p3, mid);
            if point.x < time {
                low = mid;
            } else {
                high = mid;
            }
        }
        point.y
    }
}

fn bezier_point(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let omt = 1.0 - t;
    let omt2 = omt * omt;
    let t2 = t * t;
    p0 * (omt2 * omt) + p1 * (omt2 * t * 3.0) + p2 * (omt * t2 * 3.0) + p3 * (t2 * t)
}

/// One audio key: stream name plus playback window.
#[derive(Debug, Clone)]
pub struct AudioKey {
    pub stream: String,
    /// Offset into the stream at which playback starts.
    pub start_offset: f32,
    /// Playback duration; 0 means "until stopped".
    pub duration: f32,
}

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub times: Vec<f32>,
    pub keys: Vec<AudioKey>,
}

/// Nested-animation track: keys name a clip of the target player, or
/// [`ANIMATION_STOP_KEY`].
#[derive(Debug, Clone)]
pub struct AnimationTrack {
    pub times: Vec<f32>,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Position(KeyframeTrack<Vec3>),
    Rotation(KeyframeTrack<Quat>),
    Scale(KeyframeTrack<Vec3>),
    BlendShape(KeyframeTrack<f32>),
    Value(ValueTrack),
    Method(MethodTrack),
    Bezier(BezierTrack),
    Audio(AudioTrack),
    Animation(AnimationTrack),
}

impl TrackData {
    #[must_use]
    pub fn end_time(&self) -> f32 {
        let times = match self {
            TrackData::Position(t) | TrackData::Scale(t) => &t.times,
            TrackData::Rotation(t) => &t.times,
            TrackData::BlendShape(t) => &t.times,
            TrackData::Value(t) => &t.times,
            TrackData::Method(t) => &t.times,
            TrackData::Bezier(t) => &t.times,
            TrackData::Audio(t) => &t.times,
            TrackData::Animation(t) => &t.times,
        };
        times.last().copied().unwrap_or(0.0)
    }

    /// Short kind name for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            TrackData::Position(_) => "position",
            TrackData::Rotation(_) => "rotation",
            TrackData::Scale(_) => "scale",
            TrackData::BlendShape(_) => "blend_shape",
            TrackData::Value(_) => "value",
            TrackData::Method(_) => "method",
            TrackData::Bezier(_) => "bezier",
            TrackData::Audio(_) => "audio",
            TrackData::Animation(_) => "animation",
        }
    }
}

/// Complete track definition: output address plus keyframe payload.
#[derive(Debug, Clone)]
pub struct Track {
    pub path: TrackPath,
    pub data: TrackData,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub id: Uuid,
    pub name: String,
    pub length: f32,
    pub loop_mode: LoopMode,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    /// Creates a clip whose length is the latest keyframe across tracks.
    #[must_use]
    pub fn new(name: &str, tracks: Vec<Track>) -> Self {
        let length = tracks
            .iter()
            .map(|t| t.data.end_time())
            .fold(0.0_f32, f32::max);

        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            length,
            loop_mode: LoopMode::Loop,
            tracks,
        }
    }

    /// Creates a clip with an explicit length (which may extend past the
    /// last keyframe).
    #[must_use]
    pub fn with_length(name: &str, length: f32, tracks: Vec<Track>) -> Self {
        let mut clip = Self::new(name, tracks);
        clip.length = length;
        clip
    }

    #[must_use]
    pub fn looping(mut self, loop_mode: LoopMode) -> Self {
        self.loop_mode = loop_mode;
        self
    }
}

// ============================================================================
// Trigger windows
// ============================================================================

/// Collects key indices crossed during one evaluation step, honoring loop
/// wrap and ping-pong reflection.
///
/// `time` is the post-step (wrapped/reflected) cursor, `delta` the signed
/// step that was applied before wrapping, and `pingponged` is -1/0/+1 for a
/// bounce at the start/none/end.
pub(crate) fn trigger_window(
    times: &[f32],
    time: f32,
    delta: f32,
    length: f32,
    loop_mode: LoopMode,
    pingponged: i8,
    out: &mut Vec<usize>,
) {
    out.clear();
    if times.is_empty() || delta == 0.0 {
        return;
    }

    match pingponged {
        // Bounce at the end: forward leg (prev, length], then the backward
        // leg [time, length) in reverse.
        1 => {
            let prev = 2.0 * length - time - delta;
            tracks::keys_in_range(times, prev, length, out);
            let mark = out.len();
            tracks::keys_in_range_reverse(times, time, length, out);
            dedup_tail(out, mark);
        }
        // Bounce at the start: backward leg [0, prev) in reverse, then the
        // forward leg [0, time].
        -1 => {
            let prev = -time - delta;
            tracks::keys_in_range_reverse(times, 0.0, prev, out);
            let mark = out.len();
            tracks::keys_in_range(times, -1e-6, time, out);
            dedup_tail(out, mark);
        }
        _ => {
            let prev = time - delta;
            if delta > 0.0 {
                if prev < 0.0 && loop_mode == LoopMode::Loop {
                    // Wrapped: (prev + length, length] then [0, time]
                    tracks::keys_in_range(times, prev + length, length, out);
                    tracks::keys_in_range(times, -1e-6, time, out);
                } else {
                    tracks::keys_in_range(times, prev.max(0.0).min(time), time, out);
                }
            } else if prev > length && loop_mode == LoopMode::Loop {
                // Backward wrap: [time, length)... then (0, prev - length]
                tracks::keys_in_range_reverse(times, 0.0, prev - length, out);
                tracks::keys_in_range_reverse(times, time, length + 1e-6, out);
            } else {
                tracks::keys_in_range_reverse(times, time, prev.min(length), out);
            }
        }
    }
}

/// Removes entries at `mark..` that already appear before `mark`, keeping
/// bounce legs from firing the turnaround key twice.
fn dedup_tail(out: &mut Vec<usize>, mark: usize) {
    let mut i = mark;
    while i < out.len() {
        if out[..mark].contains(&out[i]) {
            out.remove(i);
        } else {
            i += 1;
        }
    }
}
