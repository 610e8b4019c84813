//! Keyframe Track and Clip Tests
//!
//! Tests for:
//! - KeyframeTrack linear/step/cubic interpolation
//! - KeyframeCursor sequential scan and binary search fallback
//! - TrackPath parsing and display
//! - ValueTrack continuous/discrete sampling
//! - BezierTrack curve evaluation
//! - AnimationClip length auto-computation
//! - Key range queries used by trigger tracks

use glam::{Quat, Vec2, Vec3};

use skein::animation::clip::{
    AnimationClip, BezierKey, BezierTrack, Track, TrackData, TrackPath, ValueTrack,
    ValueUpdateMode,
};
use skein::animation::tracks::{
    self, InterpolationMode, KeyframeCursor, KeyframeTrack,
};
use skein::animation::values::PropertyValue;
use skein::animation::LoopMode;

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

// ============================================================================
// KeyframeTrack: Linear Interpolation
// ============================================================================

#[test]
fn track_linear_f32_midpoint() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 10.0],
        InterpolationMode::Linear,
    );

    let mut cursor = KeyframeCursor::default();
    let val = track.sample_with_cursor(0.5, &mut cursor);
    assert!(approx(val, 5.0), "Expected 5.0, got {val}");
}

#[test]
fn track_linear_clamp_beyond_range() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 10.0],
        InterpolationMode::Linear,
    );

    let mut cursor = KeyframeCursor::default();
    assert!(approx(track.sample_with_cursor(5.0, &mut cursor), 10.0));
    assert!(approx(track.sample_with_cursor(-1.0, &mut cursor), 0.0));
}

#[test]
fn track_linear_vec3() {
    let track = KeyframeTrack::new(
        vec![0.0, 2.0],
        vec![Vec3::ZERO, Vec3::new(10.0, 20.0, 30.0)],
        InterpolationMode::Linear,
    );

    let val = track.sample(1.0);
    assert!(val.abs_diff_eq(Vec3::new(5.0, 10.0, 15.0), EPSILON));
}

#[test]
fn track_linear_quat_is_slerp() {
    let q0 = Quat::IDENTITY;
    let q1 = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
    let track = KeyframeTrack::new(vec![0.0, 1.0], vec![q0, q1], InterpolationMode::Linear);

    let val = track.sample(0.5);
    let expected = q0.slerp(q1, 0.5);
    assert!(val.dot(expected).abs() > 1.0 - EPSILON);
}

#[test]
fn track_single_key_is_constant() {
    let track = KeyframeTrack::new(vec![0.0], vec![7.0_f32], InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    assert!(approx(track.sample_with_cursor(0.0, &mut cursor), 7.0));
    assert!(approx(track.sample_with_cursor(3.0, &mut cursor), 7.0));
}

// ============================================================================
// KeyframeTrack: Step Interpolation
// ============================================================================

#[test]
fn track_step_holds_value() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0, 2.0],
        vec![0.0_f32, 100.0, 200.0],
        InterpolationMode::Step,
    );

    let mut cursor = KeyframeCursor::default();
    assert!(approx(track.sample_with_cursor(0.5, &mut cursor), 0.0));
    assert!(approx(track.sample_with_cursor(0.99, &mut cursor), 0.0));
    assert!(approx(track.sample_with_cursor(1.0, &mut cursor), 100.0));
    assert!(approx(track.sample_with_cursor(1.5, &mut cursor), 100.0));
}

// ============================================================================
// KeyframeTrack: Cubic Spline Interpolation
// ============================================================================

#[test]
fn track_cubic_hits_keyframe_values() {
    // Triplets: in-tangent, value, out-tangent
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 0.0, 1.0, -1.0, 10.0, 0.0],
        InterpolationMode::CubicSpline,
    );

    assert!(approx(track.sample(0.0), 0.0));
    assert!(approx(track.sample(1.0), 10.0));
}

#[test]
fn track_cubic_zero_tangents_is_smoothstep() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 0.0, 0.0, 0.0, 10.0, 0.0],
        InterpolationMode::CubicSpline,
    );

    // Hermite with zero tangents: 3t^2 - 2t^3 at t = 0.5 is 0.5
    assert!(approx(track.sample(0.5), 5.0));
}

// ============================================================================
// KeyframeCursor
// ============================================================================

#[test]
fn cursor_sequential_playback() {
    let times: Vec<f32> = (0..100).map(|i| i as f32 * 0.1).collect();
    let values: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let track = KeyframeTrack::new(times, values, InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    for i in 0..95 {
        let t = i as f32 * 0.1 + 0.05;
        let val = track.sample_with_cursor(t, &mut cursor);
        assert!(approx(val, i as f32 + 0.5), "At t={t}: expected {}, got {val}", i as f32 + 0.5);
    }
}

#[test]
fn cursor_large_jump_falls_back() {
    let times: Vec<f32> = (0..100).map(|i| i as f32 * 0.1).collect();
    let values: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let track = KeyframeTrack::new(times, values, InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    track.sample_with_cursor(0.05, &mut cursor);
    // Jump far beyond the scan window, then back
    let val = track.sample_with_cursor(8.05, &mut cursor);
    assert!(approx(val, 80.5), "Expected 80.5, got {val}");
    let val = track.sample_with_cursor(1.05, &mut cursor);
    assert!(approx(val, 10.5), "Expected 10.5, got {val}");
}

// ============================================================================
// TrackPath
// ============================================================================

#[test]
fn track_path_parse_and_display() {
    let plain = TrackPath::parse("torso/arm");
    assert_eq!(plain.node, "torso/arm");
    assert_eq!(plain.subname, None);
    assert_eq!(plain.to_string(), "torso/arm");

    let with_sub = TrackPath::parse("torso/arm:hand");
    assert_eq!(with_sub.node, "torso/arm");
    assert_eq!(with_sub.subname.as_deref(), Some("hand"));
    assert_eq!(with_sub.to_string(), "torso/arm:hand");
}

// ============================================================================
// ValueTrack
// ============================================================================

#[test]
fn value_track_continuous_interpolates() {
    let track = ValueTrack {
        times: vec![0.0, 1.0],
        values: vec![PropertyValue::Float(0.0), PropertyValue::Float(10.0)],
        update: ValueUpdateMode::Continuous,
    };

    let Some(PropertyValue::Float(v)) = track.sample(0.5) else {
        panic!("expected a float sample");
    };
    assert!(approx(v, 5.0));
}

#[test]
fn value_track_discrete_steps() {
    let track = ValueTrack {
        times: vec![0.0, 1.0],
        values: vec![PropertyValue::Int(1), PropertyValue::Int(2)],
        update: ValueUpdateMode::Discrete,
    };

    assert_eq!(track.sample(0.5), Some(PropertyValue::Int(1)));
    assert_eq!(track.sample(1.0), Some(PropertyValue::Int(2)));
}

// ============================================================================
// BezierTrack
// ============================================================================

#[test]
fn bezier_track_endpoints_and_midpoint() {
    let track = BezierTrack {
        times: vec![0.0, 1.0],
        keys: vec![
            BezierKey {
                value: 0.0,
                in_handle: Vec2::ZERO,
                out_handle: Vec2::ZERO,
            },
            BezierKey {
                value: 10.0,
                in_handle: Vec2::ZERO,
                out_handle: Vec2::ZERO,
            },
        ],
    };

    assert!(approx(track.sample(0.0), 0.0));
    assert!(approx(track.sample(1.0), 10.0));
    // Zero handles degenerate to an S-curve symmetric around the midpoint
    let mid = track.sample(0.5);
    assert!((mid - 5.0).abs() < 1e-3, "Expected ~5.0, got {mid}");
}

// ============================================================================
// AnimationClip
// ============================================================================

#[test]
fn clip_length_is_latest_keyframe() {
    let clip = AnimationClip::new(
        "walk",
        vec![
            Track {
                path: TrackPath::node("a"),
                data: TrackData::Position(KeyframeTrack::new(
                    vec![0.0, 1.5],
                    vec![Vec3::ZERO, Vec3::ONE],
                    InterpolationMode::Linear,
                )),
            },
            Track {
                path: TrackPath::node("b"),
                data: TrackData::BlendShape(KeyframeTrack::new(
                    vec![0.0, 2.5],
                    vec![0.0, 1.0],
                    InterpolationMode::Linear,
                )),
            },
        ],
    );

    assert!(approx(clip.length, 2.5));
    assert_eq!(clip.loop_mode, LoopMode::Loop);
}

#[test]
fn clip_explicit_length_overrides() {
    let clip = AnimationClip::with_length("idle", 4.0, vec![]).looping(LoopMode::Once);
    assert!(approx(clip.length, 4.0));
    assert_eq!(clip.loop_mode, LoopMode::Once);
}

// ============================================================================
// Key range queries
// ============================================================================

#[test]
fn key_index_at_or_before() {
    let times = [0.0, 0.5, 1.0];
    assert_eq!(tracks::key_index_at_or_before(&times, -0.1), None);
    assert_eq!(tracks::key_index_at_or_before(&times, 0.0), Some(0));
    assert_eq!(tracks::key_index_at_or_before(&times, 0.7), Some(1));
    assert_eq!(tracks::key_index_at_or_before(&times, 2.0), Some(2));
}

#[test]
fn keys_in_range_half_open() {
    let times = [0.0, 0.25, 0.5, 0.75, 1.0];
    let mut out = Vec::new();

    // (from, to]: the key at `from` itself must not fire again
    tracks::keys_in_range(&times, 0.25, 0.75, &mut out);
    assert_eq!(out, vec![2, 3]);

    out.clear();
    tracks::keys_in_range_reverse(&times, 0.25, 0.75, &mut out);
    assert_eq!(out, vec![2, 1]);
}
