//! Animation blending core.
//!
//! Clips are immutable keyframe assets ([`AnimationClip`]); a shared,
//! immutable node graph ([`AnimationNode`]) describes how they combine; and
//! an [`AnimationTree`] instance drives one graph against one scene,
//! owning every piece of mutable state (parameters, play cursors, the
//! resolved track cache). `AnimationTree::advance` is the per-frame entry
//! point.

mod cache;
mod graph;
mod params;
mod state;
pub mod clip;
pub mod node;
pub mod player;
pub mod tracks;
pub mod tree;
pub mod values;

pub use clip::{
    ANIMATION_STOP_KEY, AnimationClip, AnimationTrack, AudioKey, AudioTrack, BezierKey,
    BezierTrack, LoopMode, MethodKey, MethodTrack, Track, TrackData, TrackPath, ValueTrack,
    ValueUpdateMode,
};
pub use node::{AnimationNode, BlendTree, FilterAction, NodeKind, OUTPUT_NODE, ParameterInfo};
pub use params::ParameterStore;
pub use player::AnimationPlayer;
pub use state::{Activity, AnimationState, BlendSlot, BlendState};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
pub use tree::{AnimationTree, RootMotion, TriggerEvent};
pub use values::{Interpolatable, PropertyValue};
