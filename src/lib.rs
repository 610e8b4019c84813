//! Skein: an animation blending core.
//!
//! A scene graph with skeletons and morph targets ([`scene`]), keyframed
//! animation clips, and a blend-node graph evaluated per frame by an
//! [`AnimationTree`] that commits the blended pose back into the scene.

pub mod animation;
pub mod errors;
pub mod scene;

pub use animation::{
    AnimationClip, AnimationNode, AnimationPlayer, AnimationTree, BlendTree, FilterAction,
    InterpolationMode, KeyframeTrack, LoopMode, PropertyValue, RootMotion, Track, TrackData,
    TrackPath, TriggerEvent,
};
pub use errors::SkeinError;
pub use scene::{Node, NodeHandle, Scene, Skeleton, SkeletonKey};
