//! Scene graph module
//!
//! The minimal object model animation tracks resolve against and commit into:
//! - Node: scene node (hierarchy, transform, morph weights, properties)
//! - Transform: TRS component with matrix caching
//! - Scene: scene container and path lookup
//! - Skeleton: named bone array with rest and runtime pose

pub mod node;
pub mod scene;
pub mod skeleton;
pub mod transform;

pub use node::Node;
pub use scene::Scene;
pub use skeleton::{Bone, Skeleton};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct SkeletonKey;
}
