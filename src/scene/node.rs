use rustc_hash::FxHashMap;

use crate::animation::PropertyValue;
use crate::scene::transform::Transform;
use crate::scene::{NodeHandle, SkeletonKey};

/// A scene node.
///
/// # Design Principles
///
/// - Keeps the data the blender touches every frame (hierarchy, transform,
///   morph weights) directly on the node
/// - Everything else animatable is reachable through the generic
///   [`properties`](Node::properties) map, addressed by name
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child relationships:
/// - `parent`: optional handle to the parent node (None for roots)
/// - `children`: list of child node handles
///
/// Children are addressed by [`name`](Node::name) when animation track paths
/// are resolved, so sibling names should be unique.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node name, used for track path resolution.
    pub name: String,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    // === Core Spatial Data ===
    /// Transform component (hot data written by the animation commit pass).
    pub transform: Transform,

    // === Optional Components ===
    /// Skeleton driven through this node, if any.
    pub skeleton: Option<SkeletonKey>,

    /// Morph target channel names, parallel to [`morph_weights`](Node::morph_weights).
    pub morph_names: Vec<String>,
    /// Morph target weights, written by blend-shape tracks.
    pub morph_weights: Vec<f32>,

    /// Generic animatable properties, written by value and bezier tracks.
    pub properties: FxHashMap<String, PropertyValue>,
}

impl Node {
    /// Creates a named node with a default transform and no components.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            skeleton: None,
            morph_names: Vec::new(),
            morph_weights: Vec::new(),
            properties: FxHashMap::default(),
        }
    }

    /// Parent node handle, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Read-only slice of child node handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Declares the morph target channels of this node, resetting all
    /// weights to zero.
    pub fn set_morph_channels(&mut self, names: &[&str]) {
        self.morph_names = names.iter().map(|s| (*s).to_string()).collect();
        self.morph_weights = vec![0.0; names.len()];
    }

    /// Index of a morph channel by name.
    #[must_use]
    pub fn find_morph_channel(&self, name: &str) -> Option<usize> {
        self.morph_names.iter().position(|n| n == name)
    }

    /// Reads a generic property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Writes a generic property.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.properties.insert(name.to_string(), value);
    }
}
