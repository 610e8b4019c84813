use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::animation::AnimationPlayer;
use crate::scene::node::Node;
use crate::scene::skeleton::Skeleton;
use crate::scene::{NodeHandle, SkeletonKey};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Scene graph container.
///
/// `Scene` is a pure data layer: it stores the node hierarchy, the component
/// pools the animation core resolves against (skeletons), and the registered
/// animation players. The blend tree driver borrows it immutably during graph
/// evaluation and mutably during the commit pass.
pub struct Scene {
    pub id: u32,

    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    // ==== Component / resource pools ====
    pub skeletons: SlotMap<SkeletonKey, Skeleton>,

    /// Animation players registered by name. A blend tree references one of
    /// these as its clip source.
    pub players: FxHashMap<String, AnimationPlayer>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            skeletons: SlotMap::with_key(),
            players: FxHashMap::default(),
        }
    }

    /// Adds a node without a parent (a root node).
    pub fn add_root(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Adds a node as a child of `parent`, keeping both sides of the
    /// hierarchy in sync.
    pub fn add_child(&mut self, parent: NodeHandle, mut node: Node) -> NodeHandle {
        node.parent = Some(parent);
        let handle = self.nodes.insert(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        handle
    }

    /// Removes a node and its whole subtree. Structural change: any blend
    /// tree resolved against this scene must be told via
    /// [`AnimationTree::mark_scene_changed`](crate::animation::AnimationTree::mark_scene_changed).
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.remove(handle) else {
            return;
        };
        if let Some(parent) = node.parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != handle);
            }
        }
        self.root_nodes.retain(|&r| r != handle);
        for child in node.children {
            self.remove_node(child);
        }
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Resolves a slash-separated path of child names relative to `root`.
    ///
    /// `"."` (or the empty path) resolves to `root` itself. Each segment
    /// matches a direct child by name.
    #[must_use]
    pub fn find_path(&self, root: NodeHandle, path: &str) -> Option<NodeHandle> {
        if path.is_empty() || path == "." {
            return self.nodes.contains_key(root).then_some(root);
        }

        let mut current = root;
        for segment in path.split('/') {
            let node = self.nodes.get(current)?;
            current = node
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes.get(c).is_some_and(|n| n.name == segment))?;
        }
        Some(current)
    }

    /// Registers an animation player under a name.
    pub fn add_player(&mut self, name: &str, player: AnimationPlayer) {
        self.players.insert(name.to_string(), player);
    }

    #[must_use]
    pub fn get_player(&self, name: &str) -> Option<&AnimationPlayer> {
        self.players.get(name)
    }

    pub fn get_player_mut(&mut self, name: &str) -> Option<&mut AnimationPlayer> {
        self.players.get_mut(name)
    }
}
