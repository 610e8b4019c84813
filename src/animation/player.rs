use std::collections::BTreeMap;
use std::sync::Arc;

use crate::animation::clip::AnimationClip;
use crate::scene::NodeHandle;

/// The external clip-source collaborator a blend tree is bound to.
///
/// Holds a named clip library and the scene node its track paths resolve
/// against. Clips are stored in a `BTreeMap` so resolution visits them in a
/// deterministic order, which keeps the track index assignment stable across
/// re-resolutions of an unchanged scene.
#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    /// Node track paths are resolved relative to.
    pub root: NodeHandle,
    clips: BTreeMap<String, Arc<AnimationClip>>,
}

impl AnimationPlayer {
    #[must_use]
    pub fn new(root: NodeHandle) -> Self {
        Self {
            root,
            clips: BTreeMap::new(),
        }
    }

    /// Registers a clip under a name. Adding or replacing clips is a
    /// structural change from the blend tree's point of view.
    pub fn add_clip(&mut self, name: &str, clip: AnimationClip) {
        self.clips.insert(name.to_string(), Arc::new(clip));
    }

    pub fn remove_clip(&mut self, name: &str) {
        self.clips.remove(name);
    }

    #[must_use]
    pub fn get_clip(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.clips.get(name)
    }

    #[must_use]
    pub fn has_clip(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    /// Clips in name order.
    pub fn iter_clips(&self) -> impl Iterator<Item = (&str, &Arc<AnimationClip>)> {
        self.clips.iter().map(|(n, c)| (n.as_str(), c))
    }
}
