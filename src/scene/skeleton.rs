use glam::{Quat, Vec3};
use uuid::Uuid;

/// One bone of a [`Skeleton`]: rest transform plus the mutable pose the
/// animation commit pass writes into.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,

    // === Rest Pose (static, from the source asset) ===
    pub rest_position: Vec3,
    pub rest_rotation: Quat,
    pub rest_scale: Vec3,

    // === Runtime Pose (written every frame) ===
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Bone {
    /// Creates a bone whose pose starts at its rest transform.
    #[must_use]
    pub fn new(name: &str, rest_position: Vec3, rest_rotation: Quat, rest_scale: Vec3) -> Self {
        Self {
            name: name.to_string(),
            rest_position,
            rest_rotation,
            rest_scale,
            position: rest_position,
            rotation: rest_rotation,
            scale: rest_scale,
        }
    }
}

/// A named, ordered bone array.
///
/// The bone order matters: transform tracks address bones by name, but the
/// resolved track cache pins the index once per structural change, so
/// reordering bones requires a re-resolution.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub id: Uuid,
    pub name: String,
    pub bones: Vec<Bone>,
}

impl Skeleton {
    #[must_use]
    pub fn new(name: &str, bones: Vec<Bone>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            bones,
        }
    }

    /// Index of a bone by name.
    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }
}
