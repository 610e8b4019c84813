//! Resolved track cache.
//!
//! Resolution maps every track path of the bound player's clips onto a
//! concrete animatable target once per structural change. The cache is an
//! arena indexed by the same integer ids as
//! [`BlendState::track_map`](crate::animation::BlendState): entry `i` is the
//! target for track path `i`. Entries carry `setup_pass`/`process_pass`
//! markers so the commit pass can reset an entry the first time it is touched
//! in a tick and skip entries no evaluation touched at all.

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::clip::{TrackData, TrackPath, ValueUpdateMode};
use crate::animation::values::PropertyValue;
use crate::errors::{Result, SkeinError};
use crate::scene::{NodeHandle, Scene, SkeletonKey};

#[derive(Debug, Clone, Copy)]
pub(crate) enum TransformTarget {
    Node(NodeHandle),
    Bone {
        skeleton: SkeletonKey,
        bone: usize,
    },
}

#[derive(Debug)]
pub(crate) struct TransformEntry {
    pub target: TransformTarget,
    pub init_position: Vec3,
    pub init_rotation: Quat,
    pub init_scale: Vec3,
    // Working values, reset to init at first touch each pass.
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Running weight for progressive normalized slerp.
    pub rotation_accum: f32,
    pub position_used: bool,
    pub rotation_used: bool,
    pub scale_used: bool,
}

#[derive(Debug)]
pub(crate) struct BlendShapeEntry {
    pub node: NodeHandle,
    pub shape: usize,
    pub init_value: f32,
    pub value: f32,
}

#[derive(Debug)]
pub(crate) struct ValueEntry {
    pub node: NodeHandle,
    pub property: String,
    pub init_value: PropertyValue,
    pub value: PropertyValue,
    /// Running weight for progressive blending of quaternion values.
    pub rotation_accum: f32,
    /// Discrete entries keep their last key value across passes instead of
    /// resetting to init.
    pub discrete: bool,
}

#[derive(Debug)]
pub(crate) struct BezierEntry {
    pub node: NodeHandle,
    pub property: String,
    pub init_value: f32,
    pub value: f32,
}

#[derive(Debug)]
pub(crate) struct MethodEntry {
    pub node: NodeHandle,
}

#[derive(Debug)]
pub(crate) struct AudioEntry {
    pub node: NodeHandle,
    pub playing: bool,
    /// Remaining playback window; `None` means "until stopped".
    pub remaining: Option<f32>,
    /// Strongest weight seen this pass, for silence detection.
    pub max_weight: f32,
}

#[derive(Debug)]
pub(crate) struct AnimationEntry {
    /// Registry name of the nested animation player.
    pub player: String,
    pub playing: bool,
}

#[derive(Debug)]
pub(crate) enum TrackEntryData {
    Transform(TransformEntry),
    BlendShape(BlendShapeEntry),
    Value(ValueEntry),
    Bezier(BezierEntry),
    Method(MethodEntry),
    Audio(AudioEntry),
    Animation(AnimationEntry),
}

impl TrackEntryData {
    fn category(&self) -> &'static str {
        match self {
            TrackEntryData::Transform(_) => "transform",
            TrackEntryData::BlendShape(_) => "blend_shape",
            TrackEntryData::Value(_) => "value",
            TrackEntryData::Bezier(_) => "bezier",
            TrackEntryData::Method(_) => "method",
            TrackEntryData::Audio(_) => "audio",
            TrackEntryData::Animation(_) => "animation",
        }
    }
}

#[derive(Debug)]
pub(crate) struct TrackEntry {
    pub setup_pass: u64,
    pub process_pass: u64,
    pub root_motion: bool,
    pub path: TrackPath,
    pub data: TrackEntryData,
}

impl TrackEntry {
    /// Resets working values to the captured init state. Called the first
    /// time the entry is touched in a process pass.
    pub(crate) fn reset_for_pass(&mut self, process_pass: u64) {
        self.process_pass = process_pass;
        match &mut self.data {
            TrackEntryData::Transform(t) => {
                if self.root_motion {
                    // Root motion accumulates deltas, not absolute pose.
                    t.position = Vec3::ZERO;
                    t.rotation = Quat::IDENTITY;
                    t.scale = Vec3::ZERO;
                } else {
                    t.position = t.init_position;
                    t.rotation = t.init_rotation;
                    t.scale = t.init_scale;
                }
                t.rotation_accum = 0.0;
            }
            TrackEntryData::BlendShape(t) => t.value = t.init_value,
            TrackEntryData::Value(t) => {
                if !t.discrete {
                    t.value = t.init_value.clone();
                }
                t.rotation_accum = 0.0;
            }
            TrackEntryData::Bezier(t) => t.value = t.init_value,
            TrackEntryData::Method(_) | TrackEntryData::Animation(_) => {}
            TrackEntryData::Audio(t) => t.max_weight = 0.0,
        }
    }
}

/// The resolver output: path -> index map, the inverse path list, and the
/// entry arena, all index-aligned.
pub(crate) struct ResolvedTracks {
    pub track_map: FxHashMap<TrackPath, usize>,
    pub track_paths: Vec<TrackPath>,
    pub entries: Vec<TrackEntry>,
}

/// Resolves every track of every clip of the named player against the
/// current scene.
///
/// Clips are visited in name order (the player keeps them sorted), so index
/// assignment is deterministic: resolving twice without a structural change
/// yields an identical map. All failures are collected into one
/// [`SkeinError::InvalidState`] whose message lists every reason.
pub(crate) fn resolve(
    scene: &Scene,
    player_name: &str,
    root_motion_track: Option<&TrackPath>,
    setup_pass: u64,
) -> Result<ResolvedTracks> {
    let Some(player) = scene.get_player(player_name) else {
        return Err(SkeinError::InvalidState(format!(
            "Animation player not found: '{player_name}'"
        )));
    };

    let mut reasons: Vec<String> = Vec::new();
    let mut track_map: FxHashMap<TrackPath, usize> = FxHashMap::default();
    let mut track_paths: Vec<TrackPath> = Vec::new();
    let mut entries: Vec<TrackEntry> = Vec::new();

    for (clip_name, clip) in player.iter_clips() {
        for track in &clip.tracks {
            if let Some(&idx) = track_map.get(&track.path) {
                // Same path reused: kinds must stay in the same category.
                let entry = &mut entries[idx];
                match (&track.data, &mut entry.data) {
                    (TrackData::Position(_), TrackEntryData::Transform(t)) => {
                        t.position_used = true;
                    }
                    (TrackData::Rotation(_), TrackEntryData::Transform(t)) => {
                        t.rotation_used = true;
                    }
                    (TrackData::Scale(_), TrackEntryData::Transform(t)) => {
                        t.scale_used = true;
                    }
                    (TrackData::BlendShape(_), TrackEntryData::BlendShape(_))
                    | (TrackData::Value(_), TrackEntryData::Value(_))
                    | (TrackData::Bezier(_), TrackEntryData::Bezier(_))
                    | (TrackData::Method(_), TrackEntryData::Method(_))
                    | (TrackData::Audio(_), TrackEntryData::Audio(_))
                    | (TrackData::Animation(_), TrackEntryData::Animation(_)) => {}
                    (data, entry_data) => reasons.push(format!(
                        "clip '{clip_name}': track '{}' is a {} track but the path is already bound as {}",
                        track.path,
                        data.kind_name(),
                        entry_data.category()
                    )),
                }
                continue;
            }

            let data = match resolve_track(scene, player.root, clip_name, track) {
                Ok(data) => data,
                Err(reason) => {
                    reasons.push(reason);
                    continue;
                }
            };

            let root_motion = root_motion_track == Some(&track.path)
                && matches!(data, TrackEntryData::Transform(_));

            let idx = entries.len();
            track_map.insert(track.path.clone(), idx);
            track_paths.push(track.path.clone());
            entries.push(TrackEntry {
                setup_pass,
                process_pass: 0,
                root_motion,
                path: track.path.clone(),
                data,
            });
        }
    }

    if let Some(rm) = root_motion_track {
        match track_map.get(rm) {
            Some(&idx) if entries[idx].root_motion => {}
            Some(_) => reasons.push(format!("Root motion track '{rm}' is not a transform track")),
            None => reasons.push(format!("Root motion track not found: '{rm}'")),
        }
    }

    if reasons.is_empty() {
        Ok(ResolvedTracks {
            track_map,
            track_paths,
            entries,
        })
    } else {
        Err(SkeinError::InvalidState(reasons.join("\n")))
    }
}

fn resolve_track(
    scene: &Scene,
    root: NodeHandle,
    clip_name: &str,
    track: &crate::animation::clip::Track,
) -> std::result::Result<TrackEntryData, String> {
    let path = &track.path;

    // Animation tracks address another player by registry name, not a node.
    if let TrackData::Animation(_) = &track.data {
        if scene.get_player(&path.node).is_none() {
            return Err(format!(
                "clip '{clip_name}': animation track '{path}' references missing player '{}'",
                path.node
            ));
        }
        return Ok(TrackEntryData::Animation(AnimationEntry {
            player: path.node.clone(),
            playing: false,
        }));
    }

    let Some(node_handle) = scene.find_path(root, &path.node) else {
        return Err(format!(
            "clip '{clip_name}': track '{path}': node '{}' not found in scene",
            path.node
        ));
    };
    let node = scene
        .get_node(node_handle)
        .expect("find_path returned a live handle");

    match &track.data {
        TrackData::Position(_) | TrackData::Rotation(_) | TrackData::Scale(_) => {
            let (target, init) = if let Some(bone_name) = &path.subname {
                let Some(skeleton_key) = node.skeleton else {
                    return Err(format!(
                        "clip '{clip_name}': track '{path}': node '{}' has no skeleton",
                        node.name
                    ));
                };
                let Some(skeleton) = scene.skeletons.get(skeleton_key) else {
                    return Err(format!(
                        "clip '{clip_name}': track '{path}': node '{}' references a skeleton that no longer exists",
                        node.name
                    ));
                };
                let Some(bone) = skeleton.find_bone(bone_name) else {
                    return Err(format!(
                        "clip '{clip_name}': track '{path}': missing bone '{bone_name}' in skeleton '{}'",
                        skeleton.name
                    ));
                };
                let b = &skeleton.bones[bone];
                (
                    TransformTarget::Bone {
                        skeleton: skeleton_key,
                        bone,
                    },
                    (b.position, b.rotation, b.scale),
                )
            } else {
                let t = &node.transform;
                (
                    TransformTarget::Node(node_handle),
                    (t.position, t.rotation, t.scale),
                )
            };

            Ok(TrackEntryData::Transform(TransformEntry {
                target,
                init_position: init.0,
                init_rotation: init.1,
                init_scale: init.2,
                position: init.0,
                rotation: init.1,
                scale: init.2,
                rotation_accum: 0.0,
                position_used: matches!(track.data, TrackData::Position(_)),
                rotation_used: matches!(track.data, TrackData::Rotation(_)),
                scale_used: matches!(track.data, TrackData::Scale(_)),
            }))
        }
        TrackData::BlendShape(_) => {
            let Some(shape_name) = &path.subname else {
                return Err(format!(
                    "clip '{clip_name}': blend shape track '{path}' has no shape subname"
                ));
            };
            let Some(shape) = node.find_morph_channel(shape_name) else {
                return Err(format!(
                    "clip '{clip_name}': track '{path}': missing blend shape '{shape_name}' on node '{}'",
                    node.name
                ));
            };
            let init_value = node.morph_weights[shape];
            Ok(TrackEntryData::BlendShape(BlendShapeEntry {
                node: node_handle,
                shape,
                init_value,
                value: init_value,
            }))
        }
        TrackData::Value(value_track) => {
            let Some(property) = &path.subname else {
                return Err(format!(
                    "clip '{clip_name}': value track '{path}' has no property subname"
                ));
            };
            let init_value = match node.property(property) {
                Some(v) => v.clone(),
                None => value_track.values.first().cloned().ok_or_else(|| {
                    format!("clip '{clip_name}': value track '{path}' has no keys")
                })?,
            };
            Ok(TrackEntryData::Value(ValueEntry {
                node: node_handle,
                property: property.clone(),
                value: init_value.clone(),
                init_value,
                rotation_accum: 0.0,
                discrete: value_track.update == ValueUpdateMode::Discrete,
            }))
        }
        TrackData::Bezier(bezier_track) => {
            let Some(property) = &path.subname else {
                return Err(format!(
                    "clip '{clip_name}': bezier track '{path}' has no property subname"
                ));
            };
            let init_value = node
                .property(property)
                .and_then(PropertyValue::as_float)
                .or_else(|| bezier_track.keys.first().map(|k| k.value))
                .ok_or_else(|| {
                    format!("clip '{clip_name}': bezier track '{path}' has no keys")
                })?;
            Ok(TrackEntryData::Bezier(BezierEntry {
                node: node_handle,
                property: property.clone(),
                init_value,
                value: init_value,
            }))
        }
        TrackData::Method(_) => Ok(TrackEntryData::Method(MethodEntry { node: node_handle })),
        TrackData::Audio(_) => Ok(TrackEntryData::Audio(AudioEntry {
            node: node_handle,
            playing: false,
            remaining: None,
            max_weight: 0.0,
        })),
        TrackData::Animation(_) => unreachable!("handled above"),
    }
}
