//! The per-frame blend tree driver.
//!
//! [`AnimationTree`] owns the root node reference, the resolved track cache
//! and the per-instance parameter store. `advance` is the single entry point:
//! re-resolve if stale, evaluate the graph into the blend state, then commit
//! the accumulated samples into the scene.

use std::sync::Arc;

use glam::{Quat, Vec3};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::animation::cache::{
    self, TrackEntry, TrackEntryData, TransformTarget,
};
use crate::animation::clip::{
    self, ANIMATION_STOP_KEY, AnimationClip, LoopMode, TrackData, TrackPath, ValueUpdateMode,
};
use crate::animation::graph::{self, BlendContext, CMP_EPSILON, NodeScope};
use crate::animation::node::{AnimationNode, NodeKind};
use crate::animation::params::ParameterStore;
use crate::animation::state::{Activity, BlendState};
use crate::animation::tracks::{self, KeyframeCursor, KeyframeTrack};
use crate::animation::values::PropertyValue;
use crate::errors::{Result, SkeinError};
use crate::scene::{NodeHandle, Scene};

/// Side effects of trigger-style tracks, drained by the caller once per tick.
///
/// Audio playback and nested animation players are external collaborators;
/// the tree tells them what to do instead of doing it.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    MethodCall {
        node: NodeHandle,
        method: String,
        args: SmallVec<[PropertyValue; 4]>,
    },
    AudioStart {
        node: NodeHandle,
        stream: String,
        offset: f32,
    },
    AudioStop {
        node: NodeHandle,
    },
    AnimationPlay {
        player: String,
        animation: String,
        time: f32,
    },
    AnimationStop {
        player: String,
    },
}

/// Accumulated root-motion delta for the current tick.
///
/// When a root motion track is designated, its blended per-tick delta lands
/// here instead of being written to the scene, so the caller can warp the
/// character controller externally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMotion {
    pub position: Vec3,
    pub rotation: Quat,
    /// Additive scale delta (zero when no scale motion occurred).
    pub scale: Vec3,
}

impl Default for RootMotion {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ZERO,
        }
    }
}

/// Blend tree driver.
pub struct AnimationTree {
    root: Option<Arc<AnimationNode>>,
    player_name: String,
    active: bool,

    state: BlendState,
    params: ParameterStore,
    activity: FxHashMap<String, Vec<Activity>>,

    cache: Vec<TrackEntry>,
    cache_dirty: bool,
    cache_resolved: bool,
    /// Persistent sampling cursors keyed by (clip id, track index).
    cursors: FxHashMap<(Uuid, usize), KeyframeCursor>,

    config_error: Option<String>,
    events: Vec<TriggerEvent>,

    root_motion_track: Option<TrackPath>,
    root_motion: RootMotion,

    started: bool,
    setup_pass: u64,
    process_pass: u64,
    invalid_logged: bool,
}

impl AnimationTree {
    /// Creates a tree bound to the named animation player. The root node is
    /// assigned separately via [`set_root`](Self::set_root).
    #[must_use]
    pub fn new(player_name: &str) -> Self {
        Self {
            root: None,
            player_name: player_name.to_string(),
            active: true,
            state: BlendState::default(),
            params: ParameterStore::default(),
            activity: FxHashMap::default(),
            cache: Vec::new(),
            cache_dirty: true,
            cache_resolved: false,
            cursors: FxHashMap::default(),
            config_error: None,
            events: Vec::new(),
            root_motion_track: None,
            root_motion: RootMotion::default(),
            started: true,
            setup_pass: 1,
            process_pass: 1,
            invalid_logged: false,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Assigns the root node, registering per-instance parameters and
    /// validating the wiring (unconnected inputs, dangling names, cycles).
    ///
    /// On a wiring error the root is kept but the tree goes invalid:
    /// `advance` degrades to a no-op until a valid root is assigned.
    pub fn set_root(&mut self, root: AnimationNode) -> Result<()> {
        self.set_root_shared(Arc::new(root))
    }

    /// Same as [`set_root`](Self::set_root) for an already shared asset.
    /// Sharing is safe: all per-instance state lives in this tree.
    pub fn set_root_shared(&mut self, root: Arc<AnimationNode>) -> Result<()> {
        self.params.clear();
        self.activity.clear();
        self.cache_dirty = true;
        self.started = true;
        self.invalid_logged = false;

        let mut reasons = Vec::new();
        if !root.inputs.is_empty() {
            reasons.push(format!(
                "root node ({}) must not have inputs",
                root.caption()
            ));
        }
        if let NodeKind::BlendTree(tree) = &root.kind {
            tree.validate("", &mut reasons);
        }
        Self::register_parameters(&mut self.params, &mut self.activity, &root, "parameters/");
        self.root = Some(root);

        if reasons.is_empty() {
            self.config_error = None;
            Ok(())
        } else {
            let joined = reasons.join("\n");
            self.state.make_invalid(&joined);
            self.config_error = Some(joined.clone());
            Err(SkeinError::InvalidConfiguration(joined))
        }
    }

    #[must_use]
    pub fn root(&self) -> Option<&Arc<AnimationNode>> {
        self.root.as_ref()
    }

    /// Rebinds the tree to another animation player.
    pub fn set_animation_player(&mut self, name: &str) {
        self.player_name = name.to_string();
        self.cache_dirty = true;
    }

    #[must_use]
    pub fn animation_player(&self) -> &str {
        &self.player_name
    }

    /// Structural-change notification: the scene hierarchy, a skeleton, or
    /// the bound player's clip set changed. Coalesced — any number of calls
    /// within one tick trigger a single re-resolution on the next `advance`.
    pub fn mark_scene_changed(&mut self) {
        self.cache_dirty = true;
    }

    /// Designates the transform track whose blended delta is extracted as
    /// root motion instead of being committed to the scene.
    pub fn set_root_motion_track(&mut self, track: Option<TrackPath>) {
        self.root_motion_track = track;
        self.cache_dirty = true;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Sets a per-instance parameter (`parameters/<node path>/<name>`).
    pub fn set_parameter(&mut self, path: &str, value: PropertyValue) -> Result<()> {
        self.params.set(path, value)
    }

    #[must_use]
    pub fn get_parameter(&self, path: &str) -> Option<&PropertyValue> {
        self.params.get(path)
    }

    /// The full parameter store, for introspection.
    #[must_use]
    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    #[must_use]
    pub fn is_state_invalid(&self) -> bool {
        !self.state.valid
    }

    #[must_use]
    pub fn invalid_state_reason(&self) -> &str {
        &self.state.invalid_reasons
    }

    /// Contribution weight of one input connection during the last pass,
    /// or 0 if the connection was not evaluated.
    #[must_use]
    pub fn connection_activity(&self, path: &str, input: usize) -> f32 {
        self.activity
            .get(path)
            .and_then(|records| records.get(input))
            .map_or(0.0, |record| {
                if record.last_pass == self.process_pass {
                    record.activity
                } else {
                    0.0
                }
            })
    }

    /// Root motion accumulated during the last `advance`.
    #[must_use]
    pub fn root_motion(&self) -> &RootMotion {
        &self.root_motion
    }

    /// Drains trigger events (method calls, audio and nested-animation
    /// commands) emitted by the last `advance`.
    pub fn drain_events(&mut self) -> Vec<TriggerEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // The per-tick drive
    // ========================================================================

    /// Advances the whole tree by `delta` seconds and commits the blended
    /// pose into `scene`.
    ///
    /// Configuration problems never panic here: an invalid tree leaves the
    /// previously committed pose untouched and reports through
    /// [`is_state_invalid`](Self::is_state_invalid).
    pub fn advance(&mut self, scene: &mut Scene, delta: f32) {
        if !self.active {
            return;
        }
        let Some(root) = self.root.clone() else {
            return;
        };
        if self.config_error.is_some() {
            self.log_invalid_once();
            return;
        }

        // 1. Re-resolve the track cache if a structural change is pending.
        if self.cache_dirty {
            self.cache_dirty = false;
            self.setup_pass += 1;
            self.state.clear_tracks();
            self.state.invalid_reasons.clear();
            self.cache.clear();
            self.cursors.clear();
            match cache::resolve(
                scene,
                &self.player_name,
                self.root_motion_track.as_ref(),
                self.setup_pass,
            ) {
                Ok(resolved) => {
                    debug_assert!(
                        resolved.entries.iter().all(|e| e.setup_pass == self.setup_pass)
                    );
                    self.state.track_count = resolved.entries.len();
                    self.state.track_map = resolved.track_map;
                    self.state.track_paths = resolved.track_paths;
                    self.cache = resolved.entries;
                    self.state.valid = true;
                    self.cache_resolved = true;
                    self.invalid_logged = false;
                    debug!(
                        "resolved {} tracks against player '{}' (setup pass {})",
                        self.state.track_count, self.player_name, self.setup_pass
                    );
                }
                Err(err) => {
                    self.state.make_invalid(&err.to_string());
                    self.cache_resolved = false;
                }
            }
        }
        if !self.cache_resolved {
            self.log_invalid_once();
            return;
        }

        // 2. Reset the per-tick accumulator.
        self.process_pass += 1;
        self.state.reset_pass();
        self.state.valid = true;
        self.state.invalid_reasons.clear();
        let root_slot = self.state.push_weights(vec![1.0; self.state.track_count]);

        // 3. Evaluate the graph into the blend state.
        let Some(player) = scene.get_player(&self.player_name) else {
            self.state
                .make_invalid(&format!("Animation player not found: '{}'", self.player_name));
            self.log_invalid_once();
            return;
        };
        {
            let mut ctx = BlendContext {
                state: &mut self.state,
                params: &mut self.params,
                activity: &mut self.activity,
                player,
                process_pass: self.process_pass,
            };
            if self.started {
                // Initial seek to 0 primes the leaf cursors; its samples are
                // discarded so the first committed pose is the delta pose.
                graph::process_node(
                    &mut ctx, &root, "parameters/", &NodeScope::ROOT, root_slot, 0.0, true, false,
                );
                ctx.state.animation_states.clear();
            }
            graph::process_node(
                &mut ctx, &root, "parameters/", &NodeScope::ROOT, root_slot, delta, false, false,
            );
        }
        self.started = false;
        self.state.last_pass = self.process_pass;

        if !self.state.valid {
            self.log_invalid_once();
            return;
        }
        self.invalid_logged = false;

        // 4. Commit the accumulated samples.
        self.root_motion = RootMotion::default();
        Self::commit_pass(
            scene,
            &self.state,
            &mut self.cache,
            &mut self.cursors,
            &mut self.events,
            &mut self.root_motion,
            self.process_pass,
            delta,
        );
    }

    fn log_invalid_once(&mut self) {
        if !self.invalid_logged {
            warn!(
                "animation tree is in an invalid state, skipping advance: {}",
                if self.state.invalid_reasons.is_empty() {
                    self.config_error.as_deref().unwrap_or("unknown reason")
                } else {
                    &self.state.invalid_reasons
                }
            );
            self.invalid_logged = true;
        }
    }

    fn register_parameters(
        params: &mut ParameterStore,
        activity: &mut FxHashMap<String, Vec<Activity>>,
        node: &AnimationNode,
        base: &str,
    ) {
        for info in node.parameter_list() {
            params.declare(format!("{base}{}", info.name), info.default);
        }
        if !node.inputs.is_empty() {
            activity.insert(
                base.trim_end_matches('/').to_string(),
                vec![Activity::default(); node.inputs.len()],
            );
        }
        if let NodeKind::BlendTree(tree) = &node.kind {
            for (name, entry) in &tree.nodes {
                let child_base = format!("{base}{name}/");
                Self::register_parameters(params, activity, &entry.node, &child_base);
            }
        }
    }

    // ========================================================================
    // Commit pass
    // ========================================================================

    fn commit_pass(
        scene: &mut Scene,
        state: &BlendState,
        cache: &mut [TrackEntry],
        cursors: &mut FxHashMap<(Uuid, usize), KeyframeCursor>,
        events: &mut Vec<TriggerEvent>,
        root_motion: &mut RootMotion,
        process_pass: u64,
        tick_delta: f32,
    ) {
        let mut window: Vec<usize> = Vec::new();

        // Accumulation: fold every animation state into the touched entries.
        for astate in &state.animation_states {
            let clip = &astate.clip;
            for (track_idx, track) in clip.tracks.iter().enumerate() {
                let Some(&idx) = state.track_map.get(&track.path) else {
                    // Track unresolved this session (stale during a pending
                    // re-resolution); skip.
                    continue;
                };
                let weight = state.weights(astate.slot)[idx];
                let entry = &mut cache[idx];
                if entry.process_pass != process_pass {
                    entry.reset_for_pass(process_pass);
                }
                let is_root_motion = entry.root_motion;

                match (&track.data, &mut entry.data) {
                    (TrackData::Position(t), TrackEntryData::Transform(te)) => {
                        if is_root_motion {
                            if let Some(delta_pos) =
                                root_motion_delta_vec3(t, clip, astate.time, astate.delta, astate.pingponged, astate.seeked)
                            {
                                te.position += delta_pos * weight;
                            }
                        } else if weight.abs() > CMP_EPSILON {
                            let cursor = cursors.entry((clip.id, track_idx)).or_default();
                            let v = t.sample_with_cursor(astate.time, cursor);
                            te.position += (v - te.init_position) * weight;
                        }
                    }
                    (TrackData::Rotation(t), TrackEntryData::Transform(te)) => {
                        if is_root_motion {
                            if let Some(delta_rot) =
                                root_motion_delta_quat(t, clip, astate.time, astate.delta, astate.pingponged, astate.seeked)
                            {
                                te.rotation =
                                    (te.rotation * Quat::IDENTITY.slerp(delta_rot, weight)).normalize();
                            }
                        } else if weight.abs() > CMP_EPSILON {
                            let cursor = cursors.entry((clip.id, track_idx)).or_default();
                            let v = t.sample_with_cursor(astate.time, cursor);
                            // Progressive normalized slerp: a complementary
                            // pair of weights lands on the exact slerp.
                            if te.rotation_accum == 0.0 {
                                te.rotation = v;
                                te.rotation_accum = weight;
                            } else {
                                let total = te.rotation_accum + weight;
                                // Cancelling weights (additive stacks) would
                                // divide by zero; drop the contribution.
                                if total.abs() > CMP_EPSILON {
                                    te.rotation = v
                                        .slerp(te.rotation, te.rotation_accum / total)
                                        .normalize();
                                    te.rotation_accum = total;
                                }
                            }
                        }
                    }
                    (TrackData::Scale(t), TrackEntryData::Transform(te)) => {
                        if is_root_motion {
                            if let Some(delta_scale) =
                                root_motion_delta_vec3(t, clip, astate.time, astate.delta, astate.pingponged, astate.seeked)
                            {
                                te.scale += delta_scale * weight;
                            }
                        } else if weight.abs() > CMP_EPSILON {
                            let cursor = cursors.entry((clip.id, track_idx)).or_default();
                            let v = t.sample_with_cursor(astate.time, cursor);
                            te.scale += (v - te.init_scale) * weight;
                        }
                    }
                    (TrackData::BlendShape(t), TrackEntryData::BlendShape(te)) => {
                        if weight.abs() > CMP_EPSILON {
                            let cursor = cursors.entry((clip.id, track_idx)).or_default();
                            let v = t.sample_with_cursor(astate.time, cursor);
                            te.value += (v - te.init_value) * weight;
                        }
                    }
                    (TrackData::Value(vt), TrackEntryData::Value(te)) => {
                        if weight.abs() <= CMP_EPSILON {
                            continue;
                        }
                        match vt.update {
                            ValueUpdateMode::Continuous => {
                                let Some(v) = vt.sample(astate.time) else {
                                    continue;
                                };
                                blend_value(te, &v, weight);
                            }
                            ValueUpdateMode::Discrete => {
                                if astate.seeked {
                                    if let Some(v) = vt.sample(astate.time) {
                                        te.value = v;
                                    }
                                } else {
                                    clip::trigger_window(
                                        &vt.times, astate.time, astate.delta, clip.length,
                                        clip.loop_mode, astate.pingponged, &mut window,
                                    );
                                    // Last writer wins within one tick.
                                    if let Some(&key) = window.last() {
                                        te.value = vt.values[key].clone();
                                    }
                                }
                            }
                        }
                    }
                    (TrackData::Bezier(bt), TrackEntryData::Bezier(te)) => {
                        if weight.abs() > CMP_EPSILON {
                            let v = bt.sample(astate.time);
                            te.value += (v - te.init_value) * weight;
                        }
                    }
                    (TrackData::Method(mt), TrackEntryData::Method(te)) => {
                        // All matching keys fire, in graph-traversal order.
                        if weight.abs() <= CMP_EPSILON || astate.seeked {
                            continue;
                        }
                        clip::trigger_window(
                            &mt.times, astate.time, astate.delta, clip.length,
                            clip.loop_mode, astate.pingponged, &mut window,
                        );
                        for &key in &window {
                            let k = &mt.keys[key];
                            events.push(TriggerEvent::MethodCall {
                                node: te.node,
                                method: k.method.clone(),
                                args: k.args.clone(),
                            });
                        }
                    }
                    (TrackData::Audio(at), TrackEntryData::Audio(te)) => {
                        te.max_weight = te.max_weight.max(weight.abs());
                        if weight.abs() <= CMP_EPSILON {
                            continue;
                        }
                        if astate.seeked {
                            // A seek landing inside a key window starts the
                            // stream mid-way.
                            if let Some(key) =
                                tracks::key_index_at_or_before(&at.times, astate.time)
                            {
                                let k = &at.keys[key];
                                let into = astate.time - at.times[key];
                                if k.duration <= 0.0 || into < k.duration {
                                    events.push(TriggerEvent::AudioStart {
                                        node: te.node,
                                        stream: k.stream.clone(),
                                        offset: k.start_offset + into,
                                    });
                                    te.playing = true;
                                    te.remaining =
                                        (k.duration > 0.0).then(|| k.duration - into);
                                }
                            }
                        } else {
                            clip::trigger_window(
                                &at.times, astate.time, astate.delta, clip.length,
                                clip.loop_mode, astate.pingponged, &mut window,
                            );
                            for &key in &window {
                                let k = &at.keys[key];
                                events.push(TriggerEvent::AudioStart {
                                    node: te.node,
                                    stream: k.stream.clone(),
                                    offset: k.start_offset,
                                });
                                te.playing = true;
                                te.remaining = (k.duration > 0.0).then_some(k.duration);
                            }
                        }
                    }
                    (TrackData::Animation(at), TrackEntryData::Animation(te)) => {
                        if astate.seeked {
                            if let Some(key) =
                                tracks::key_index_at_or_before(&at.times, astate.time)
                            {
                                let name = &at.keys[key];
                                if name == ANIMATION_STOP_KEY || name.is_empty() {
                                    if te.playing {
                                        events.push(TriggerEvent::AnimationStop {
                                            player: te.player.clone(),
                                        });
                                        te.playing = false;
                                    }
                                } else {
                                    events.push(TriggerEvent::AnimationPlay {
                                        player: te.player.clone(),
                                        animation: name.clone(),
                                        time: astate.time - at.times[key],
                                    });
                                    te.playing = true;
                                }
                            }
                        } else {
                            clip::trigger_window(
                                &at.times, astate.time, astate.delta, clip.length,
                                clip.loop_mode, astate.pingponged, &mut window,
                            );
                            for &key in &window {
                                let name = &at.keys[key];
                                if name == ANIMATION_STOP_KEY || name.is_empty() {
                                    if te.playing {
                                        events.push(TriggerEvent::AnimationStop {
                                            player: te.player.clone(),
                                        });
                                        te.playing = false;
                                    }
                                } else {
                                    events.push(TriggerEvent::AnimationPlay {
                                        player: te.player.clone(),
                                        animation: name.clone(),
                                        time: 0.0,
                                    });
                                    te.playing = true;
                                }
                            }
                        }
                    }
                    // Kind mismatches are rejected at resolution time.
                    _ => {}
                }
            }
        }

        // Write-out: push committed values to their targets; handle stale
        // entries (untouched this pass).
        for entry in cache.iter_mut() {
            if entry.process_pass != process_pass {
                // Stale: a playing trigger track that lost all contributors
                // is stopped; everything else is simply skipped.
                match &mut entry.data {
                    TrackEntryData::Audio(te) if te.playing => {
                        debug!("audio track '{}' lost all contributors, stopping", entry.path);
                        events.push(TriggerEvent::AudioStop { node: te.node });
                        te.playing = false;
                    }
                    TrackEntryData::Animation(te) if te.playing => {
                        debug!(
                            "animation track '{}' lost all contributors, stopping",
                            entry.path
                        );
                        events.push(TriggerEvent::AnimationStop {
                            player: te.player.clone(),
                        });
                        te.playing = false;
                    }
                    _ => {}
                }
                continue;
            }

            match &mut entry.data {
                TrackEntryData::Transform(te) => {
                    if entry.root_motion {
                        // Report pure deltas: the entry accumulates on top of
                        // the captured init transform every pass.
                        root_motion.position = te.position - te.init_position;
                        root_motion.rotation =
                            (te.init_rotation.inverse() * te.rotation).normalize();
                        root_motion.scale = te.scale - te.init_scale;
                        continue;
                    }
                    match te.target {
                        TransformTarget::Node(handle) => {
                            if let Some(node) = scene.get_node_mut(handle) {
                                if te.position_used {
                                    node.transform.position = te.position;
                                }
                                if te.rotation_used {
                                    node.transform.rotation = te.rotation;
                                }
                                if te.scale_used {
                                    node.transform.scale = te.scale;
                                }
                                node.transform.mark_dirty();
                            }
                        }
                        TransformTarget::Bone { skeleton, bone } => {
                            if let Some(b) = scene
                                .skeletons
                                .get_mut(skeleton)
                                .and_then(|s| s.bone_mut(bone))
                            {
                                if te.position_used {
                                    b.position = te.position;
                                }
                                if te.rotation_used {
                                    b.rotation = te.rotation;
                                }
                                if te.scale_used {
                                    b.scale = te.scale;
                                }
                            }
                        }
                    }
                }
                TrackEntryData::BlendShape(te) => {
                    if let Some(node) = scene.get_node_mut(te.node) {
                        if let Some(slot) = node.morph_weights.get_mut(te.shape) {
                            *slot = te.value;
                        }
                    }
                }
                TrackEntryData::Value(te) => {
                    if let Some(node) = scene.get_node_mut(te.node) {
                        node.set_property(&te.property, te.value.clone());
                    }
                }
                TrackEntryData::Bezier(te) => {
                    if let Some(node) = scene.get_node_mut(te.node) {
                        node.set_property(&te.property, PropertyValue::Float(te.value));
                    }
                }
                TrackEntryData::Method(_) => {}
                TrackEntryData::Audio(te) => {
                    if te.playing {
                        if te.max_weight <= CMP_EPSILON {
                            events.push(TriggerEvent::AudioStop { node: te.node });
                            te.playing = false;
                        } else if let Some(remaining) = te.remaining.as_mut() {
                            *remaining -= tick_delta;
                            if *remaining <= 0.0 {
                                events.push(TriggerEvent::AudioStop { node: te.node });
                                te.playing = false;
                                te.remaining = None;
                            }
                        }
                    }
                }
                TrackEntryData::Animation(_) => {}
            }
        }
    }
}

/// Blends one sampled value into a value entry, init-relative for numeric
/// variants and last-wins for everything else.
fn blend_value(te: &mut cache::ValueEntry, sample: &PropertyValue, weight: f32) {
    match (&mut te.value, sample, &te.init_value) {
        (PropertyValue::Float(cur), PropertyValue::Float(v), PropertyValue::Float(init)) => {
            *cur += (v - init) * weight;
        }
        (PropertyValue::Vec3(cur), PropertyValue::Vec3(v), PropertyValue::Vec3(init)) => {
            *cur += (*v - *init) * weight;
        }
        (PropertyValue::Quat(cur), PropertyValue::Quat(v), PropertyValue::Quat(_)) => {
            if te.rotation_accum == 0.0 {
                *cur = *v;
                te.rotation_accum = weight;
            } else {
                let total = te.rotation_accum + weight;
                *cur = v.slerp(*cur, te.rotation_accum / total).normalize();
                te.rotation_accum = total;
            }
        }
        (cur, v, _) => *cur = v.clone(),
    }
}

/// Per-tick delta of a vector track, honoring loop wrap.
fn root_motion_delta_vec3(
    track: &KeyframeTrack<Vec3>,
    clip: &AnimationClip,
    time: f32,
    delta: f32,
    pingponged: i8,
    seeked: bool,
) -> Option<Vec3> {
    if seeked || delta == 0.0 {
        return None;
    }
    let length = clip.length;
    match pingponged {
        // Net displacement over a bounce is the plain difference between the
        // reflected endpoints.
        1 => Some(track.sample(time) - track.sample((2.0 * length - time - delta).clamp(0.0, length))),
        -1 => Some(track.sample(time) - track.sample((-time - delta).clamp(0.0, length))),
        _ => {
            let prev = time - delta;
            if clip.loop_mode == LoopMode::Loop && prev < 0.0 {
                // Forward wrap: tail segment plus head segment.
                Some(
                    (track.sample(length) - track.sample(prev + length))
                        + (track.sample(time) - track.sample(0.0)),
                )
            } else if clip.loop_mode == LoopMode::Loop && prev > length {
                // Backward wrap.
                Some(
                    (track.sample(0.0) - track.sample(prev - length))
                        + (track.sample(time) - track.sample(length)),
                )
            } else {
                Some(track.sample(time) - track.sample(prev.clamp(0.0, length)))
            }
        }
    }
}

/// Per-tick delta of a rotation track, honoring loop wrap.
fn root_motion_delta_quat(
    track: &KeyframeTrack<Quat>,
    clip: &AnimationClip,
    time: f32,
    delta: f32,
    pingponged: i8,
    seeked: bool,
) -> Option<Quat> {
    if seeked || delta == 0.0 {
        return None;
    }
    let length = clip.length;
    let diff = |from: f32, to: f32| track.sample(from).inverse() * track.sample(to);
    match pingponged {
        1 => Some(diff((2.0 * length - time - delta).clamp(0.0, length), time)),
        -1 => Some(diff((-time - delta).clamp(0.0, length), time)),
        _ => {
            let prev = time - delta;
            if clip.loop_mode == LoopMode::Loop && prev < 0.0 {
                Some((diff(prev + length, length) * diff(0.0, time)).normalize())
            } else if clip.loop_mode == LoopMode::Loop && prev > length {
                Some((diff(prev - length, 0.0) * diff(length, time)).normalize())
            } else {
                Some(diff(prev.clamp(0.0, length), time))
            }
        }
    }
}
