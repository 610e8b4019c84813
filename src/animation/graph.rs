//! Recursive blend graph evaluation.
//!
//! Evaluation threads an explicit mutable [`BlendContext`] through the node
//! recursion: composite nodes derive filtered/scaled weight vectors for their
//! children, leaves append [`AnimationState`](crate::animation::AnimationState)
//! samples, and everything lands in the shared
//! [`BlendState`](crate::animation::BlendState) consumed by the commit pass.
//! Nodes themselves stay immutable shared assets; per-instance cursors live
//! in the tree's [`ParameterStore`].

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::animation::clip::{AnimationClip, LoopMode};
use crate::animation::node::{
    AnimationNode, BlendTree, FilterAction, NodeKind, OUTPUT_NODE, PARAM_ADD_AMOUNT,
    PARAM_BLEND_AMOUNT, PARAM_FORWARD, PARAM_SCALE, PARAM_TIME,
};
use crate::animation::params::ParameterStore;
use crate::animation::player::AnimationPlayer;
use crate::animation::state::{Activity, AnimationState, BlendSlot, BlendState};
use crate::animation::values::PropertyValue;

/// Weights below this threshold are treated as silent.
pub(crate) const CMP_EPSILON: f32 = 1e-5;

/// Mutable evaluation context for one `advance` call.
pub(crate) struct BlendContext<'a> {
    pub state: &'a mut BlendState,
    pub params: &'a mut ParameterStore,
    pub activity: &'a mut FxHashMap<String, Vec<Activity>>,
    pub player: &'a AnimationPlayer,
    pub process_pass: u64,
}

/// Where a node sits while being evaluated: the enclosing blend tree (for
/// input resolution) and that tree's parameter prefix, plus this node's own
/// connection list within it.
pub(crate) struct NodeScope<'a> {
    pub tree: Option<&'a BlendTree>,
    pub base: &'a str,
    pub connections: &'a [Option<String>],
}

impl NodeScope<'_> {
    pub(crate) const ROOT: NodeScope<'static> = NodeScope {
        tree: None,
        base: "parameters/",
        connections: &[],
    };
}

/// Evaluates one node, returning the time actually consumed by its subtree
/// this tick (0 on a pure seek; sign flips after a ping-pong bounce).
pub(crate) fn process_node(
    ctx: &mut BlendContext,
    node: &AnimationNode,
    own_base: &str,
    scope: &NodeScope,
    slot: BlendSlot,
    time: f32,
    seek: bool,
    seek_root: bool,
) -> f32 {
    match &node.kind {
        NodeKind::Animation { animation } => {
            process_animation(ctx, animation, own_base, slot, time, seek, seek_root)
        }
        NodeKind::Blend2 => {
            let amount = ctx
                .params
                .get_float(&format!("{own_base}{PARAM_BLEND_AMOUNT}"));
            let rem0 = blend_input(
                ctx, node, own_base, scope, 0, slot, time, seek, seek_root,
                1.0 - amount, FilterAction::Blend, true,
            );
            let rem1 = blend_input(
                ctx, node, own_base, scope, 1, slot, time, seek, seek_root,
                amount, FilterAction::Pass, true,
            );
            if amount > 0.5 { rem1 } else { rem0 }
        }
        NodeKind::Add2 { sync } => {
            let amount = ctx
                .params
                .get_float(&format!("{own_base}{PARAM_ADD_AMOUNT}"));
            let rem = blend_input(
                ctx, node, own_base, scope, 0, slot, time, seek, seek_root,
                1.0, FilterAction::Ignore, true,
            );
            blend_input(
                ctx, node, own_base, scope, 1, slot, time, seek, seek_root,
                amount, FilterAction::Pass, *sync,
            );
            rem
        }
        NodeKind::TimeScale => {
            let scale = ctx.params.get_float(&format!("{own_base}{PARAM_SCALE}"));
            let child_time = if seek { time } else { time * scale };
            let rem = blend_input(
                ctx, node, own_base, scope, 0, slot, child_time, seek, seek_root,
                1.0, FilterAction::Ignore, true,
            );
            if scale.abs() > CMP_EPSILON { rem / scale.abs() } else { 0.0 }
        }
        NodeKind::BlendTree(tree) => {
            // Always present: BlendTree::new seeds the output sentinel.
            let Some(entry) = tree.get(OUTPUT_NODE) else {
                ctx.state
                    .make_invalid(&format!("{own_base}: blend tree has no output node"));
                return 0.0;
            };
            let child_base = format!("{own_base}{OUTPUT_NODE}/");
            let child_scope = NodeScope {
                tree: Some(tree),
                base: own_base,
                connections: &entry.connections,
            };
            process_node(
                ctx, &entry.node, &child_base, &child_scope, slot, time, seek, seek_root,
            )
        }
        NodeKind::Output => blend_input(
            ctx, node, own_base, scope, 0, slot, time, seek, seek_root,
            1.0, FilterAction::Ignore, true,
        ),
        NodeKind::Start | NodeKind::End => 0.0,
    }
}

/// The core recursive primitive: evaluates the child wired into `input`,
/// scaling and filtering its per-track contribution weights.
///
/// Filter semantics (consulted only when the node has filtering enabled and
/// the action is not `Ignore`):
/// - `Pass`: only filtered sub-paths contribute, scaled by `blend`
/// - `Stop`: filtered sub-paths are zeroed outright
/// - `Blend`: filtered sub-paths are scaled by `blend`, the rest stay at the
///   parent weight (so a cross-fade pair touches only its filtered sub-paths)
///
/// Sync semantics: a synced child follows the parent's time cursor and seek
/// flags verbatim; an unsynced child advances only by wall delta through its
/// own cursor and never sees parent seeks.
///
/// # Panics
///
/// Panics if `input` is out of range for `node` — that is a programming
/// error, not a configuration error.
pub(crate) fn blend_input(
    ctx: &mut BlendContext,
    node: &AnimationNode,
    own_base: &str,
    scope: &NodeScope,
    input: usize,
    slot: BlendSlot,
    time: f32,
    seek: bool,
    seek_root: bool,
    blend: f32,
    filter: FilterAction,
    sync: bool,
) -> f32 {
    assert!(
        input < node.inputs.len(),
        "blend_input: input {input} out of range for {} node",
        node.caption()
    );

    let Some(tree) = scope.tree else {
        ctx.state
            .make_invalid("Node with inputs evaluated outside a blend tree");
        return 0.0;
    };
    let Some(source) = scope.connections.get(input).and_then(Option::as_ref) else {
        ctx.state.make_invalid(&format!(
            "{own_base}: no node connected to input {input}"
        ));
        return 0.0;
    };
    let Some(entry) = tree.get(source) else {
        ctx.state.make_invalid(&format!(
            "{own_base}: input {input} references missing node '{source}'"
        ));
        return 0.0;
    };

    // Derive the child's per-track weights from this node's slot.
    let use_filter = node.filter_enabled && filter != FilterAction::Ignore;
    let mut weights = ctx.state.weights(slot).to_vec();
    if use_filter {
        for (i, w) in weights.iter_mut().enumerate() {
            let filtered = node.is_path_filtered(&ctx.state.track_paths[i]);
            *w = match filter {
                FilterAction::Ignore => *w * blend,
                FilterAction::Pass => {
                    if filtered { *w * blend } else { 0.0 }
                }
                FilterAction::Stop => {
                    if filtered { 0.0 } else { *w * blend }
                }
                FilterAction::Blend => {
                    if filtered { *w * blend } else { *w }
                }
            };
        }
    } else {
        for w in &mut weights {
            *w *= blend;
        }
    }

    // Liveness record for this connection, keyed by the node instance path.
    let activity_key = own_base.trim_end_matches('/');
    if let Some(records) = ctx.activity.get_mut(activity_key) {
        if let Some(record) = records.get_mut(input) {
            record.last_pass = ctx.process_pass;
            record.activity = blend.clamp(0.0, 1.0);
        }
    }

    let (child_time, child_seek) = if sync {
        (time, seek)
    } else if seek {
        // Unsynced children keep their own cursor through parent seeks.
        (0.0, false)
    } else {
        (time, false)
    };

    let child_slot = ctx.state.push_weights(weights);
    let child_base = format!("{}{}/", scope.base, source);
    let child_scope = NodeScope {
        tree: Some(tree),
        base: scope.base,
        connections: &entry.connections,
    };
    process_node(
        ctx,
        &entry.node,
        &child_base,
        &child_scope,
        child_slot,
        child_time,
        child_seek,
        seek_root,
    )
}

/// Leaf primitive: appends one [`AnimationState`] sample carrying the clip,
/// its local time/step and the node's weight slot.
pub(crate) fn blend_animation(
    ctx: &mut BlendContext,
    clip: Arc<AnimationClip>,
    time: f32,
    delta: f32,
    seeked: bool,
    seek_root: bool,
    blend: f32,
    pingponged: i8,
    slot: BlendSlot,
) {
    ctx.state.animation_states.push(AnimationState {
        clip,
        time,
        delta,
        slot,
        blend,
        seeked,
        seek_root,
        pingponged,
    });
}

/// Leaf node: advances the per-instance play cursor through the clip's loop
/// mode and contributes one sample.
fn process_animation(
    ctx: &mut BlendContext,
    animation: &str,
    own_base: &str,
    slot: BlendSlot,
    time: f32,
    seek: bool,
    seek_root: bool,
) -> f32 {
    let Some(clip) = ctx.player.get_clip(animation) else {
        ctx.state
            .make_invalid(&format!("Animation not found: '{animation}'"));
        return 0.0;
    };
    let clip = Arc::clone(clip);
    let length = clip.length;
    if length <= 0.0 {
        return 0.0;
    }

    let time_key = format!("{own_base}{PARAM_TIME}");
    let forward_key = format!("{own_base}{PARAM_FORWARD}");
    let prev = ctx.params.get_float(&time_key);
    let forward = ctx.params.get_bool(&forward_key);

    let mut pingponged = 0_i8;
    let (cur, step, consumed, new_forward) = if seek {
        (time.clamp(0.0, length), 0.0, 0.0, forward)
    } else {
        match clip.loop_mode {
            LoopMode::Once => {
                // The sample step is the clamped consumed time, not the raw
                // tick delta: once the cursor pins at an end, the step drops
                // to zero so trigger windows close and root motion stops.
                let cur = (prev + time).clamp(0.0, length);
                let step = cur - prev;
                (cur, step, step, true)
            }
            LoopMode::Loop => {
                let cur = (prev + time).rem_euclid(length);
                (cur, time, time, true)
            }
            LoopMode::PingPong => {
                let step = if forward { time } else { -time };
                let raw = prev + step;
                let (cur, next_forward) = if raw > length {
                    pingponged = 1;
                    ((2.0 * length - raw).clamp(0.0, length), false)
                } else if raw < 0.0 {
                    pingponged = -1;
                    ((-raw).clamp(0.0, length), true)
                } else {
                    (raw, forward)
                };
                (cur, step, step, next_forward)
            }
        }
    };

    blend_animation(ctx, clip, cur, step, seek, seek_root, 1.0, pingponged, slot);

    ctx.params
        .set_internal(&time_key, PropertyValue::Float(cur));
    ctx.params
        .set_internal(&forward_key, PropertyValue::Bool(new_forward));

    consumed
}
