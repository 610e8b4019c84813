use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::clip::TrackPath;
use crate::animation::values::PropertyValue;
use crate::errors::{Result, SkeinError};

/// How a composite node's path filter applies to one of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    /// Merge unconditionally; the filter is not consulted.
    Ignore,
    /// Merge only sub-paths marked in the filter; others contribute zero.
    Pass,
    /// Zero out filtered sub-paths; others merge normally.
    Stop,
    /// Cross-fade: filtered sub-paths are scaled by the input weight,
    /// unfiltered sub-paths keep the parent weight untouched.
    Blend,
}

/// A named input slot.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
}

/// A declared, typed parameter with its default value. Parameters are
/// namespaced per tree instance by prefixing the node's structural path, so
/// one shared node asset never carries per-instance state.
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub default: PropertyValue,
}

pub(crate) const PARAM_TIME: &str = "time";
pub(crate) const PARAM_FORWARD: &str = "forward";
pub(crate) const PARAM_BLEND_AMOUNT: &str = "blend_amount";
pub(crate) const PARAM_ADD_AMOUNT: &str = "add_amount";
pub(crate) const PARAM_SCALE: &str = "scale";

/// Name of the designated output node inside every blend tree.
pub const OUTPUT_NODE: &str = "output";

// ============================================================================
// Blend tree container
// ============================================================================

#[derive(Debug, Clone)]
pub struct BlendTreeEntry {
    pub node: Arc<AnimationNode>,
    /// One slot per input of `node`; `None` means unconnected.
    pub connections: Vec<Option<String>>,
}

/// Named child nodes of a blend-tree container, wired by per-input
/// connection lists. The designated [`OUTPUT_NODE`] drains the graph.
#[derive(Debug, Clone, Default)]
pub struct BlendTree {
    pub(crate) nodes: FxHashMap<String, BlendTreeEntry>,
}

impl BlendTree {
    /// Creates an empty tree containing only the output sentinel.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = FxHashMap::default();
        nodes.insert(
            OUTPUT_NODE.to_string(),
            BlendTreeEntry {
                node: Arc::new(AnimationNode::output()),
                connections: vec![None],
            },
        );
        Self { nodes }
    }

    /// Adds a named node.
    pub fn add_node(&mut self, name: &str, node: AnimationNode) -> Result<()> {
        if self.nodes.contains_key(name) {
            return Err(SkeinError::DuplicateNodeName(name.to_string()));
        }
        let connections = vec![None; node.inputs.len()];
        self.nodes.insert(
            name.to_string(),
            BlendTreeEntry {
                node: Arc::new(node),
                connections,
            },
        );
        Ok(())
    }

    /// Adds a node that is already shared (the same asset may live in
    /// several trees; its per-instance parameters never collide because they
    /// are keyed by structural path).
    pub fn add_shared_node(&mut self, name: &str, node: Arc<AnimationNode>) -> Result<()> {
        if self.nodes.contains_key(name) {
            return Err(SkeinError::DuplicateNodeName(name.to_string()));
        }
        let connections = vec![None; node.inputs.len()];
        self.nodes
            .insert(name.to_string(), BlendTreeEntry { node, connections });
        Ok(())
    }

    /// Wires `source` into input `input` of `target`.
    pub fn connect(&mut self, target: &str, input: usize, source: &str) -> Result<()> {
        if !self.nodes.contains_key(source) {
            return Err(SkeinError::NodeNotFound(source.to_string()));
        }
        let entry = self
            .nodes
            .get_mut(target)
            .ok_or_else(|| SkeinError::NodeNotFound(target.to_string()))?;
        if input >= entry.connections.len() {
            return Err(SkeinError::InputIndexOutOfRange {
                context: target.to_string(),
                index: input,
            });
        }
        entry.connections[input] = Some(source.to_string());
        Ok(())
    }

    /// Wires `source` into the tree's output.
    pub fn connect_output(&mut self, source: &str) -> Result<()> {
        self.connect(OUTPUT_NODE, 0, source)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BlendTreeEntry> {
        self.nodes.get(name)
    }

    /// Checks wiring: every input connected to an existing node, no cycles.
    /// Appends one reason per problem, prefixed with the instance path.
    pub(crate) fn validate(&self, prefix: &str, reasons: &mut Vec<String>) {
        for (name, entry) in &self.nodes {
            for (i, conn) in entry.connections.iter().enumerate() {
                match conn {
                    None => reasons.push(format!(
                        "{prefix}{name}: input {i} ({}) is not connected",
                        entry.node.inputs[i].name
                    )),
                    Some(source) if !self.nodes.contains_key(source) => reasons.push(format!(
                        "{prefix}{name}: input {i} references missing node '{source}'"
                    )),
                    Some(_) => {}
                }
            }
            if let NodeKind::BlendTree(sub) = &entry.node.kind {
                sub.validate(&format!("{prefix}{name}/"), reasons);
            }
        }
        self.check_cycles(prefix, reasons);
    }

    fn check_cycles(&self, prefix: &str, reasons: &mut Vec<String>) {
        // DFS over connection edges; grey set detects back edges.
        let mut done: FxHashSet<&str> = FxHashSet::default();
        let mut stack: FxHashSet<&str> = FxHashSet::default();
        for name in self.nodes.keys() {
            self.visit(name, &mut done, &mut stack, prefix, reasons);
        }
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        done: &mut FxHashSet<&'a str>,
        stack: &mut FxHashSet<&'a str>,
        prefix: &str,
        reasons: &mut Vec<String>,
    ) {
        if done.contains(name) {
            return;
        }
        if !stack.insert(name) {
            reasons.push(format!("{prefix}{name}: cyclic input wiring"));
            return;
        }
        if let Some(entry) = self.nodes.get(name) {
            for source in entry.connections.iter().flatten() {
                self.visit(source, done, stack, prefix, reasons);
            }
        }
        stack.remove(name);
        done.insert(name);
    }
}

// ============================================================================
// Node variants
// ============================================================================

/// Behavior of an [`AnimationNode`].
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Leaf: plays one named clip from the bound animation player, keeping
    /// its cursor in the per-instance `time`/`forward` parameters.
    Animation { animation: String },
    /// Two-way cross-fade driven by the `blend_amount` parameter. The
    /// filtered sub-paths cross-fade against the unfiltered rest.
    Blend2,
    /// Additive blend: input 0 passes through at full weight, input 1 is
    /// layered on top scaled by `add_amount`. `sync` phase-locks input 1 to
    /// the parent time cursor.
    Add2 { sync: bool },
    /// Scales child time by the `scale` parameter.
    TimeScale,
    /// Container of named, wired children.
    BlendTree(BlendTree),
    /// Drains a blend tree; carries exactly one input.
    Output,
    /// Terminal sentinel: no inputs, contributes nothing.
    Start,
    /// Terminal sentinel: no inputs, contributes nothing.
    End,
}

/// A node in the blend graph.
///
/// Node values are shared assets (`Arc<AnimationNode>`): everything mutable
/// per tree instance lives in the owning tree's parameter map, keyed by the
/// node's structural path.
#[derive(Debug, Clone)]
pub struct AnimationNode {
    pub inputs: Vec<Input>,
    pub(crate) filter: FxHashSet<TrackPath>,
    pub(crate) filter_enabled: bool,
    pub kind: NodeKind,
}

impl AnimationNode {
    fn with_inputs(kind: NodeKind, inputs: &[&str]) -> Self {
        Self {
            inputs: inputs
                .iter()
                .map(|n| Input {
                    name: (*n).to_string(),
                })
                .collect(),
            filter: FxHashSet::default(),
            filter_enabled: false,
            kind,
        }
    }

    #[must_use]
    pub fn animation(animation: &str) -> Self {
        Self::with_inputs(
            NodeKind::Animation {
                animation: animation.to_string(),
            },
            &[],
        )
    }

    #[must_use]
    pub fn blend2() -> Self {
        Self::with_inputs(NodeKind::Blend2, &["in", "blend"])
    }

    #[must_use]
    pub fn add2(sync: bool) -> Self {
        Self::with_inputs(NodeKind::Add2 { sync }, &["in", "add"])
    }

    #[must_use]
    pub fn time_scale() -> Self {
        Self::with_inputs(NodeKind::TimeScale, &["in"])
    }

    #[must_use]
    pub fn blend_tree(tree: BlendTree) -> Self {
        Self::with_inputs(NodeKind::BlendTree(tree), &[])
    }

    #[must_use]
    pub(crate) fn output() -> Self {
        Self::with_inputs(NodeKind::Output, &["output"])
    }

    #[must_use]
    pub fn start() -> Self {
        Self::with_inputs(NodeKind::Start, &[])
    }

    #[must_use]
    pub fn end() -> Self {
        Self::with_inputs(NodeKind::End, &[])
    }

    #[must_use]
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Whether this node kind consults its path filter at all.
    #[must_use]
    pub fn has_filter(&self) -> bool {
        matches!(self.kind, NodeKind::Blend2 | NodeKind::Add2 { .. })
    }

    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.filter_enabled = enabled;
    }

    #[must_use]
    pub fn is_filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    /// Marks or unmarks a track sub-path in the filter set.
    pub fn set_filter_path(&mut self, path: TrackPath, enabled: bool) {
        if enabled {
            self.filter.insert(path);
        } else {
            self.filter.remove(&path);
        }
    }

    #[must_use]
    pub fn is_path_filtered(&self, path: &TrackPath) -> bool {
        self.filter.contains(path)
    }

    /// Declares the node's parameters with default values. The owning tree
    /// registers them under the node's instance-qualified path.
    #[must_use]
    pub fn parameter_list(&self) -> Vec<ParameterInfo> {
        match &self.kind {
            NodeKind::Animation { .. } => vec![
                ParameterInfo {
                    name: PARAM_TIME,
                    default: PropertyValue::Float(0.0),
                },
                ParameterInfo {
                    name: PARAM_FORWARD,
                    default: PropertyValue::Bool(true),
                },
            ],
            NodeKind::Blend2 => vec![ParameterInfo {
                name: PARAM_BLEND_AMOUNT,
                default: PropertyValue::Float(0.0),
            }],
            NodeKind::Add2 { .. } => vec![ParameterInfo {
                name: PARAM_ADD_AMOUNT,
                default: PropertyValue::Float(0.0),
            }],
            NodeKind::TimeScale => vec![ParameterInfo {
                name: PARAM_SCALE,
                default: PropertyValue::Float(1.0),
            }],
            _ => Vec::new(),
        }
    }

    /// Short human-readable kind name.
    #[must_use]
    pub fn caption(&self) -> &'static str {
        match &self.kind {
            NodeKind::Animation { .. } => "Animation",
            NodeKind::Blend2 => "Blend2",
            NodeKind::Add2 { .. } => "Add2",
            NodeKind::TimeScale => "TimeScale",
            NodeKind::BlendTree(_) => "BlendTree",
            NodeKind::Output => "Output",
            NodeKind::Start => "Start",
            NodeKind::End => "End",
        }
    }
}
