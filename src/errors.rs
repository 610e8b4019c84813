//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SkeinError`] covers all failure modes including:
//! - Blend graph configuration errors (dangling connections, cycles)
//! - Track resolution errors (missing nodes, bones, blend shapes)
//! - Parameter access errors
//!
//! Configuration and resolution failures are *also* surfaced through the
//! tree's invalid-state flag and reason string, so a failed `advance` can
//! degrade to a no-op instead of propagating an error every tick.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SkeinError>`.

use thiserror::Error;

/// The main error type for the skein animation core.
#[derive(Error, Debug)]
pub enum SkeinError {
    // ========================================================================
    // Blend Graph Configuration Errors
    // ========================================================================
    /// The blend graph wiring is malformed (cycle, dangling connection,
    /// unconnected input). The string lists every problem found.
    #[error("Invalid blend graph configuration: {0}")]
    InvalidConfiguration(String),

    /// A named node was not found in a blend tree.
    #[error("Node not found in blend tree: {0}")]
    NodeNotFound(String),

    /// An input index was out of range for a node.
    #[error("Input index out of range: {context} (index: {index})")]
    InputIndexOutOfRange {
        /// Description of the node being wired
        context: String,
        /// The invalid index
        index: usize,
    },

    /// A node name is already taken in a blend tree.
    #[error("Duplicate node name in blend tree: {0}")]
    DuplicateNodeName(String),

    // ========================================================================
    // Track Resolution Errors
    // ========================================================================
    /// Track resolution failed. The string carries the accumulated
    /// human-readable reasons (one per unresolvable track).
    #[error("Invalid animation state: {0}")]
    InvalidState(String),

    // ========================================================================
    // Parameter Errors
    // ========================================================================
    /// A parameter path does not exist for the current root node.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// A parameter was set with a value of the wrong type.
    #[error("Parameter type mismatch: {path} expects {expected}")]
    ParameterTypeMismatch {
        /// Instance-qualified parameter path
        path: String,
        /// Name of the expected type
        expected: &'static str,
    },
}

/// Alias for `Result<T, SkeinError>`.
pub type Result<T> = std::result::Result<T, SkeinError>;
