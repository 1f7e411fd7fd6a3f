//! Error types for scene graph operations
//!
//! All variants describe programmer-error class failures: the primary
//! accessors treat them as fatal contract violations and panic with the
//! formatted message, while `try_`-prefixed variants surface them as values
//! for callers that need to probe.

use thiserror::Error;

/// Errors raised by typed access and indexed child operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A typed accessor was invoked on an object of an incompatible kind
    #[error("scene object type mismatch: expected {expected}")]
    TypeMismatch {
        /// The type the caller asked for
        expected: &'static str,
    },

    /// An indexed child operation was given an out-of-range index
    #[error("child index {index} out of range for group with {num_children} children")]
    ChildIndexOutOfRange {
        /// The offending index
        index: usize,
        /// Number of children the group actually holds
        num_children: usize,
    },
}
