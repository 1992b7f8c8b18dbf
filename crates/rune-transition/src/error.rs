//! Error types for the transition engine.

use thiserror::Error;

/// Result type for transition engine operations.
pub type Result<T> = std::result::Result<T, TransitionError>;

/// Usage errors raised synchronously while updating a group.
///
/// These are programmer mistakes, not runtime conditions: the engine rejects
/// the update and leaves its state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// An entity was supplied without a key.
    #[error("entity at index {index} has no key")]
    MissingKey { index: usize },

    /// Two entities in the same update share a key.
    #[error("duplicate entity key `{key}`")]
    DuplicateKey { key: String },

    /// A node reference cannot point at more than one entity.
    #[error("node reference requires a single entity, got {count}")]
    MultipleEntitiesWithNodeRef { count: usize },
}
