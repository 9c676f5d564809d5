//! Error taxonomy for the simulation core
//!
//! Every error is returned synchronously to the caller of the operation that
//! produced it. Geometric degeneracies never surface here; they fall back to
//! approximate results inside the narrow phase.

use thiserror::Error;

use crate::sim::EntityId;

/// Errors produced by construction, lifecycle and snapshot operations
#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected at construction: zero period, negative radius, degenerate polygon
    #[error("invalid motion parameters: {0}")]
    InvalidMotionParameters(String),

    /// Construction record names a kind the core does not know
    #[error("unknown entity kind `{0}`")]
    UnknownEntityKind(String),

    /// Lifecycle operation on an id that is not in the live table
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// Kind-specific operation on an entity of another kind
    #[error("entity {id} is not a {expected}")]
    WrongKind { id: EntityId, expected: &'static str },

    /// Track layout violates a structural precondition
    #[error("invalid world: {0}")]
    WorldStructure(String),

    /// Snapshot could not be encoded or decoded
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, SimError>;
