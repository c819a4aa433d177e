//! Error types for the tree mutation layer
//!
//! This module defines all error types that can occur while planning or
//! applying a structural mutation. Planning errors (`InvalidPosition`,
//! `InvalidMove`, `NodeNotFound`) are raised before any statement reaches
//! the store, so a failed call leaves the forest untouched.

use thiserror::Error;

/// Errors raised by tree mutations.
#[derive(Error, Debug)]
pub enum TreeError {
    /// An unrecognized position token was given
    ///
    /// Raised while parsing caller input; never reaches the store.
    #[error("An invalid position was given: {position}")]
    InvalidPosition { position: String },

    /// The requested move would corrupt the nesting structure
    ///
    /// Self-moves, moves into a node's own descendants, and moves of a root
    /// into its own tree all land here, before any bulk update executes.
    #[error("{reason}")]
    InvalidMove { reason: String },

    /// Referenced node does not exist
    #[error("Node '{node_id}' does not exist")]
    NodeNotFound { node_id: String },

    /// Backing-store failure, propagated unmodified after rollback
    ///
    /// Mutations are not safe to blindly retry (tree-id allocation and gap
    /// shifts are not idempotent); callers retry the whole logical operation
    /// after re-reading node state.
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TreeError {
    /// Create an InvalidPosition error
    pub fn invalid_position(position: impl Into<String>) -> Self {
        Self::InvalidPosition {
            position: position.into(),
        }
    }

    /// Create an InvalidMove error
    pub fn invalid_move(reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            reason: reason.into(),
        }
    }

    /// Create a NodeNotFound error
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
