//! Domain Events for tree mutations
//!
//! This module defines the domain events emitted by `TreeService` when the
//! forest changes. Events follow the observer pattern, allowing other parts
//! of a host application (sync layers, UIs, caches) to react to structural
//! changes without coupling to the engine.
//!
//! Events are emitted using tokio's broadcast channel, after the mutation's
//! transaction has committed; subscribers never observe a mutation that was
//! rolled back.

use crate::models::Node;

/// Domain events emitted by TreeService
///
/// These represent domain-level changes, not database operations. The node
/// payloads carry post-mutation placement.
#[derive(Debug, Clone)]
pub enum TreeEvent {
    /// A new node was inserted into the forest
    NodeCreated(Node),

    /// A node (and its subtree) was relocated
    NodeMoved(Node),

    /// A node and its whole subtree were deleted
    NodeDeleted { id: String, deleted_count: u64 },
}

impl TreeEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            TreeEvent::NodeCreated(_) => "node:created",
            TreeEvent::NodeMoved(_) => "node:moved",
            TreeEvent::NodeDeleted { .. } => "node:deleted",
        }
    }
}
