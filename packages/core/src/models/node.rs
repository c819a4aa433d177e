//! Node Data Structures
//!
//! This module defines the core `Node` struct: a universal hierarchical
//! record whose position in its tree is encoded with the nested-set scheme.
//!
//! # Placement encoding
//!
//! Every node carries `(tree_id, lft, rgt, level, parent_id)`. Within one
//! tree the `lft`/`rgt` values of all nodes form the exact integer range
//! `1..=2N` (N nodes), and a subtree is precisely the set of rows whose
//! interval falls inside its top node's `[lft, rgt]`. The forest is the full
//! table ordered by `(tree_id, lft)`: trees in creation order, nodes in
//! depth-first preorder within each tree.
//!
//! Placement fields are assigned when a node is inserted and rewritten only
//! by the mutation engine; they are never edited directly.
//!
//! # Examples
//!
//! ```rust
//! use arbor_core::models::Node;
//! use serde_json::json;
//!
//! let node = Node::new(
//!     "text".to_string(),
//!     "My first note".to_string(),
//!     json!({}),
//! );
//! assert!(node.is_root());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Universal hierarchical record.
///
/// # Fields
///
/// - `id`: unique identifier (UUID v4 unless supplied by the caller)
/// - `node_type`: type identifier (e.g., "text", "task", "folder")
/// - `content`: primary content/text of the node
/// - `parent_id`: reference to the parent node, `None` for roots
/// - `tree_id`: identifier of the tree this node belongs to
/// - `lft`, `rgt`: nested-set interval edges (`lft < rgt`)
/// - `level`: depth below the root (`0` for roots)
/// - `created_at`, `modified_at`: audit timestamps
/// - `properties`: JSON object containing entity-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier
    pub id: String,

    /// Node type (e.g., "text", "task", "folder")
    pub node_type: String,

    /// Primary content/text of the node
    pub content: String,

    /// Parent node ID; `None` for root nodes
    pub parent_id: Option<String>,

    /// Tree this node belongs to
    pub tree_id: i64,

    /// Left edge of the nested-set interval
    pub lft: i64,

    /// Right edge of the nested-set interval
    pub rgt: i64,

    /// Depth below the root (roots are 0)
    pub level: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,

    /// Entity-specific fields as a JSON object
    pub properties: serde_json::Value,
}

impl Node {
    /// Create a new unplaced Node with an auto-generated UUID.
    ///
    /// The placement fields (`tree_id`, `lft`, `rgt`, `level`, `parent_id`)
    /// are zeroed; they are assigned by `TreeService::create_node` when the
    /// node is inserted into the forest.
    pub fn new(node_type: String, content: String, properties: serde_json::Value) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), node_type, content, properties)
    }

    /// Create a new unplaced Node with an explicit id.
    ///
    /// Callers that track ids on their side (frontends, importers) supply
    /// their own; everything else should use [`Node::new`].
    pub fn new_with_id(
        id: String,
        node_type: String,
        content: String,
        properties: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            node_type,
            content,
            parent_id: None,
            tree_id: 0,
            lft: 0,
            rgt: 0,
            level: 0,
            created_at: now,
            modified_at: now,
            properties,
        }
    }

    /// Whether this node is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether this node has a parent.
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    /// Interval width: `rgt - lft + 1`, i.e. twice the subtree's node count.
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Number of nodes in this node's subtree, including itself.
    pub fn subtree_size(&self) -> i64 {
        self.width() / 2
    }

    /// Whether `other` is a strict descendant of this node.
    pub fn contains(&self, other: &Node) -> bool {
        self.tree_id == other.tree_id && self.lft < other.lft && other.rgt < self.rgt
    }
}
