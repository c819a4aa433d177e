//! Tree Service - The Mutation Engine Facade
//!
//! This module provides the main entry point for structural operations on
//! the forest:
//!
//! - `move_node` - relocate a node and its whole subtree (the dispatcher
//!   over the five relocation algorithms)
//! - `create_node` / `delete_node` - insert a leaf, remove a subtree
//! - Read-side queries (tree, forest, children, descendants)
//!
//! Every mutation is planned as a pure script (see `operations::moves`),
//! applied by the store inside one transaction, and then mirrored onto the
//! in-memory node that is returned to the caller. A mutation either fully
//! restores the nested-set invariants before its transaction commits, or
//! fails with the store untouched.
//!
//! # Retry semantics
//!
//! The engine performs no retries: tree-id allocation and gap shifts are not
//! idempotent, so a failed mutation must be retried as a whole logical
//! operation, re-reading node state first.

use crate::db::script::TreeId;
use crate::db::{TreeEvent, TreeStore};
use crate::models::Node;
use crate::operations::moves;
use crate::operations::{Position, TreeError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel capacity for tree events.
///
/// 128 provides headroom for burst operations (bulk imports) while limiting
/// memory overhead. Observer lag is acceptable; subscribers resynchronize by
/// re-reading.
const TREE_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Parameters for creating a node
///
/// # Examples
///
/// ```no_run
/// # use arbor_core::services::CreateNodeParams;
/// # use serde_json::json;
/// let params = CreateNodeParams {
///     id: None,
///     node_type: "text".to_string(),
///     content: "Hello World".to_string(),
///     parent_id: Some("parent-123".to_string()),
///     properties: json!({}),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CreateNodeParams {
    /// Optional ID for the node. If None, a UUID is generated
    pub id: Option<String>,
    /// Type of the node (text, task, etc.)
    pub node_type: String,
    /// Content of the node
    pub content: String,
    /// Optional parent node ID; None creates a new root tree
    pub parent_id: Option<String>,
    /// Additional node properties as JSON
    pub properties: Value,
}

/// The mutation engine facade.
///
/// Holds the store behind the [`TreeStore`] abstraction and a broadcast
/// channel for [`TreeEvent`]s emitted after committed mutations.
pub struct TreeService {
    store: Arc<dyn TreeStore>,
    event_tx: broadcast::Sender<TreeEvent>,
}

impl TreeService {
    /// Create a new TreeService over a store
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        let (event_tx, _) = broadcast::channel(TREE_EVENT_CHANNEL_CAPACITY);
        Self { store, event_tx }
    }

    /// Subscribe to tree events
    ///
    /// Events are emitted after the mutation's transaction has committed;
    /// subscribers never observe a rolled-back mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: TreeEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    async fn require_node(&self, node_id: &str) -> Result<Node, TreeError> {
        self.store
            .get_node(node_id)
            .await?
            .ok_or_else(|| TreeError::node_not_found(node_id))
    }

    //
    // READ-SIDE QUERIES
    //

    /// Fetch a single node by id
    pub async fn get_node(&self, node_id: &str) -> Result<Option<Node>, TreeError> {
        Ok(self.store.get_node(node_id).await?)
    }

    /// Fetch one tree in depth-first preorder
    pub async fn get_tree(&self, tree_id: i64) -> Result<Vec<Node>, TreeError> {
        Ok(self.store.fetch_tree(tree_id).await?)
    }

    /// Fetch the whole forest ordered by `(tree_id, lft)`
    pub async fn get_forest(&self) -> Result<Vec<Node>, TreeError> {
        Ok(self.store.fetch_forest().await?)
    }

    /// Fetch the children of a parent in sibling order; `None` fetches the
    /// forest's roots in tree order
    pub async fn get_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>, TreeError> {
        Ok(self.store.fetch_children(parent_id).await?)
    }

    /// Fetch a node's descendants with one interval range scan
    pub async fn get_descendants(
        &self,
        node_id: &str,
        include_self: bool,
    ) -> Result<Vec<Node>, TreeError> {
        let node = self.require_node(node_id).await?;
        Ok(self.store.fetch_descendants(&node, include_self).await?)
    }

    //
    // MUTATIONS
    //

    /// Insert a new node into the forest.
    ///
    /// With a parent, the node becomes the parent's last child (a two-wide
    /// gap is opened inside the parent's right edge); without one, the node
    /// becomes the root of a brand new tree with a freshly allocated tree
    /// id. Returns the node with its assigned placement.
    pub async fn create_node(&self, params: CreateNodeParams) -> Result<Node, TreeError> {
        let CreateNodeParams {
            id,
            node_type,
            content,
            parent_id,
            properties,
        } = params;

        let mut node = match id {
            Some(id) => Node::new_with_id(id, node_type, content, properties),
            None => Node::new(node_type, content, properties),
        };

        let plan = match parent_id {
            Some(parent_id) => {
                let parent = self.require_node(&parent_id).await?;
                moves::insert_under(&parent, &node)
            }
            None => moves::insert_as_root(&node),
        };

        let outcome = self.store.apply(plan.script).await?;
        plan.patch.apply(&mut node, outcome.allocated_tree_id)?;

        tracing::debug!(
            "Created node '{}' at tree {} [{}, {}]",
            node.id,
            node.tree_id,
            node.lft,
            node.rgt
        );
        self.emit(TreeEvent::NodeCreated(node.clone()));
        Ok(node)
    }

    /// Delete a node and its whole subtree, closing the gap it leaves.
    ///
    /// Returns the number of nodes deleted. Deleting a node that does not
    /// exist succeeds with 0 (idempotent delete).
    pub async fn delete_node(&self, node_id: &str) -> Result<u64, TreeError> {
        let node = match self.store.get_node(node_id).await? {
            Some(node) => node,
            None => return Ok(0),
        };
        let deleted_count = node.subtree_size() as u64;

        let script = moves::delete_subtree(&node);
        self.store.apply(script).await?;

        tracing::debug!("Deleted subtree of '{}' ({} nodes)", node.id, deleted_count);
        self.emit(TreeEvent::NodeDeleted {
            id: node.id,
            deleted_count,
        });
        Ok(deleted_count)
    }

    /// Move `node_id` relative to `target_id` as specified by `position`.
    ///
    /// A `target_id` of `None` turns the node into a root node (no-op when
    /// it already is one). Routing:
    ///
    /// - target is a root and position is `left`/`right`: root-sibling
    ///   insertion. Root nodes of different trees are not linked by
    ///   `lft`/`rgt` contiguity, so this path relabels tree-id blocks and
    ///   leaves other trees' intervals alone.
    /// - node is a root: its whole tree moves into the target's tree.
    /// - otherwise: intra-tree or cross-tree child relocation, chosen by
    ///   tree-id equality.
    ///
    /// All validation (self-moves, descendant targets, a root into its own
    /// tree) happens before any bulk update executes. Returns the node
    /// updated to its post-mutation placement.
    pub async fn move_node(
        &self,
        node_id: &str,
        target_id: Option<&str>,
        position: Position,
    ) -> Result<Node, TreeError> {
        let mut node = self.require_node(node_id).await?;

        let plan = match target_id {
            None => {
                if node.is_root() {
                    // Already a root: nothing to do.
                    return Ok(node);
                }
                moves::promote_to_root(&node, TreeId::Allocated)
            }
            Some(target_id) => {
                let target = self.require_node(target_id).await?;
                if target.is_root() && position.is_sibling() {
                    moves::sibling_of_root(&node, &target, position)?
                } else if node.is_root() {
                    moves::move_root_to_tree(&node, &target, position)?
                } else if node.tree_id == target.tree_id {
                    moves::move_within_tree(&node, &target, position)?
                } else {
                    moves::move_child_to_new_tree(&node, &target, position)?
                }
            }
        };

        let outcome = self.store.apply(plan.script).await?;
        plan.patch.apply(&mut node, outcome.allocated_tree_id)?;

        tracing::debug!(
            "Moved node '{}' {} of {:?}: now tree {} [{}, {}] level {}",
            node.id,
            position,
            target_id,
            node.tree_id,
            node.lft,
            node.rgt,
            node.level
        );
        self.emit(TreeEvent::NodeMoved(node.clone()));
        Ok(node)
    }

    /// Like [`TreeService::move_node`], taking the position as its string
    /// token (`"first-child"`, `"last-child"`, `"left"`, `"right"`).
    ///
    /// Unknown tokens fail with [`TreeError::InvalidPosition`] before
    /// anything touches the store.
    pub async fn move_node_str(
        &self,
        node_id: &str,
        target_id: Option<&str>,
        position: &str,
    ) -> Result<Node, TreeError> {
        let position = position.parse::<Position>()?;
        self.move_node(node_id, target_id, position).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseService, TursoStore};
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup() -> (TreeService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
        let service = TreeService::new(Arc::new(TursoStore::new(db)));
        (service, temp_dir)
    }

    fn text(content: &str, parent_id: Option<&str>) -> CreateNodeParams {
        CreateNodeParams {
            id: Some(content.to_string()),
            node_type: "text".to_string(),
            content: content.to_string(),
            parent_id: parent_id.map(str::to_string),
            properties: json!({}),
        }
    }

    #[tokio::test]
    async fn test_move_without_target_on_root_is_noop() {
        let (service, _temp_dir) = setup().await;
        let root = service.create_node(text("r", None)).await.unwrap();

        let moved = service
            .move_node("r", None, Position::LastChild)
            .await
            .unwrap();
        assert_eq!(moved, root);
    }

    #[tokio::test]
    async fn test_move_unknown_node_fails_before_store() {
        let (service, _temp_dir) = setup().await;
        let err = service
            .move_node("ghost", None, Position::LastChild)
            .await
            .unwrap_err();
        assert!(matches!(err, TreeError::NodeNotFound { .. }));
    }

    #[tokio::test]
    async fn test_move_node_str_rejects_unknown_token() {
        let (service, _temp_dir) = setup().await;
        service.create_node(text("r", None)).await.unwrap();

        let err = service
            .move_node_str("r", None, "sideways")
            .await
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidPosition { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_node_is_idempotent() {
        let (service, _temp_dir) = setup().await;
        assert_eq!(service.delete_node("ghost").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_events_emitted_after_commit() {
        let (service, _temp_dir) = setup().await;
        let mut events = service.subscribe();

        service.create_node(text("r", None)).await.unwrap();
        service.create_node(text("a", Some("r"))).await.unwrap();
        service
            .move_node("a", None, Position::LastChild)
            .await
            .unwrap();
        service.delete_node("a").await.unwrap();

        let kinds: Vec<String> = (0..4)
            .map(|_| events.try_recv().unwrap().event_type().to_string())
            .collect();
        assert_eq!(
            kinds,
            vec!["node:created", "node:created", "node:moved", "node:deleted"]
        );
    }
}
