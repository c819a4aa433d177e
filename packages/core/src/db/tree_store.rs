//! TreeStore Trait - Database Abstraction Layer
//!
//! This module defines the `TreeStore` trait that abstracts storage
//! operations for the nested-set forest. The trait is the engine's whole
//! contract with the backing store: fetch one row by key, run ordered range
//! scans, and apply a mutation script atomically.
//!
//! # Architecture
//!
//! - **Abstraction Point**: between TreeService (planning and dispatch) and
//!   the database implementation
//! - **Scripts, not SQL**: mutations arrive as [`MutationScript`] values;
//!   each implementation renders them with its own statement templates
//! - **Async-First**: all methods are async to support both embedded and
//!   network backends
//!
//! # Examples
//!
//! ```rust,no_run
//! use arbor_core::db::{DatabaseService, TreeStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./arbor.db")).await?);
//!     let store: Arc<dyn TreeStore> = Arc::new(TursoStore::new(db));
//!
//!     let forest = store.fetch_forest().await?;
//!     println!("{} nodes", forest.len());
//!     Ok(())
//! }
//! ```

use crate::db::script::{MutationScript, ScriptOutcome};
use crate::models::Node;
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for nested-set forest persistence.
///
/// Implementations must be `Send + Sync` to allow usage in async contexts
/// where futures may be moved between threads.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Fetch a single node by id.
    ///
    /// Returns `Ok(None)` when the node doesn't exist (not an error).
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;

    /// Fetch every node of one tree, in depth-first preorder (`lft` order).
    async fn fetch_tree(&self, tree_id: i64) -> Result<Vec<Node>>;

    /// Fetch the whole forest ordered by `(tree_id, lft)`: trees in creation
    /// order, nodes in depth-first preorder within each tree.
    async fn fetch_forest(&self) -> Result<Vec<Node>>;

    /// Fetch the children of a parent in sibling order.
    ///
    /// `None` fetches the forest's root nodes, ordered by tree id.
    async fn fetch_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>>;

    /// Fetch a node's descendants as one interval range scan.
    ///
    /// This is the read-side payoff of the nested-set encoding: the whole
    /// subtree is the rows whose `lft` falls inside the node's interval.
    async fn fetch_descendants(&self, node: &Node, include_self: bool) -> Result<Vec<Node>>;

    /// Run every statement of `script` inside one transaction, rolling back
    /// on the first failure.
    ///
    /// At most one fresh tree id is claimed per script (max aggregate + 1,
    /// resolved inside the same transaction); the outcome reports it along
    /// with the number of rows deleted.
    async fn apply(&self, script: MutationScript) -> Result<ScriptOutcome>;
}
