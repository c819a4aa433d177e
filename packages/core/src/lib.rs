//! Arbor Core - Nested-Set Forest Engine
//!
//! This crate maintains an ordered forest of hierarchical records inside a
//! flat, range-queryable libsql table, using the nested-set encoding: every
//! node carries `(tree_id, lft, rgt, level, parent_id)`, and a subtree is
//! exactly the rows whose interval falls inside its top node's `[lft, rgt]`.
//!
//! The heart of the crate is structural mutation: relocating a node and its
//! whole subtree - as a sibling, as a first/last child, within one tree,
//! across trees, or promoted to a new root - with a bounded sequence of bulk
//! conditional updates applied in one transaction, never exposing a
//! partially mutated tree.
//!
//! # Modules
//!
//! - [`models`] - Data structures (the universal `Node` record)
//! - [`operations`] - Positions, domain errors, and the pure mutation
//!   planning algorithms
//! - [`services`] - `TreeService`, the mutation engine facade
//! - [`db`] - Database layer: libsql connection management, the mutation
//!   script model, and the `TreeStore` abstraction

pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseService, TreeEvent, TreeStore, TursoStore};
pub use models::Node;
pub use operations::{Position, TreeError};
pub use services::{CreateNodeParams, TreeService};
