//! Database Layer
//!
//! This module handles all interaction with the libsql backing store:
//!
//! - Database initialization and connection management
//! - The mutation-script statement model (plans as data)
//! - The `TreeStore` abstraction and its libsql implementation
//! - Domain events emitted after committed mutations
//!
//! # Architecture
//!
//! The forest lives in one flat `nodes` table indexed on `(tree_id, lft)`.
//! Structure is rewritten with bulk conditional updates; the store never
//! materializes a pointer tree.

mod database;
mod error;
pub mod events;
pub mod script;
mod tree_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use events::TreeEvent;
pub use script::{MutationScript, ScriptOutcome, Statement, TreeId};
pub use tree_store::TreeStore;
pub use turso_store::TursoStore;
