//! Tree Mutation Operations
//!
//! The pure planning layer of the mutation engine:
//!
//! - [`Position`] - where a moved node lands relative to its target
//! - [`TreeError`] - domain errors, raised before anything reaches the store
//! - [`moves`] - the relocation/insertion/deletion algorithms as pure
//!   functions from snapshots to mutation scripts
//!
//! `TreeService` in the services layer drives these plans against the store.

pub mod error;
pub mod moves;
pub mod position;

pub use error::TreeError;
pub use moves::{MovePlan, NodePatch};
pub use position::Position;
