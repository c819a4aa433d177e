//! Business Services
//!
//! This module contains the engine's service layer:
//!
//! - `TreeService` - structural mutations and forest queries
//!
//! Services coordinate between the planning layer and the database layer,
//! enforcing the mutation rules and orchestrating transactions.

pub mod tree_service;

pub use tree_service::{CreateNodeParams, TreeService};
