//! polisync-graph: Neo4j adapter for the relationship-traversal store.
//!
//! Implements the [`polisync_core::EntityStore`] contract over Neo4j. Entities
//! are nodes keyed by the `id` property (`patente` for vehicles), linked by
//! `TIENE`, `EMITE`, `CUBIERTO_POR`, and `POSEE` relationships.

pub mod client;
pub mod mutations;
pub mod queries;
pub mod reports;
mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
