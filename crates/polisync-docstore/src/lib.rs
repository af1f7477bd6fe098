//! polisync-docstore: MongoDB adapter for the tabular-reporting store.
//!
//! Implements the [`polisync_core::EntityStore`] contract over MongoDB. Each
//! entity kind lives in its own collection, keyed by its business-key field
//! (`id_cliente`, `nro_poliza`, `id_siniestro`, `id_agente`, `patente`).

pub mod client;
pub mod mutations;
pub mod queries;
pub mod reports;
mod store;

pub use client::{DocClient, DocConfig, DocError};
