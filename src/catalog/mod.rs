//! Closed task catalog and SLA profile reference data.
//!
//! The catalog is read-only from the engine's point of view: jobs may only
//! reference predefined tasks, never free-text descriptions, and SLA
//! commitments are copied out of the catalog into per-job snapshots at
//! confirmation time. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - The read-only store port in [`store`]
//! - The in-memory adapter in [`memory`]

pub mod domain;
pub mod memory;
pub mod store;

pub use domain::{CatalogError, ProviderLevel, Region, ServiceTask, SlaProfile, TaskCode};
pub use memory::InMemoryCatalog;
pub use store::{CatalogStore, CatalogStoreError, CatalogStoreResult};
