//! Storage boundary: customers, the catalog and document stores.
//!
//! Synchronous, `Send + Sync` ports with in-memory adapters. A database-backed
//! adapter must provide the same guarantees: a conditional stock decrement
//! that checks and writes in one step, and a unique index on document numbers.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryCatalog, InMemoryCustomers, InMemoryDocumentStore};
pub use r#trait::{Catalog, CustomerDirectory, DocumentStore, ItemLookup, StoreError};
