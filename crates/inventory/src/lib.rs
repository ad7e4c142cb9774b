//! Inventory domain module.
//!
//! Catalog items and their stock levels, implemented as deterministic domain
//! logic (no IO, no storage). Stock moves through reservations applied by the
//! infra layer or through an explicit stock correction.

pub mod item;

pub use item::{normalize_sku, CatalogItem, ItemUnit, NewCatalogItem};
