//! `billbook-core`: domain foundation building blocks.
//!
//! Identifiers, decimal value objects and the domain error model shared by
//! every other crate. No infrastructure concerns.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, DocumentId, ItemId, UserId};
pub use money::{Money, Percent, Quantity};
