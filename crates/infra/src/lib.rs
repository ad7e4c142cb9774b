//! Infrastructure layer: storage ports and adapters, stock reservation,
//! configuration and the document services built on them.

pub mod config;
pub mod reservation;
pub mod service;
pub mod store;
