//! Entity trait: identity that survives state changes.

/// Records addressed by a stable identifier (customers, catalog items,
/// quotations, invoices). Stores key their records through this trait.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
