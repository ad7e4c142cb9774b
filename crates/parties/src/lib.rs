//! Parties domain module: the customers documents are issued to.

pub mod customer;

pub use customer::{Address, Customer, CustomerDetails};
