//! Core business logic - framework-agnostic user, catalog, inventory and order operations.

pub mod inventory;
pub mod order;
pub mod product;
pub mod user;
