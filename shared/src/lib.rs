//! Shared domain logic for the Tradepost POS platform
//!
//! This crate contains the pure, I/O-free parts of the inventory-costing
//! domain: money arithmetic, the FIFO consumption planner, and the
//! cross-cutting enums shared between services and the HTTP surface.

pub mod fifo;
pub mod models;
pub mod money;
pub mod validation;

pub use fifo::*;
pub use models::*;
pub use money::*;
