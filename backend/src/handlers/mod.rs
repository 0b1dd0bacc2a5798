//! HTTP handlers

pub mod adjustment;
pub mod health;
pub mod ledger;
pub mod order;
pub mod product;

pub use adjustment::*;
pub use health::*;
pub use ledger::*;
pub use order::*;
pub use product::*;
