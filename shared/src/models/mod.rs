//! Cross-cutting domain enums
//!
//! These are shared between the HTTP surface and the services so request
//! payloads, ledger rows, and audit views all speak the same vocabulary.

pub mod adjustment;
pub mod ledger;

pub use adjustment::*;
pub use ledger::*;
