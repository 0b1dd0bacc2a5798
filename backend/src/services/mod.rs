//! Business logic services for the Tradepost backend

pub mod adjustment;
pub mod costing;
pub mod ledger;
pub mod order;
pub mod product;
