//! Rectangular-region exchange between patch collections.
//!
//! [`plan`] decides what moves; [`data_exchange`] moves it.

pub mod data_exchange;
pub mod plan;

pub use data_exchange::{assign_tags, execute, CompRange, ExchangeStats};
pub use plan::{ExchangePlan, Pairing, PlanSide, Role, WorkItem};
