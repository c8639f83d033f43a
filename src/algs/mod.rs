//! Communication and exchange algorithms.

pub mod communicator;
pub mod exchange;
pub mod wire;

pub use exchange::{CompRange, ExchangePlan};
