//! Thermal control engine

pub mod thermal;

pub use thermal::{identify_duty, next_duty, DutyDecision};
