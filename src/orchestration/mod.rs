//! Coordinates storage loads and engine runs.

pub mod service;

pub use service::{CalcFailure, TaxService};
