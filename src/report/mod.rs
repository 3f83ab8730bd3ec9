//! Answer report generation.

pub mod generator;

pub use generator::write_report;
