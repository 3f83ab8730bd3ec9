//! Query answering pipeline.
//!
//! One query runs strictly in sequence: chart step, routing, aggregation,
//! insight step. Failures in the chart step are reported and never stop the
//! insight step.

pub mod pipeline;

pub use pipeline::{plan, Assistant, AssistantSettings};
