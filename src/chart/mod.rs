//! Chart generation from model-authored chart specifications.
//!
//! The chart model answers with a fenced code block holding a declarative
//! JSON specification. The specification is validated against a fixed
//! allow-list and evaluated against the read-only dataset; nothing the model
//! writes is ever executed.

pub mod extract;
pub mod render;
pub mod spec;

pub use extract::extract_code_block;
pub use render::{render_chart, RenderedChart};
pub use spec::ChartSpec;

use crate::analysis::AnalysisError;
use thiserror::Error;

/// Errors raised while turning a model response into a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid chart specification: {0}")]
    InvalidSpec(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("no data to plot for {0}")]
    NoData(String),
}
