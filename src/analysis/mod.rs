//! Query routing and deposit aggregation.
//!
//! The router picks a grouping dimension from the user's free-text query;
//! the aggregator turns that choice into the summary table the insight
//! prompt is grounded on.

pub mod aggregator;
pub mod router;
pub mod table;

pub use aggregator::{partition, summarize, AnalysisError, GroupTotals};
#[allow(unused_imports)]
pub use router::route_query;
