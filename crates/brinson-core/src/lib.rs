pub mod attribution;
pub mod error;
pub mod types;

#[cfg(feature = "narrative")]
pub mod narrative;

pub use attribution::engine::{
    attribute, compute, compute_with, validate, AttributionInput, AttributionResult,
    AttributionScheme, AttributionTable, SegmentRecord, TotalsSummary,
};
pub use error::AttributionError;
pub use types::*;

/// Standard result type for all attribution operations
pub type BrinsonResult<T> = Result<T, AttributionError>;
