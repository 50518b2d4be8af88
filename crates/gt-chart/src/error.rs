//! Chart validation errors.

use gt_core::GtError;
use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

/// Errors raised when constructing or adjusting compressor charts.
///
/// These are invariant violations (caller bugs), never per-operating-point
/// failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("Invalid chart data: {what}")]
    InvalidArg { what: &'static str },

    #[error("Chart invariant violated: {what}")]
    Invariant { what: &'static str },
}

impl From<GtError> for ChartError {
    fn from(_: GtError) -> Self {
        ChartError::InvalidArg {
            what: "chart interpolation grid",
        }
    }
}
