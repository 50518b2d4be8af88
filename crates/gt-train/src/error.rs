//! Train evaluation errors.
//!
//! These cover the non-recoverable channel of the failure design: invariant
//! violations and caller bugs. Per-operating-point infeasibilities are not
//! errors; they are carried as `FailureStatus` on the result.

use gt_chart::ChartError;
use gt_fluids::FluidError;
use thiserror::Error;

pub type TrainResult<T> = Result<T, TrainError>;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Invalid train configuration: {what}")]
    InvalidConfig { what: &'static str },

    #[error("Invalid evaluation input: {what}")]
    InvalidInput { what: &'static str },

    #[error(
        "Trying to recirculate fluid in stage {stage_index} without a cached composition to recirculate"
    )]
    NoFluidToRecirculate { stage_index: usize },

    #[error(transparent)]
    Fluid(#[from] FluidError),

    #[error(transparent)]
    Chart(#[from] ChartError),
}
