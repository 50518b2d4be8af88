//! Errors for the sampled (tabular) compressor model.

use thiserror::Error;

pub type SampledResult<T> = Result<T, SampledError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampledError {
    #[error("Invalid sampled data: {what}")]
    InvalidArg { what: &'static str },

    #[error("Degenerate geometry: {what}")]
    Degenerate { what: &'static str },
}
