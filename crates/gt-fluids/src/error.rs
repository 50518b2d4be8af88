//! Fluid property errors.

use thiserror::Error;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors that can occur during fluid property calculations.
///
/// All backend calls are treated as potentially failing numerical routines:
/// a divergence surfaces as an error here and the train evaluator flags the
/// operating point invalid, never retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Non-physical values (negative density, pressure, etc.).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// Value out of valid range.
    #[error("Value out of range for {what}")]
    OutOfRange { what: &'static str },

    /// Invalid argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Unknown fluid component name.
    #[error("Unknown component: {name}")]
    UnknownComponent { name: String },

    /// Convergence failure (e.g., solving for T given P,h).
    #[error("Convergence failed for {what}")]
    ConvergenceFailed { what: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FluidError::NonPhysical { what: "pressure" };
        assert!(err.to_string().contains("pressure"));

        let err = FluidError::UnknownComponent {
            name: "unobtainium".into(),
        };
        assert!(err.to_string().contains("unobtainium"));
    }
}
