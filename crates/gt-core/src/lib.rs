//! gt-core: stable foundation for gastrain.
//!
//! Contains:
//! - units (uom SI types + constructors + physical constants)
//! - numeric (Real + tolerances + root finding + 1-D interpolation)
//! - rates (stream-day / calendar-day rate handling)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod rates;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{GtError, GtResult};
pub use numeric::*;
pub use rates::*;
pub use units::*;
