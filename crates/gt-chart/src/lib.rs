//! gt-chart: compressor performance maps for gastrain.
//!
//! Provides:
//! - `ChartCurve`: one speed line with head/efficiency interpolators
//! - `VariableSpeedChart`: ordered curves with envelope surfaces and
//!   distance-weighted efficiency interpolation
//! - `SingleSpeedChart`: one curve, fixed shaft speed
//! - Capacity evaluation with ASV / choke corrections and area flags

pub mod area;
pub mod capacity;
pub mod chart;
pub mod curve;
pub mod error;
pub mod single_speed;
pub mod variable_speed;

// Re-exports for ergonomics
pub use area::{AreaFlags, ChartAreaFlag};
pub use capacity::{CapacityResult, evaluate_capacity, evaluate_capacity_batch};
pub use chart::CompressorChart;
pub use curve::ChartCurve;
pub use error::{ChartError, ChartResult};
pub use single_speed::SingleSpeedChart;
pub use variable_speed::VariableSpeedChart;
