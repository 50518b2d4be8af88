//! gt-train: compressor-train solvers for gastrain.
//!
//! A train is a series of compressor stages on a common shaft. Given a fluid,
//! an operating point (rate, suction pressure, discharge pressure), and a
//! performance chart per stage, the solvers find the shaft speed or control
//! action that meets the pressure targets, and report per-stage thermodynamic
//! state, power, and a failure status for infeasible points.
//!
//! Three topologies:
//! - [`SingleSpeedCompressorTrain`]: fixed speed, pressure control absorbs
//!   target mismatches
//! - [`VariableSpeedCompressorTrain`]: speed solved by root-finding
//! - [`MultiStreamCompressorTrain`]: streams entering/leaving between stages,
//!   optional intermediate-pressure target splitting the shaft solve

pub mod common;
pub mod config;
pub mod error;
pub mod multi_stream;
pub mod results;
pub mod single_speed;
pub mod stage;
pub mod variable_speed;

// Re-exports for ergonomics
pub use common::{TargetComparison, compare_to_target};
pub use config::{CompressorTrainStage, EnergyAdjustment, PressureControl, TrainStream};
pub use error::{TrainError, TrainResult};
pub use multi_stream::MultiStreamCompressorTrain;
pub use results::{CompressorStageResult, CompressorTrainResult, FailureStatus, StreamState};
pub use single_speed::SingleSpeedCompressorTrain;
pub use variable_speed::VariableSpeedCompressorTrain;
