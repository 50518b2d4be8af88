//! gt-fluids: fluid property calculations for gastrain.
//!
//! Provides:
//! - Gas component definitions with critical constants and cp polynomials
//! - Composition handling (normalized mole fractions, mole-weighted mixing)
//! - Process conditions with the designated standard conditions
//! - `ThermoBackend` trait for property calculations
//! - Native cubic (SRK/PR) backend
//! - Immutable `FluidStream` with flash / enthalpy-flash / mix operations
//!
//! # Architecture
//!
//! The `ThermoBackend` trait isolates the train solvers from the property
//! backend. The native cubic backend is the default; tests inject simpler
//! models (e.g. ideal gas) to exercise control logic without a real
//! equation of state.

pub mod backend;
pub mod component;
pub mod composition;
pub mod conditions;
pub mod cubic;
pub mod eos;
pub mod error;
pub mod stream;

// Re-exports for ergonomics
pub use backend::{FluidProperties, ThermoBackend};
pub use component::Component;
pub use composition::FluidComposition;
pub use conditions::ProcessConditions;
pub use cubic::CubicBackend;
pub use eos::{CubicForm, EoSModel};
pub use error::{FluidError, FluidResult};
pub use stream::{FluidFactory, FluidModel, FluidStream};
