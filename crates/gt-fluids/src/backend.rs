//! Thermodynamic backend trait.
//!
//! The backend is the narrow interface between the process engine and
//! whatever library computes fluid properties. Streams and trains only ever
//! talk to `dyn ThermoBackend`, which lets tests substitute an ideal-gas
//! stub for the cubic solver when exercising control logic.

use crate::composition::FluidComposition;
use crate::conditions::ProcessConditions;
use crate::eos::EoSModel;
use crate::error::FluidResult;

/// Bulk properties of a fluid at a single state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidProperties {
    /// Density [kg/m3]
    pub density: f64,
    /// Compressibility factor [-]
    pub z: f64,
    /// Heat capacity ratio cp/cv [-]
    pub kappa: f64,
    /// Specific enthalpy [J/kg]
    pub enthalpy_joule_per_kg: f64,
    /// Molar mass [kg/mol]
    pub molar_mass: f64,
    /// Molar vapor fraction [-]
    pub vapor_fraction_molar: f64,
}

/// Trait for thermodynamic property backends.
///
/// Implementations must be thread-safe (`Send + Sync`); streams are immutable
/// and share the backend behind an `Arc`. Every method is a potentially
/// failing numerical routine: divergence is an error, not a retryable
/// transient.
pub trait ThermoBackend: Send + Sync {
    /// Backend name (for debugging/logging).
    fn name(&self) -> &str;

    /// Flash the composition to the given conditions and compute properties.
    ///
    /// With `remove_liquid`, any liquid phase is dropped before the
    /// properties are reported (gas-phase properties only).
    fn properties(
        &self,
        composition: &FluidComposition,
        eos_model: EoSModel,
        conditions: ProcessConditions,
        remove_liquid: bool,
    ) -> FluidResult<FluidProperties>;

    /// Solve for the temperature [K] at which the fluid has the given
    /// specific enthalpy [J/kg] at the given pressure [bara].
    fn temperature_from_enthalpy(
        &self,
        composition: &FluidComposition,
        eos_model: EoSModel,
        pressure_bara: f64,
        enthalpy_joule_per_kg: f64,
    ) -> FluidResult<f64>;
}
