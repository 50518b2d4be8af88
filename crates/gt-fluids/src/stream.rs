//! Immutable fluid streams.
//!
//! A stream is a composition + equation of state + conditions + mass rate,
//! with the bulk properties computed through the backend at construction.
//! Every operation returns a new stream; existing streams are never mutated,
//! which makes them trivially sharable across threads.

use std::fmt;
use std::sync::Arc;

use crate::backend::{FluidProperties, ThermoBackend};
use crate::composition::FluidComposition;
use crate::conditions::ProcessConditions;
use crate::eos::EoSModel;
use crate::error::{FluidError, FluidResult};
use gt_core::units::constants::HOURS_PER_DAY;

/// Static description of a fluid: what flows, not how much.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidModel {
    pub composition: FluidComposition,
    pub eos_model: EoSModel,
}

impl FluidModel {
    pub fn new(composition: FluidComposition, eos_model: EoSModel) -> Self {
        Self {
            composition,
            eos_model,
        }
    }
}

/// Creates streams of a given fluid model through a shared backend.
///
/// Caches the standard-conditions gas density used for standard-rate to
/// mass-rate conversions (computed once, after a liquid-removing flash to
/// 1.01325 bara / 288.15 K).
#[derive(Clone)]
pub struct FluidFactory {
    model: FluidModel,
    backend: Arc<dyn ThermoBackend>,
    standard_density: f64,
}

impl fmt::Debug for FluidFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluidFactory")
            .field("model", &self.model)
            .field("backend", &self.backend.name())
            .field("standard_density", &self.standard_density)
            .finish()
    }
}

impl FluidFactory {
    pub fn new(model: FluidModel, backend: Arc<dyn ThermoBackend>) -> FluidResult<Self> {
        let standard = backend.properties(
            &model.composition,
            model.eos_model,
            ProcessConditions::standard_conditions(),
            true,
        )?;
        if standard.density <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "standard-conditions density",
            });
        }
        Ok(Self {
            model,
            backend,
            standard_density: standard.density,
        })
    }

    pub fn model(&self) -> &FluidModel {
        &self.model
    }

    pub fn backend(&self) -> &Arc<dyn ThermoBackend> {
        &self.backend
    }

    /// Gas density at standard conditions [kg/Sm3].
    pub fn standard_density(&self) -> f64 {
        self.standard_density
    }

    /// Create a zero-rate stream at the given conditions.
    pub fn stream_at(
        &self,
        pressure_bara: f64,
        temperature_kelvin: f64,
    ) -> FluidResult<FluidStream> {
        FluidStream::new(
            Arc::clone(&self.backend),
            self.model.composition.clone(),
            self.model.eos_model,
            ProcessConditions::from_bara_kelvin(pressure_bara, temperature_kelvin)?,
            0.0,
        )
    }

    /// Standard volume rate [Sm3/day] to mass rate [kg/h].
    pub fn standard_rate_to_mass_rate(&self, standard_rate_sm3_per_day: f64) -> f64 {
        standard_rate_sm3_per_day * self.standard_density / HOURS_PER_DAY
    }

    /// Mass rate [kg/h] to standard volume rate [Sm3/day].
    pub fn mass_rate_to_standard_rate(&self, mass_rate_kg_per_hour: f64) -> f64 {
        mass_rate_kg_per_hour * HOURS_PER_DAY / self.standard_density
    }
}

/// A fluid at a state, carrying a mass rate.
#[derive(Clone)]
pub struct FluidStream {
    backend: Arc<dyn ThermoBackend>,
    composition: FluidComposition,
    eos_model: EoSModel,
    conditions: ProcessConditions,
    mass_rate_kg_per_hour: f64,
    properties: FluidProperties,
    standard_density: f64,
}

impl fmt::Debug for FluidStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluidStream")
            .field("pressure_bara", &self.pressure_bara())
            .field("temperature_kelvin", &self.temperature_kelvin())
            .field("mass_rate_kg_per_hour", &self.mass_rate_kg_per_hour)
            .field("density", &self.properties.density)
            .finish()
    }
}

impl FluidStream {
    pub fn new(
        backend: Arc<dyn ThermoBackend>,
        composition: FluidComposition,
        eos_model: EoSModel,
        conditions: ProcessConditions,
        mass_rate_kg_per_hour: f64,
    ) -> FluidResult<Self> {
        if !mass_rate_kg_per_hour.is_finite() || mass_rate_kg_per_hour < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "mass rate must be non-negative and finite",
            });
        }
        let properties = backend.properties(&composition, eos_model, conditions, false)?;
        let standard = backend.properties(
            &composition,
            eos_model,
            ProcessConditions::standard_conditions(),
            true,
        )?;
        Ok(Self {
            backend,
            composition,
            eos_model,
            conditions,
            mass_rate_kg_per_hour,
            properties,
            standard_density: standard.density,
        })
    }

    pub fn composition(&self) -> &FluidComposition {
        &self.composition
    }

    pub fn eos_model(&self) -> EoSModel {
        self.eos_model
    }

    pub fn conditions(&self) -> ProcessConditions {
        self.conditions
    }

    pub fn pressure_bara(&self) -> f64 {
        self.conditions.pressure_bara()
    }

    pub fn temperature_kelvin(&self) -> f64 {
        self.conditions.temperature_kelvin()
    }

    pub fn mass_rate_kg_per_hour(&self) -> f64 {
        self.mass_rate_kg_per_hour
    }

    /// Density [kg/m3].
    pub fn density(&self) -> f64 {
        self.properties.density
    }

    /// Compressibility factor [-].
    pub fn z(&self) -> f64 {
        self.properties.z
    }

    /// Heat capacity ratio cp/cv [-].
    pub fn kappa(&self) -> f64 {
        self.properties.kappa
    }

    /// Specific enthalpy [J/kg].
    pub fn enthalpy_joule_per_kg(&self) -> f64 {
        self.properties.enthalpy_joule_per_kg
    }

    /// Molar mass [kg/mol].
    pub fn molar_mass(&self) -> f64 {
        self.properties.molar_mass
    }

    /// Molar vapor fraction [-].
    pub fn vapor_fraction_molar(&self) -> f64 {
        self.properties.vapor_fraction_molar
    }

    /// Gas density at standard conditions after a liquid-removing flash [kg/Sm3].
    pub fn standard_density(&self) -> f64 {
        self.standard_density
    }

    /// Actual volume rate at the stream conditions [m3/h].
    pub fn actual_rate_m3_per_hour(&self) -> f64 {
        self.mass_rate_kg_per_hour / self.properties.density
    }

    /// Same fluid and state, different mass rate.
    pub fn with_mass_rate(&self, mass_rate_kg_per_hour: f64) -> FluidResult<Self> {
        if !mass_rate_kg_per_hour.is_finite() || mass_rate_kg_per_hour < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "mass rate must be non-negative and finite",
            });
        }
        let mut stream = self.clone();
        stream.mass_rate_kg_per_hour = mass_rate_kg_per_hour;
        Ok(stream)
    }

    /// Flash to new conditions, optionally dropping the liquid phase.
    pub fn flash_to(
        &self,
        conditions: ProcessConditions,
        remove_liquid: bool,
    ) -> FluidResult<Self> {
        let properties =
            self.backend
                .properties(&self.composition, self.eos_model, conditions, remove_liquid)?;
        let mut stream = self.clone();
        stream.conditions = conditions;
        stream.properties = properties;
        Ok(stream)
    }

    /// New stream at `new_pressure_bara` whose temperature is found from an
    /// enthalpy change of `dh_joule_per_kg` relative to this stream
    /// (pressure-enthalpy flash).
    pub fn with_enthalpy_change(
        &self,
        dh_joule_per_kg: f64,
        new_pressure_bara: f64,
    ) -> FluidResult<Self> {
        let target_enthalpy = self.properties.enthalpy_joule_per_kg + dh_joule_per_kg;
        let temperature = self.backend.temperature_from_enthalpy(
            &self.composition,
            self.eos_model,
            new_pressure_bara,
            target_enthalpy,
        )?;
        self.flash_to(
            ProcessConditions::from_bara_kelvin(new_pressure_bara, temperature)?,
            false,
        )
    }

    /// Mix with another stream at the given conditions.
    ///
    /// The mixed composition is mole-weighted from the two mass rates; the
    /// result carries the summed mass rate and is flashed to `conditions`.
    /// When exactly one side has zero mass rate the other stream's
    /// composition is used unchanged (this rule applies at every call site,
    /// including streams whose standard density is degenerate).
    pub fn mix_with(
        &self,
        other: &FluidStream,
        self_mass_rate_kg_per_hour: f64,
        other_mass_rate_kg_per_hour: f64,
        conditions: ProcessConditions,
    ) -> FluidResult<Self> {
        if self.eos_model != other.eos_model {
            return Err(FluidError::InvalidArg {
                what: "mixing streams with different EoS models",
            });
        }
        let total = self_mass_rate_kg_per_hour + other_mass_rate_kg_per_hour;
        if self_mass_rate_kg_per_hour == 0.0 && other_mass_rate_kg_per_hour == 0.0 {
            // Degenerate mix: keep this stream's fluid, unchanged.
            return self.flash_to(conditions, false);
        }

        let self_moles = self_mass_rate_kg_per_hour / self.composition.molar_mass();
        let other_moles = other_mass_rate_kg_per_hour / other.composition.molar_mass();
        let mixed_composition = self.composition.mix(&other.composition, self_moles, other_moles)?;

        FluidStream::new(
            Arc::clone(&self.backend),
            mixed_composition,
            self.eos_model,
            conditions,
            total,
        )
    }

    /// Standard volume rate [Sm3/day] to mass rate [kg/h] for this fluid.
    pub fn standard_rate_to_mass_rate(&self, standard_rate_sm3_per_day: f64) -> f64 {
        standard_rate_sm3_per_day * self.standard_density / HOURS_PER_DAY
    }

    /// Mass rate [kg/h] to standard volume rate [Sm3/day] for this fluid.
    pub fn mass_rate_to_standard_rate(&self, mass_rate_kg_per_hour: f64) -> f64 {
        mass_rate_kg_per_hour * HOURS_PER_DAY / self.standard_density
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::cubic::CubicBackend;

    fn medium_gas_factory() -> FluidFactory {
        let composition = FluidComposition::new_mole_fractions(vec![
            (Component::Methane, 0.85),
            (Component::Ethane, 0.08),
            (Component::Propane, 0.03),
            (Component::CarbonDioxide, 0.02),
            (Component::Nitrogen, 0.02),
        ])
        .unwrap();
        FluidFactory::new(
            FluidModel::new(composition, EoSModel::Srk),
            Arc::new(CubicBackend::new()),
        )
        .unwrap()
    }

    #[test]
    fn rate_conversion_round_trips() {
        let factory = medium_gas_factory();
        let standard_rate = 3_000_000.0;
        let mass_rate = factory.standard_rate_to_mass_rate(standard_rate);
        let back = factory.mass_rate_to_standard_rate(mass_rate);
        assert!((back - standard_rate).abs() / standard_rate < 1e-9);
    }

    #[test]
    fn flash_is_pure() {
        let factory = medium_gas_factory();
        let stream = factory.stream_at(30.0, 300.0).unwrap();
        let flashed = stream
            .flash_to(ProcessConditions::from_bara_kelvin(60.0, 330.0).unwrap(), false)
            .unwrap();
        // Original untouched
        assert!((stream.pressure_bara() - 30.0).abs() < 1e-9);
        assert!((flashed.pressure_bara() - 60.0).abs() < 1e-9);
        assert!(flashed.density() > stream.density());
    }

    #[test]
    fn enthalpy_change_flash_heats_the_gas() {
        let factory = medium_gas_factory();
        let stream = factory.stream_at(30.0, 300.0).unwrap();
        let compressed = stream.with_enthalpy_change(150_000.0, 90.0).unwrap();
        assert!((compressed.pressure_bara() - 90.0).abs() < 1e-9);
        assert!(compressed.temperature_kelvin() > stream.temperature_kelvin());
        // The enthalpy actually moved by the requested amount
        let dh = compressed.enthalpy_joule_per_kg() - stream.enthalpy_joule_per_kg();
        assert!((dh - 150_000.0).abs() / 150_000.0 < 1e-3, "dh = {dh}");
    }

    #[test]
    fn mixing_pure_streams_mole_weights_composition() {
        let backend: Arc<dyn ThermoBackend> = Arc::new(CubicBackend::new());
        let conditions = ProcessConditions::from_bara_kelvin(20.0, 300.0).unwrap();
        let methane = FluidStream::new(
            Arc::clone(&backend),
            FluidComposition::pure(Component::Methane),
            EoSModel::Srk,
            conditions,
            100.0,
        )
        .unwrap();
        let ethane = FluidStream::new(
            Arc::clone(&backend),
            FluidComposition::pure(Component::Ethane),
            EoSModel::Srk,
            conditions,
            100.0,
        )
        .unwrap();

        // Equal mass rates: mole fractions weight by 1/M
        let mixed = methane.mix_with(&ethane, 100.0, 100.0, conditions).unwrap();
        let n_methane = 100.0 / Component::Methane.molar_mass();
        let n_ethane = 100.0 / Component::Ethane.molar_mass();
        let expected = n_methane / (n_methane + n_ethane);
        assert!(
            (mixed.composition().mole_fraction(Component::Methane) - expected).abs() < 1e-9
        );
        assert!((mixed.mass_rate_kg_per_hour() - 200.0).abs() < 1e-12);
    }

    #[test]
    fn mixing_with_zero_rate_returns_other_composition() {
        let backend: Arc<dyn ThermoBackend> = Arc::new(CubicBackend::new());
        let conditions = ProcessConditions::from_bara_kelvin(20.0, 300.0).unwrap();
        let methane = FluidStream::new(
            Arc::clone(&backend),
            FluidComposition::pure(Component::Methane),
            EoSModel::Srk,
            conditions,
            0.0,
        )
        .unwrap();
        let ethane = FluidStream::new(
            Arc::clone(&backend),
            FluidComposition::pure(Component::Ethane),
            EoSModel::Srk,
            conditions,
            50.0,
        )
        .unwrap();

        let mixed = methane.mix_with(&ethane, 0.0, 50.0, conditions).unwrap();
        assert_eq!(mixed.composition().mole_fraction(Component::Ethane), 1.0);
    }

    #[test]
    fn negative_mass_rate_rejected() {
        let factory = medium_gas_factory();
        let stream = factory.stream_at(30.0, 300.0).unwrap();
        assert!(stream.with_mass_rate(-1.0).is_err());
    }
}
