//! The thermodynamic backend is a trait: the control logic runs unchanged on
//! an ideal-gas stub, which keeps these tests independent of the cubic
//! equation of state.

mod common;

use approx::assert_relative_eq;
use common::{stage, variable_chart_wide};
use gt_core::units::constants::GAS_CONSTANT;
use gt_fluids::{
    Component, EoSModel, FluidComposition, FluidFactory, FluidModel, FluidProperties,
    FluidResult, ProcessConditions, ThermoBackend,
};
use gt_train::{EnergyAdjustment, VariableSpeedCompressorTrain};
use std::sync::Arc;

/// Ideal gas with a constant specific heat: z = 1, kappa from cp and the
/// specific gas constant, enthalpy linear in temperature.
#[derive(Debug)]
struct IdealGasBackend {
    cp_joule_per_kg_kelvin: f64,
}

impl IdealGasBackend {
    fn new(cp_joule_per_kg_kelvin: f64) -> Self {
        Self {
            cp_joule_per_kg_kelvin,
        }
    }
}

impl ThermoBackend for IdealGasBackend {
    fn name(&self) -> &str {
        "ideal-gas-stub"
    }

    fn properties(
        &self,
        composition: &FluidComposition,
        _eos_model: EoSModel,
        conditions: ProcessConditions,
        _remove_liquid: bool,
    ) -> FluidResult<FluidProperties> {
        let molar_mass = composition.molar_mass();
        let r_specific = GAS_CONSTANT / molar_mass;
        let pressure_pa = conditions.pressure_bara() * 1.0e5;
        let temperature = conditions.temperature_kelvin();
        let cp = self.cp_joule_per_kg_kelvin;
        Ok(FluidProperties {
            density: pressure_pa / (r_specific * temperature),
            z: 1.0,
            kappa: cp / (cp - r_specific),
            enthalpy_joule_per_kg: cp * temperature,
            molar_mass,
            vapor_fraction_molar: 1.0,
        })
    }

    fn temperature_from_enthalpy(
        &self,
        _composition: &FluidComposition,
        _eos_model: EoSModel,
        _pressure_bara: f64,
        enthalpy_joule_per_kg: f64,
    ) -> FluidResult<f64> {
        Ok(enthalpy_joule_per_kg / self.cp_joule_per_kg_kelvin)
    }
}

fn ideal_methane_factory() -> FluidFactory {
    FluidFactory::new(
        FluidModel::new(FluidComposition::pure(Component::Methane), EoSModel::Srk),
        Arc::new(IdealGasBackend::new(2200.0)),
    )
    .unwrap()
}

#[test]
fn train_solves_on_the_stub_backend() {
    let train = VariableSpeedCompressorTrain::new(
        vec![stage(variable_chart_wide())],
        ideal_methane_factory(),
        None,
        None,
        EnergyAdjustment::default(),
    )
    .unwrap();

    let result = train.evaluate(3_000_000.0, 30.0, 95.0).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_relative_eq!(result.discharge_pressure_bara(), 95.0, max_relative = 1e-3);
    assert!(result.power_megawatt > 0.0);
    // Compression heats an ideal gas
    assert!(result.outlet_stream.temperature_kelvin > 303.15);
}

#[test]
fn stub_power_matches_hand_calculation() {
    let train = VariableSpeedCompressorTrain::new(
        vec![stage(variable_chart_wide())],
        ideal_methane_factory(),
        None,
        None,
        EnergyAdjustment::default(),
    )
    .unwrap();
    let result = train.evaluate(3_000_000.0, 30.0, 95.0).unwrap();

    // Power = mass rate (incl. recirculation) * dH / 3.6e9
    let stage_result = &result.stage_results[0];
    let dh = stage_result.polytropic_enthalpy_change_joule_per_kg;
    let expected =
        stage_result.mass_rate_asv_corrected_kg_per_hour * dh / 3.6e9;
    assert_relative_eq!(result.power_megawatt, expected, max_relative = 1e-9);

    // And dH agrees with the ideal-gas temperature rise
    let dt = stage_result.outlet_stream.temperature_kelvin
        - stage_result.inlet_stream.temperature_kelvin;
    assert_relative_eq!(dh, 2200.0 * dt, max_relative = 1e-6);
}
