//! Single-speed compressor train.
//!
//! No speed degree of freedom: the train is evaluated at its fixed speed and
//! any mismatch against the discharge target is absorbed by the configured
//! pressure-control strategy.

use crate::common::{
    TargetComparison, calculate_train_given_rate_pd_speed, calculate_train_given_rate_ps_pd_speed,
    calculate_train_given_rate_ps_speed, compare_to_target, maximize_x_where_valid,
};
use crate::config::{CompressorTrainStage, EnergyAdjustment, PressureControl};
use crate::error::{TrainError, TrainResult};
use crate::results::{CompressorTrainResult, FailureStatus, StreamState};
use gt_chart::CompressorChart;
use gt_core::numeric::INNER_ITERATION_CAP;
use gt_core::units::constants::{
    EPSILON, PRESSURE_CALCULATION_TOLERANCE, RATE_CALCULATION_TOLERANCE,
};
use gt_fluids::FluidFactory;
use rayon::prelude::*;
use tracing::debug;

pub struct SingleSpeedCompressorTrain {
    stages: Vec<CompressorTrainStage>,
    fluid_factory: FluidFactory,
    pressure_control: PressureControl,
    maximum_power_megawatt: Option<f64>,
    maximum_discharge_pressure_bara: Option<f64>,
    energy_adjustment: EnergyAdjustment,
}

impl SingleSpeedCompressorTrain {
    pub fn new(
        stages: Vec<CompressorTrainStage>,
        fluid_factory: FluidFactory,
        pressure_control: PressureControl,
        maximum_power_megawatt: Option<f64>,
        maximum_discharge_pressure_bara: Option<f64>,
        energy_adjustment: EnergyAdjustment,
    ) -> TrainResult<Self> {
        if stages.is_empty() {
            return Err(TrainError::InvalidConfig {
                what: "train needs at least one stage",
            });
        }
        if stages
            .iter()
            .any(|s| !matches!(s.chart, CompressorChart::SingleSpeed(_)))
        {
            return Err(TrainError::InvalidConfig {
                what: "single speed train requires single speed charts",
            });
        }
        if let Some(max_pd) = maximum_discharge_pressure_bara {
            if !(max_pd > 0.0) {
                return Err(TrainError::InvalidConfig {
                    what: "maximum discharge pressure must be positive",
                });
            }
            if pressure_control != PressureControl::DownstreamChoke {
                return Err(TrainError::InvalidConfig {
                    what: "maximum discharge pressure requires downstream choke control",
                });
            }
        }
        Ok(Self {
            stages,
            fluid_factory,
            pressure_control,
            maximum_power_megawatt,
            maximum_discharge_pressure_bara,
            energy_adjustment,
        })
    }

    pub fn stages(&self) -> &[CompressorTrainStage] {
        &self.stages
    }

    pub fn fluid_factory(&self) -> &FluidFactory {
        &self.fluid_factory
    }

    /// Evaluate one operating point given standard rate and pressures.
    pub fn evaluate(
        &self,
        rate_sm3_per_day: f64,
        suction_pressure_bara: f64,
        discharge_pressure_bara: f64,
    ) -> TrainResult<CompressorTrainResult> {
        let mass_rate = self.fluid_factory.standard_rate_to_mass_rate(rate_sm3_per_day);
        let mut result = self.evaluate_given_mass_rate_ps_pd(
            mass_rate,
            suction_pressure_bara,
            discharge_pressure_bara,
        )?;
        result.finalize(self.maximum_power_megawatt, self.energy_adjustment);
        Ok(result)
    }

    /// Evaluate a batch of independent operating points in parallel.
    pub fn evaluate_batch(
        &self,
        rates_sm3_per_day: &[f64],
        suction_pressures_bara: &[f64],
        discharge_pressures_bara: &[f64],
    ) -> TrainResult<Vec<CompressorTrainResult>> {
        if rates_sm3_per_day.len() != suction_pressures_bara.len()
            || rates_sm3_per_day.len() != discharge_pressures_bara.len()
        {
            return Err(TrainError::InvalidInput {
                what: "rate and pressure vectors must have equal length",
            });
        }
        (0..rates_sm3_per_day.len())
            .into_par_iter()
            .map(|i| {
                self.evaluate(
                    rates_sm3_per_day[i],
                    suction_pressures_bara[i],
                    discharge_pressures_bara[i],
                )
            })
            .collect()
    }

    fn evaluate_given_mass_rate_ps_pd(
        &self,
        mass_rate_kg_per_hour: f64,
        suction_pressure_bara: f64,
        target_discharge_pressure_bara: f64,
    ) -> TrainResult<CompressorTrainResult> {
        if mass_rate_kg_per_hour <= 0.0 {
            return Ok(CompressorTrainResult::create_empty(
                self.stages.len(),
                FailureStatus::NoFailure,
            ));
        }

        let free = calculate_train_given_rate_ps_speed(
            &self.stages,
            &self.fluid_factory,
            mass_rate_kg_per_hour,
            suction_pressure_bara,
            f64::NAN,
            0.0,
            0.0,
        )?;

        let mut result = if let Some(choked_free) = self.apply_maximum_discharge_pressure(
            &free,
            mass_rate_kg_per_hour,
            suction_pressure_bara,
        )? {
            // The floating discharge was pulled down to the cap by upstream
            // choking; only the downstream choke to target remains.
            let mut result = choked_free;
            match compare_to_target(
                result.discharge_pressure_bara(),
                target_discharge_pressure_bara,
            ) {
                TargetComparison::BelowTarget => {
                    result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
                }
                TargetComparison::Met | TargetComparison::AboveTarget => {
                    choke_discharge_to(&mut result, target_discharge_pressure_bara);
                }
            }
            result
        } else {
            match compare_to_target(free.discharge_pressure_bara(), target_discharge_pressure_bara)
            {
                TargetComparison::Met => free,
                TargetComparison::BelowTarget => {
                    let mut result = free;
                    result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
                    result
                }
                TargetComparison::AboveTarget => calculate_train_given_rate_ps_pd_speed(
                    &self.stages,
                    &self.fluid_factory,
                    self.pressure_control,
                    mass_rate_kg_per_hour,
                    suction_pressure_bara,
                    target_discharge_pressure_bara,
                    f64::NAN,
                )?,
            }
        };

        // The stonewall wins over pressure-target bookkeeping.
        if result
            .stage_results
            .iter()
            .any(|s| s.rate_exceeds_maximum)
        {
            result.failure_status = FailureStatus::AboveMaximumFlowRate;
        }
        result.speed_rpm = self.stages[0].chart.maximum_speed();
        Ok(result)
    }

    /// Upstream-choke the train onto the maximum discharge pressure when the
    /// free operating point floats above it. Returns `None` when the cap is
    /// not configured or not violated.
    fn apply_maximum_discharge_pressure(
        &self,
        free: &CompressorTrainResult,
        mass_rate_kg_per_hour: f64,
        suction_pressure_bara: f64,
    ) -> TrainResult<Option<CompressorTrainResult>> {
        let Some(max_pd) = self.maximum_discharge_pressure_bara else {
            return Ok(None);
        };
        if free.discharge_pressure_bara() <= max_pd * (1.0 + PRESSURE_CALCULATION_TOLERANCE) {
            return Ok(None);
        }
        debug!(
            discharge = free.discharge_pressure_bara(),
            max_pd, "floating discharge above maximum; choking upstream"
        );

        let mut choked = calculate_train_given_rate_pd_speed(
            &self.stages,
            &self.fluid_factory,
            mass_rate_kg_per_hour,
            max_pd,
            f64::NAN,
            suction_pressure_bara,
        )?;
        if let Some(first) = choked.stage_results.first_mut() {
            first.inlet_pressure_before_choking_bara =
                suction_pressure_bara - self.stages[0].pressure_drop_ahead_of_stage_bar;
        }
        let original_inlet = self
            .fluid_factory
            .stream_at(suction_pressure_bara, self.stages[0].inlet_temperature_kelvin)?
            .with_mass_rate(mass_rate_kg_per_hour)?;
        choked.inlet_stream = StreamState::from_stream(&original_inlet);
        Ok(Some(choked))
    }

    /// Largest standard rate [Sm3/day] the train can move between the given
    /// pressures while staying valid.
    pub fn get_max_standard_rate(
        &self,
        suction_pressure_bara: f64,
        discharge_pressure_bara: f64,
    ) -> TrainResult<f64> {
        let stage_inlet_pressure =
            suction_pressure_bara - self.stages[0].pressure_drop_ahead_of_stage_bar;
        if stage_inlet_pressure <= 0.0 {
            return Ok(0.0);
        }
        let inlet = self
            .fluid_factory
            .stream_at(stage_inlet_pressure, self.stages[0].inlet_temperature_kelvin)?;
        let max_mass_rate =
            self.stages[0].chart.maximum_rate_at_speed(f64::NAN) * inlet.density();

        let is_valid = |mass_rate: f64| -> TrainResult<bool> {
            let mut result = self.evaluate_given_mass_rate_ps_pd(
                mass_rate,
                suction_pressure_bara,
                discharge_pressure_bara,
            )?;
            result.finalize(self.maximum_power_megawatt, self.energy_adjustment);
            Ok(result.is_valid())
        };

        if !is_valid(EPSILON)? {
            return Ok(0.0);
        }
        let max_valid = maximize_x_where_valid(
            EPSILON,
            max_mass_rate,
            is_valid,
            RATE_CALCULATION_TOLERANCE,
            INNER_ITERATION_CAP,
        );
        Ok(self
            .fluid_factory
            .mass_rate_to_standard_rate(max_valid * (1.0 - RATE_CALCULATION_TOLERANCE)))
    }

    /// Vector form of [`Self::get_max_standard_rate`].
    pub fn get_max_standard_rate_batch(
        &self,
        suction_pressures_bara: &[f64],
        discharge_pressures_bara: &[f64],
    ) -> TrainResult<Vec<f64>> {
        suction_pressures_bara
            .iter()
            .zip(discharge_pressures_bara)
            .map(|(ps, pd)| self.get_max_standard_rate(*ps, *pd))
            .collect()
    }
}

/// Mark the last stage as downstream-choked onto the target pressure.
fn choke_discharge_to(result: &mut CompressorTrainResult, target_pressure_bara: f64) {
    if let Some(last) = result.stage_results.last_mut() {
        if compare_to_target(last.outlet_stream.pressure_bara, target_pressure_bara)
            == TargetComparison::Met
        {
            return;
        }
        last.pressure_is_choked = true;
        last.outlet_pressure_before_choking_bara = last.outlet_stream.pressure_bara;
        last.outlet_stream.pressure_bara = target_pressure_bara;
    }
    result.outlet_stream.pressure_bara = target_pressure_bara;
}
