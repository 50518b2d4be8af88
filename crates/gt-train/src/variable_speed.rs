//! Variable-speed compressor train on a common shaft.
//!
//! Every stage turns at the same speed, so meeting a discharge-pressure
//! target is a one-dimensional root-finding problem on shaft speed. When the
//! target falls below what minimum speed delivers, the configured
//! pressure-control strategy absorbs the difference.

use crate::common::{
    TargetComparison, calculate_train_given_rate_ps_pd_speed, calculate_train_given_rate_ps_speed,
    compare_to_target, maximize_x_where_valid, try_find_root,
};
use crate::config::{CompressorTrainStage, EnergyAdjustment, PressureControl};
use crate::error::{TrainError, TrainResult};
use crate::results::{CompressorTrainResult, FailureStatus};
use crate::single_speed::SingleSpeedCompressorTrain;
use gt_chart::{CompressorChart, VariableSpeedChart};
use gt_core::numeric::INNER_ITERATION_CAP;
use gt_core::units::constants::{
    EPSILON, POWER_CALCULATION_TOLERANCE, RATE_CALCULATION_TOLERANCE,
};
use gt_fluids::FluidFactory;
use rayon::prelude::*;
use tracing::debug;

pub struct VariableSpeedCompressorTrain {
    stages: Vec<CompressorTrainStage>,
    fluid_factory: FluidFactory,
    pressure_control: Option<PressureControl>,
    maximum_power_megawatt: Option<f64>,
    energy_adjustment: EnergyAdjustment,
    minimum_speed: f64,
    maximum_speed: f64,
}

impl VariableSpeedCompressorTrain {
    pub fn new(
        stages: Vec<CompressorTrainStage>,
        fluid_factory: FluidFactory,
        pressure_control: Option<PressureControl>,
        maximum_power_megawatt: Option<f64>,
        energy_adjustment: EnergyAdjustment,
    ) -> TrainResult<Self> {
        if stages.is_empty() {
            return Err(TrainError::InvalidConfig {
                what: "train needs at least one stage",
            });
        }
        if stages
            .iter()
            .any(|s| !matches!(s.chart, CompressorChart::VariableSpeed(_)))
        {
            return Err(TrainError::InvalidConfig {
                what: "variable speed train requires variable speed charts",
            });
        }

        // Common shaft: the train can only run where every stage's chart is
        // defined.
        let minimum_speed = stages
            .iter()
            .map(|s| s.chart.minimum_speed())
            .fold(f64::NEG_INFINITY, f64::max);
        let maximum_speed = stages
            .iter()
            .map(|s| s.chart.maximum_speed())
            .fold(f64::INFINITY, f64::min);
        if minimum_speed > maximum_speed {
            return Err(TrainError::InvalidConfig {
                what: "stage charts have no common speed range",
            });
        }

        Ok(Self {
            stages,
            fluid_factory,
            pressure_control,
            maximum_power_megawatt,
            energy_adjustment,
            minimum_speed,
            maximum_speed,
        })
    }

    pub fn stages(&self) -> &[CompressorTrainStage] {
        &self.stages
    }

    pub fn fluid_factory(&self) -> &FluidFactory {
        &self.fluid_factory
    }

    pub fn minimum_speed(&self) -> f64 {
        self.minimum_speed
    }

    pub fn maximum_speed(&self) -> f64 {
        self.maximum_speed
    }

    /// Evaluate one operating point given standard rate and pressures.
    pub fn evaluate(
        &self,
        rate_sm3_per_day: f64,
        suction_pressure_bara: f64,
        discharge_pressure_bara: f64,
    ) -> TrainResult<CompressorTrainResult> {
        let mass_rate = self.fluid_factory.standard_rate_to_mass_rate(rate_sm3_per_day);
        let mut result = if mass_rate > 0.0 {
            self.calculate_shaft_speed_given_rate_ps_pd(
                mass_rate,
                suction_pressure_bara,
                discharge_pressure_bara,
            )?
        } else {
            CompressorTrainResult::create_empty(self.stages.len(), FailureStatus::NoFailure)
        };
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

    fn forward(
        &self,
        mass_rate_kg_per_hour: f64,
        inlet_pressure_bara: f64,
        speed: f64,
    ) -> TrainResult<CompressorTrainResult> {
        calculate_train_given_rate_ps_speed(
            &self.stages,
            &self.fluid_factory,
            mass_rate_kg_per_hour,
            inlet_pressure_bara,
            speed,
            0.0,
            0.0,
        )
    }

    /// Find the shaft speed meeting the discharge target, or the closest
    /// feasible operating point with its failure status.
    pub fn calculate_shaft_speed_given_rate_ps_pd(
        &self,
        mass_rate_kg_per_hour: f64,
        suction_pressure_bara: f64,
        target_discharge_pressure_bara: f64,
    ) -> TrainResult<CompressorTrainResult> {
        let within_capacity = |result: &CompressorTrainResult| {
            result.stage_results.iter().all(|s| s.point_is_valid)
        };

        let result_for_maximum_speed =
            self.forward(mass_rate_kg_per_hour, suction_pressure_bara, self.maximum_speed)?;
        if !within_capacity(&result_for_maximum_speed) {
            // The rate is beyond the stonewall even at maximum speed.
            let mut result = result_for_maximum_speed;
            result.failure_status = FailureStatus::AboveMaximumFlowRate;
            return Ok(result);
        }

        let mut minimum_speed = self.minimum_speed;
        let mut result_for_minimum_speed =
            self.forward(mass_rate_kg_per_hour, suction_pressure_bara, minimum_speed)?;
        if !within_capacity(&result_for_minimum_speed) {
            // The rate exceeds capacity at minimum speed; tighten the lower
            // bound to the lowest speed that stays inside the envelope.
            minimum_speed = -maximize_x_where_valid(
                -self.maximum_speed,
                -self.minimum_speed,
                |negated_speed| {
                    Ok(within_capacity(&self.forward(
                        mass_rate_kg_per_hour,
                        suction_pressure_bara,
                        -negated_speed,
                    )?))
                },
                RATE_CALCULATION_TOLERANCE,
                INNER_ITERATION_CAP,
            );
            result_for_minimum_speed =
                self.forward(mass_rate_kg_per_hour, suction_pressure_bara, minimum_speed)?;
        }

        // Solution 1: the target is bracketed by the speed range.
        if result_for_minimum_speed.discharge_pressure_bara() <= target_discharge_pressure_bara
            && target_discharge_pressure_bara
                <= result_for_maximum_speed.discharge_pressure_bara()
        {
            let speed = try_find_root(self.minimum_speed, self.maximum_speed, |s| {
                Ok(self
                    .forward(mass_rate_kg_per_hour, suction_pressure_bara, s)?
                    .discharge_pressure_bara()
                    - target_discharge_pressure_bara)
            })?;
            let mut result =
                self.forward(mass_rate_kg_per_hour, suction_pressure_bara, speed)?;
            self.set_failure_from_target(&mut result, target_discharge_pressure_bara);
            return Ok(result);
        }

        // Solution 2: the target is below the minimum-speed discharge.
        if target_discharge_pressure_bara < result_for_minimum_speed.discharge_pressure_bara() {
            if let Some(pressure_control) = self.pressure_control {
                let mut result = self.evaluate_with_pressure_control(
                    pressure_control,
                    mass_rate_kg_per_hour,
                    suction_pressure_bara,
                    target_discharge_pressure_bara,
                    minimum_speed,
                )?;
                self.set_failure_from_target(&mut result, target_discharge_pressure_bara);
                return Ok(result);
            }
            let mut result = result_for_minimum_speed;
            result.failure_status = FailureStatus::TargetDischargePressureTooLow;
            return Ok(result);
        }

        // Solution 3: the target is above the maximum-speed discharge.
        let mut result = result_for_maximum_speed;
        result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
        Ok(result)
    }

    /// Fixed-speed evaluation with the given pressure control.
    ///
    /// Chokes and the uniform ASV fraction apply directly; the ASV-pressure
    /// and common-ASV strategies run through the single-speed equivalent
    /// train projected at this speed.
    pub fn evaluate_with_pressure_control(
        &self,
        pressure_control: PressureControl,
        mass_rate_kg_per_hour: f64,
        inlet_pressure_bara: f64,
        outlet_pressure_bara: f64,
        speed: f64,
    ) -> TrainResult<CompressorTrainResult> {
        match pressure_control {
            PressureControl::UpstreamChoke
            | PressureControl::DownstreamChoke
            | PressureControl::IndividualAsvRate => calculate_train_given_rate_ps_pd_speed(
                &self.stages,
                &self.fluid_factory,
                pressure_control,
                mass_rate_kg_per_hour,
                inlet_pressure_bara,
                outlet_pressure_bara,
                speed,
            ),
            PressureControl::IndividualAsvPressure | PressureControl::CommonAsv => {
                let mut result = self
                    .single_speed_equivalent(speed)?
                    .evaluate(
                        self.fluid_factory
                            .mass_rate_to_standard_rate(mass_rate_kg_per_hour),
                        inlet_pressure_bara,
                        outlet_pressure_bara,
                    )?;
                result.speed_rpm = speed;
                Ok(result)
            }
        }
    }

    /// Project every stage chart onto its curve at `speed` and build the
    /// equivalent fixed-speed train with the same control strategy.
    pub fn single_speed_equivalent(&self, speed: f64) -> TrainResult<SingleSpeedCompressorTrain> {
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                Ok(CompressorTrainStage {
                    chart: CompressorChart::SingleSpeed(stage.chart.single_speed_equivalent(speed)?),
                    inlet_temperature_kelvin: stage.inlet_temperature_kelvin,
                    pressure_drop_ahead_of_stage_bar: stage.pressure_drop_ahead_of_stage_bar,
                    remove_liquid_after_cooling: stage.remove_liquid_after_cooling,
                })
            })
            .collect::<TrainResult<Vec<_>>>()?;
        SingleSpeedCompressorTrain::new(
            stages,
            self.fluid_factory.clone(),
            self.pressure_control
                .unwrap_or(PressureControl::DownstreamChoke),
            None,
            None,
            EnergyAdjustment::default(),
        )
    }

    fn set_failure_from_target(&self, result: &mut CompressorTrainResult, target: f64) {
        if result.stage_results.iter().any(|s| s.rate_exceeds_maximum) {
            result.failure_status = FailureStatus::AboveMaximumFlowRate;
            return;
        }
        if result.failure_status != FailureStatus::NoFailure {
            return;
        }
        match compare_to_target(result.discharge_pressure_bara(), target) {
            TargetComparison::Met => {}
            TargetComparison::BelowTarget => {
                result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
            }
            TargetComparison::AboveTarget => {
                result.failure_status = FailureStatus::TargetDischargePressureTooLow;
            }
        }
    }

    fn first_stage_chart(&self) -> TrainResult<&VariableSpeedChart> {
        self.stages[0]
            .chart
            .as_variable_speed()
            .ok_or(TrainError::InvalidConfig {
                what: "variable speed train requires variable speed charts",
            })
    }

    /// Largest standard rates [Sm3/day] for each (suction, discharge) pair.
    pub fn get_max_standard_rate_batch(
        &self,
        suction_pressures_bara: &[f64],
        discharge_pressures_bara: &[f64],
    ) -> TrainResult<Vec<f64>> {
        if suction_pressures_bara.len() != discharge_pressures_bara.len() {
            return Err(TrainError::InvalidInput {
                what: "rate and pressure vectors must have equal length",
            });
        }
        suction_pressures_bara
            .iter()
            .zip(discharge_pressures_bara)
            .map(|(ps, pd)| self.get_max_standard_rate(*ps, *pd))
            .collect()
    }

    /// Largest standard rate [Sm3/day] for which the evaluation is valid.
    ///
    /// The solution can land on the maximum-speed curve, on a
    /// pressure-controlled point at maximum speed, or on the stonewall; a
    /// configured maximum power further caps the rate.
    pub fn get_max_standard_rate(
        &self,
        suction_pressure_bara: f64,
        target_discharge_pressure_bara: f64,
    ) -> TrainResult<f64> {
        match self.get_max_mass_rate(suction_pressure_bara, target_discharge_pressure_bara, false)
        {
            Ok(mass_rate) => Ok(self.fluid_factory.mass_rate_to_standard_rate(mass_rate)),
            Err(e) => {
                debug!("maximum-rate search failed: {e}");
                Ok(f64::NAN)
            }
        }
    }

    fn get_max_mass_rate(
        &self,
        suction_pressure_bara: f64,
        target_discharge_pressure_bara: f64,
        allow_asv: bool,
    ) -> TrainResult<f64> {
        let chart = self.first_stage_chart()?;
        let inlet = self.fluid_factory.stream_at(
            suction_pressure_bara,
            self.stages[0].inlet_temperature_kelvin,
        )?;
        let inlet_density = inlet.density();

        let within_capacity = |result: &CompressorTrainResult| {
            result.stage_results.iter().all(|s| s.point_is_valid)
        };
        let calc = |mass_rate: f64, speed: f64| {
            self.forward(mass_rate, suction_pressure_bara, speed)
        };

        // First-stage bounds on the maximum-speed curve; validated for the
        // whole train below.
        let min_mass_rate_at_max_speed_first_stage =
            chart.maximum_speed_curve().minimum_rate() * inlet_density;
        let max_mass_rate_at_max_speed_first_stage =
            chart.maximum_speed_curve().maximum_rate() * inlet_density;
        let max_mass_rate_at_min_speed_first_stage =
            chart.maximum_rate_as_function_of_speed(self.minimum_speed) * inlet_density;

        let result_min_at_max_speed = calc(min_mass_rate_at_max_speed_first_stage, self.maximum_speed)?;

        let min_mass_rate_at_max_speed: f64;
        let result_min_mass_rate_at_max_speed: CompressorTrainResult;
        let mut max_mass_rate_at_max_speed = max_mass_rate_at_max_speed_first_stage;
        let mut result_max_mass_rate_at_max_speed =
            calc(max_mass_rate_at_max_speed_first_stage, self.maximum_speed)?;

        if !within_capacity(&result_min_at_max_speed) {
            if !allow_asv {
                debug!("no valid mass rate without ASV; returning zero maximum rate");
                return Ok(0.0);
            }
            let result_epsilon = calc(EPSILON, self.maximum_speed)?;
            if !within_capacity(&result_epsilon) {
                debug!("no valid mass rate even with full recirculation");
                return Ok(0.0);
            }
            min_mass_rate_at_max_speed = EPSILON;
            result_min_mass_rate_at_max_speed = result_epsilon;
            max_mass_rate_at_max_speed = maximize_x_where_valid(
                EPSILON,
                min_mass_rate_at_max_speed_first_stage,
                |mass| Ok(within_capacity(&calc(mass, self.maximum_speed)?)),
                RATE_CALCULATION_TOLERANCE,
                INNER_ITERATION_CAP,
            );
            result_max_mass_rate_at_max_speed = calc(max_mass_rate_at_max_speed, self.maximum_speed)?;
        } else {
            min_mass_rate_at_max_speed = min_mass_rate_at_max_speed_first_stage;
            result_min_mass_rate_at_max_speed = result_min_at_max_speed;
            if !within_capacity(&result_max_mass_rate_at_max_speed) {
                max_mass_rate_at_max_speed = maximize_x_where_valid(
                    min_mass_rate_at_max_speed,
                    max_mass_rate_at_max_speed_first_stage,
                    |mass| Ok(within_capacity(&calc(mass, self.maximum_speed)?)),
                    RATE_CALCULATION_TOLERANCE,
                    INNER_ITERATION_CAP,
                );
                result_max_mass_rate_at_max_speed =
                    calc(max_mass_rate_at_max_speed, self.maximum_speed)?;
            }
        }

        // Scenario 1: the head target is out of reach at any rate.
        if result_min_mass_rate_at_max_speed.discharge_pressure_bara()
            < target_discharge_pressure_bara
        {
            return Ok(0.0);
        }

        let rate_to_return = if target_discharge_pressure_bara
            >= result_max_mass_rate_at_max_speed.discharge_pressure_bara()
        {
            // Scenario 2: the solution lies on the maximum-speed curve.
            let mass_rate = try_find_root(
                min_mass_rate_at_max_speed,
                max_mass_rate_at_max_speed,
                |mass| {
                    Ok(calc(mass, self.maximum_speed)?.discharge_pressure_bara()
                        - target_discharge_pressure_bara)
                },
            )?;
            mass_rate * (1.0 - RATE_CALCULATION_TOLERANCE)
        } else if self.pressure_control.is_some()
            && self
                .evaluate_with_pressure_control(
                    self.pressure_control.unwrap_or(PressureControl::DownstreamChoke),
                    max_mass_rate_at_max_speed,
                    suction_pressure_bara,
                    target_discharge_pressure_bara,
                    self.maximum_speed,
                )
                .map(|r| r.is_valid())
                .unwrap_or(false)
        {
            // Scenario 3: pressure control absorbs the overshoot at full rate.
            max_mass_rate_at_max_speed * (1.0 - RATE_CALCULATION_TOLERANCE)
        } else {
            // Scenario 4: the solution lies on the stonewall.
            let result_max_mass_rate_at_min_speed = {
                let result = calc(max_mass_rate_at_min_speed_first_stage, self.minimum_speed)?;
                if within_capacity(&result) {
                    result
                } else {
                    let mass = maximize_x_where_valid(
                        EPSILON,
                        max_mass_rate_at_min_speed_first_stage,
                        |mass| Ok(within_capacity(&calc(mass, self.minimum_speed)?)),
                        RATE_CALCULATION_TOLERANCE,
                        INNER_ITERATION_CAP,
                    );
                    calc(mass, self.minimum_speed)?
                }
            };

            if result_max_mass_rate_at_max_speed.discharge_pressure_bara()
                >= target_discharge_pressure_bara
                && target_discharge_pressure_bara
                    >= result_max_mass_rate_at_min_speed.discharge_pressure_bara()
            {
                let stone_wall_result = |speed: f64| -> TrainResult<CompressorTrainResult> {
                    let max_valid_mass = maximize_x_where_valid(
                        chart.minimum_rate_as_function_of_speed(speed) * inlet_density,
                        chart.maximum_rate_as_function_of_speed(speed) * inlet_density,
                        |mass| Ok(within_capacity(&calc(mass, speed)?)),
                        RATE_CALCULATION_TOLERANCE,
                        INNER_ITERATION_CAP,
                    );
                    calc(max_valid_mass, speed)
                };
                let speed = try_find_root(self.minimum_speed, self.maximum_speed, |s| {
                    Ok(stone_wall_result(s)?.discharge_pressure_bara()
                        - target_discharge_pressure_bara)
                })?;
                let result = stone_wall_result(speed)?;
                result.mass_rate_asv_corrected_kg_per_hour() * (1.0 - RATE_CALCULATION_TOLERANCE)
            } else if result_max_mass_rate_at_min_speed.discharge_pressure_bara()
                > target_discharge_pressure_bara
            {
                // Scenario 5: pressure too high even at minimum speed and
                // maximum flow.
                return Ok(0.0);
            } else {
                return Err(TrainError::InvalidInput {
                    what: "inconsistent maximum-rate search state",
                });
            }
        };

        // A configured maximum power can cap the rate further.
        let Some(maximum_power) = self.maximum_power_megawatt else {
            return Ok(rate_to_return);
        };
        let power_at = |mass: f64| -> TrainResult<f64> {
            Ok(self
                .calculate_shaft_speed_given_rate_ps_pd(
                    mass,
                    suction_pressure_bara,
                    target_discharge_pressure_bara,
                )?
                .power_megawatt)
        };
        if power_at(rate_to_return)? <= maximum_power {
            return Ok(rate_to_return);
        }
        let result_minimum_rate = self.calculate_shaft_speed_given_rate_ps_pd(
            EPSILON,
            suction_pressure_bara,
            target_discharge_pressure_bara,
        )?;
        if result_minimum_rate.power_megawatt > maximum_power {
            // Even idle recirculation exceeds the power budget.
            return Ok(0.0);
        }
        try_find_root(
            result_minimum_rate.mass_rate_asv_corrected_kg_per_hour(),
            rate_to_return,
            |mass| Ok(power_at(mass)? - maximum_power * (1.0 - POWER_CALCULATION_TOLERANCE)),
        )
    }
}
