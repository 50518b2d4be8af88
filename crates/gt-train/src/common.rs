//! Shared train-evaluation machinery: the forward stage walk, target
//! comparisons, and the fixed-speed pressure-control subroutines.

use crate::config::{CompressorTrainStage, PressureControl};
use crate::error::{TrainError, TrainResult};
use crate::results::{CompressorTrainResult, FailureStatus, StreamState};
use gt_chart::CompressorChart;
use gt_core::numeric::find_root;
use gt_core::units::constants::{PRESSURE_CALCULATION_TOLERANCE, STANDARD_PRESSURE_BARA};
use gt_fluids::{FluidFactory, FluidStream, ProcessConditions};
use tracing::debug;

/// Where a calculated pressure sits relative to its target, within the
/// relative pressure tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetComparison {
    Met,
    BelowTarget,
    AboveTarget,
}

pub fn compare_to_target(calculated: f64, target: f64) -> TargetComparison {
    if (calculated - target).abs() <= PRESSURE_CALCULATION_TOLERANCE * target {
        TargetComparison::Met
    } else if calculated < target {
        TargetComparison::BelowTarget
    } else {
        TargetComparison::AboveTarget
    }
}

/// Root-finding over evaluations that may fail; the first error wins.
pub(crate) fn try_find_root<F>(lower: f64, upper: f64, mut f: F) -> TrainResult<f64>
where
    F: FnMut(f64) -> TrainResult<f64>,
{
    let mut captured: Option<TrainError> = None;
    let root = find_root(lower, upper, |x| {
        if captured.is_some() {
            return 0.0;
        }
        match f(x) {
            Ok(v) => v,
            Err(e) => {
                captured = Some(e);
                0.0
            }
        }
    });
    match captured {
        Some(e) => Err(e),
        None => Ok(root),
    }
}

/// Predicate bisection over evaluations that may fail; an errored evaluation
/// counts as not satisfying the predicate.
pub(crate) fn maximize_x_where_valid<F>(
    x_min: f64,
    x_max: f64,
    mut predicate: F,
    rel_tol: f64,
    max_iterations: usize,
) -> f64
where
    F: FnMut(f64) -> TrainResult<bool>,
{
    gt_core::numeric::maximize_x_given_predicate(
        x_min,
        x_max,
        |x| predicate(x).unwrap_or(false),
        rel_tol,
        max_iterations,
    )
}

/// Speed to hand a stage: single-speed charts run at their fixed speed, the
/// rest follow the shaft.
fn stage_speed(stage: &CompressorTrainStage, shaft_speed: f64) -> f64 {
    match &stage.chart {
        CompressorChart::SingleSpeed(c) => c.speed(),
        CompressorChart::VariableSpeed(_) => shaft_speed,
    }
}

/// Forward evaluation of a stage sequence at a fixed shaft speed.
///
/// Builds the train inlet from the fluid factory at the suction pressure and
/// the first stage's inlet temperature, then walks the stages, handing each
/// stage's outlet conditions to the next. The failure status is left at
/// `NoFailure`; callers compare against their targets.
pub(crate) fn calculate_train_given_rate_ps_speed(
    stages: &[CompressorTrainStage],
    fluid_factory: &FluidFactory,
    mass_rate_kg_per_hour: f64,
    inlet_pressure_bara: f64,
    shaft_speed: f64,
    asv_rate_fraction: f64,
    asv_additional_mass_rate: f64,
) -> TrainResult<CompressorTrainResult> {
    let train_inlet = fluid_factory
        .stream_at(inlet_pressure_bara, stages[0].inlet_temperature_kelvin)?
        .with_mass_rate(mass_rate_kg_per_hour)?;

    let mut stage_results = Vec::with_capacity(stages.len());
    let mut current: FluidStream = train_inlet.clone();
    for stage in stages {
        let result = stage.evaluate(
            &current,
            stage_speed(stage, shaft_speed),
            mass_rate_kg_per_hour,
            asv_rate_fraction,
            asv_additional_mass_rate,
        )?;
        current = current
            .flash_to(
                ProcessConditions::from_bara_kelvin(
                    result.outlet_stream.pressure_bara,
                    result.outlet_stream.temperature_kelvin,
                )?,
                false,
            )?
            .with_mass_rate(mass_rate_kg_per_hour)?;
        stage_results.push(result);
    }

    let outlet_state = StreamState::from_stream(&current);
    Ok(CompressorTrainResult::new(
        stage_results,
        shaft_speed,
        StreamState::from_stream(&train_inlet),
        outlet_state,
        FailureStatus::NoFailure,
    ))
}

/// Choke the train inlet until the discharge pressure meets
/// `outlet_pressure_bara` at the given speed (upstream choke).
///
/// The reported train inlet keeps the original suction pressure; the first
/// stage records the choked pressure and the pre-choke value.
pub(crate) fn calculate_train_given_rate_pd_speed(
    stages: &[CompressorTrainStage],
    fluid_factory: &FluidFactory,
    mass_rate_kg_per_hour: f64,
    outlet_pressure_bara: f64,
    shaft_speed: f64,
    upper_bound_for_inlet_pressure: f64,
) -> TrainResult<CompressorTrainResult> {
    let lower_bound = STANDARD_PRESSURE_BARA + stages[0].pressure_drop_ahead_of_stage_bar;
    let choked_inlet_pressure = try_find_root(lower_bound, upper_bound_for_inlet_pressure, |x| {
        Ok(calculate_train_given_rate_ps_speed(
            stages,
            fluid_factory,
            mass_rate_kg_per_hour,
            x,
            shaft_speed,
            0.0,
            0.0,
        )?
        .discharge_pressure_bara()
            - outlet_pressure_bara)
    })?;

    calculate_train_given_rate_ps_speed(
        stages,
        fluid_factory,
        mass_rate_kg_per_hour,
        choked_inlet_pressure,
        shaft_speed,
        0.0,
        0.0,
    )
}

/// Fixed-speed evaluation against both pressure targets, applying the
/// configured pressure-control strategy when free operation overshoots.
///
/// `IndividualAsvPressure` currently dispatches to the same uniform-fraction
/// subroutine as `IndividualAsvRate`.
pub(crate) fn calculate_train_given_rate_ps_pd_speed(
    stages: &[CompressorTrainStage],
    fluid_factory: &FluidFactory,
    pressure_control: PressureControl,
    mass_rate_kg_per_hour: f64,
    inlet_pressure_bara: f64,
    outlet_pressure_bara: f64,
    shaft_speed: f64,
) -> TrainResult<CompressorTrainResult> {
    let walk = |asv_rate_fraction: f64, asv_additional_mass_rate: f64| {
        calculate_train_given_rate_ps_speed(
            stages,
            fluid_factory,
            mass_rate_kg_per_hour,
            inlet_pressure_bara,
            shaft_speed,
            asv_rate_fraction,
            asv_additional_mass_rate,
        )
    };

    match pressure_control {
        PressureControl::UpstreamChoke | PressureControl::DownstreamChoke => {
            let mut train_result = walk(0.0, 0.0)?;
            let free_discharge = train_result.discharge_pressure_bara();

            if free_discharge * (1.0 + PRESSURE_CALCULATION_TOLERANCE) < outlet_pressure_bara {
                // Choking can only lower the discharge; the target is out of reach.
                train_result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
                return Ok(train_result);
            }

            if pressure_control == PressureControl::UpstreamChoke {
                let mut choked = calculate_train_given_rate_pd_speed(
                    stages,
                    fluid_factory,
                    mass_rate_kg_per_hour,
                    outlet_pressure_bara,
                    shaft_speed,
                    inlet_pressure_bara,
                )?;
                if let Some(first) = choked.stage_results.first_mut() {
                    first.inlet_pressure_before_choking_bara =
                        inlet_pressure_bara - stages[0].pressure_drop_ahead_of_stage_bar;
                }
                // The reported train inlet keeps the original suction pressure.
                let original_inlet = fluid_factory
                    .stream_at(inlet_pressure_bara, stages[0].inlet_temperature_kelvin)?
                    .with_mass_rate(mass_rate_kg_per_hour)?;
                choked.inlet_stream = StreamState::from_stream(&original_inlet);
                return Ok(choked);
            }

            // Downstream choke: the operating point stays; the reported final
            // discharge becomes the target, the computed value is retained.
            if outlet_pressure_bara >= STANDARD_PRESSURE_BARA {
                if let Some(last) = train_result.stage_results.last_mut() {
                    last.pressure_is_choked = true;
                    last.outlet_pressure_before_choking_bara = last.outlet_stream.pressure_bara;
                    last.outlet_stream.pressure_bara = outlet_pressure_bara;
                }
                train_result.outlet_stream.pressure_bara = outlet_pressure_bara;
            }
            Ok(train_result)
        }

        PressureControl::IndividualAsvRate | PressureControl::IndividualAsvPressure => {
            // Feasibility: full recirculation must bring the discharge at or
            // below the target.
            let max_recirculation = walk(1.0, 0.0)?;
            if max_recirculation.discharge_pressure_bara() >= outlet_pressure_bara {
                debug!(
                    inlet_pressure_bara,
                    shaft_speed,
                    outlet_pressure_bara,
                    "full recirculation cannot absorb the pressure difference"
                );
                let mut infeasible = max_recirculation;
                infeasible.failure_status = FailureStatus::TargetDischargePressureTooLow;
                return Ok(infeasible);
            }

            let asv_rate_fraction = try_find_root(0.0, 1.0, |fraction| {
                Ok(walk(fraction, 0.0)?.discharge_pressure_bara() - outlet_pressure_bara)
            })?;
            walk(asv_rate_fraction, 0.0)
        }

        PressureControl::CommonAsv => {
            // One common recirculated mass rate over the whole train, bounded
            // by the first stage's capacity at this speed.
            let free = walk(0.0, 0.0)?;
            let inlet_density = free.stage_results[0].inlet_stream.density_kg_per_m3;
            let first_stage_speed = stage_speed(&stages[0], shaft_speed);
            let maximum_additional = (stages[0].chart.maximum_rate_at_speed(first_stage_speed)
                * inlet_density
                - mass_rate_kg_per_hour)
                .max(0.0);

            let max_recirculation = walk(0.0, maximum_additional)?;
            if max_recirculation.discharge_pressure_bara() >= outlet_pressure_bara {
                let mut infeasible = max_recirculation;
                infeasible.failure_status = FailureStatus::TargetDischargePressureTooLow;
                return Ok(infeasible);
            }

            let additional = try_find_root(0.0, maximum_additional, |extra| {
                Ok(walk(0.0, extra)?.discharge_pressure_bara() - outlet_pressure_bara)
            })?;
            walk(0.0, additional)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_comparison_uses_relative_tolerance() {
        assert_eq!(compare_to_target(100.05, 100.0), TargetComparison::Met);
        assert_eq!(compare_to_target(99.95, 100.0), TargetComparison::Met);
        assert_eq!(compare_to_target(99.0, 100.0), TargetComparison::BelowTarget);
        assert_eq!(compare_to_target(101.0, 100.0), TargetComparison::AboveTarget);
    }

    #[test]
    fn try_find_root_propagates_errors() {
        let result = try_find_root(0.0, 1.0, |_| {
            Err::<f64, _>(TrainError::InvalidInput { what: "boom" })
        });
        assert!(result.is_err());
    }

    #[test]
    fn try_find_root_solves_when_no_errors() {
        let root = try_find_root(0.0, 10.0, |x| Ok(x * x - 9.0)).unwrap();
        assert!((root - 3.0).abs() < 1e-6);
    }
}
