//! Variable-speed train scenarios: internal points, failure taxonomy,
//! pressure control, maximum-rate queries, and the energy adjustment.

mod common;

use approx::assert_relative_eq;
use common::{medium_gas_factory, stage, variable_chart_wide};
use gt_train::{
    EnergyAdjustment, FailureStatus, PressureControl, VariableSpeedCompressorTrain,
};

fn one_stage_train(
    pressure_control: Option<PressureControl>,
    maximum_power: Option<f64>,
    adjustment: EnergyAdjustment,
) -> VariableSpeedCompressorTrain {
    VariableSpeedCompressorTrain::new(
        vec![stage(variable_chart_wide())],
        medium_gas_factory(),
        pressure_control,
        maximum_power,
        adjustment,
    )
    .unwrap()
}

#[test]
fn internal_point_meets_discharge_target() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    let result = train.evaluate(3_000_000.0, 30.0, 100.0).unwrap();

    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_eq!(result.failure_status, FailureStatus::NoFailure);
    assert_relative_eq!(result.discharge_pressure_bara(), 100.0, max_relative = 1e-3);
    assert!(result.speed_rpm >= train.minimum_speed());
    assert!(result.speed_rpm <= train.maximum_speed());
    // A medium-gas megascale duty lands in the single-digit megawatt range
    assert!(
        result.power_megawatt > 4.0 && result.power_megawatt < 9.0,
        "power = {} MW",
        result.power_megawatt
    );
    // Mass balance: what enters the train leaves it
    assert_relative_eq!(
        result.inlet_stream.mass_rate_kg_per_hour,
        result.outlet_stream.mass_rate_kg_per_hour,
        max_relative = 1e-9
    );
}

#[test]
fn discharge_pressure_is_monotone_in_target_speed() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    // Solving for increasing targets must produce increasing speeds
    let low = train.evaluate(3_000_000.0, 30.0, 80.0).unwrap();
    let high = train.evaluate(3_000_000.0, 30.0, 120.0).unwrap();
    assert!(low.is_valid() && high.is_valid());
    assert!(high.speed_rpm > low.speed_rpm);
}

#[test]
fn target_above_maximum_speed_fails_high() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    let result = train.evaluate(3_000_000.0, 30.0, 200.0).unwrap();
    assert!(!result.is_valid());
    assert_eq!(
        result.failure_status,
        FailureStatus::TargetDischargePressureTooHigh
    );
    // The reported operating point is the maximum-speed one
    assert_relative_eq!(result.speed_rpm, train.maximum_speed(), max_relative = 1e-9);
    assert!(result.discharge_pressure_bara() < 200.0);
}

#[test]
fn rate_beyond_stonewall_fails_above_maximum_flow() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    let result = train.evaluate(9_500_000.0, 30.0, 100.0).unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.failure_status, FailureStatus::AboveMaximumFlowRate);
    assert!(result.stage_results[0].rate_exceeds_maximum);
}

#[test]
fn target_below_minimum_speed_without_control_fails_low() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    let result = train.evaluate(3_000_000.0, 30.0, 40.0).unwrap();
    assert!(!result.is_valid());
    assert_eq!(
        result.failure_status,
        FailureStatus::TargetDischargePressureTooLow
    );
}

#[test]
fn asv_rate_control_absorbs_overshoot() {
    let train = one_stage_train(
        Some(PressureControl::IndividualAsvRate),
        None,
        EnergyAdjustment::default(),
    );
    // Free operation at minimum speed overshoots 48 bara; recirculation
    // pushes the wheel toward choke until the target is met.
    let result = train.evaluate(3_000_000.0, 30.0, 48.0).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_relative_eq!(result.discharge_pressure_bara(), 48.0, max_relative = 1e-3);
    assert!(result.stage_results[0].rate_has_recirculation);
    // The recirculated mass exceeds the throughput
    assert!(
        result.stage_results[0].mass_rate_asv_corrected_kg_per_hour
            > result.stage_results[0].mass_rate_kg_per_hour
    );
}

#[test]
fn upstream_choke_control_keeps_reported_suction_pressure() {
    let train = one_stage_train(
        Some(PressureControl::UpstreamChoke),
        None,
        EnergyAdjustment::default(),
    );
    let result = train.evaluate(3_000_000.0, 30.0, 45.0).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_relative_eq!(result.discharge_pressure_bara(), 45.0, max_relative = 1e-3);
    // The train inlet reports the unchoked suction pressure while the first
    // stage sees the choked one.
    assert_relative_eq!(result.inlet_stream.pressure_bara, 30.0, max_relative = 1e-9);
    assert!(result.stage_results[0].inlet_stream.pressure_bara < 30.0);
    assert!(
        result.stage_results[0]
            .inlet_pressure_before_choking_bara
            .is_finite()
    );
}

#[test]
fn downstream_choke_control_retains_pre_choke_pressure() {
    let train = one_stage_train(
        Some(PressureControl::DownstreamChoke),
        None,
        EnergyAdjustment::default(),
    );
    let result = train.evaluate(3_000_000.0, 30.0, 45.0).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_relative_eq!(result.discharge_pressure_bara(), 45.0, max_relative = 1e-9);
    let last = result.stage_results.last().unwrap();
    assert!(last.pressure_is_choked);
    assert!(last.outlet_pressure_before_choking_bara >= 45.0);
}

#[test]
fn energy_adjustment_shifts_reported_power_only() {
    let base = one_stage_train(None, None, EnergyAdjustment::default());
    let adjusted = one_stage_train(None, None, EnergyAdjustment::new(10.0, 1.0));

    let result_base = base.evaluate(3_000_000.0, 30.0, 100.0).unwrap();
    let result_adjusted = adjusted.evaluate(3_000_000.0, 30.0, 100.0).unwrap();

    assert_relative_eq!(
        result_adjusted.energy_usage_megawatt,
        result_base.energy_usage_megawatt + 10.0,
        max_relative = 1e-9
    );
    // The thermodynamic state is untouched by the calibration
    assert_relative_eq!(
        result_adjusted.power_megawatt,
        result_base.power_megawatt,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        result_adjusted.outlet_stream.temperature_kelvin,
        result_base.outlet_stream.temperature_kelvin,
        max_relative = 1e-9
    );
}

#[test]
fn maximum_power_marks_result_invalid() {
    let capped = one_stage_train(None, Some(1.0), EnergyAdjustment::default());
    let result = capped.evaluate(3_000_000.0, 30.0, 100.0).unwrap();
    assert!(result.above_maximum_power);
    assert_eq!(result.failure_status, FailureStatus::AboveMaximumPower);
    assert!(!result.is_valid());
}

#[test]
fn max_standard_rate_is_valid_and_bounded() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    let max_rate = train.get_max_standard_rate(30.0, 100.0).unwrap();
    assert!(
        max_rate > 3_000_000.0 && max_rate < 9_000_000.0,
        "max rate = {max_rate}"
    );
    let at_max = train.evaluate(max_rate, 30.0, 100.0).unwrap();
    assert!(at_max.is_valid(), "failure: {:?}", at_max.failure_status);
}

#[test]
fn max_standard_rate_is_zero_when_head_unreachable() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    // No rate can deliver 30 -> 400 bara in one stage on this chart
    let max_rate = train.get_max_standard_rate(30.0, 400.0).unwrap();
    assert_eq!(max_rate, 0.0);
}

#[test]
fn maximum_power_caps_the_maximum_rate() {
    let free = one_stage_train(None, None, EnergyAdjustment::default());
    let capped = one_stage_train(None, Some(5.0), EnergyAdjustment::default());

    let unconstrained = free.get_max_standard_rate(30.0, 100.0).unwrap();
    let constrained = capped.get_max_standard_rate(30.0, 100.0).unwrap();
    assert!(constrained < unconstrained);
    let at_constrained = capped.evaluate(constrained, 30.0, 100.0).unwrap();
    assert!(at_constrained.power_megawatt <= 5.0 * 1.01);
}

#[test]
fn zero_rate_is_a_valid_empty_point() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    let result = train.evaluate(0.0, 30.0, 100.0).unwrap();
    assert!(result.is_valid());
    assert_eq!(result.power_megawatt, 0.0);
    assert!(result.discharge_pressure_bara().is_nan());
}

#[test]
fn batch_matches_pointwise_evaluation() {
    let train = one_stage_train(None, None, EnergyAdjustment::default());
    let rates = [3_000_000.0, 0.0, 9_500_000.0];
    let ps = [30.0, 30.0, 30.0];
    let pd = [100.0, 100.0, 100.0];
    let batch = train.evaluate_batch(&rates, &ps, &pd).unwrap();
    assert_eq!(batch.len(), 3);
    for (i, result) in batch.iter().enumerate() {
        let single = train.evaluate(rates[i], ps[i], pd[i]).unwrap();
        assert_eq!(result.failure_status, single.failure_status);
        assert_eq!(result.is_valid(), single.is_valid());
    }
}

#[test]
fn single_speed_equivalent_projects_every_stage() {
    let train = one_stage_train(
        Some(PressureControl::CommonAsv),
        None,
        EnergyAdjustment::default(),
    );
    let equivalent = train.single_speed_equivalent(9000.0).unwrap();
    let chart = equivalent.stages()[0].chart.as_single_speed().unwrap();
    assert_relative_eq!(chart.speed(), 9000.0, max_relative = 1e-12);
}
