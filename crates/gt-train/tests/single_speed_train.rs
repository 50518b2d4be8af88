//! Single-speed train scenarios: downstream choke bookkeeping, failure
//! taxonomy, maximum discharge pressure, and ASV-based pressure control.

mod common;

use approx::assert_relative_eq;
use common::{
    medium_gas_factory, single_speed_chart_stage_one, single_speed_chart_stage_two, stage,
};
use gt_train::{
    CompressorTrainResult, EnergyAdjustment, FailureStatus, PressureControl,
    SingleSpeedCompressorTrain,
};

fn two_stage_train(
    pressure_control: PressureControl,
    maximum_discharge_pressure: Option<f64>,
    adjustment: EnergyAdjustment,
) -> SingleSpeedCompressorTrain {
    SingleSpeedCompressorTrain::new(
        vec![
            stage(single_speed_chart_stage_one()),
            stage(single_speed_chart_stage_two()),
        ],
        medium_gas_factory(),
        pressure_control,
        None,
        maximum_discharge_pressure,
        adjustment,
    )
    .unwrap()
}

/// Free (unchoked) discharge pressure of the train at this operating point,
/// read off a deliberately unreachable target.
fn free_discharge(train: &SingleSpeedCompressorTrain, rate: f64, ps: f64) -> f64 {
    let probe = train.evaluate(rate, ps, 2000.0).unwrap();
    assert_eq!(
        probe.failure_status,
        FailureStatus::TargetDischargePressureTooHigh
    );
    probe.discharge_pressure_bara()
}

const RATE: f64 = 5_000_000.0;
const PS: f64 = 80.0;

#[test]
fn downstream_choke_reports_target_and_keeps_pre_choke_value() {
    let train = two_stage_train(
        PressureControl::DownstreamChoke,
        None,
        EnergyAdjustment::default(),
    );
    let free = free_discharge(&train, RATE, PS);
    let target = free * 0.9;

    let result = train.evaluate(RATE, PS, target).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_relative_eq!(result.discharge_pressure_bara(), target, max_relative = 1e-9);

    let last = result.stage_results.last().unwrap();
    assert!(last.pressure_is_choked);
    assert_relative_eq!(
        last.outlet_pressure_before_choking_bara,
        free,
        max_relative = 1e-6
    );
    assert!(last.outlet_pressure_before_choking_bara >= target);
    // The suction side is untouched
    assert_relative_eq!(result.inlet_stream.pressure_bara, PS, max_relative = 1e-9);
}

#[test]
fn target_above_free_discharge_fails_high_and_unchoked() {
    let train = two_stage_train(
        PressureControl::DownstreamChoke,
        None,
        EnergyAdjustment::default(),
    );
    let free = free_discharge(&train, RATE, PS);

    let result = train.evaluate(RATE, PS, free * 1.1).unwrap();
    assert!(!result.is_valid());
    assert_eq!(
        result.failure_status,
        FailureStatus::TargetDischargePressureTooHigh
    );
    // The computed (unchoked) discharge is reported
    assert_relative_eq!(result.discharge_pressure_bara(), free, max_relative = 1e-6);
    assert!(!result.stage_results.last().unwrap().pressure_is_choked);
}

#[test]
fn rate_beyond_stonewall_fails_above_maximum_flow() {
    let train = two_stage_train(
        PressureControl::DownstreamChoke,
        None,
        EnergyAdjustment::default(),
    );
    let result = train.evaluate(10_000_000.0, PS, 300.0).unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.failure_status, FailureStatus::AboveMaximumFlowRate);
    assert!(
        result
            .stage_results
            .iter()
            .any(|s| s.rate_exceeds_maximum)
    );
}

#[test]
fn maximum_discharge_pressure_chokes_upstream_first() {
    let unconstrained = two_stage_train(
        PressureControl::DownstreamChoke,
        None,
        EnergyAdjustment::default(),
    );
    let free = free_discharge(&unconstrained, RATE, PS);
    let max_pd = free * 0.95;
    let target = free * 0.85;

    let train = two_stage_train(
        PressureControl::DownstreamChoke,
        Some(max_pd),
        EnergyAdjustment::default(),
    );
    let result = train.evaluate(RATE, PS, target).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    // Final discharge is downstream-choked onto the target...
    assert_relative_eq!(result.discharge_pressure_bara(), target, max_relative = 1e-9);
    // ...from the capped pressure, not the free one
    let last = result.stage_results.last().unwrap();
    assert_relative_eq!(
        last.outlet_pressure_before_choking_bara,
        max_pd,
        max_relative = 1e-3
    );
    // The cap was reached by choking the suction side
    let first = &result.stage_results[0];
    assert!(first.inlet_stream.pressure_bara < PS);
    assert_relative_eq!(result.inlet_stream.pressure_bara, PS, max_relative = 1e-9);
}

#[test]
fn common_asv_control_recirculates_to_target() {
    let train = two_stage_train(
        PressureControl::CommonAsv,
        None,
        EnergyAdjustment::default(),
    );
    let free = free_discharge(&train, RATE, PS);
    let target = free * 0.93;

    let result = train.evaluate(RATE, PS, target).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_relative_eq!(result.discharge_pressure_bara(), target, max_relative = 1e-3);
    // Every stage compresses the common recirculated mass on top of the
    // throughput
    for stage_result in &result.stage_results {
        assert!(
            stage_result.mass_rate_asv_corrected_kg_per_hour
                > stage_result.mass_rate_kg_per_hour
        );
    }
}

#[test]
fn individual_asv_rate_control_meets_target() {
    let train = two_stage_train(
        PressureControl::IndividualAsvRate,
        None,
        EnergyAdjustment::default(),
    );
    let free = free_discharge(&train, RATE, PS);
    let target = free * 0.93;

    let result = train.evaluate(RATE, PS, target).unwrap();
    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    assert_relative_eq!(result.discharge_pressure_bara(), target, max_relative = 1e-3);
}

#[test]
fn energy_adjustment_constant_shifts_every_valid_point() {
    let base = two_stage_train(
        PressureControl::DownstreamChoke,
        None,
        EnergyAdjustment::default(),
    );
    let adjusted = two_stage_train(
        PressureControl::DownstreamChoke,
        None,
        EnergyAdjustment::new(10.0, 1.0),
    );
    let free = free_discharge(&base, RATE, PS);
    let targets = [free * 0.85, free * 0.9, free * 0.95];

    for target in targets {
        let result_base = base.evaluate(RATE, PS, target).unwrap();
        let result_adjusted = adjusted.evaluate(RATE, PS, target).unwrap();
        assert_relative_eq!(
            result_adjusted.energy_usage_megawatt,
            result_base.energy_usage_megawatt + 10.0,
            max_relative = 1e-9
        );
    }
}

#[test]
fn max_standard_rate_respects_the_envelope() {
    let train = two_stage_train(
        PressureControl::DownstreamChoke,
        None,
        EnergyAdjustment::default(),
    );
    let free = free_discharge(&train, RATE, PS);
    let max_rate = train.get_max_standard_rate(PS, free * 0.9).unwrap();
    assert!(max_rate > 0.0);
    let at_max: CompressorTrainResult = train.evaluate(max_rate, PS, free * 0.9).unwrap();
    assert!(at_max.is_valid(), "failure: {:?}", at_max.failure_status);
}

#[test]
fn maximum_discharge_pressure_requires_downstream_choke() {
    let result = SingleSpeedCompressorTrain::new(
        vec![stage(single_speed_chart_stage_one())],
        medium_gas_factory(),
        PressureControl::UpstreamChoke,
        None,
        Some(300.0),
        EnergyAdjustment::default(),
    );
    assert!(result.is_err());
}
