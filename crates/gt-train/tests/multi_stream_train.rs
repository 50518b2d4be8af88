//! Multi-stream train scenarios: intermediate-pressure targets, stream
//! bookkeeping, the mass-balance guard, and zero-rate recirculation.

mod common;

use approx::assert_relative_eq;
use common::{
    medium_gas_factory, stage, variable_chart_high_pressure_stage,
    variable_chart_low_pressure_stage,
};
use gt_train::{
    EnergyAdjustment, FailureStatus, MultiStreamCompressorTrain, PressureControl, TrainStream,
};

/// Two-stage train: main inlet at stage 0, an outlet draw and an extra inlet
/// at stage 1, with the intermediate-pressure target at the stage-1 junction.
fn two_stage_train() -> MultiStreamCompressorTrain {
    MultiStreamCompressorTrain::new(
        vec![
            stage(variable_chart_low_pressure_stage()),
            stage(variable_chart_high_pressure_stage()),
        ],
        vec![
            TrainStream::inlet(medium_gas_factory(), 0),
            TrainStream::outlet(1),
            TrainStream::inlet(medium_gas_factory(), 1),
        ],
        Some(PressureControl::DownstreamChoke),
        Some(PressureControl::DownstreamChoke),
        Some(PressureControl::DownstreamChoke),
        Some(1),
        None,
        EnergyAdjustment::default(),
    )
    .unwrap()
}

const PS: f64 = 10.0;
const P_INT: f64 = 30.0;
const PD: f64 = 90.0;

#[test]
fn intermediate_pressure_target_is_met() {
    let mut train = two_stage_train();
    let result = train
        .evaluate(&[1_000_000.0, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();

    assert!(result.is_valid(), "failure: {:?}", result.failure_status);
    // The pressure between the stages equals the intermediate target
    assert_relative_eq!(
        result.stage_results[0].outlet_stream.pressure_bara,
        P_INT,
        max_relative = 1e-3
    );
    assert_relative_eq!(result.discharge_pressure_bara(), PD, max_relative = 1e-3);
    // Both sub-trains share the shaft: one speed, within chart bounds
    assert!(result.speed_rpm >= train.minimum_speed());
    assert!(result.speed_rpm <= train.maximum_speed());
    assert!(result.power_megawatt > 0.0);
}

#[test]
fn zero_rate_stage_recirculates_cached_fluid() {
    let mut train = two_stage_train();
    // Prime the recirculation cache with a normal evaluation
    let first = train
        .evaluate(&[1_000_000.0, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();
    assert!(first.is_valid());

    // Now nothing enters stage 0; it must recirculate last step's fluid
    let second = train
        .evaluate(&[0.0, 0.0, 500_000.0], PS, PD, Some(P_INT))
        .unwrap();
    assert!(second.is_valid(), "failure: {:?}", second.failure_status);
    assert!(second.stage_results[0].rate_has_recirculation);
    assert_eq!(second.stage_results[0].mass_rate_kg_per_hour, 0.0);
    assert!(second.power_megawatt > 0.0);
}

#[test]
fn recirculation_without_history_is_an_error() {
    let mut train = two_stage_train();
    let result = train.evaluate(&[0.0, 0.0, 500_000.0], PS, PD, Some(P_INT));
    assert!(result.is_err());
}

#[test]
fn mass_balance_violation_short_circuits() {
    let mut train = two_stage_train();
    // Outlet draw at stage 1 exceeds everything that entered before it
    let result = train
        .evaluate(&[1_000_000.0, 2_000_000.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.failure_status, FailureStatus::NotCalculated);
    assert_eq!(result.power_megawatt, 0.0);
}

#[test]
fn outlet_draw_reduces_second_stage_rate() {
    let mut train = two_stage_train();
    let base = train
        .evaluate(&[1_000_000.0, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();
    let with_draw = train
        .evaluate(&[1_000_000.0, 300_000.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();

    assert!(base.is_valid() && with_draw.is_valid());
    // The draw is deducted before stage 1; stage 0 is unaffected
    assert_relative_eq!(
        with_draw.stage_results[0].mass_rate_kg_per_hour,
        base.stage_results[0].mass_rate_kg_per_hour,
        max_relative = 1e-9
    );
    assert!(
        with_draw.stage_results[1].mass_rate_kg_per_hour
            < base.stage_results[1].mass_rate_kg_per_hour
    );
}

#[test]
fn per_stage_rates_deduct_outlets_before_inlets() {
    let train = two_stage_train();
    let stage_rates = train.rates_per_stage(&[1_000_000.0, 300_000.0, 200_000.0]);
    assert_eq!(stage_rates.len(), 2);
    assert_relative_eq!(stage_rates[0], 1_000_000.0, max_relative = 1e-12);
    assert_relative_eq!(stage_rates[1], 900_000.0, max_relative = 1e-12);
}

#[test]
fn stream_rate_vector_length_is_validated() {
    let mut train = two_stage_train();
    assert!(
        train
            .evaluate(&[1_000_000.0, 0.0], PS, PD, Some(P_INT))
            .is_err()
    );
}

#[test]
fn intermediate_pressure_must_match_configuration() {
    let mut train = two_stage_train();
    assert!(
        train
            .evaluate(&[1_000_000.0, 0.0, 0.0], PS, PD, None)
            .is_err()
    );
}

#[test]
fn interstage_stage_number_bounds_are_enforced() {
    let build = |stage_number: usize| {
        MultiStreamCompressorTrain::new(
            vec![
                stage(variable_chart_low_pressure_stage()),
                stage(variable_chart_high_pressure_stage()),
            ],
            vec![TrainStream::inlet(medium_gas_factory(), 0)],
            None,
            None,
            None,
            Some(stage_number),
            None,
            EnergyAdjustment::default(),
        )
    };
    assert!(build(0).is_err());
    assert!(build(2).is_err());
    assert!(build(1).is_ok());
}

#[test]
fn max_rate_for_stream_is_positive_and_valid() {
    let mut train = two_stage_train();
    // Prime the cache so search iterations with small rates stay evaluable
    train
        .evaluate(&[1_000_000.0, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();

    let max_rate = train
        .get_max_rate_for_stream(0, &[1_000_000.0, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();
    assert!(max_rate > 1_000_000.0, "max rate = {max_rate}");

    let at_max = train
        .evaluate(&[max_rate, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();
    assert!(at_max.is_valid(), "failure: {:?}", at_max.failure_status);

    // Outlet streams have no meaningful maximum rate
    let outlet_max = train
        .get_max_rate_for_stream(1, &[1_000_000.0, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();
    assert_eq!(outlet_max, 0.0);
}

#[test]
fn additional_inlet_stream_mixes_into_stage_one() {
    let mut train = two_stage_train();
    let base = train
        .evaluate(&[1_000_000.0, 0.0, 0.0], PS, PD, Some(P_INT))
        .unwrap();
    let with_extra = train
        .evaluate(&[1_000_000.0, 0.0, 400_000.0], PS, PD, Some(P_INT))
        .unwrap();

    assert!(base.is_valid() && with_extra.is_valid());
    assert!(
        with_extra.stage_results[1].mass_rate_kg_per_hour
            > base.stage_results[1].mass_rate_kg_per_hour
    );
    // Multi-stream mass balance across the whole train
    let total_in = with_extra.stage_results[0].mass_rate_kg_per_hour
        + (with_extra.stage_results[1].mass_rate_kg_per_hour
            - with_extra.stage_results[0].mass_rate_kg_per_hour);
    assert_relative_eq!(
        with_extra.outlet_stream.mass_rate_kg_per_hour,
        total_in,
        max_relative = 1e-6
    );
}
