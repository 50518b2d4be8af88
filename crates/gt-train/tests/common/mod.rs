#![allow(dead_code)]
//! Shared fixtures for the train integration tests.
//!
//! The fluid is a medium natural gas (methane-dominated with ethane, propane,
//! CO2, and nitrogen) on the SRK equation of state; the charts are sized so
//! the scenario operating points fall inside their envelopes.

use gt_chart::{ChartCurve, CompressorChart, SingleSpeedChart, VariableSpeedChart};
use gt_fluids::{Component, CubicBackend, EoSModel, FluidComposition, FluidFactory, FluidModel};
use gt_train::CompressorTrainStage;
use std::sync::Arc;

pub fn medium_gas_factory() -> FluidFactory {
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

/// Variable-speed chart spanning 7000..12000 rpm, sized for a medium-gas
/// stage taking roughly 30 bara suction at a few thousand Am3/h.
pub fn variable_chart_wide() -> VariableSpeedChart {
    let low = ChartCurve::new(
        7000.0,
        vec![2000.0, 3500.0, 5000.0, 6500.0],
        vec![90_000.0, 82_000.0, 70_000.0, 50_000.0],
        vec![0.72, 0.76, 0.74, 0.70],
    )
    .unwrap();
    let high = ChartCurve::new(
        12_000.0,
        vec![3400.0, 6000.0, 8600.0, 11_000.0],
        vec![260_000.0, 235_000.0, 200_000.0, 145_000.0],
        vec![0.72, 0.76, 0.74, 0.70],
    )
    .unwrap();
    VariableSpeedChart::new(vec![low, high], None).unwrap()
}

/// First multi-stream stage: low suction pressure, large actual rates.
pub fn variable_chart_low_pressure_stage() -> VariableSpeedChart {
    let low = ChartCurve::new(
        7000.0,
        vec![2200.0, 3300.0, 4400.0, 5500.0],
        vec![95_000.0, 88_000.0, 76_000.0, 58_000.0],
        vec![0.72, 0.76, 0.74, 0.70],
    )
    .unwrap();
    let high = ChartCurve::new(
        12_000.0,
        vec![3800.0, 5700.0, 7600.0, 9500.0],
        vec![280_000.0, 258_000.0, 222_000.0, 165_000.0],
        vec![0.72, 0.76, 0.74, 0.70],
    )
    .unwrap();
    VariableSpeedChart::new(vec![low, high], None).unwrap()
}

/// Second multi-stream stage: denser gas, smaller actual rates.
pub fn variable_chart_high_pressure_stage() -> VariableSpeedChart {
    let low = ChartCurve::new(
        7000.0,
        vec![700.0, 1050.0, 1400.0, 1750.0],
        vec![95_000.0, 88_000.0, 76_000.0, 58_000.0],
        vec![0.72, 0.76, 0.74, 0.70],
    )
    .unwrap();
    let high = ChartCurve::new(
        12_000.0,
        vec![1200.0, 1800.0, 2400.0, 3000.0],
        vec![280_000.0, 258_000.0, 222_000.0, 165_000.0],
        vec![0.72, 0.76, 0.74, 0.70],
    )
    .unwrap();
    VariableSpeedChart::new(vec![low, high], None).unwrap()
}

/// Fixed-speed curve for a first stage at 80 bara suction.
pub fn single_speed_chart_stage_one() -> SingleSpeedChart {
    SingleSpeedChart::new(
        ChartCurve::new(
            10_800.0,
            vec![1800.0, 2400.0, 3000.0, 3600.0],
            vec![80_000.0, 74_000.0, 65_000.0, 50_000.0],
            vec![0.72, 0.75, 0.74, 0.70],
        )
        .unwrap(),
    )
}

/// Fixed-speed curve for a second stage at roughly twice the density.
pub fn single_speed_chart_stage_two() -> SingleSpeedChart {
    SingleSpeedChart::new(
        ChartCurve::new(
            10_800.0,
            vec![900.0, 1300.0, 1700.0, 2100.0],
            vec![130_000.0, 120_000.0, 104_000.0, 80_000.0],
            vec![0.72, 0.75, 0.74, 0.70],
        )
        .unwrap(),
    )
}

pub fn stage(chart: impl Into<CompressorChart>) -> CompressorTrainStage {
    CompressorTrainStage::new(chart.into(), 303.15, 0.0, true).unwrap()
}
