//! Train configuration: stages, streams, pressure control, energy adjustment.

use crate::error::{TrainError, TrainResult};
use gt_chart::CompressorChart;
use gt_fluids::FluidFactory;
use serde::{Deserialize, Serialize};

/// How a fixed operating point is pulled onto a pressure target when the
/// free operation of the train does not meet it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureControl {
    /// Throttle upstream of the first stage until the discharge meets target.
    UpstreamChoke,
    /// Keep the operating point; report the target as the final discharge.
    DownstreamChoke,
    /// Uniform anti-surge recirculation fraction across stages.
    IndividualAsvRate,
    /// Per-stage ASV balancing pressure fractions. Currently dispatches to
    /// the same uniform-fraction subroutine as `IndividualAsvRate`; kept as a
    /// distinct variant because the configuration distinguishes them.
    IndividualAsvPressure,
    /// One common recirculation mass rate over the whole train.
    CommonAsv,
}

/// Linear calibration applied to the reported power at the boundary:
/// `reported = factor * raw + constant`. Does not affect the thermodynamic
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyAdjustment {
    pub constant_megawatt: f64,
    pub factor: f64,
}

impl Default for EnergyAdjustment {
    fn default() -> Self {
        Self {
            constant_megawatt: 0.0,
            factor: 1.0,
        }
    }
}

impl EnergyAdjustment {
    pub fn new(constant_megawatt: f64, factor: f64) -> Self {
        Self {
            constant_megawatt,
            factor,
        }
    }

    pub fn apply(&self, power_megawatt: f64) -> f64 {
        self.factor * power_megawatt + self.constant_megawatt
    }
}

/// One compressor stage: a chart plus the inter-stage process ahead of it.
///
/// The pressure drop and cooling to the stage inlet temperature are applied
/// before the wheel; liquids formed during cooling can optionally be removed.
#[derive(Debug, Clone)]
pub struct CompressorTrainStage {
    pub chart: CompressorChart,
    pub inlet_temperature_kelvin: f64,
    pub pressure_drop_ahead_of_stage_bar: f64,
    pub remove_liquid_after_cooling: bool,
}

impl CompressorTrainStage {
    pub fn new(
        chart: CompressorChart,
        inlet_temperature_kelvin: f64,
        pressure_drop_ahead_of_stage_bar: f64,
        remove_liquid_after_cooling: bool,
    ) -> TrainResult<Self> {
        if !inlet_temperature_kelvin.is_finite() || inlet_temperature_kelvin <= 0.0 {
            return Err(TrainError::InvalidConfig {
                what: "stage inlet temperature must be positive",
            });
        }
        if !pressure_drop_ahead_of_stage_bar.is_finite() || pressure_drop_ahead_of_stage_bar < 0.0 {
            return Err(TrainError::InvalidConfig {
                what: "pressure drop ahead of stage must be >= 0",
            });
        }
        Ok(Self {
            chart,
            inlet_temperature_kelvin,
            pressure_drop_ahead_of_stage_bar,
            remove_liquid_after_cooling,
        })
    }

    /// Like [`Self::new`] but with a surge control margin applied to the
    /// chart before it is mounted on the stage.
    pub fn with_control_margin(
        chart: CompressorChart,
        inlet_temperature_kelvin: f64,
        pressure_drop_ahead_of_stage_bar: f64,
        remove_liquid_after_cooling: bool,
        control_margin: f64,
    ) -> TrainResult<Self> {
        Self::new(
            chart.with_control_margin(control_margin)?,
            inlet_temperature_kelvin,
            pressure_drop_ahead_of_stage_bar,
            remove_liquid_after_cooling,
        )
    }
}

/// A stream entering or leaving a multi-stream train at a stage junction.
///
/// Stream index 0 is always the main inlet at stage 0. Outlet streams carry
/// no fluid definition of their own; they draw whatever flows in the train.
#[derive(Debug, Clone)]
pub struct TrainStream {
    pub fluid: Option<FluidFactory>,
    pub is_inlet: bool,
    pub connected_to_stage: usize,
}

impl TrainStream {
    pub fn inlet(fluid: FluidFactory, connected_to_stage: usize) -> Self {
        Self {
            fluid: Some(fluid),
            is_inlet: true,
            connected_to_stage,
        }
    }

    pub fn outlet(connected_to_stage: usize) -> Self {
        Self {
            fluid: None,
            is_inlet: false,
            connected_to_stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_adjustment_is_linear() {
        let adj = EnergyAdjustment::new(2.5, 1.1);
        assert!((adj.apply(10.0) - 13.5).abs() < 1e-12);
        let identity = EnergyAdjustment::default();
        assert_eq!(identity.apply(7.0), 7.0);
    }

    #[test]
    fn stage_validation() {
        let chart = CompressorChart::from(
            gt_chart::ChartCurve::new(
                10_000.0,
                vec![1000.0, 2000.0],
                vec![80_000.0, 60_000.0],
                vec![0.75, 0.72],
            )
            .unwrap(),
        );
        assert!(CompressorTrainStage::new(chart.clone(), 303.15, 0.0, true).is_ok());
        assert!(CompressorTrainStage::new(chart.clone(), -1.0, 0.0, true).is_err());
        assert!(CompressorTrainStage::new(chart, 303.15, -0.1, true).is_err());
    }
}
