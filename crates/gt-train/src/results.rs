//! Per-operating-point results for stages and trains.
//!
//! Results are plain values owned by the caller: no references back into the
//! train, charts, or fluid backend.

use gt_chart::ChartAreaFlag;
use gt_fluids::FluidStream;
use serde::{Deserialize, Serialize};

/// Why an operating point could not be met. `NoFailure` means every target
/// was met within tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStatus {
    NoFailure,
    /// The chart cannot deliver the requested head even at maximum speed.
    TargetDischargePressureTooHigh,
    /// Free operation overshoots and no active pressure control absorbs it.
    TargetDischargePressureTooLow,
    TargetSuctionPressureTooHigh,
    TargetSuctionPressureTooLow,
    /// The requested rate exceeds the stonewall even at maximum speed.
    AboveMaximumFlowRate,
    AboveMaximumPower,
    /// Short-circuited (e.g. mass-balance violation); nothing was computed.
    NotCalculated,
}

/// Snapshot of a fluid stream's state for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    pub pressure_bara: f64,
    pub temperature_kelvin: f64,
    pub density_kg_per_m3: f64,
    pub z: f64,
    pub kappa: f64,
    pub enthalpy_joule_per_kg: f64,
    pub mass_rate_kg_per_hour: f64,
    pub standard_rate_sm3_per_day: f64,
}

impl StreamState {
    pub fn from_stream(stream: &FluidStream) -> Self {
        Self {
            pressure_bara: stream.pressure_bara(),
            temperature_kelvin: stream.temperature_kelvin(),
            density_kg_per_m3: stream.density(),
            z: stream.z(),
            kappa: stream.kappa(),
            enthalpy_joule_per_kg: stream.enthalpy_joule_per_kg(),
            mass_rate_kg_per_hour: stream.mass_rate_kg_per_hour(),
            standard_rate_sm3_per_day: stream
                .mass_rate_to_standard_rate(stream.mass_rate_kg_per_hour()),
        }
    }

    pub fn empty() -> Self {
        Self {
            pressure_bara: f64::NAN,
            temperature_kelvin: f64::NAN,
            density_kg_per_m3: f64::NAN,
            z: f64::NAN,
            kappa: f64::NAN,
            enthalpy_joule_per_kg: f64::NAN,
            mass_rate_kg_per_hour: 0.0,
            standard_rate_sm3_per_day: 0.0,
        }
    }
}

/// Result for one stage at one operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorStageResult {
    /// Stage inlet / outlet at the throughput mass rate (ASV excluded).
    pub inlet_stream: StreamState,
    pub outlet_stream: StreamState,
    /// Stage inlet / outlet including recirculated gas.
    pub inlet_stream_including_asv: StreamState,
    pub outlet_stream_including_asv: StreamState,

    pub inlet_actual_rate_m3_per_hour: f64,
    pub inlet_actual_rate_asv_corrected_m3_per_hour: f64,
    pub outlet_actual_rate_m3_per_hour: f64,
    pub mass_rate_kg_per_hour: f64,
    pub mass_rate_asv_corrected_kg_per_hour: f64,

    /// Head across the wheel, after any choke correction [J/kg].
    pub polytropic_head_joule_per_kg: f64,
    pub polytropic_head_before_choke_joule_per_kg: f64,
    pub polytropic_enthalpy_change_joule_per_kg: f64,
    pub polytropic_enthalpy_change_before_choke_joule_per_kg: f64,
    pub polytropic_efficiency: f64,

    pub power_megawatt: f64,
    pub chart_area_flag: ChartAreaFlag,

    pub rate_has_recirculation: bool,
    pub rate_exceeds_maximum: bool,
    pub pressure_is_choked: bool,
    pub head_exceeds_maximum: bool,
    pub point_is_valid: bool,

    /// Pressure seen before an upstream choke was applied [bara]; NaN when
    /// the inlet is unchoked.
    pub inlet_pressure_before_choking_bara: f64,
    /// Pressure computed before a downstream choke was applied [bara]; NaN
    /// when the discharge is unchoked.
    pub outlet_pressure_before_choking_bara: f64,
}

impl CompressorStageResult {
    /// Placeholder for a stage that was not computed (zero rate or
    /// short-circuited evaluation).
    pub fn not_calculated() -> Self {
        Self {
            inlet_stream: StreamState::empty(),
            outlet_stream: StreamState::empty(),
            inlet_stream_including_asv: StreamState::empty(),
            outlet_stream_including_asv: StreamState::empty(),
            inlet_actual_rate_m3_per_hour: 0.0,
            inlet_actual_rate_asv_corrected_m3_per_hour: 0.0,
            outlet_actual_rate_m3_per_hour: 0.0,
            mass_rate_kg_per_hour: 0.0,
            mass_rate_asv_corrected_kg_per_hour: 0.0,
            polytropic_head_joule_per_kg: f64::NAN,
            polytropic_head_before_choke_joule_per_kg: f64::NAN,
            polytropic_enthalpy_change_joule_per_kg: f64::NAN,
            polytropic_enthalpy_change_before_choke_joule_per_kg: f64::NAN,
            polytropic_efficiency: f64::NAN,
            power_megawatt: 0.0,
            chart_area_flag: ChartAreaFlag::NotCalculated,
            rate_has_recirculation: false,
            rate_exceeds_maximum: false,
            pressure_is_choked: false,
            head_exceeds_maximum: false,
            point_is_valid: true,
            inlet_pressure_before_choking_bara: f64::NAN,
            outlet_pressure_before_choking_bara: f64::NAN,
        }
    }

    pub fn discharge_pressure_bara(&self) -> f64 {
        self.outlet_stream.pressure_bara
    }

    pub fn inlet_pressure_bara(&self) -> f64 {
        self.inlet_stream.pressure_bara
    }
}

/// Result for the whole train at one operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorTrainResult {
    pub stage_results: Vec<CompressorStageResult>,
    /// Solved shaft speed [rpm]; NaN for empty points and sampled models.
    pub speed_rpm: f64,
    /// Train inlet at the requested suction conditions.
    pub inlet_stream: StreamState,
    /// Train outlet after the last stage (and any downstream choke).
    pub outlet_stream: StreamState,
    pub failure_status: FailureStatus,
    pub above_maximum_power: bool,
    /// Shaft power summed over stages [MW].
    pub power_megawatt: f64,
    /// Power after the linear energy adjustment [MW].
    pub energy_usage_megawatt: f64,
}

impl CompressorTrainResult {
    pub fn new(
        stage_results: Vec<CompressorStageResult>,
        speed_rpm: f64,
        inlet_stream: StreamState,
        outlet_stream: StreamState,
        failure_status: FailureStatus,
    ) -> Self {
        let power: f64 = stage_results.iter().map(|s| s.power_megawatt).sum();
        Self {
            stage_results,
            speed_rpm,
            inlet_stream,
            outlet_stream,
            failure_status,
            above_maximum_power: false,
            power_megawatt: power,
            energy_usage_megawatt: power,
        }
    }

    /// Zero-rate / short-circuit result: zero power, NaN conditions.
    pub fn create_empty(number_of_stages: usize, failure_status: FailureStatus) -> Self {
        Self {
            stage_results: (0..number_of_stages)
                .map(|_| CompressorStageResult::not_calculated())
                .collect(),
            speed_rpm: f64::NAN,
            inlet_stream: StreamState::empty(),
            outlet_stream: StreamState::empty(),
            failure_status,
            above_maximum_power: false,
            power_megawatt: 0.0,
            energy_usage_megawatt: 0.0,
        }
    }

    pub fn discharge_pressure_bara(&self) -> f64 {
        self.outlet_stream.pressure_bara
    }

    pub fn suction_pressure_bara(&self) -> f64 {
        self.inlet_stream.pressure_bara
    }

    /// Mass rate through the first stage including recirculation [kg/h].
    pub fn mass_rate_asv_corrected_kg_per_hour(&self) -> f64 {
        self.stage_results
            .first()
            .map(|s| s.mass_rate_asv_corrected_kg_per_hour)
            .unwrap_or(0.0)
    }

    pub fn is_valid(&self) -> bool {
        self.failure_status == FailureStatus::NoFailure
            && !self.above_maximum_power
            && self.stage_results.iter().all(|s| s.point_is_valid)
    }

    /// Recompute the cached power sums after stage results were edited.
    pub fn refresh_power(&mut self) {
        self.power_megawatt = self.stage_results.iter().map(|s| s.power_megawatt).sum();
        self.energy_usage_megawatt = self.power_megawatt;
    }

    /// Apply the maximum-power limit and the linear energy adjustment.
    pub fn finalize(
        &mut self,
        maximum_power_megawatt: Option<f64>,
        adjustment: crate::config::EnergyAdjustment,
    ) {
        if let Some(max_power) = maximum_power_megawatt {
            if self.power_megawatt > max_power {
                self.above_maximum_power = true;
                if self.failure_status == FailureStatus::NoFailure {
                    self.failure_status = FailureStatus::AboveMaximumPower;
                }
            }
        }
        self.energy_usage_megawatt = adjustment.apply(self.power_megawatt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_is_valid_zero_power() {
        let result = CompressorTrainResult::create_empty(2, FailureStatus::NoFailure);
        assert!(result.is_valid());
        assert_eq!(result.power_megawatt, 0.0);
        assert!(result.discharge_pressure_bara().is_nan());
        assert_eq!(result.stage_results.len(), 2);
    }

    #[test]
    fn not_calculated_result_is_invalid() {
        let result = CompressorTrainResult::create_empty(2, FailureStatus::NotCalculated);
        assert!(!result.is_valid());
    }

    #[test]
    fn finalize_applies_power_cap_and_adjustment() {
        let mut result = CompressorTrainResult::create_empty(1, FailureStatus::NoFailure);
        result.power_megawatt = 12.0;
        result.finalize(Some(10.0), crate::config::EnergyAdjustment::new(1.0, 1.0));
        assert!(result.above_maximum_power);
        assert_eq!(result.failure_status, FailureStatus::AboveMaximumPower);
        assert!((result.energy_usage_megawatt - 13.0).abs() < 1e-12);
        assert!(!result.is_valid());
    }
}
