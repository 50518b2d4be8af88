//! Capacity evaluation: classify and correct (rate, head) points against the
//! chart envelope.
//!
//! Points below the minimum-flow line are lifted to it (the ASV recirculates
//! to keep flow through the wheel). Points past the stonewall are invalid.
//! Points below the minimum-speed head can be choked up to it when the caller
//! permits extrapolation (operating at minimum speed and throttling the
//! discharge).

use crate::area::{AreaFlags, ChartAreaFlag};
use crate::variable_speed::VariableSpeedChart;

/// Outcome of a capacity evaluation for one (rate, head) point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityResult {
    /// Rate after any minimum-flow correction [Am3/h].
    pub rate: f64,
    /// Head after any minimum-speed choke correction [J/kg].
    pub head: f64,
    pub rate_has_recirculation: bool,
    pub rate_exceeds_maximum: bool,
    pub pressure_is_choked: bool,
    pub head_exceeds_maximum: bool,
    pub below_minimum_speed: bool,
}

impl CapacityResult {
    pub fn exceeds_capacity(&self) -> bool {
        self.rate_exceeds_maximum || self.head_exceeds_maximum
    }

    pub fn area_flag(&self) -> ChartAreaFlag {
        ChartAreaFlag::from_flags(AreaFlags {
            below_minimum_flow_rate: self.rate_has_recirculation,
            above_maximum_flow_rate: self.rate_exceeds_maximum,
            below_minimum_speed: self.below_minimum_speed && !self.pressure_is_choked,
            above_maximum_speed: false,
        })
    }
}

/// Classify and correct a (rate, head) point against the chart envelope.
pub fn evaluate_capacity(
    chart: &VariableSpeedChart,
    rate: f64,
    head: f64,
    extrapolate_heads_below_minimum: bool,
) -> CapacityResult {
    let mut result = CapacityResult {
        rate,
        head,
        rate_has_recirculation: false,
        rate_exceeds_maximum: false,
        pressure_is_choked: false,
        head_exceeds_maximum: false,
        below_minimum_speed: false,
    };

    let minimum_rate = chart.minimum_rate_as_function_of_head(head);
    if result.rate < minimum_rate {
        result.rate_has_recirculation = true;
        result.rate = minimum_rate;
    }

    let maximum_rate = chart.maximum_rate_as_function_of_head(head);
    if result.rate > maximum_rate {
        result.rate_exceeds_maximum = true;
    }

    let minimum_head = chart.minimum_head_as_function_of_rate(result.rate);
    if result.head < minimum_head {
        result.below_minimum_speed = true;
        if extrapolate_heads_below_minimum {
            result.pressure_is_choked = true;
            result.head = minimum_head;
        }
    }

    let maximum_head = chart.maximum_head_as_function_of_rate(result.rate);
    if result.head > maximum_head {
        result.head_exceeds_maximum = true;
    }

    result
}

/// Evaluate a batch of points.
pub fn evaluate_capacity_batch(
    chart: &VariableSpeedChart,
    points: &[(f64, f64)],
    extrapolate_heads_below_minimum: bool,
) -> Vec<CapacityResult> {
    points
        .iter()
        .map(|(rate, head)| evaluate_capacity(chart, *rate, *head, extrapolate_heads_below_minimum))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::ChartCurve;

    fn chart() -> VariableSpeedChart {
        let low = ChartCurve::new(
            7500.0,
            vec![1000.0, 2000.0, 3000.0, 4000.0],
            vec![80_000.0, 70_000.0, 55_000.0, 35_000.0],
            vec![0.72, 0.75, 0.74, 0.70],
        )
        .unwrap();
        let high = ChartCurve::new(
            10_500.0,
            vec![1500.0, 2800.0, 4200.0, 5600.0],
            vec![160_000.0, 145_000.0, 115_000.0, 75_000.0],
            vec![0.72, 0.75, 0.74, 0.70],
        )
        .unwrap();
        VariableSpeedChart::new(vec![low, high], None).unwrap()
    }

    #[test]
    fn internal_point_is_untouched() {
        let chart = chart();
        let result = evaluate_capacity(&chart, 2500.0, 100_000.0, true);
        assert_eq!(result.rate, 2500.0);
        assert_eq!(result.head, 100_000.0);
        assert!(!result.exceeds_capacity());
        assert_eq!(result.area_flag(), ChartAreaFlag::Internal);
    }

    #[test]
    fn low_rate_recirculates_to_minimum_flow() {
        let chart = chart();
        let result = evaluate_capacity(&chart, 500.0, 100_000.0, true);
        assert!(result.rate_has_recirculation);
        assert!(result.rate > 500.0);
        assert!(!result.exceeds_capacity());
        assert_eq!(result.area_flag(), ChartAreaFlag::BelowMinimumFlowRate);
    }

    #[test]
    fn stonewall_violation_is_invalid() {
        let chart = chart();
        let result = evaluate_capacity(&chart, 6500.0, 80_000.0, true);
        assert!(result.rate_exceeds_maximum);
        assert!(result.exceeds_capacity());
        assert_eq!(result.area_flag(), ChartAreaFlag::AboveMaximumFlowRate);
    }

    #[test]
    fn low_head_chokes_up_when_permitted() {
        let chart = chart();
        let result = evaluate_capacity(&chart, 2000.0, 30_000.0, true);
        assert!(result.pressure_is_choked);
        assert!((result.head - 70_000.0).abs() < 1e-9);
        assert!(!result.exceeds_capacity());

        let no_extrapolation = evaluate_capacity(&chart, 2000.0, 30_000.0, false);
        assert!(!no_extrapolation.pressure_is_choked);
        assert!(no_extrapolation.below_minimum_speed);
        assert_eq!(no_extrapolation.head, 30_000.0);
        assert_eq!(no_extrapolation.area_flag(), ChartAreaFlag::BelowMinimumSpeed);
    }

    #[test]
    fn high_head_exceeds_maximum() {
        let chart = chart();
        let result = evaluate_capacity(&chart, 2000.0, 200_000.0, true);
        assert!(result.head_exceeds_maximum);
        assert!(result.exceeds_capacity());
    }
}
