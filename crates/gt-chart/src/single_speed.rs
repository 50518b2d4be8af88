//! Single-speed compressor chart.

use crate::area::ChartAreaFlag;
use crate::curve::ChartCurve;
use crate::error::{ChartError, ChartResult};

/// A single-speed chart is one curve; the shaft speed has no degree of
/// freedom.
#[derive(Debug, Clone)]
pub struct SingleSpeedChart {
    curve: ChartCurve,
}

impl SingleSpeedChart {
    pub fn new(curve: ChartCurve) -> Self {
        Self { curve }
    }

    /// Build a single-speed chart with a control margin applied to the curve.
    pub fn with_control_margin(curve: ChartCurve, control_margin: f64) -> ChartResult<Self> {
        Ok(Self {
            curve: curve.adjust_for_control_margin(control_margin)?,
        })
    }

    pub fn curve(&self) -> &ChartCurve {
        &self.curve
    }

    pub fn speed(&self) -> f64 {
        self.curve.speed()
    }

    /// Minimum and maximum speed coincide for a single-speed chart; this
    /// keeps single- and variable-speed charts usable generically.
    pub fn minimum_speed(&self) -> f64 {
        self.curve.speed()
    }

    pub fn maximum_speed(&self) -> f64 {
        self.curve.speed()
    }

    pub fn minimum_rate(&self) -> f64 {
        self.curve.minimum_rate()
    }

    pub fn maximum_rate(&self) -> f64 {
        self.curve.maximum_rate()
    }

    /// Chart area flag based on actual rate [Am3/h] alone.
    pub fn area_flag_for_rate(&self, rate: f64) -> ChartAreaFlag {
        if rate < self.curve.minimum_rate() {
            ChartAreaFlag::BelowMinimumFlowRate
        } else if rate > self.curve.maximum_rate() {
            ChartAreaFlag::AboveMaximumFlowRate
        } else {
            ChartAreaFlag::Internal
        }
    }
}

impl TryFrom<ChartCurve> for SingleSpeedChart {
    type Error = ChartError;

    fn try_from(curve: ChartCurve) -> Result<Self, Self::Error> {
        Ok(Self::new(curve))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> SingleSpeedChart {
        SingleSpeedChart::new(
            ChartCurve::new(
                10_800.0,
                vec![2000.0, 3000.0, 4000.0],
                vec![120_000.0, 100_000.0, 70_000.0],
                vec![0.72, 0.75, 0.71],
            )
            .unwrap(),
        )
    }

    #[test]
    fn speed_bounds_coincide() {
        let c = chart();
        assert_eq!(c.minimum_speed(), 10_800.0);
        assert_eq!(c.maximum_speed(), 10_800.0);
    }

    #[test]
    fn area_flag_by_rate() {
        let c = chart();
        assert_eq!(c.area_flag_for_rate(1500.0), ChartAreaFlag::BelowMinimumFlowRate);
        assert_eq!(c.area_flag_for_rate(3000.0), ChartAreaFlag::Internal);
        assert_eq!(c.area_flag_for_rate(4500.0), ChartAreaFlag::AboveMaximumFlowRate);
    }
}
