//! Unified chart handle for train stages.

use crate::curve::ChartCurve;
use crate::error::ChartResult;
use crate::single_speed::SingleSpeedChart;
use crate::variable_speed::VariableSpeedChart;

/// Either chart kind, with the operations a stage evaluation needs.
///
/// Variable-speed charts interpolate between curves; single-speed charts
/// answer everything from their one curve and ignore the speed argument.
#[derive(Debug, Clone)]
pub enum CompressorChart {
    SingleSpeed(SingleSpeedChart),
    VariableSpeed(VariableSpeedChart),
}

impl CompressorChart {
    pub fn minimum_speed(&self) -> f64 {
        match self {
            CompressorChart::SingleSpeed(c) => c.minimum_speed(),
            CompressorChart::VariableSpeed(c) => c.minimum_speed(),
        }
    }

    pub fn maximum_speed(&self) -> f64 {
        match self {
            CompressorChart::SingleSpeed(c) => c.maximum_speed(),
            CompressorChart::VariableSpeed(c) => c.maximum_speed(),
        }
    }

    /// Minimum chart rate at a shaft speed [Am3/h].
    pub fn minimum_rate_at_speed(&self, speed: f64) -> f64 {
        match self {
            CompressorChart::SingleSpeed(c) => c.minimum_rate(),
            CompressorChart::VariableSpeed(c) => c.minimum_rate_as_function_of_speed(speed),
        }
    }

    /// Maximum chart rate at a shaft speed [Am3/h].
    pub fn maximum_rate_at_speed(&self, speed: f64) -> f64 {
        match self {
            CompressorChart::SingleSpeed(c) => c.maximum_rate(),
            CompressorChart::VariableSpeed(c) => c.maximum_rate_as_function_of_speed(speed),
        }
    }

    /// Polytropic head at (speed, rate) [J/kg].
    pub fn head_at_speed_and_rate(&self, speed: f64, rate: f64) -> f64 {
        match self {
            CompressorChart::SingleSpeed(c) => c.curve().head_as_function_of_rate(rate),
            CompressorChart::VariableSpeed(c) => c.head_at_speed_and_rate(speed, rate),
        }
    }

    /// Polytropic efficiency for a corrected operating point.
    pub fn efficiency_at(&self, rate: f64, head: f64) -> f64 {
        match self {
            CompressorChart::SingleSpeed(c) => c.curve().efficiency_as_function_of_rate(rate),
            CompressorChart::VariableSpeed(c) => c.efficiency_at_rate_and_head(rate, head),
        }
    }

    /// Apply a control margin, shifting every curve's minimum-rate point to
    /// the right by that fraction of its rate span.
    pub fn with_control_margin(&self, control_margin: f64) -> ChartResult<CompressorChart> {
        match self {
            CompressorChart::SingleSpeed(c) => Ok(CompressorChart::SingleSpeed(
                SingleSpeedChart::with_control_margin(c.curve().clone(), control_margin)?,
            )),
            CompressorChart::VariableSpeed(c) => Ok(CompressorChart::VariableSpeed(
                VariableSpeedChart::new(c.curves().to_vec(), Some(control_margin))?,
            )),
        }
    }

    /// Project a variable-speed chart to its single-speed equivalent at the
    /// given speed; a single-speed chart is returned unchanged.
    pub fn single_speed_equivalent(&self, speed: f64) -> ChartResult<SingleSpeedChart> {
        match self {
            CompressorChart::SingleSpeed(c) => Ok(c.clone()),
            CompressorChart::VariableSpeed(c) => Ok(SingleSpeedChart::new(c.curve_at_speed(speed)?)),
        }
    }

    pub fn as_variable_speed(&self) -> Option<&VariableSpeedChart> {
        match self {
            CompressorChart::VariableSpeed(c) => Some(c),
            CompressorChart::SingleSpeed(_) => None,
        }
    }

    pub fn as_single_speed(&self) -> Option<&SingleSpeedChart> {
        match self {
            CompressorChart::SingleSpeed(c) => Some(c),
            CompressorChart::VariableSpeed(_) => None,
        }
    }
}

impl From<SingleSpeedChart> for CompressorChart {
    fn from(chart: SingleSpeedChart) -> Self {
        CompressorChart::SingleSpeed(chart)
    }
}

impl From<VariableSpeedChart> for CompressorChart {
    fn from(chart: VariableSpeedChart) -> Self {
        CompressorChart::VariableSpeed(chart)
    }
}

impl From<ChartCurve> for CompressorChart {
    fn from(curve: ChartCurve) -> Self {
        CompressorChart::SingleSpeed(SingleSpeedChart::new(curve))
    }
}
