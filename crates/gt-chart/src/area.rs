//! Classification of an operating point relative to the chart envelope.

use serde::{Deserialize, Serialize};

/// Where a (rate, head, speed) point sits relative to the performance map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartAreaFlag {
    Internal,
    /// Surge / ASV region.
    BelowMinimumFlowRate,
    /// Choke / stonewall region.
    AboveMaximumFlowRate,
    BelowMinimumSpeed,
    AboveMaximumSpeed,
    BelowMinimumSpeedAndBelowMinimumFlowRate,
    BelowMinimumSpeedAndAboveMaximumFlowRate,
    NoFlowRate,
    NotCalculated,
}

/// Booleans feeding the area-flag classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AreaFlags {
    pub below_minimum_flow_rate: bool,
    pub above_maximum_flow_rate: bool,
    pub below_minimum_speed: bool,
    pub above_maximum_speed: bool,
}

impl ChartAreaFlag {
    /// Derive the flag with the documented precedence: speed-and-flow
    /// combinations first, then flow violations, then speed violations.
    pub fn from_flags(flags: AreaFlags) -> ChartAreaFlag {
        if flags.below_minimum_speed && flags.below_minimum_flow_rate {
            ChartAreaFlag::BelowMinimumSpeedAndBelowMinimumFlowRate
        } else if flags.below_minimum_speed && flags.above_maximum_flow_rate {
            ChartAreaFlag::BelowMinimumSpeedAndAboveMaximumFlowRate
        } else if flags.below_minimum_flow_rate {
            ChartAreaFlag::BelowMinimumFlowRate
        } else if flags.above_maximum_flow_rate {
            ChartAreaFlag::AboveMaximumFlowRate
        } else if flags.below_minimum_speed {
            ChartAreaFlag::BelowMinimumSpeed
        } else if flags.above_maximum_speed {
            ChartAreaFlag::AboveMaximumSpeed
        } else {
            ChartAreaFlag::Internal
        }
    }
}
