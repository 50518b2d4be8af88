//! Compressor chart curve at a single shaft speed.

use crate::error::{ChartError, ChartResult};
use gt_core::numeric::Interp1d;

/// Performance curve at one shaft speed.
///
/// Units:
///   Rate [Am3/h], ascending and strictly monotone
///   Polytropic head [J/kg], strictly decreasing with rate
///   Efficiency as fraction (0, 1]
///   Speed [rpm]
///
/// Multiple curves make up a complete variable-speed map; a single-speed
/// chart has only one curve.
#[derive(Debug, Clone)]
pub struct ChartCurve {
    speed_rpm: f64,
    rate_actual_m3_per_hour: Vec<f64>,
    polytropic_head_joule_per_kg: Vec<f64>,
    efficiency_fraction: Vec<f64>,
    head_by_rate: Interp1d,
    efficiency_by_rate: Interp1d,
    rate_by_head: Interp1d,
}

impl ChartCurve {
    pub fn new(
        speed_rpm: f64,
        rate_actual_m3_per_hour: Vec<f64>,
        polytropic_head_joule_per_kg: Vec<f64>,
        efficiency_fraction: Vec<f64>,
    ) -> ChartResult<Self> {
        let n = rate_actual_m3_per_hour.len();
        if n < 2 {
            return Err(ChartError::InvalidArg {
                what: "chart curve needs at least two points",
            });
        }
        if polytropic_head_joule_per_kg.len() != n || efficiency_fraction.len() != n {
            return Err(ChartError::InvalidArg {
                what: "chart curve vectors must have equal length",
            });
        }
        if !(speed_rpm >= 0.0 && speed_rpm.is_finite()) {
            return Err(ChartError::InvalidArg {
                what: "speed_rpm must be >= 0",
            });
        }
        if rate_actual_m3_per_hour.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(ChartError::InvalidArg {
                what: "all rate values must be >= 0",
            });
        }
        if rate_actual_m3_per_hour.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ChartError::InvalidArg {
                what: "rate values must be strictly increasing",
            });
        }
        if polytropic_head_joule_per_kg
            .iter()
            .any(|h| !h.is_finite() || *h < 0.0)
        {
            return Err(ChartError::InvalidArg {
                what: "all head values must be >= 0",
            });
        }
        if polytropic_head_joule_per_kg.windows(2).any(|w| w[1] > w[0]) {
            return Err(ChartError::InvalidArg {
                what: "head values must be non-increasing with rate",
            });
        }
        if efficiency_fraction
            .iter()
            .any(|e| !e.is_finite() || *e <= 0.0 || *e > 1.0)
        {
            return Err(ChartError::InvalidArg {
                what: "efficiency values must be in (0, 1]",
            });
        }

        let head_by_rate = Interp1d::new(
            rate_actual_m3_per_hour.clone(),
            polytropic_head_joule_per_kg.clone(),
        )?;
        let efficiency_by_rate = Interp1d::new(
            rate_actual_m3_per_hour.clone(),
            efficiency_fraction.clone(),
        )?;
        // Head decreases with rate, so the inverse grid reverses both axes.
        // Ties (flat head segments) are collapsed to keep the grid strict.
        let mut inverse_heads = vec![polytropic_head_joule_per_kg[0]];
        let mut inverse_rates = vec![rate_actual_m3_per_hour[0]];
        for i in 1..n {
            if polytropic_head_joule_per_kg[i] < inverse_heads[inverse_heads.len() - 1] {
                inverse_heads.push(polytropic_head_joule_per_kg[i]);
                inverse_rates.push(rate_actual_m3_per_hour[i]);
            }
        }
        if inverse_heads.len() < 2 {
            return Err(ChartError::InvalidArg {
                what: "head values must not all be equal",
            });
        }
        let rate_by_head = Interp1d::new_from_decreasing(inverse_heads, inverse_rates)?;

        Ok(Self {
            speed_rpm,
            rate_actual_m3_per_hour,
            polytropic_head_joule_per_kg,
            efficiency_fraction,
            head_by_rate,
            efficiency_by_rate,
            rate_by_head,
        })
    }

    pub fn speed(&self) -> f64 {
        self.speed_rpm
    }

    pub fn rate_values(&self) -> &[f64] {
        &self.rate_actual_m3_per_hour
    }

    pub fn head_values(&self) -> &[f64] {
        &self.polytropic_head_joule_per_kg
    }

    pub fn efficiency_values(&self) -> &[f64] {
        &self.efficiency_fraction
    }

    pub fn minimum_rate(&self) -> f64 {
        self.rate_actual_m3_per_hour[0]
    }

    pub fn maximum_rate(&self) -> f64 {
        self.rate_actual_m3_per_hour[self.rate_actual_m3_per_hour.len() - 1]
    }

    pub fn is_100_percent_efficient(&self) -> bool {
        self.efficiency_fraction.iter().all(|e| *e == 1.0)
    }

    /// Head = f(rate), constant extrapolation at the endpoints.
    pub fn head_as_function_of_rate(&self, rate: f64) -> f64 {
        self.head_by_rate.eval(rate)
    }

    /// Efficiency = f(rate), constant extrapolation at the endpoints.
    pub fn efficiency_as_function_of_rate(&self, rate: f64) -> f64 {
        self.efficiency_by_rate.eval(rate)
    }

    /// Rate = f(head), constant extrapolation at the endpoints.
    pub fn rate_as_function_of_head(&self, head: f64) -> f64 {
        self.rate_by_head.eval(head)
    }

    /// Rate = f(head) with linear extrapolation beyond the curve ends.
    pub fn rate_as_function_of_head_extrapolate(&self, head: f64) -> f64 {
        self.rate_by_head.eval_extrapolate(head)
    }

    /// (rate, head, efficiency) at the minimum-rate point.
    pub fn point_at_minimum_rate(&self) -> (f64, f64, f64) {
        (
            self.rate_actual_m3_per_hour[0],
            self.polytropic_head_joule_per_kg[0],
            self.efficiency_fraction[0],
        )
    }

    /// (rate, head, efficiency) at the maximum-rate point (top of stonewall).
    pub fn point_at_maximum_rate(&self) -> (f64, f64, f64) {
        let i = self.rate_actual_m3_per_hour.len() - 1;
        (
            self.rate_actual_m3_per_hour[i],
            self.polytropic_head_joule_per_kg[i],
            self.efficiency_fraction[i],
        )
    }

    /// Shortest planar distance from (rate, head) to the curve polyline, and
    /// the efficiency at the closest point.
    ///
    /// The distance is negative when the closest point lies below the query
    /// point (the curve is below), positive when above.
    pub fn distance_and_efficiency_from_closest_point(&self, rate: f64, head: f64) -> (f64, f64) {
        let mut best_distance_sq = f64::INFINITY;
        let mut closest_x = self.rate_actual_m3_per_hour[0];
        let mut closest_y = self.polytropic_head_joule_per_kg[0];

        for i in 0..self.rate_actual_m3_per_hour.len() - 1 {
            let (x0, y0) = (
                self.rate_actual_m3_per_hour[i],
                self.polytropic_head_joule_per_kg[i],
            );
            let (x1, y1) = (
                self.rate_actual_m3_per_hour[i + 1],
                self.polytropic_head_joule_per_kg[i + 1],
            );
            let dx = x1 - x0;
            let dy = y1 - y0;
            let seg_len_sq = dx * dx + dy * dy;
            let t = if seg_len_sq > 0.0 {
                (((rate - x0) * dx + (head - y0) * dy) / seg_len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let px = x0 + t * dx;
            let py = y0 + t * dy;
            let dist_sq = (rate - px) * (rate - px) + (head - py) * (head - py);
            if dist_sq < best_distance_sq {
                best_distance_sq = dist_sq;
                closest_x = px;
                closest_y = py;
            }
        }

        let mut distance = best_distance_sq.sqrt();
        if closest_y < head {
            distance = -distance;
        }
        let efficiency = self.efficiency_by_rate.eval(closest_x);
        (distance, efficiency)
    }

    /// Shift the minimum-rate point right by `control_margin` of the rate
    /// span, trimming points to the left and interpolating head/efficiency at
    /// the new minimum-rate point.
    pub fn adjust_for_control_margin(&self, control_margin: f64) -> ChartResult<Self> {
        if !(0.0..=1.0).contains(&control_margin) || !control_margin.is_finite() {
            return Err(ChartError::InvalidArg {
                what: "control margin must be in [0, 1]",
            });
        }
        if control_margin == 0.0 {
            return Ok(self.clone());
        }

        let span = self.maximum_rate() - self.minimum_rate();
        let new_minimum_rate = self.minimum_rate() + span * control_margin;

        let new_point = (
            new_minimum_rate,
            self.head_by_rate.eval(new_minimum_rate),
            self.efficiency_by_rate.eval(new_minimum_rate),
        );

        let mut rates = vec![new_point.0];
        let mut heads = vec![new_point.1];
        let mut efficiencies = vec![new_point.2];
        for i in 0..self.rate_actual_m3_per_hour.len() {
            if self.rate_actual_m3_per_hour[i] > new_minimum_rate {
                rates.push(self.rate_actual_m3_per_hour[i]);
                heads.push(self.polytropic_head_joule_per_kg[i]);
                efficiencies.push(self.efficiency_fraction[i]);
            }
        }

        if rates.len() < 2 {
            return Err(ChartError::InvalidArg {
                what: "control margin leaves fewer than two curve points",
            });
        }

        ChartCurve::new(self.speed_rpm, rates, heads, efficiencies)
    }
}
