//! Variable-speed compressor chart.
//!
//! The performance map is an ordered set of curves by ascending speed. Its
//! envelope is bounded by the minimum-speed curve (bottom), the maximum-speed
//! curve (top), the minimum-flow line (left), and the stonewall (right).

use crate::curve::ChartCurve;
use crate::error::{ChartError, ChartResult};
use gt_core::numeric::Interp1d;

#[derive(Debug, Clone)]
pub struct VariableSpeedChart {
    curves: Vec<ChartCurve>,
    control_margin: Option<f64>,
    min_rate_by_head: Interp1d,
    max_rate_by_head: Interp1d,
    min_rate_by_speed: Interp1d,
    max_rate_by_speed: Interp1d,
    max_head_by_rate: Interp1d,
    min_head_by_rate: Interp1d,
    // Scaling of the (rate, head) plane for the efficiency metric
    rate_scale: (f64, f64),
    head_scale: (f64, f64),
}

impl VariableSpeedChart {
    /// Build a chart from curves, optionally applying a control margin that
    /// shifts every curve's minimum-rate point to the right by that fraction
    /// of its rate span.
    pub fn new(curves: Vec<ChartCurve>, control_margin: Option<f64>) -> ChartResult<Self> {
        if curves.len() < 2 {
            return Err(ChartError::InvalidArg {
                what: "variable speed chart needs at least two curves",
            });
        }

        let mut curves = curves;
        if let Some(margin) = control_margin {
            curves = curves
                .into_iter()
                .map(|c| c.adjust_for_control_margin(margin))
                .collect::<ChartResult<Vec<_>>>()?;
        }
        curves.sort_by(|a, b| a.speed().total_cmp(&b.speed()));
        if curves.windows(2).any(|w| w[1].speed() <= w[0].speed()) {
            return Err(ChartError::InvalidArg {
                what: "curve speeds must be distinct",
            });
        }

        let min_curve = &curves[0];
        let max_curve = &curves[curves.len() - 1];

        // Minimum-flow line: straight between the minimum-rate points of the
        // minimum- and maximum-speed curves (assumes choking below).
        let (r_lo, h_lo, _) = min_curve.point_at_minimum_rate();
        let (r_hi, h_hi, _) = max_curve.point_at_minimum_rate();
        if h_hi <= h_lo {
            return Err(ChartError::Invariant {
                what: "maximum-speed curve must sit above the minimum-speed curve",
            });
        }
        let min_rate_by_head = Interp1d::new(vec![h_lo, h_hi], vec![r_lo, r_hi])?;

        // Maximum rate as a function of head follows the maximum-speed curve
        // (assumes choking below its head range).
        let max_rate_by_head = Interp1d::new_from_decreasing(
            max_curve.head_values().to_vec(),
            max_curve.rate_values().to_vec(),
        )?;

        let speeds: Vec<f64> = curves.iter().map(|c| c.speed()).collect();
        let min_rate_by_speed = Interp1d::new(
            speeds.clone(),
            curves.iter().map(|c| c.minimum_rate()).collect(),
        )?;
        let max_rate_by_speed = Interp1d::new(
            speeds,
            curves.iter().map(|c| c.maximum_rate()).collect(),
        )?;

        let max_head_by_rate = Interp1d::new(
            max_curve.rate_values().to_vec(),
            max_curve.head_values().to_vec(),
        )?;

        // Minimum head follows the minimum-speed curve, extended along the
        // stonewall up to the maximum-rate point of the maximum-speed curve.
        let (stone_rate, stone_head, _) = max_curve.point_at_maximum_rate();
        let mut min_head_rates = min_curve.rate_values().to_vec();
        let mut min_head_heads = min_curve.head_values().to_vec();
        if stone_rate > min_head_rates[min_head_rates.len() - 1] {
            min_head_rates.push(stone_rate);
            min_head_heads.push(stone_head);
        }
        let min_head_by_rate = Interp1d::new(min_head_rates, min_head_heads)?;

        let all_rates: Vec<f64> = curves
            .iter()
            .flat_map(|c| c.rate_values().iter().copied())
            .collect();
        let all_heads: Vec<f64> = curves
            .iter()
            .flat_map(|c| c.head_values().iter().copied())
            .collect();
        let rate_scale = mean_and_std(&all_rates);
        let head_scale = mean_and_std(&all_heads);

        Ok(Self {
            curves,
            control_margin,
            min_rate_by_head,
            max_rate_by_head,
            min_rate_by_speed,
            max_rate_by_speed,
            max_head_by_rate,
            min_head_by_rate,
            rate_scale,
            head_scale,
        })
    }

    pub fn curves(&self) -> &[ChartCurve] {
        &self.curves
    }

    pub fn control_margin(&self) -> Option<f64> {
        self.control_margin
    }

    pub fn minimum_speed_curve(&self) -> &ChartCurve {
        &self.curves[0]
    }

    pub fn maximum_speed_curve(&self) -> &ChartCurve {
        &self.curves[self.curves.len() - 1]
    }

    pub fn minimum_speed(&self) -> f64 {
        self.minimum_speed_curve().speed()
    }

    pub fn maximum_speed(&self) -> f64 {
        self.maximum_speed_curve().speed()
    }

    pub fn is_100_percent_efficient(&self) -> bool {
        self.curves.iter().all(|c| c.is_100_percent_efficient())
    }

    /// Minimum flow = f(head), assuming choking below the envelope.
    pub fn minimum_rate_as_function_of_head(&self, head: f64) -> f64 {
        self.min_rate_by_head.eval(head)
    }

    /// Maximum rate = f(head), assuming choking below the envelope.
    pub fn maximum_rate_as_function_of_head(&self, head: f64) -> f64 {
        self.max_rate_by_head.eval(head)
    }

    /// Minimum rate = f(speed), from the per-curve minimum-rate endpoints.
    pub fn minimum_rate_as_function_of_speed(&self, speed: f64) -> f64 {
        self.min_rate_by_speed.eval(speed)
    }

    /// Maximum rate = f(speed), from the per-curve maximum-rate endpoints.
    pub fn maximum_rate_as_function_of_speed(&self, speed: f64) -> f64 {
        self.max_rate_by_speed.eval(speed)
    }

    /// Maximum head = f(rate), along the maximum-speed curve.
    pub fn maximum_head_as_function_of_rate(&self, rate: f64) -> f64 {
        self.max_head_by_rate.eval(rate)
    }

    /// Minimum head = f(rate), along the minimum-speed curve and stonewall.
    pub fn minimum_head_as_function_of_rate(&self, rate: f64) -> f64 {
        self.min_head_by_rate.eval(rate)
    }

    pub fn closest_curve_below_speed(&self, speed: f64) -> Option<&ChartCurve> {
        self.curves.iter().rev().find(|c| c.speed() <= speed)
    }

    pub fn closest_curve_above_speed(&self, speed: f64) -> Option<&ChartCurve> {
        self.curves.iter().find(|c| c.speed() >= speed)
    }

    /// Head [J/kg] at a shaft speed and actual rate, interpolated linearly in
    /// speed between the adjacent curves. Speeds outside the chart clamp to
    /// the nearest curve.
    pub fn head_at_speed_and_rate(&self, speed: f64, rate: f64) -> f64 {
        let below = self.closest_curve_below_speed(speed);
        let above = self.closest_curve_above_speed(speed);
        match (below, above) {
            (Some(b), Some(a)) => {
                if a.speed() == b.speed() {
                    b.head_as_function_of_rate(rate)
                } else {
                    let fraction = (speed - b.speed()) / (a.speed() - b.speed());
                    let head_below = b.head_as_function_of_rate(rate);
                    let head_above = a.head_as_function_of_rate(rate);
                    head_below + fraction * (head_above - head_below)
                }
            }
            (Some(b), None) => b.head_as_function_of_rate(rate),
            (None, Some(a)) => a.head_as_function_of_rate(rate),
            (None, None) => f64::NAN,
        }
    }

    /// Efficiency at a (rate, head) point by distance-weighted interpolation
    /// between the nearest curves above and below.
    ///
    /// Rate and head are scaled by the chart-wide mean and standard deviation
    /// of each axis so the distance metric is dimensionally neutral.
    pub fn efficiency_at_rate_and_head(&self, rate: f64, head: f64) -> f64 {
        if self.is_100_percent_efficient() {
            return 1.0;
        }

        let (rate_mean, rate_std) = self.rate_scale;
        let (head_mean, head_std) = self.head_scale;
        let scaled_rate = (rate - rate_mean) / rate_std;
        let scaled_head = (head - head_mean) / head_std;

        let mut distance_above = f64::INFINITY;
        let mut distance_below = f64::NEG_INFINITY;
        let mut efficiency_above = 1.0;
        let mut efficiency_below = 1.0;

        for curve in &self.curves {
            let (distance, efficiency) = scaled_distance_and_efficiency(
                curve,
                scaled_rate,
                scaled_head,
                (rate_mean, rate_std),
                (head_mean, head_std),
            );
            if (0.0..distance_above).contains(&distance) {
                distance_above = distance;
                efficiency_above = efficiency;
            } else if distance < 0.0 && distance > distance_below {
                distance_below = distance;
                efficiency_below = efficiency;
            }
        }

        let alpha = if distance_above.is_infinite() {
            1.0
        } else if distance_below.is_infinite() {
            0.0
        } else {
            distance_above.abs() / (distance_above.abs() + distance_below.abs())
        };

        alpha * efficiency_below + (1.0 - alpha) * efficiency_above
    }

    /// Build the equivalent single-speed curve at an arbitrary speed by
    /// interpolating head between the adjacent curves across the rate span at
    /// that speed.
    pub fn curve_at_speed(&self, speed: f64) -> ChartResult<ChartCurve> {
        if let Some(exact) = self.curves.iter().find(|c| c.speed() == speed) {
            return Ok(exact.clone());
        }

        let below = self.closest_curve_below_speed(speed);
        let above = self.closest_curve_above_speed(speed);
        let point_count = below
            .map(|c| c.rate_values().len())
            .unwrap_or(0)
            .max(above.map(|c| c.rate_values().len()).unwrap_or(0))
            .max(5);

        let min_rate = self.minimum_rate_as_function_of_speed(speed);
        let max_rate = self.maximum_rate_as_function_of_speed(speed);
        if !(max_rate > min_rate) {
            return Err(ChartError::Invariant {
                what: "degenerate rate span for interpolated curve",
            });
        }

        let mut rates = Vec::with_capacity(point_count);
        let mut heads = Vec::with_capacity(point_count);
        let mut efficiencies = Vec::with_capacity(point_count);
        let mut previous_head = f64::INFINITY;
        for i in 0..point_count {
            let rate = min_rate + (max_rate - min_rate) * i as f64 / (point_count - 1) as f64;
            let head = self.head_at_speed_and_rate(speed, rate).min(previous_head);
            previous_head = head;
            rates.push(rate);
            heads.push(head);
            efficiencies.push(self.efficiency_at_rate_and_head(rate, head).clamp(1e-6, 1.0));
        }

        ChartCurve::new(speed, rates, heads, efficiencies)
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = variance.sqrt();
    // Degenerate charts (all-equal values) keep the metric usable.
    if std == 0.0 { (mean, 1.0) } else { (mean, std) }
}

/// Distance from a scaled query point to a curve scaled the same way, with
/// the efficiency at the closest point. Sign convention as for the unscaled
/// curve distance: negative when the curve lies below the query point.
fn scaled_distance_and_efficiency(
    curve: &ChartCurve,
    scaled_rate: f64,
    scaled_head: f64,
    rate_scale: (f64, f64),
    head_scale: (f64, f64),
) -> (f64, f64) {
    let rates = curve.rate_values();
    let heads = curve.head_values();
    let sx = |r: f64| (r - rate_scale.0) / rate_scale.1;
    let sy = |h: f64| (h - head_scale.0) / head_scale.1;

    let mut best_distance_sq = f64::INFINITY;
    let mut closest_x = sx(rates[0]);
    let mut closest_y = sy(heads[0]);
    for i in 0..rates.len() - 1 {
        let (x0, y0) = (sx(rates[i]), sy(heads[i]));
        let (x1, y1) = (sx(rates[i + 1]), sy(heads[i + 1]));
        let dx = x1 - x0;
        let dy = y1 - y0;
        let seg_len_sq = dx * dx + dy * dy;
        let t = if seg_len_sq > 0.0 {
            (((scaled_rate - x0) * dx + (scaled_head - y0) * dy) / seg_len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let px = x0 + t * dx;
        let py = y0 + t * dy;
        let dist_sq = (scaled_rate - px) * (scaled_rate - px) + (scaled_head - py) * (scaled_head - py);
        if dist_sq < best_distance_sq {
            best_distance_sq = dist_sq;
            closest_x = px;
            closest_y = py;
        }
    }

    let mut distance = best_distance_sq.sqrt();
    if closest_y < scaled_head {
        distance = -distance;
    }
    // Map the closest scaled x back to an unscaled rate for the efficiency lookup.
    let unscaled_rate = closest_x * rate_scale.1 + rate_scale.0;
    (distance, curve.efficiency_as_function_of_rate(unscaled_rate))
}
