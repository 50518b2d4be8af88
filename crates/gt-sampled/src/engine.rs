//! Sampled (tabular) compressor model in full 3-D.
//!
//! The variables are rate, suction pressure (ps), and discharge pressure
//! (pd); the function value is power or fuel. Inside the convex hull of the
//! samples the model interpolates linearly. Outside, a query is projected
//! onto the hull the way the physical machine would move it: rate below the
//! envelope is lifted to minimum rate (ASV recirculation), pd below the
//! envelope is lifted to minimum pd (discharge choking), ps above the
//! envelope is lowered to maximum ps (suction choking). Points that none of
//! the projections can reach evaluate to NaN.

use crate::delaunay::Delaunay3;
use crate::error::{SampledError, SampledResult};
use crate::hull2d::{lower_chain, upper_chain};
use crate::hull3d::{ConvexHull3, HalfHull, HalfSide};
use crate::interpolate::SimplexInterpolator2;
use gt_core::numeric::Interp1d;
use tracing::debug;

const RATE_AXIS: usize = 0;
const PS_AXIS: usize = 1;
const PD_AXIS: usize = 2;

/// Nudge applied when projecting onto boundary surfaces.
const EPSILON: f64 = 1e-5;

/// Fraction of the rate span treated as numerical uncertainty at the rate
/// boundaries.
const EPSILON_MAX_RATE: f64 = 1e-4;

/// One sampled operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledDataPoint {
    pub rate: f64,
    pub suction_pressure: f64,
    pub discharge_pressure: f64,
    /// Power or fuel at this point.
    pub function_value: f64,
}

/// Boundary surface of a half hull with its energy counterpart and the two
/// 1-D guards projecting queries onto the surface's own footprint.
struct BoundarySurfaces {
    surface: SimplexInterpolator2,
    energy: SimplexInterpolator2,
    guard_a: Interp1d,
    guard_b: Interp1d,
}

pub struct CompressorModelSampled3D {
    scale_factor_rate: f64,
    interpolator: Delaunay3,
    function_values: Vec<f64>,
    rate_span: f64,
    /// min_rate(ps, pd); guard_a: pd(ps) lower, guard_b: ps(pd) upper.
    lower_rate: BoundarySurfaces,
    /// max_rate(ps, pd) on the monotonic part; guards as for lower_rate.
    upper_rate: BoundarySurfaces,
    /// min_pd(rate, ps); guard_a: rate(ps) lower, guard_b: ps(rate) upper.
    lower_pd: BoundarySurfaces,
    /// max_ps(rate, pd); guard_a: rate(pd) lower, guard_b: pd(rate) lower.
    upper_ps: BoundarySurfaces,
}

fn project(points: &[[f64; 3]], u_axis: usize, v_axis: usize) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p[u_axis], p[v_axis]]).collect()
}

fn half_hull_points(points: &[[f64; 3]], half: &HalfHull, u_axis: usize, v_axis: usize) -> Vec<[f64; 2]> {
    half.point_indices
        .iter()
        .map(|&i| [points[i][u_axis], points[i][v_axis]])
        .collect()
}

impl CompressorModelSampled3D {
    pub fn new(sampled_data: &[SampledDataPoint], rescale_rate: bool) -> SampledResult<Self> {
        if sampled_data.len() < 5 {
            return Err(SampledError::InvalidArg {
                what: "sampled 3-D model needs at least five points",
            });
        }

        // Rescale the rate axis so the three axes have comparable magnitudes.
        let n = sampled_data.len() as f64;
        let mean_rate = sampled_data.iter().map(|p| p.rate).sum::<f64>() / n;
        let mean_ps = sampled_data.iter().map(|p| p.suction_pressure).sum::<f64>() / n;
        let mean_pd = sampled_data.iter().map(|p| p.discharge_pressure).sum::<f64>() / n;
        let scale_factor_rate = if rescale_rate {
            let factor = (2.0 * mean_rate / (mean_ps + mean_pd)).round();
            if factor.is_finite() && factor >= 1.0 {
                factor
            } else {
                1.0
            }
        } else {
            1.0
        };
        debug!(scale_factor_rate, "building sampled 3-D compressor model");

        let points: Vec<[f64; 3]> = sampled_data
            .iter()
            .map(|p| {
                [
                    p.rate / scale_factor_rate,
                    p.suction_pressure,
                    p.discharge_pressure,
                ]
            })
            .collect();
        let function_values: Vec<f64> = sampled_data.iter().map(|p| p.function_value).collect();

        let hull = ConvexHull3::new(points.clone())?;
        let interpolator = Delaunay3::new(points.clone())?;
        let rate_span = hull.max_bound()[RATE_AXIS] - hull.min_bound()[RATE_AXIS];

        // Lower hull in the rate direction: min_rate(ps, pd).
        // Guards: pd may be lifted to the footprint's lower pd(ps) chain and
        // ps lowered to its upper ps(pd) chain.
        let lower_rate_half = hull.half_hull(RATE_AXIS, HalfSide::Lower);
        let lower_rate = build_boundary(
            &points,
            &function_values,
            &lower_rate_half,
            (PS_AXIS, PD_AXIS, RATE_AXIS),
            0.0,
            GuardSpec {
                input_is_u: true,
                side: ChainSide::Lower,
            },
            GuardSpec {
                input_is_u: false,
                side: ChainSide::Upper,
            },
        )?;

        // Monotonic part of the upper rate hull: max_rate(ps, pd), with the
        // rate increasing in ps and decreasing in pd.
        let upper_rate_half = hull.monotonic_upper_half_hull(RATE_AXIS, PS_AXIS, PD_AXIS);
        let upper_rate = build_boundary(
            &points,
            &function_values,
            &upper_rate_half,
            (PS_AXIS, PD_AXIS, RATE_AXIS),
            0.0,
            GuardSpec {
                input_is_u: true,
                side: ChainSide::Lower,
            },
            GuardSpec {
                input_is_u: false,
                side: ChainSide::Upper,
            },
        )?;

        // Lower hull in the pd direction: min_pd(rate, ps).
        // Guards: rate lifted to the lower rate(ps) chain, ps lowered to the
        // upper ps(rate) chain.
        let lower_pd_half = hull.half_hull(PD_AXIS, HalfSide::Lower);
        let lower_pd = build_boundary(
            &points,
            &function_values,
            &lower_pd_half,
            (RATE_AXIS, PS_AXIS, PD_AXIS),
            0.0,
            GuardSpec {
                input_is_u: false,
                side: ChainSide::Lower,
            },
            GuardSpec {
                input_is_u: true,
                side: ChainSide::Upper,
            },
        )?;

        // Upper hull in the ps direction: max_ps(rate, pd).
        // Guards: rate lifted to the lower rate(pd) chain, pd lifted to the
        // lower pd(rate) chain.
        let upper_ps_half = hull.half_hull(PS_AXIS, HalfSide::Upper);
        let upper_ps = build_boundary(
            &points,
            &function_values,
            &upper_ps_half,
            (RATE_AXIS, PD_AXIS, PS_AXIS),
            f64::INFINITY,
            GuardSpec {
                input_is_u: false,
                side: ChainSide::Lower,
            },
            GuardSpec {
                input_is_u: true,
                side: ChainSide::Lower,
            },
        )?;

        Ok(Self {
            scale_factor_rate,
            interpolator,
            function_values,
            rate_span,
            lower_rate,
            upper_rate,
            lower_pd,
            upper_ps,
        })
    }

    /// Evaluate the energy function at one (rate, ps, pd) query.
    ///
    /// Returns NaN for points outside the hull that no projection reaches.
    pub fn evaluate(&self, rate: f64, suction_pressure: f64, discharge_pressure: f64) -> f64 {
        let rate_scaled = rate / self.scale_factor_rate;
        let ps = suction_pressure;
        let pd = discharge_pressure;

        let direct = self
            .interpolator
            .interpolate(&self.function_values, [rate_scaled, ps, pd]);
        if direct.is_finite() {
            return direct;
        }

        let uncertainty = self.rate_span * EPSILON_MAX_RATE;

        // Rate projection: ASV recirculation up to minimum rate.
        let pd_projected = pd.max(self.lower_rate.guard_a.eval(ps));
        let ps_projected = ps.min(self.lower_rate.guard_b.eval(pd_projected));
        let minimum_rate = self.lower_rate.surface.eval(ps_projected, pd_projected);
        if rate_scaled <= minimum_rate + uncertainty {
            let value = self.lower_rate.energy.eval(ps_projected, pd_projected);
            if value.is_finite() {
                return value;
            }
        }

        // Numerical noise just past the maximum rate evaluates on the
        // maximum-rate surface.
        let pd_projected = pd.max(self.upper_rate.guard_a.eval(ps));
        let ps_projected = ps.min(self.upper_rate.guard_b.eval(pd_projected));
        let maximum_rate = self.upper_rate.surface.eval(ps_projected, pd_projected);
        if (rate_scaled - maximum_rate).abs() < uncertainty {
            let value = self.upper_rate.energy.eval(ps_projected, pd_projected);
            if value.is_finite() {
                return value;
            }
        }

        // Pd projection: discharge choking up to minimum pd.
        let rate_projected = rate_scaled.max(self.lower_pd.guard_a.eval(ps) + EPSILON);
        let ps_projected = ps.min(self.lower_pd.guard_b.eval(rate_projected));
        let minimum_pd = self.lower_pd.surface.eval(rate_projected, ps_projected);
        if pd <= minimum_pd + EPSILON {
            let value = self.lower_pd.energy.eval(rate_projected, ps_projected);
            if value.is_finite() {
                return value;
            }
        }

        // Ps projection: suction choking down to maximum ps.
        let rate_projected = rate_scaled.max(self.upper_ps.guard_a.eval(pd) + EPSILON);
        let pd_projected = pd.max(self.upper_ps.guard_b.eval(rate_projected) + EPSILON);
        let maximum_ps = self.upper_ps.surface.eval(rate_projected, pd_projected);
        if ps >= maximum_ps - EPSILON {
            let value = self.upper_ps.energy.eval(rate_projected, pd_projected);
            if value.is_finite() {
                return value;
            }
        }

        f64::NAN
    }

    /// Evaluate a batch of queries.
    pub fn evaluate_batch(
        &self,
        rates: &[f64],
        suction_pressures: &[f64],
        discharge_pressures: &[f64],
    ) -> Vec<f64> {
        rates
            .iter()
            .zip(suction_pressures)
            .zip(discharge_pressures)
            .map(|((r, ps), pd)| self.evaluate(*r, *ps, *pd))
            .collect()
    }

    /// Maximum rate at the given pressures from the monotonic part of the
    /// upper rate hull, in unscaled rate units. Zero outside the feasible
    /// pressure region.
    pub fn get_max_rate(&self, suction_pressure: f64, discharge_pressure: f64) -> f64 {
        let pd_projected = discharge_pressure.max(self.upper_rate.guard_a.eval(suction_pressure));
        let ps_projected = suction_pressure.min(self.upper_rate.guard_b.eval(pd_projected));
        self.upper_rate.surface.eval(ps_projected, pd_projected) * self.scale_factor_rate
    }

    /// Vector form of [`Self::get_max_rate`].
    pub fn get_max_rate_batch(
        &self,
        suction_pressures: &[f64],
        discharge_pressures: &[f64],
    ) -> Vec<f64> {
        suction_pressures
            .iter()
            .zip(discharge_pressures)
            .map(|(ps, pd)| self.get_max_rate(*ps, *pd))
            .collect()
    }
}

/// Which chain of the footprint hull a guard follows.
#[derive(Clone, Copy)]
enum ChainSide {
    Lower,
    Upper,
}

/// A 1-D guard: piecewise-linear `output = f(input)` along one chain of the
/// footprint's convex hull. `input_is_u` selects which projected coordinate
/// is the input; the other is the output.
#[derive(Clone, Copy)]
struct GuardSpec {
    input_is_u: bool,
    side: ChainSide,
}

fn build_guard(footprint: &[[f64; 2]], spec: GuardSpec) -> SampledResult<Interp1d> {
    let pairs: Vec<[f64; 2]> = footprint
        .iter()
        .map(|p| {
            if spec.input_is_u {
                [p[0], p[1]]
            } else {
                [p[1], p[0]]
            }
        })
        .collect();
    let (xs, ys) = match spec.side {
        ChainSide::Lower => lower_chain(&pairs)?,
        ChainSide::Upper => upper_chain(&pairs)?,
    };
    Interp1d::new(xs, ys).map_err(|_| SampledError::Degenerate {
        what: "boundary guard grid",
    })
}

fn build_boundary(
    points: &[[f64; 3]],
    function_values: &[f64],
    half: &HalfHull,
    (u_axis, v_axis, value_axis): (usize, usize, usize),
    fill_value: f64,
    guard_a_spec: GuardSpec,
    guard_b_spec: GuardSpec,
) -> SampledResult<BoundarySurfaces> {
    if half.facets.is_empty() {
        return Err(SampledError::Degenerate {
            what: "half hull has no facets",
        });
    }

    let projected_all = project(points, u_axis, v_axis);
    let surface_values: Vec<f64> = points.iter().map(|p| p[value_axis]).collect();

    let surface = SimplexInterpolator2::new(
        projected_all.clone(),
        surface_values,
        half.facets.clone(),
        fill_value,
    )?;
    let energy = SimplexInterpolator2::new(
        projected_all,
        function_values.to_vec(),
        half.facets.clone(),
        f64::NAN,
    )?;

    let footprint = half_hull_points(points, half, u_axis, v_axis);
    let guard_a = build_guard(&footprint, guard_a_spec)?;
    let guard_b = build_guard(&footprint, guard_b_spec)?;

    Ok(BoundarySurfaces {
        surface,
        energy,
        guard_a,
        guard_b,
    })
}
