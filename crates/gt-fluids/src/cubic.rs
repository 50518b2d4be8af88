//! Native cubic equation-of-state backend (SRK and PR).
//!
//! Classical van der Waals mixing rules with zero binary interaction
//! parameters, analytic enthalpy departure, real cp by central difference of
//! enthalpy, and real cv from the `cp - cv = -T (dP/dT)^2 / (dP/dV)` identity.
//!
//! The backend treats the mixture as single phase: root selection between a
//! gas-like and a liquid-like compressibility uses the minimum-Gibbs
//! criterion, and `remove_liquid` forces the gas-like root (the properties of
//! the gas phase are what the compressor sees).

use crate::backend::{FluidProperties, ThermoBackend};
use crate::composition::FluidComposition;
use crate::conditions::ProcessConditions;
use crate::eos::{CubicForm, EoSModel};
use crate::error::{FluidError, FluidResult};
use gt_core::units::constants::GAS_CONSTANT;

/// Reference temperature for the ideal-gas enthalpy integral [K].
const REFERENCE_TEMPERATURE: f64 = 273.15;

/// Temperature search window for (P, h) flashes [K].
const T_MIN: f64 = 150.0;
const T_MAX: f64 = 1500.0;

const SQRT2: f64 = std::f64::consts::SQRT_2;

/// Native SRK/PR property backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicBackend;

impl CubicBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Temperature-dependent mixture parameters, molar SI units.
struct MixtureParams {
    /// Attraction parameter [Pa m^6 / mol^2]
    a: f64,
    /// Co-volume [m^3 / mol]
    b: f64,
    /// d(a)/dT [Pa m^6 / (mol^2 K)]
    da_dt: f64,
}

fn m_factor(form: CubicForm, acentric: f64) -> f64 {
    match form {
        CubicForm::Srk => 0.480 + 1.574 * acentric - 0.176 * acentric * acentric,
        CubicForm::Pr => 0.37464 + 1.54226 * acentric - 0.26992 * acentric * acentric,
    }
}

fn omega_a(form: CubicForm) -> f64 {
    match form {
        CubicForm::Srk => 0.42748,
        CubicForm::Pr => 0.45724,
    }
}

fn omega_b(form: CubicForm) -> f64 {
    match form {
        CubicForm::Srk => 0.08664,
        CubicForm::Pr => 0.07780,
    }
}

fn mixture_params(
    composition: &FluidComposition,
    form: CubicForm,
    temperature: f64,
) -> MixtureParams {
    let n = composition.iter().count();
    let mut a_i = Vec::with_capacity(n);
    let mut da_i = Vec::with_capacity(n);
    let mut x_i = Vec::with_capacity(n);
    let mut b = 0.0;

    for (component, x) in composition.iter() {
        let data = component.data();
        let tc = data.critical_temperature;
        let pc = data.critical_pressure;
        let m = m_factor(form, data.acentric_factor);

        let a0 = omega_a(form) * GAS_CONSTANT * GAS_CONSTANT * tc * tc / pc;
        let sqrt_tr = (temperature / tc).sqrt();
        let s = 1.0 + m * (1.0 - sqrt_tr);
        let alpha = s * s;
        // d(alpha)/dT = -m * s / sqrt(T * Tc)
        let dalpha_dt = -m * s / (temperature * tc).sqrt();

        a_i.push(a0 * alpha);
        da_i.push(a0 * dalpha_dt);
        x_i.push(x);
        b += x * omega_b(form) * GAS_CONSTANT * tc / pc;
    }

    let mut a = 0.0;
    let mut da_dt = 0.0;
    for i in 0..n {
        for j in 0..n {
            let aij = (a_i[i] * a_i[j]).sqrt();
            a += x_i[i] * x_i[j] * aij;
            if aij > 0.0 {
                // d(sqrt(ai*aj))/dT
                da_dt += x_i[i] * x_i[j] * 0.5 * (a_i[j] * da_i[i] + a_i[i] * da_i[j]) / aij;
            }
        }
    }

    MixtureParams { a, b, da_dt }
}

/// Real roots of z^3 + c2 z^2 + c1 z + c0 = 0.
fn solve_cubic(c2: f64, c1: f64, c0: f64) -> Vec<f64> {
    let q = (3.0 * c1 - c2 * c2) / 9.0;
    let r = (9.0 * c2 * c1 - 27.0 * c0 - 2.0 * c2 * c2 * c2) / 54.0;
    let disc = q * q * q + r * r;

    if disc > 0.0 {
        let sqrt_disc = disc.sqrt();
        let s = (r + sqrt_disc).cbrt();
        let t = (r - sqrt_disc).cbrt();
        vec![s + t - c2 / 3.0]
    } else {
        let minus_q = -q;
        let theta = (r / (minus_q * minus_q * minus_q).sqrt()).clamp(-1.0, 1.0).acos();
        let two_sqrt_q = 2.0 * minus_q.sqrt();
        (0..3)
            .map(|k| {
                two_sqrt_q * ((theta + 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos()
                    - c2 / 3.0
            })
            .collect()
    }
}

/// Log fugacity coefficient of the mixture at compressibility z.
fn ln_phi(form: CubicForm, z: f64, a_dim: f64, b_dim: f64) -> f64 {
    match form {
        CubicForm::Srk => z - 1.0 - (z - b_dim).ln() - a_dim / b_dim * (1.0 + b_dim / z).ln(),
        CubicForm::Pr => {
            z - 1.0
                - (z - b_dim).ln()
                - a_dim / (2.0 * SQRT2 * b_dim)
                    * ((z + (1.0 + SQRT2) * b_dim) / (z + (1.0 - SQRT2) * b_dim)).ln()
        }
    }
}

/// Solve the cubic for z and select a root.
///
/// With `force_vapor` the gas-like (largest) root is returned; otherwise the
/// root with the lower Gibbs energy wins. The second element reports whether
/// the chosen root is the gas-like one.
fn solve_z(form: CubicForm, a_dim: f64, b_dim: f64, force_vapor: bool) -> FluidResult<(f64, bool)> {
    let (c2, c1, c0) = match form {
        CubicForm::Srk => (
            -1.0,
            a_dim - b_dim - b_dim * b_dim,
            -a_dim * b_dim,
        ),
        CubicForm::Pr => (
            b_dim - 1.0,
            a_dim - 3.0 * b_dim * b_dim - 2.0 * b_dim,
            -(a_dim * b_dim - b_dim * b_dim - b_dim * b_dim * b_dim),
        ),
    };

    let mut roots: Vec<f64> = solve_cubic(c2, c1, c0)
        .into_iter()
        .filter(|z| *z > b_dim && z.is_finite())
        .collect();
    roots.sort_by(|a, b| a.total_cmp(b));

    let (z_min, z_max) = match (roots.first(), roots.last()) {
        (Some(lo), Some(hi)) => (*lo, *hi),
        _ => {
            return Err(FluidError::ConvergenceFailed {
                what: "no physical compressibility root",
            });
        }
    };

    if roots.len() == 1 || (z_max - z_min) < 1e-10 {
        // Single phase; classify gas-like by the magnitude of z.
        return Ok((z_max, z_max > 0.3));
    }

    if force_vapor {
        return Ok((z_max, true));
    }

    let phi_vapor = ln_phi(form, z_max, a_dim, b_dim);
    let phi_liquid = ln_phi(form, z_min, a_dim, b_dim);
    if phi_vapor <= phi_liquid {
        Ok((z_max, true))
    } else {
        Ok((z_min, false))
    }
}

/// Ideal-gas molar enthalpy relative to the reference temperature [J/mol].
fn ideal_enthalpy_molar(composition: &FluidComposition, t: f64) -> f64 {
    let t0 = REFERENCE_TEMPERATURE;
    composition
        .iter()
        .map(|(component, x)| {
            let [a, b, c, d] = component.data().cp_coefficients;
            x * (a * (t - t0)
                + b / 2.0 * (t * t - t0 * t0)
                + c / 3.0 * (t * t * t - t0 * t0 * t0)
                + d / 4.0 * (t * t * t * t - t0 * t0 * t0 * t0))
        })
        .sum()
}

struct StateEvaluation {
    z: f64,
    is_vapor: bool,
    /// Molar enthalpy including departure [J/mol]
    enthalpy_molar: f64,
    params: MixtureParams,
}

fn evaluate_state(
    composition: &FluidComposition,
    form: CubicForm,
    pressure_pa: f64,
    temperature: f64,
    force_vapor: bool,
) -> FluidResult<StateEvaluation> {
    let params = mixture_params(composition, form, temperature);
    let rt = GAS_CONSTANT * temperature;
    let a_dim = params.a * pressure_pa / (rt * rt);
    let b_dim = params.b * pressure_pa / rt;
    let (z, is_vapor) = solve_z(form, a_dim, b_dim, force_vapor)?;

    let departure = match form {
        CubicForm::Srk => {
            rt * (z - 1.0)
                + (params.a - temperature * params.da_dt) / params.b * (z / (z + b_dim)).ln()
        }
        CubicForm::Pr => {
            rt * (z - 1.0)
                + (params.a - temperature * params.da_dt) / (2.0 * SQRT2 * params.b)
                    * ((z + (1.0 - SQRT2) * b_dim) / (z + (1.0 + SQRT2) * b_dim)).ln()
        }
    };

    let enthalpy_molar = ideal_enthalpy_molar(composition, temperature) + departure;
    if !enthalpy_molar.is_finite() || !z.is_finite() {
        return Err(FluidError::ConvergenceFailed {
            what: "non-finite state evaluation",
        });
    }

    Ok(StateEvaluation {
        z,
        is_vapor,
        enthalpy_molar,
        params,
    })
}

/// cp - cv [J/(mol K)] from the pressure-explicit identity at molar volume v.
fn cp_minus_cv_molar(form: CubicForm, params: &MixtureParams, t: f64, v: f64) -> f64 {
    let b = params.b;
    let dp_dt;
    let dp_dv;
    match form {
        CubicForm::Srk => {
            dp_dt = GAS_CONSTANT / (v - b) - params.da_dt / (v * (v + b));
            dp_dv = -GAS_CONSTANT * t / ((v - b) * (v - b))
                + params.a * (2.0 * v + b) / (v * v * (v + b) * (v + b));
        }
        CubicForm::Pr => {
            let denom = v * v + 2.0 * b * v - b * b;
            dp_dt = GAS_CONSTANT / (v - b) - params.da_dt / denom;
            dp_dv = -GAS_CONSTANT * t / ((v - b) * (v - b))
                + params.a * (2.0 * v + 2.0 * b) / (denom * denom);
        }
    }
    if dp_dv >= 0.0 {
        // Mechanically unstable volume; fall back to the ideal-gas offset.
        return GAS_CONSTANT;
    }
    -t * dp_dt * dp_dt / dp_dv
}

impl ThermoBackend for CubicBackend {
    fn name(&self) -> &str {
        "cubic-eos"
    }

    fn properties(
        &self,
        composition: &FluidComposition,
        eos_model: EoSModel,
        conditions: ProcessConditions,
        remove_liquid: bool,
    ) -> FluidResult<FluidProperties> {
        let form = eos_model.cubic_form();
        let pressure_pa = conditions.pressure_bara() * 1.0e5;
        let temperature = conditions.temperature_kelvin();
        let molar_mass = composition.molar_mass();

        let state = evaluate_state(composition, form, pressure_pa, temperature, remove_liquid)?;

        let density = pressure_pa * molar_mass / (state.z * GAS_CONSTANT * temperature);
        if !density.is_finite() || density <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "density from cubic equation of state",
            });
        }

        // Real cp by central difference of the full enthalpy.
        let dt = 0.05;
        let h_plus = evaluate_state(composition, form, pressure_pa, temperature + dt, remove_liquid)?;
        let h_minus =
            evaluate_state(composition, form, pressure_pa, temperature - dt, remove_liquid)?;
        let cp_molar = (h_plus.enthalpy_molar - h_minus.enthalpy_molar) / (2.0 * dt);

        let v = state.z * GAS_CONSTANT * temperature / pressure_pa;
        let cv_molar = cp_molar - cp_minus_cv_molar(form, &state.params, temperature, v);
        if cp_molar <= 0.0 || cv_molar <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "heat capacity from cubic equation of state",
            });
        }
        let kappa = cp_molar / cv_molar;
        if !kappa.is_finite() || kappa < 1.0 {
            return Err(FluidError::NonPhysical {
                what: "kappa must be >= 1 and finite",
            });
        }

        Ok(FluidProperties {
            density,
            z: state.z,
            kappa,
            enthalpy_joule_per_kg: state.enthalpy_molar / molar_mass,
            molar_mass,
            vapor_fraction_molar: if state.is_vapor { 1.0 } else { 0.0 },
        })
    }

    fn temperature_from_enthalpy(
        &self,
        composition: &FluidComposition,
        eos_model: EoSModel,
        pressure_bara: f64,
        enthalpy_joule_per_kg: f64,
    ) -> FluidResult<f64> {
        let form = eos_model.cubic_form();
        let pressure_pa = pressure_bara * 1.0e5;
        let molar_mass = composition.molar_mass();
        let target_molar = enthalpy_joule_per_kg * molar_mass;

        let h_at = |t: f64| -> FluidResult<f64> {
            Ok(evaluate_state(composition, form, pressure_pa, t, true)?.enthalpy_molar)
        };

        let mut lo = T_MIN;
        let mut hi = T_MAX;
        let h_lo = h_at(lo)?;
        let h_hi = h_at(hi)?;
        if target_molar < h_lo || target_molar > h_hi {
            return Err(FluidError::ConvergenceFailed {
                what: "enthalpy outside solvable temperature range",
            });
        }

        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if h_at(mid)? < target_molar {
                lo = mid;
            } else {
                hi = mid;
            }
            if (hi - lo) < 1e-6 * lo {
                break;
            }
        }
        Ok(0.5 * (lo + hi))
    }
}
