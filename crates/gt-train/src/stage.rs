//! Single-stage evaluation: inter-stage conditioning, ASV handling, chart
//! lookup, and the polytropic head / enthalpy inner iteration.

use crate::config::CompressorTrainStage;
use crate::error::{TrainError, TrainResult};
use crate::results::{CompressorStageResult, StreamState};
use gt_chart::{AreaFlags, ChartAreaFlag};
use gt_core::numeric::INNER_ITERATION_CAP;
use gt_core::units::constants::{EPSILON, GAS_CONSTANT};
use gt_fluids::{FluidStream, ProcessConditions};
use tracing::warn;

/// Relative convergence tolerance for the head/enthalpy inner iteration.
const INNER_TOLERANCE: f64 = 1e-3;

/// Seconds-per-hour times watts-per-megawatt: kg/h * J/kg to MW.
const KGH_JKG_TO_MW: f64 = 3.6e9;

/// Outcome of the outlet-state iteration.
struct OutletSolution {
    outlet: FluidStream,
    enthalpy_change_joule_per_kg: f64,
    converged: bool,
}

/// Iterate the outlet state consistent with a polytropic head.
///
/// The head at a pressure ratio pi follows the Campbell formulation
/// `H = Z R T_in / (M kappa_exp) * (pi^kappa_exp - 1)` with
/// `kappa_exp = (kappa - 1) / (kappa * eta)`, Z and kappa averaged between
/// inlet and outlet. The outlet Z and kappa depend on the outlet temperature,
/// which depends on the enthalpy change, so the pressure ratio is iterated to
/// a fixed point (20 iterations, relative tolerance 1e-3; non-convergence is
/// logged and the last estimate kept).
fn solve_outlet_for_head(
    inlet: &FluidStream,
    head_joule_per_kg: f64,
    efficiency: f64,
) -> TrainResult<OutletSolution> {
    let enthalpy_change = head_joule_per_kg / efficiency;
    if head_joule_per_kg <= 0.0 {
        return Ok(OutletSolution {
            outlet: inlet.clone(),
            enthalpy_change_joule_per_kg: 0.0,
            converged: true,
        });
    }

    let z_in = inlet.z();
    let kappa_in = inlet.kappa();
    let t_in = inlet.temperature_kelvin();
    let p_in = inlet.pressure_bara();
    let molar_mass = inlet.molar_mass();

    let mut z_avg = z_in;
    let mut kappa_avg = kappa_in;
    let mut outlet = inlet.clone();
    let mut previous_outlet_pressure = f64::NAN;
    let mut converged = false;

    for _ in 0..INNER_ITERATION_CAP {
        let kappa_exp = (kappa_avg - 1.0) / (kappa_avg * efficiency);
        let pressure_ratio = (1.0
            + head_joule_per_kg * molar_mass * kappa_exp / (z_avg * GAS_CONSTANT * t_in))
            .powf(1.0 / kappa_exp);
        let outlet_pressure = p_in * pressure_ratio;

        outlet = inlet.with_enthalpy_change(enthalpy_change, outlet_pressure)?;
        z_avg = 0.5 * (z_in + outlet.z());
        kappa_avg = 0.5 * (kappa_in + outlet.kappa());

        if previous_outlet_pressure.is_finite()
            && (outlet_pressure - previous_outlet_pressure).abs()
                < INNER_TOLERANCE * previous_outlet_pressure
        {
            converged = true;
            break;
        }
        previous_outlet_pressure = outlet_pressure;
    }

    if !converged {
        warn!(
            head = head_joule_per_kg,
            efficiency, "polytropic head iteration did not converge; keeping last estimate"
        );
    }

    Ok(OutletSolution {
        outlet,
        enthalpy_change_joule_per_kg: enthalpy_change,
        converged,
    })
}

impl CompressorTrainStage {
    /// Evaluate the stage for an inlet stream, shaft speed, and mass rate.
    ///
    /// ASV recirculation enters twice: `asv_rate_fraction` scales the mass
    /// rate linearly towards the chart maximum at this speed (fraction 1 is
    /// full recirculation), and `asv_additional_mass_rate` adds a fixed
    /// recirculated mass on top. Flow below the minimum-flow line is always
    /// lifted to it. Power is computed from the recirculation-corrected mass
    /// rate; the ASV'd gas is compressed too.
    pub fn evaluate(
        &self,
        inlet_stream: &FluidStream,
        speed: f64,
        mass_rate_kg_per_hour: f64,
        asv_rate_fraction: f64,
        asv_additional_mass_rate: f64,
    ) -> TrainResult<CompressorStageResult> {
        if !(0.0..=1.0).contains(&asv_rate_fraction) {
            return Err(TrainError::InvalidInput {
                what: "asv_rate_fraction must be in [0, 1]",
            });
        }
        if asv_additional_mass_rate < 0.0 {
            return Err(TrainError::InvalidInput {
                what: "asv_additional_mass_rate must be >= 0",
            });
        }

        // Inter-stage conditioning: pressure drop, cooling, liquid removal.
        let stage_inlet_pressure =
            inlet_stream.pressure_bara() - self.pressure_drop_ahead_of_stage_bar;
        if stage_inlet_pressure <= 0.0 {
            return Err(TrainError::InvalidInput {
                what: "pressure drop ahead of stage exceeds inlet pressure",
            });
        }
        let stage_inlet = inlet_stream
            .flash_to(
                ProcessConditions::from_bara_kelvin(
                    stage_inlet_pressure,
                    self.inlet_temperature_kelvin,
                )?,
                self.remove_liquid_after_cooling,
            )?
            .with_mass_rate(mass_rate_kg_per_hour)?;

        let inlet_density = stage_inlet.density();
        let minimum_rate = self.chart.minimum_rate_at_speed(speed);
        let maximum_rate = self.chart.maximum_rate_at_speed(speed);
        let maximum_mass_rate = maximum_rate * inlet_density;

        // ASV expansion of the mass rate: the fraction interpolates linearly
        // between the throughput and the chart maximum at this speed, so
        // fraction 1 is full recirculation (wheel at maximum flow, minimum
        // head). The minimum-flow clamp below covers the surge side.
        let k_asv = if mass_rate_kg_per_hour > EPSILON {
            (maximum_mass_rate / mass_rate_kg_per_hour).max(1.0)
        } else {
            1.0
        };
        let asv_mass_rate = mass_rate_kg_per_hour * (1.0 + asv_rate_fraction * (k_asv - 1.0))
            + asv_additional_mass_rate;

        let rate_without_asv = mass_rate_kg_per_hour / inlet_density;
        let rate_with_asv = asv_mass_rate / inlet_density;

        // Chart capacity correction: lift to minimum flow, flag stonewall.
        let corrected_rate = rate_with_asv.max(minimum_rate);
        let rate_exceeds_maximum = corrected_rate > maximum_rate;
        let rate_has_recirculation = corrected_rate > rate_without_asv;
        let mass_rate_used = corrected_rate * inlet_density;

        let below_minimum_speed = speed < self.chart.minimum_speed() * (1.0 - 1e-9);
        let above_maximum_speed = speed > self.chart.maximum_speed() * (1.0 + 1e-9);

        let head = self.chart.head_at_speed_and_rate(speed, corrected_rate);
        let efficiency = self.chart.efficiency_at(corrected_rate, head);
        if !(efficiency > 0.0) || !efficiency.is_finite() {
            return Err(TrainError::InvalidInput {
                what: "chart efficiency must be positive",
            });
        }

        let solution = solve_outlet_for_head(&stage_inlet, head, efficiency)?;
        let outlet = solution.outlet.with_mass_rate(mass_rate_kg_per_hour)?;
        let outlet_including_asv = outlet.with_mass_rate(mass_rate_used)?;
        let inlet_including_asv = stage_inlet.with_mass_rate(mass_rate_used)?;

        let power_megawatt = mass_rate_used * solution.enthalpy_change_joule_per_kg / KGH_JKG_TO_MW;

        let chart_area_flag = ChartAreaFlag::from_flags(AreaFlags {
            below_minimum_flow_rate: rate_with_asv < minimum_rate,
            above_maximum_flow_rate: rate_exceeds_maximum,
            below_minimum_speed,
            above_maximum_speed,
        });

        let point_is_valid =
            !rate_exceeds_maximum && !above_maximum_speed && !below_minimum_speed && solution.converged;

        Ok(CompressorStageResult {
            inlet_stream: StreamState::from_stream(&stage_inlet),
            outlet_stream: StreamState::from_stream(&outlet),
            inlet_stream_including_asv: StreamState::from_stream(&inlet_including_asv),
            outlet_stream_including_asv: StreamState::from_stream(&outlet_including_asv),
            inlet_actual_rate_m3_per_hour: rate_without_asv,
            inlet_actual_rate_asv_corrected_m3_per_hour: corrected_rate,
            outlet_actual_rate_m3_per_hour: mass_rate_kg_per_hour / outlet.density(),
            mass_rate_kg_per_hour,
            mass_rate_asv_corrected_kg_per_hour: mass_rate_used,
            polytropic_head_joule_per_kg: head,
            polytropic_head_before_choke_joule_per_kg: head,
            polytropic_enthalpy_change_joule_per_kg: solution.enthalpy_change_joule_per_kg,
            polytropic_enthalpy_change_before_choke_joule_per_kg: solution
                .enthalpy_change_joule_per_kg,
            polytropic_efficiency: efficiency,
            power_megawatt,
            chart_area_flag,
            rate_has_recirculation,
            rate_exceeds_maximum,
            pressure_is_choked: false,
            head_exceeds_maximum: false,
            point_is_valid,
            inlet_pressure_before_choking_bara: f64::NAN,
            outlet_pressure_before_choking_bara: f64::NAN,
        })
    }
}
