//! Variable-speed train with multiple ingoing/outgoing streams and an
//! optional intermediate-pressure target.
//!
//! Streams may enter or leave the train between stages. At each junction,
//! outgoing volume is deducted before incoming volume is added. A stage whose
//! resulting throughput is zero runs in recirculation mode on the fluid
//! cached from the most recent evaluation of that stage; this cache is the
//! only mutable state in the engine and must be reset between independent
//! time series.

use crate::common::{
    TargetComparison, compare_to_target, maximize_x_where_valid, try_find_root,
};
use crate::config::{CompressorTrainStage, EnergyAdjustment, PressureControl, TrainStream};
use crate::error::{TrainError, TrainResult};
use crate::results::{CompressorTrainResult, FailureStatus, StreamState};
use gt_chart::CompressorChart;
use gt_core::numeric::INNER_ITERATION_CAP;
use gt_core::units::constants::{
    EPSILON, PRESSURE_CALCULATION_TOLERANCE, RATE_CALCULATION_TOLERANCE, STANDARD_PRESSURE_BARA,
};
use gt_fluids::{FluidFactory, FluidModel, FluidStream, ProcessConditions};
use std::sync::Arc;
use tracing::warn;

pub struct MultiStreamCompressorTrain {
    stages: Vec<CompressorTrainStage>,
    streams: Vec<TrainStream>,
    pressure_control: Option<PressureControl>,
    pressure_control_first_part: Option<PressureControl>,
    pressure_control_last_part: Option<PressureControl>,
    stage_number_interstage_pressure: Option<usize>,
    maximum_power_megawatt: Option<f64>,
    energy_adjustment: EnergyAdjustment,
    minimum_speed: f64,
    maximum_speed: f64,
    inlet_streams_per_stage: Vec<Vec<usize>>,
    outlet_streams_per_stage: Vec<Vec<usize>>,
    /// Fluid that passed through each stage in the most recent evaluation,
    /// consulted when a stage sees zero inlet mass rate.
    recirculation_cache: Vec<Option<FluidStream>>,
}

#[allow(clippy::too_many_arguments)]
impl MultiStreamCompressorTrain {
    pub fn new(
        stages: Vec<CompressorTrainStage>,
        streams: Vec<TrainStream>,
        pressure_control: Option<PressureControl>,
        pressure_control_first_part: Option<PressureControl>,
        pressure_control_last_part: Option<PressureControl>,
        stage_number_interstage_pressure: Option<usize>,
        maximum_power_megawatt: Option<f64>,
        energy_adjustment: EnergyAdjustment,
    ) -> TrainResult<Self> {
        if stages.is_empty() {
            return Err(TrainError::InvalidConfig {
                what: "train needs at least one stage",
            });
        }
        if stages
            .iter()
            .any(|s| !matches!(s.chart, CompressorChart::VariableSpeed(_)))
        {
            return Err(TrainError::InvalidConfig {
                what: "multi-stream train requires variable speed charts",
            });
        }
        if streams.is_empty() {
            return Err(TrainError::InvalidConfig {
                what: "multi-stream train needs at least one stream",
            });
        }
        if !streams[0].is_inlet || streams[0].connected_to_stage != 0 {
            return Err(TrainError::InvalidConfig {
                what: "stream 0 must be an inlet connected to stage 0",
            });
        }
        for stream in &streams {
            if stream.connected_to_stage >= stages.len() {
                return Err(TrainError::InvalidConfig {
                    what: "stream connected to a stage outside the train",
                });
            }
            if stream.is_inlet && stream.fluid.is_none() {
                return Err(TrainError::InvalidConfig {
                    what: "inlet streams must carry a fluid definition",
                });
            }
        }
        if let Some(k) = stage_number_interstage_pressure {
            if k < 1 || k > stages.len() - 1 {
                return Err(TrainError::InvalidConfig {
                    what: "interstage pressure stage number must be in [1, n_stages - 1]",
                });
            }
        }

        let minimum_speed = stages
            .iter()
            .map(|s| s.chart.minimum_speed())
            .fold(f64::NEG_INFINITY, f64::max);
        let maximum_speed = stages
            .iter()
            .map(|s| s.chart.maximum_speed())
            .fold(f64::INFINITY, f64::min);
        if minimum_speed > maximum_speed {
            return Err(TrainError::InvalidConfig {
                what: "stage charts have no common speed range",
            });
        }

        let mut inlet_streams_per_stage = vec![Vec::new(); stages.len()];
        let mut outlet_streams_per_stage = vec![Vec::new(); stages.len()];
        for (index, stream) in streams.iter().enumerate() {
            if stream.is_inlet {
                inlet_streams_per_stage[stream.connected_to_stage].push(index);
            } else {
                outlet_streams_per_stage[stream.connected_to_stage].push(index);
            }
        }

        let n_stages = stages.len();
        Ok(Self {
            stages,
            streams,
            pressure_control,
            pressure_control_first_part,
            pressure_control_last_part,
            stage_number_interstage_pressure,
            maximum_power_megawatt,
            energy_adjustment,
            minimum_speed,
            maximum_speed,
            inlet_streams_per_stage,
            outlet_streams_per_stage,
            recirculation_cache: vec![None; n_stages],
        })
    }

    pub fn stages(&self) -> &[CompressorTrainStage] {
        &self.stages
    }

    pub fn streams(&self) -> &[TrainStream] {
        &self.streams
    }

    pub fn minimum_speed(&self) -> f64 {
        self.minimum_speed
    }

    pub fn maximum_speed(&self) -> f64 {
        self.maximum_speed
    }

    /// Drop the per-stage recirculation state. Callers sharing a train
    /// across independent time series must reset between series.
    pub fn reset_recirculation_state(&mut self) {
        for slot in &mut self.recirculation_cache {
            *slot = None;
        }
    }

    fn main_inlet_fluid(&self) -> &FluidFactory {
        // Validated at construction: stream 0 is an inlet with a fluid.
        self.streams[0]
            .fluid
            .as_ref()
            .expect("stream 0 carries a fluid definition")
    }

    /// Cumulative ingoing volume must cover cumulative outgoing volume at
    /// every stage; a compressor train cannot create fluid.
    fn mass_balance_holds(&self, stream_rates: &[f64]) -> bool {
        let mut ingoing = 0.0;
        let mut outgoing = 0.0;
        for stage_number in 0..self.stages.len() {
            for &i in &self.inlet_streams_per_stage[stage_number] {
                ingoing += stream_rates[i];
            }
            for &i in &self.outlet_streams_per_stage[stage_number] {
                outgoing += stream_rates[i];
            }
            if outgoing > ingoing {
                warn!(
                    stage_number,
                    "outgoing streams exceed ingoing streams; point not calculated"
                );
                return false;
            }
        }
        true
    }

    /// Per-stage rates from per-stream rates, outlet draws deducted before
    /// inlet additions at the same junction. Units follow the input.
    pub fn rates_per_stage(&self, stream_rates: &[f64]) -> Vec<f64> {
        let mut stage_rates = vec![0.0; self.stages.len()];
        let mut carried = 0.0;
        for (stage_number, stage_rate) in stage_rates.iter_mut().enumerate() {
            let mut rate = carried;
            for &i in &self.outlet_streams_per_stage[stage_number] {
                rate -= stream_rates[i];
            }
            for &i in &self.inlet_streams_per_stage[stage_number] {
                rate += stream_rates[i];
            }
            *stage_rate = rate;
            carried = rate;
        }
        stage_rates
    }

    /// Evaluate one operating point.
    ///
    /// `intermediate_pressure_bara` must be given exactly when the train was
    /// configured with an interstage pressure stage.
    pub fn evaluate(
        &mut self,
        stream_rates_sm3_per_day: &[f64],
        suction_pressure_bara: f64,
        discharge_pressure_bara: f64,
        intermediate_pressure_bara: Option<f64>,
    ) -> TrainResult<CompressorTrainResult> {
        if stream_rates_sm3_per_day.len() != self.streams.len() {
            return Err(TrainError::InvalidInput {
                what: "stream rate vector length must match the stream count",
            });
        }
        if intermediate_pressure_bara.is_some() != self.stage_number_interstage_pressure.is_some() {
            return Err(TrainError::InvalidInput {
                what: "intermediate pressure requires a configured interstage stage (and vice versa)",
            });
        }

        if !self.mass_balance_holds(stream_rates_sm3_per_day) {
            return Ok(CompressorTrainResult::create_empty(
                self.stages.len(),
                FailureStatus::NotCalculated,
            ));
        }

        let any_positive_inlet = self
            .streams
            .iter()
            .enumerate()
            .any(|(i, s)| s.is_inlet && stream_rates_sm3_per_day[i] > 0.0);
        if !any_positive_inlet {
            return Ok(CompressorTrainResult::create_empty(
                self.stages.len(),
                FailureStatus::NoFailure,
            ));
        }

        let mut result = match intermediate_pressure_bara {
            Some(p_intermediate) => self.evaluate_with_intermediate_pressure(
                stream_rates_sm3_per_day,
                suction_pressure_bara,
                p_intermediate,
                discharge_pressure_bara,
            )?,
            None => self.evaluate_against_discharge_target(
                stream_rates_sm3_per_day,
                suction_pressure_bara,
                discharge_pressure_bara,
            )?,
        };
        result.finalize(self.maximum_power_megawatt, self.energy_adjustment);
        Ok(result)
    }

    /// Sequential batch evaluation; the recirculation cache carries state
    /// from one point to the next, so points are not independent.
    pub fn evaluate_batch(
        &mut self,
        stream_rates_sm3_per_day: &[Vec<f64>],
        suction_pressures_bara: &[f64],
        discharge_pressures_bara: &[f64],
        intermediate_pressures_bara: Option<&[f64]>,
    ) -> TrainResult<Vec<CompressorTrainResult>> {
        if stream_rates_sm3_per_day.len() != suction_pressures_bara.len()
            || stream_rates_sm3_per_day.len() != discharge_pressures_bara.len()
        {
            return Err(TrainError::InvalidInput {
                what: "rate and pressure vectors must have equal length",
            });
        }
        let mut results = Vec::with_capacity(stream_rates_sm3_per_day.len());
        for (i, rates) in stream_rates_sm3_per_day.iter().enumerate() {
            results.push(self.evaluate(
                rates,
                suction_pressures_bara[i],
                discharge_pressures_bara[i],
                intermediate_pressures_bara.map(|p| p[i]),
            )?);
        }
        Ok(results)
    }

    fn evaluate_against_discharge_target(
        &mut self,
        stream_rates: &[f64],
        suction_pressure_bara: f64,
        discharge_pressure_bara: f64,
    ) -> TrainResult<CompressorTrainResult> {
        let speed = self.find_speed_given_targets(
            stream_rates,
            suction_pressure_bara,
            discharge_pressure_bara,
            self.minimum_speed,
            self.maximum_speed,
        )?;
        let mut result =
            self.calculate_compressor_train(stream_rates, suction_pressure_bara, speed, 0.0, 0.0)?;

        match compare_to_target(result.discharge_pressure_bara(), discharge_pressure_bara) {
            TargetComparison::Met => {}
            TargetComparison::BelowTarget => {
                result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
            }
            TargetComparison::AboveTarget => {
                if let Some(control) = self.pressure_control {
                    result = self.evaluate_with_pressure_control(
                        control,
                        stream_rates,
                        suction_pressure_bara,
                        discharge_pressure_bara,
                        speed,
                    )?;
                } else {
                    result.failure_status = FailureStatus::TargetDischargePressureTooLow;
                }
            }
        }
        if result
            .stage_results
            .iter()
            .any(|s| s.rate_exceeds_maximum)
        {
            result.failure_status = FailureStatus::AboveMaximumFlowRate;
        }
        Ok(result)
    }

    /// Shaft speed meeting the discharge target within the given bounds, or
    /// the nearest bound when the target is outside what the train delivers.
    fn find_speed_given_targets(
        &mut self,
        stream_rates: &[f64],
        suction_pressure_bara: f64,
        target_discharge_pressure_bara: f64,
        lower_bound: f64,
        upper_bound: f64,
    ) -> TrainResult<f64> {
        let within_capacity = |result: &CompressorTrainResult| {
            result.stage_results.iter().all(|s| s.point_is_valid)
        };

        let result_max = self.calculate_compressor_train(
            stream_rates,
            suction_pressure_bara,
            upper_bound,
            0.0,
            0.0,
        )?;
        if !within_capacity(&result_max) {
            return Ok(upper_bound);
        }

        let mut minimum_speed = lower_bound;
        let mut result_min = self.calculate_compressor_train(
            stream_rates,
            suction_pressure_bara,
            minimum_speed,
            0.0,
            0.0,
        )?;
        if !within_capacity(&result_min) {
            minimum_speed = -maximize_x_where_valid(
                -upper_bound,
                -lower_bound,
                |negated| {
                    let result = self.calculate_compressor_train(
                        stream_rates,
                        suction_pressure_bara,
                        -negated,
                        0.0,
                        0.0,
                    )?;
                    Ok(result.stage_results.iter().all(|s| s.point_is_valid))
                },
                RATE_CALCULATION_TOLERANCE,
                INNER_ITERATION_CAP,
            );
            result_min = self.calculate_compressor_train(
                stream_rates,
                suction_pressure_bara,
                minimum_speed,
                0.0,
                0.0,
            )?;
        }

        if result_min.discharge_pressure_bara() <= target_discharge_pressure_bara
            && target_discharge_pressure_bara <= result_max.discharge_pressure_bara()
        {
            return try_find_root(lower_bound, upper_bound, |speed| {
                Ok(self
                    .calculate_compressor_train(
                        stream_rates,
                        suction_pressure_bara,
                        speed,
                        0.0,
                        0.0,
                    )?
                    .discharge_pressure_bara()
                    - target_discharge_pressure_bara)
            });
        }
        if target_discharge_pressure_bara > result_max.discharge_pressure_bara() {
            return Ok(upper_bound);
        }
        Ok(minimum_speed)
    }

    /// Fixed-speed evaluation with a pressure control.
    ///
    /// Chokes and the uniform ASV fraction operate on the multi-stream walk;
    /// the ASV-pressure and common-ASV strategies share the uniform-fraction
    /// subroutine here.
    fn evaluate_with_pressure_control(
        &mut self,
        control: PressureControl,
        stream_rates: &[f64],
        inlet_pressure_bara: f64,
        outlet_pressure_bara: f64,
        speed: f64,
    ) -> TrainResult<CompressorTrainResult> {
        match control {
            PressureControl::UpstreamChoke => {
                let free = self.calculate_compressor_train(
                    stream_rates,
                    inlet_pressure_bara,
                    speed,
                    0.0,
                    0.0,
                )?;
                if free.discharge_pressure_bara() < outlet_pressure_bara {
                    let mut result = free;
                    result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
                    return Ok(result);
                }
                let lower_bound =
                    STANDARD_PRESSURE_BARA + self.stages[0].pressure_drop_ahead_of_stage_bar;
                let choked_inlet = try_find_root(lower_bound, inlet_pressure_bara, |ps| {
                    Ok(self
                        .calculate_compressor_train(stream_rates, ps, speed, 0.0, 0.0)?
                        .discharge_pressure_bara()
                        - outlet_pressure_bara)
                })?;
                let mut result = self.calculate_compressor_train(
                    stream_rates,
                    choked_inlet,
                    speed,
                    0.0,
                    0.0,
                )?;
                if let Some(first) = result.stage_results.first_mut() {
                    first.inlet_pressure_before_choking_bara =
                        inlet_pressure_bara - self.stages[0].pressure_drop_ahead_of_stage_bar;
                }
                let original_inlet = self
                    .main_inlet_fluid()
                    .stream_at(inlet_pressure_bara, self.stages[0].inlet_temperature_kelvin)?;
                result.inlet_stream = StreamState::from_stream(&original_inlet);
                Ok(result)
            }
            PressureControl::DownstreamChoke => {
                let mut result = self.calculate_compressor_train(
                    stream_rates,
                    inlet_pressure_bara,
                    speed,
                    0.0,
                    0.0,
                )?;
                if result.discharge_pressure_bara() * (1.0 + PRESSURE_CALCULATION_TOLERANCE)
                    < outlet_pressure_bara
                {
                    result.failure_status = FailureStatus::TargetDischargePressureTooHigh;
                    return Ok(result);
                }
                if outlet_pressure_bara >= STANDARD_PRESSURE_BARA {
                    if let Some(last) = result.stage_results.last_mut() {
                        last.pressure_is_choked = true;
                        last.outlet_pressure_before_choking_bara = last.outlet_stream.pressure_bara;
                        last.outlet_stream.pressure_bara = outlet_pressure_bara;
                    }
                    result.outlet_stream.pressure_bara = outlet_pressure_bara;
                }
                Ok(result)
            }
            PressureControl::IndividualAsvRate
            | PressureControl::IndividualAsvPressure
            | PressureControl::CommonAsv => {
                let max_recirculation = self.calculate_compressor_train(
                    stream_rates,
                    inlet_pressure_bara,
                    speed,
                    1.0,
                    0.0,
                )?;
                if max_recirculation.discharge_pressure_bara() >= outlet_pressure_bara {
                    let mut result = max_recirculation;
                    result.failure_status = FailureStatus::TargetDischargePressureTooLow;
                    return Ok(result);
                }
                let fraction = try_find_root(0.0, 1.0, |f| {
                    Ok(self
                        .calculate_compressor_train(
                            stream_rates,
                            inlet_pressure_bara,
                            speed,
                            f,
                            0.0,
                        )?
                        .discharge_pressure_bara()
                        - outlet_pressure_bara)
                })?;
                self.calculate_compressor_train(
                    stream_rates,
                    inlet_pressure_bara,
                    speed,
                    fraction,
                    0.0,
                )
            }
        }
    }

    /// Forward walk through the stages with stream bookkeeping.
    fn calculate_compressor_train(
        &mut self,
        stream_rates: &[f64],
        suction_pressure_bara: f64,
        speed: f64,
        asv_rate_fraction: f64,
        asv_additional_mass_rate: f64,
    ) -> TrainResult<CompressorTrainResult> {
        self.calculate_compressor_train_with_outlet(
            stream_rates,
            suction_pressure_bara,
            speed,
            asv_rate_fraction,
            asv_additional_mass_rate,
        )
        .map(|(result, _)| result)
    }

    fn calculate_compressor_train_with_outlet(
        &mut self,
        stream_rates: &[f64],
        suction_pressure_bara: f64,
        speed: f64,
        asv_rate_fraction: f64,
        asv_additional_mass_rate: f64,
    ) -> TrainResult<(CompressorTrainResult, FluidStream)> {
        let mut current = self
            .main_inlet_fluid()
            .stream_at(suction_pressure_bara, self.stages[0].inlet_temperature_kelvin)?;
        let mut mass_rate_this_stage = current.standard_rate_to_mass_rate(stream_rates[0]);
        let train_inlet_state =
            StreamState::from_stream(&current.with_mass_rate(mass_rate_this_stage)?);

        let mut stage_results = Vec::with_capacity(self.stages.len());
        for stage_number in 0..self.stages.len() {
            // Draw outgoing streams before adding incoming ones.
            for &stream_number in &self.outlet_streams_per_stage[stage_number] {
                mass_rate_this_stage -=
                    current.standard_rate_to_mass_rate(stream_rates[stream_number]);
            }
            for &stream_number in &self.inlet_streams_per_stage[stage_number] {
                if stream_number == 0 {
                    continue;
                }
                let additional = self.streams[stream_number]
                    .fluid
                    .as_ref()
                    .ok_or(TrainError::InvalidConfig {
                        what: "inlet streams must carry a fluid definition",
                    })?
                    .stream_at(current.pressure_bara(), current.temperature_kelvin())?;
                let additional_mass_rate =
                    additional.standard_rate_to_mass_rate(stream_rates[stream_number]);
                if mass_rate_this_stage > 0.0 || additional_mass_rate > 0.0 {
                    current = additional.mix_with(
                        &current,
                        additional_mass_rate,
                        mass_rate_this_stage,
                        ProcessConditions::from_bara_kelvin(
                            current.pressure_bara(),
                            current.temperature_kelvin(),
                        )?,
                    )?;
                }
                mass_rate_this_stage += additional_mass_rate;
            }

            if mass_rate_this_stage <= EPSILON {
                match &self.recirculation_cache[stage_number] {
                    Some(cached) => {
                        warn!(
                            stage_number,
                            "no fluid entering the stage; recirculating the cached composition"
                        );
                        current = cached.flash_to(current.conditions(), false)?;
                        mass_rate_this_stage = 0.0;
                    }
                    None => {
                        return Err(TrainError::NoFluidToRecirculate {
                            stage_index: stage_number,
                        });
                    }
                }
            }

            let stage_result = self.stages[stage_number].evaluate(
                &current,
                speed,
                mass_rate_this_stage,
                asv_rate_fraction,
                asv_additional_mass_rate,
            )?;

            self.recirculation_cache[stage_number] = Some(current.clone());

            current = current
                .flash_to(
                    ProcessConditions::from_bara_kelvin(
                        stage_result.outlet_stream.pressure_bara,
                        stage_result.outlet_stream.temperature_kelvin,
                    )?,
                    false,
                )?
                .with_mass_rate(mass_rate_this_stage)?;
            stage_results.push(stage_result);
        }

        let outlet_state = StreamState::from_stream(&current);
        let result = CompressorTrainResult::new(
            stage_results,
            speed,
            train_inlet_state,
            outlet_state,
            FailureStatus::NoFailure,
        );
        Ok((result, current))
    }

    /// Split the train at the interstage-pressure stage and solve the two
    /// sub-trains; the common shaft runs at the larger of the two speeds and
    /// the non-governing sub-train is pulled onto its target by its
    /// configured pressure control.
    fn evaluate_with_intermediate_pressure(
        &mut self,
        stream_rates: &[f64],
        suction_pressure_bara: f64,
        intermediate_pressure_bara: f64,
        discharge_pressure_bara: f64,
    ) -> TrainResult<CompressorTrainResult> {
        let split_stage = self
            .stage_number_interstage_pressure
            .ok_or(TrainError::InvalidConfig {
                what: "intermediate pressure requires a configured interstage stage",
            })?;

        let (mut first_part, mut last_part) = self.split_at_stage(split_stage)?;
        let (rates_first, rates_last) = self.split_rates_at_stage(stream_rates, split_stage);

        let speed_first = first_part.find_speed_given_targets(
            &rates_first,
            suction_pressure_bara,
            intermediate_pressure_bara,
            self.minimum_speed,
            self.maximum_speed,
        )?;
        let (result_first_optimal, first_outlet) = first_part
            .calculate_compressor_train_with_outlet(
                &rates_first,
                suction_pressure_bara,
                speed_first,
                0.0,
                0.0,
            )?;

        // The last sub-train's inlet fluid is whatever leaves the first part.
        let outlet_fluid_model = FluidModel::new(
            first_outlet.composition().clone(),
            first_outlet.eos_model(),
        );
        last_part.streams[0].fluid = Some(FluidFactory::new(
            outlet_fluid_model,
            Arc::clone(self.main_inlet_fluid().backend()),
        )?);

        let speed_last = last_part.find_speed_given_targets(
            &rates_last,
            intermediate_pressure_bara,
            discharge_pressure_bara,
            self.minimum_speed,
            self.maximum_speed,
        )?;
        let result_last_optimal = last_part.calculate_compressor_train(
            &rates_last,
            intermediate_pressure_bara,
            speed_last,
            0.0,
            0.0,
        )?;

        // Both sub-trains share a shaft: the larger speed governs and the
        // other sub-train is pressure-controlled onto its target.
        let (speed, result_first, result_last) = if speed_first > speed_last {
            let controlled = last_part.evaluate_with_pressure_control(
                self.pressure_control_last_part
                    .unwrap_or(PressureControl::DownstreamChoke),
                &rates_last,
                intermediate_pressure_bara,
                discharge_pressure_bara,
                speed_first,
            )?;
            (speed_first, result_first_optimal, controlled)
        } else {
            let controlled = first_part.evaluate_with_pressure_control(
                self.pressure_control_first_part
                    .unwrap_or(PressureControl::DownstreamChoke),
                &rates_first,
                suction_pressure_bara,
                intermediate_pressure_bara,
                speed_last,
            )?;
            (speed_last, controlled, result_last_optimal)
        };

        // Sync recirculation state back from the sub-trains.
        for stage_number in 0..self.stages.len() {
            self.recirculation_cache[stage_number] = if stage_number < split_stage {
                first_part.recirculation_cache[stage_number].clone()
            } else {
                last_part.recirculation_cache[stage_number - split_stage].clone()
            };
        }

        let intermediate_status =
            compare_to_target(result_first.discharge_pressure_bara(), intermediate_pressure_bara);
        let discharge_status =
            compare_to_target(result_last.discharge_pressure_bara(), discharge_pressure_bara);

        let mut stage_results = result_first.stage_results;
        stage_results.extend(result_last.stage_results);

        let failure_status = if stage_results.iter().any(|s| s.rate_exceeds_maximum) {
            FailureStatus::AboveMaximumFlowRate
        } else {
            match (discharge_status, intermediate_status) {
                (TargetComparison::BelowTarget, _) => FailureStatus::TargetDischargePressureTooHigh,
                (TargetComparison::AboveTarget, _) => FailureStatus::TargetDischargePressureTooLow,
                (TargetComparison::Met, TargetComparison::BelowTarget) => {
                    FailureStatus::TargetSuctionPressureTooLow
                }
                (TargetComparison::Met, TargetComparison::AboveTarget) => {
                    FailureStatus::TargetSuctionPressureTooHigh
                }
                (TargetComparison::Met, TargetComparison::Met) => FailureStatus::NoFailure,
            }
        };

        Ok(CompressorTrainResult::new(
            stage_results,
            speed,
            result_first.inlet_stream,
            result_last.outlet_stream,
            failure_status,
        ))
    }

    /// Build the two sub-trains for an intermediate-pressure split.
    fn split_at_stage(
        &self,
        split_stage: usize,
    ) -> TrainResult<(MultiStreamCompressorTrain, MultiStreamCompressorTrain)> {
        let first_streams: Vec<TrainStream> = self
            .streams
            .iter()
            .filter(|s| s.connected_to_stage < split_stage)
            .cloned()
            .collect();

        // Stream 0 of the last part is a placeholder for whatever comes out
        // of the first part; its fluid is set at evaluation time.
        let mut last_streams = vec![TrainStream::inlet(self.main_inlet_fluid().clone(), 0)];
        last_streams.extend(
            self.streams
                .iter()
                .filter(|s| s.connected_to_stage >= split_stage)
                .map(|s| TrainStream {
                    fluid: s.fluid.clone(),
                    is_inlet: s.is_inlet,
                    connected_to_stage: s.connected_to_stage - split_stage,
                }),
        );

        let mut first_part = MultiStreamCompressorTrain::new(
            self.stages[..split_stage].to_vec(),
            first_streams,
            self.pressure_control_first_part,
            None,
            None,
            None,
            None,
            EnergyAdjustment::default(),
        )?;
        let mut last_part = MultiStreamCompressorTrain::new(
            self.stages[split_stage..].to_vec(),
            last_streams,
            self.pressure_control_last_part,
            None,
            None,
            None,
            None,
            EnergyAdjustment::default(),
        )?;

        for stage_number in 0..self.stages.len() {
            if stage_number < split_stage {
                first_part.recirculation_cache[stage_number] =
                    self.recirculation_cache[stage_number].clone();
            } else {
                last_part.recirculation_cache[stage_number - split_stage] =
                    self.recirculation_cache[stage_number].clone();
            }
        }

        Ok((first_part, last_part))
    }

    /// Split stream rates at a stage: the first part keeps the rates of
    /// streams ahead of the split; the last part starts from the rate carried
    /// into the split stage plus the rates at or after it.
    fn split_rates_at_stage(
        &self,
        stream_rates: &[f64],
        split_stage: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let rates_first: Vec<f64> = self
            .streams
            .iter()
            .enumerate()
            .filter(|(_, s)| s.connected_to_stage < split_stage)
            .map(|(i, _)| stream_rates[i])
            .collect();

        let carried_rate = self.rates_per_stage(stream_rates)[split_stage - 1];
        let mut rates_last = vec![carried_rate];
        rates_last.extend(
            self.streams
                .iter()
                .enumerate()
                .filter(|(_, s)| s.connected_to_stage >= split_stage)
                .map(|(i, _)| stream_rates[i]),
        );

        (rates_first, rates_last)
    }

    /// Largest rate for one ingoing stream keeping the train valid, all
    /// other stream rates fixed: exponential doubling above the last known
    /// valid rate, then bisection.
    pub fn get_max_rate_for_stream(
        &mut self,
        stream_to_maximize: usize,
        stream_rates_sm3_per_day: &[f64],
        suction_pressure_bara: f64,
        discharge_pressure_bara: f64,
        intermediate_pressure_bara: Option<f64>,
    ) -> TrainResult<f64> {
        if stream_to_maximize >= self.streams.len() {
            return Err(TrainError::InvalidInput {
                what: "stream index out of range",
            });
        }
        if !self.streams[stream_to_maximize].is_inlet {
            return Ok(0.0);
        }

        let base_rates = stream_rates_sm3_per_day.to_vec();
        let initial_rate = base_rates[stream_to_maximize];

        if !self.stream_rate_is_valid(
            &base_rates,
            stream_to_maximize,
            initial_rate,
            suction_pressure_bara,
            discharge_pressure_bara,
            intermediate_pressure_bara,
        )? {
            if !self.stream_rate_is_valid(
                &base_rates,
                stream_to_maximize,
                EPSILON,
                suction_pressure_bara,
                discharge_pressure_bara,
                intermediate_pressure_bara,
            )? {
                return Ok(0.0);
            }
            let max_rate = maximize_x_where_valid(
                EPSILON,
                initial_rate.max(EPSILON),
                |rate| {
                    self.stream_rate_is_valid(
                        &base_rates,
                        stream_to_maximize,
                        rate,
                        suction_pressure_bara,
                        discharge_pressure_bara,
                        intermediate_pressure_bara,
                    )
                },
                RATE_CALCULATION_TOLERANCE,
                INNER_ITERATION_CAP,
            );
            return Ok(max_rate * (1.0 - RATE_CALCULATION_TOLERANCE));
        }

        // Double until invalid, then bisect inside the last bracket.
        let mut known_valid = initial_rate.max(EPSILON);
        let mut iterations = 0;
        while self.stream_rate_is_valid(
            &base_rates,
            stream_to_maximize,
            known_valid * 2.0,
            suction_pressure_bara,
            discharge_pressure_bara,
            intermediate_pressure_bara,
        )? {
            known_valid *= 2.0;
            iterations += 1;
            if iterations > 40 {
                break;
            }
        }
        let max_rate = maximize_x_where_valid(
            known_valid,
            known_valid * 2.0,
            |rate| {
                self.stream_rate_is_valid(
                    &base_rates,
                    stream_to_maximize,
                    rate,
                    suction_pressure_bara,
                    discharge_pressure_bara,
                    intermediate_pressure_bara,
                )
            },
            RATE_CALCULATION_TOLERANCE,
            INNER_ITERATION_CAP,
        );
        Ok(max_rate * (1.0 - RATE_CALCULATION_TOLERANCE))
    }

    fn stream_rate_is_valid(
        &mut self,
        base_rates: &[f64],
        stream_index: usize,
        rate: f64,
        suction_pressure_bara: f64,
        discharge_pressure_bara: f64,
        intermediate_pressure_bara: Option<f64>,
    ) -> TrainResult<bool> {
        let mut rates = base_rates.to_vec();
        rates[stream_index] = rate;
        Ok(self
            .evaluate(
                &rates,
                suction_pressure_bara,
                discharge_pressure_bara,
                intermediate_pressure_bara,
            )?
            .is_valid())
    }
}
