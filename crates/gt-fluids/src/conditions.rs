//! Process conditions: a validated (pressure, temperature) pair.

use crate::error::{FluidError, FluidResult};
use gt_core::units::constants::{STANDARD_PRESSURE_BARA, STANDARD_TEMPERATURE_KELVIN};
use gt_core::units::{Pressure, Temperature, bara, kelvin};

/// A pressure/temperature operating point.
///
/// Pressure and temperature are both strictly positive. The designated
/// standard conditions (1.01325 bara, 288.15 K) anchor all standard-rate to
/// mass-rate conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessConditions {
    pressure: Pressure,
    temperature: Temperature,
}

impl ProcessConditions {
    pub fn new(pressure: Pressure, temperature: Temperature) -> FluidResult<Self> {
        if !pressure.value.is_finite() || pressure.value <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "pressure must be positive and finite",
            });
        }
        if !temperature.value.is_finite() || temperature.value <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "temperature must be positive and finite",
            });
        }
        Ok(Self {
            pressure,
            temperature,
        })
    }

    /// Create from pressure in bara and temperature in kelvin.
    pub fn from_bara_kelvin(pressure_bara: f64, temperature_kelvin: f64) -> FluidResult<Self> {
        Self::new(bara(pressure_bara), kelvin(temperature_kelvin))
    }

    /// The standard reference conditions (1 atm, 15 degC).
    pub fn standard_conditions() -> Self {
        Self {
            pressure: bara(STANDARD_PRESSURE_BARA),
            temperature: kelvin(STANDARD_TEMPERATURE_KELVIN),
        }
    }

    pub fn pressure(&self) -> Pressure {
        self.pressure
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    /// Pressure in bara.
    pub fn pressure_bara(&self) -> f64 {
        use uom::si::pressure::bar;
        self.pressure.get::<bar>()
    }

    /// Temperature in kelvin.
    pub fn temperature_kelvin(&self) -> f64 {
        use uom::si::thermodynamic_temperature::kelvin;
        self.temperature.get::<kelvin>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_valid_conditions() {
        let conditions = ProcessConditions::from_bara_kelvin(30.0, 300.0).unwrap();
        assert!((conditions.pressure_bara() - 30.0).abs() < 1e-9);
        assert!((conditions.temperature_kelvin() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn reject_non_positive() {
        assert!(ProcessConditions::from_bara_kelvin(-1.0, 300.0).is_err());
        assert!(ProcessConditions::from_bara_kelvin(30.0, 0.0).is_err());
        assert!(ProcessConditions::from_bara_kelvin(f64::NAN, 300.0).is_err());
    }

    #[test]
    fn standard_conditions_values() {
        let std = ProcessConditions::standard_conditions();
        assert!((std.pressure_bara() - 1.01325).abs() < 1e-9);
        assert!((std.temperature_kelvin() - 288.15).abs() < 1e-9);
    }
}
