// gt-core/src/units.rs

use uom::si::f64::{
    MassDensity as UomMassDensity, Power as UomPower, Pressure as UomPressure, Ratio as UomRatio,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};

// Public canonical unit types (SI, f64)
pub type Density = UomMassDensity;
pub type Power = UomPower;
pub type Pressure = UomPressure;
pub type Ratio = UomRatio;
pub type Temperature = UomThermodynamicTemperature;

/// Specific enthalpy [J/kg].
///
/// Not part of uom's standard set, so we use f64 with clear documentation.
pub type SpecEnthalpy = f64;

/// Polytropic head [J/kg].
pub type PolytropicHead = f64;

/// Mass rate [kg/h]. Charts and trains work in kg/h throughout, which uom's
/// SI mass-rate unit set does not model cleanly.
pub type MassRateKgPerHour = f64;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bara(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn kelvin(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kg_per_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn megawatt(v: f64) -> Power {
    use uom::si::power::megawatt;
    Power::new::<megawatt>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

pub mod constants {
    /// Standard reference pressure [bara] (1 atm).
    pub const STANDARD_PRESSURE_BARA: f64 = 1.01325;

    /// Standard reference temperature [K] (15 degC).
    pub const STANDARD_TEMPERATURE_KELVIN: f64 = 288.15;

    /// Universal gas constant [J/(mol K)].
    pub const GAS_CONSTANT: f64 = 8.314_472;

    pub const SECONDS_PER_HOUR: f64 = 3600.0;
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    pub const HOURS_PER_DAY: f64 = 24.0;

    /// Pascals per bar.
    pub const PA_PER_BAR: f64 = 1.0e5;

    /// Universal small mass-rate / speed guard.
    pub const EPSILON: f64 = 1e-5;

    /// Relative tolerance for meeting a pressure target [bar, relative].
    pub const PRESSURE_CALCULATION_TOLERANCE: f64 = 1e-3;

    /// Relative tolerance shaved off reported maximum rates.
    pub const RATE_CALCULATION_TOLERANCE: f64 = 1e-3;

    /// Relative tolerance on maximum-power comparisons.
    pub const POWER_CALCULATION_TOLERANCE: f64 = 1e-3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _p = pa(101_325.0);
        let _t = kelvin(300.0);
        let _rho = kg_per_m3(50.0);
        let _w = megawatt(5.0);
        let _r = unitless(0.5);
    }

    #[test]
    fn bara_matches_pascal() {
        let p = bara(1.0);
        assert!((p.value - 1.0e5).abs() < 1e-9);
        assert!((bara(constants::STANDARD_PRESSURE_BARA).value - 101_325.0).abs() < 1e-6);
    }
}
