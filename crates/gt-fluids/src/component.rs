//! Gas components and their physical data.

use crate::error::{FluidError, FluidResult};
use serde::{Deserialize, Serialize};

/// Components supported by the fluid model.
///
/// The set covers the natural-gas range handled by the process engine, from
/// nitrogen and CO2 through the C1-C6 alkanes, plus water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Nitrogen,
    #[serde(rename = "CO2")]
    CarbonDioxide,
    Methane,
    Ethane,
    Propane,
    IsoButane,
    NormalButane,
    IsoPentane,
    NormalPentane,
    NormalHexane,
    Water,
}

/// Static physical data for a component.
///
/// Critical constants and acentric factor for the cubic equations of state,
/// and ideal-gas heat capacity polynomial coefficients
/// `cp = a + b*T + c*T^2 + d*T^3` [J/(mol K)] with T in kelvin.
#[derive(Debug, Clone, Copy)]
pub struct ComponentData {
    /// Molar mass [kg/mol]
    pub molar_mass: f64,
    /// Critical temperature [K]
    pub critical_temperature: f64,
    /// Critical pressure [Pa]
    pub critical_pressure: f64,
    /// Acentric factor [-]
    pub acentric_factor: f64,
    /// Ideal-gas cp polynomial coefficients [J/(mol K)]
    pub cp_coefficients: [f64; 4],
}

impl Component {
    pub const ALL: [Component; 11] = [
        Component::Nitrogen,
        Component::CarbonDioxide,
        Component::Methane,
        Component::Ethane,
        Component::Propane,
        Component::IsoButane,
        Component::NormalButane,
        Component::IsoPentane,
        Component::NormalPentane,
        Component::NormalHexane,
        Component::Water,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Component::Nitrogen => "nitrogen",
            Component::CarbonDioxide => "CO2",
            Component::Methane => "methane",
            Component::Ethane => "ethane",
            Component::Propane => "propane",
            Component::IsoButane => "i_butane",
            Component::NormalButane => "n_butane",
            Component::IsoPentane => "i_pentane",
            Component::NormalPentane => "n_pentane",
            Component::NormalHexane => "n_hexane",
            Component::Water => "water",
        }
    }

    pub fn from_name(name: &str) -> FluidResult<Component> {
        let component = match name {
            "nitrogen" => Component::Nitrogen,
            "CO2" | "co2" | "carbon_dioxide" => Component::CarbonDioxide,
            "methane" => Component::Methane,
            "ethane" => Component::Ethane,
            "propane" => Component::Propane,
            "i_butane" | "isobutane" => Component::IsoButane,
            "n_butane" | "butane" => Component::NormalButane,
            "i_pentane" | "isopentane" => Component::IsoPentane,
            "n_pentane" | "pentane" => Component::NormalPentane,
            "n_hexane" | "hexane" => Component::NormalHexane,
            "water" => Component::Water,
            _ => {
                return Err(FluidError::UnknownComponent {
                    name: name.to_string(),
                });
            }
        };
        Ok(component)
    }

    /// Molar mass [kg/mol].
    pub fn molar_mass(&self) -> f64 {
        self.data().molar_mass
    }

    pub fn data(&self) -> &'static ComponentData {
        match self {
            Component::Nitrogen => &ComponentData {
                molar_mass: 0.028_013_4,
                critical_temperature: 126.20,
                critical_pressure: 33.98e5,
                acentric_factor: 0.037,
                cp_coefficients: [28.90, -0.157_1e-2, 0.808_1e-5, -2.873e-9],
            },
            Component::CarbonDioxide => &ComponentData {
                molar_mass: 0.044_009_5,
                critical_temperature: 304.13,
                critical_pressure: 73.77e5,
                acentric_factor: 0.223_6,
                cp_coefficients: [22.26, 5.981e-2, -3.501e-5, 7.469e-9],
            },
            Component::Methane => &ComponentData {
                molar_mass: 0.016_042_5,
                critical_temperature: 190.56,
                critical_pressure: 45.99e5,
                acentric_factor: 0.011_5,
                cp_coefficients: [19.89, 5.024e-2, 1.269e-5, -11.01e-9],
            },
            Component::Ethane => &ComponentData {
                molar_mass: 0.030_069_0,
                critical_temperature: 305.32,
                critical_pressure: 48.72e5,
                acentric_factor: 0.099_5,
                cp_coefficients: [6.900, 17.27e-2, -6.406e-5, 7.285e-9],
            },
            Component::Propane => &ComponentData {
                molar_mass: 0.044_095_6,
                critical_temperature: 369.83,
                critical_pressure: 42.48e5,
                acentric_factor: 0.152_3,
                cp_coefficients: [-4.04, 30.48e-2, -15.72e-5, 31.74e-9],
            },
            Component::IsoButane => &ComponentData {
                molar_mass: 0.058_122_2,
                critical_temperature: 408.14,
                critical_pressure: 36.48e5,
                acentric_factor: 0.177_0,
                cp_coefficients: [-7.913, 41.60e-2, -23.01e-5, 49.91e-9],
            },
            Component::NormalButane => &ComponentData {
                molar_mass: 0.058_122_2,
                critical_temperature: 425.12,
                critical_pressure: 37.96e5,
                acentric_factor: 0.200_2,
                cp_coefficients: [3.96, 37.15e-2, -18.34e-5, 35.00e-9],
            },
            Component::IsoPentane => &ComponentData {
                molar_mass: 0.072_148_8,
                critical_temperature: 460.43,
                critical_pressure: 33.81e5,
                acentric_factor: 0.227_5,
                cp_coefficients: [-9.525, 50.66e-2, -27.29e-5, 57.69e-9],
            },
            Component::NormalPentane => &ComponentData {
                molar_mass: 0.072_148_8,
                critical_temperature: 469.70,
                critical_pressure: 33.70e5,
                acentric_factor: 0.251_5,
                cp_coefficients: [6.774, 45.43e-2, -22.46e-5, 42.29e-9],
            },
            Component::NormalHexane => &ComponentData {
                molar_mass: 0.086_175_4,
                critical_temperature: 507.60,
                critical_pressure: 30.25e5,
                acentric_factor: 0.301_3,
                cp_coefficients: [6.938, 55.22e-2, -28.65e-5, 57.69e-9],
            },
            Component::Water => &ComponentData {
                molar_mass: 0.018_015_3,
                critical_temperature: 647.10,
                critical_pressure: 220.64e5,
                acentric_factor: 0.344_9,
                cp_coefficients: [32.24, 0.192_3e-2, 1.055e-5, -3.595e-9],
            },
        }
    }
}
