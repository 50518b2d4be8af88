//! Fluid composition (normalized mole fractions over named components).

use crate::component::Component;
use crate::error::{FluidError, FluidResult};
use gt_core::numeric::{Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};

/// Fluid composition defined by normalized mole fractions.
///
/// The composition is always normalized (mole fractions sum to 1.0) and
/// immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidComposition {
    /// Components and their mole fractions (always normalized to sum=1).
    items: Vec<(Component, f64)>,
}

impl FluidComposition {
    /// Create a pure-component composition.
    pub fn pure(component: Component) -> Self {
        Self {
            items: vec![(component, 1.0)],
        }
    }

    /// Create a composition from mole fractions.
    ///
    /// Validates that all fractions are finite, non-negative, and have a
    /// positive sum, then normalizes to sum=1.
    pub fn new_mole_fractions(fractions: Vec<(Component, f64)>) -> FluidResult<Self> {
        if fractions.is_empty() {
            return Err(FluidError::InvalidArg {
                what: "empty composition",
            });
        }

        let mut sum = 0.0;
        for (_, frac) in &fractions {
            if !frac.is_finite() {
                return Err(FluidError::NonPhysical {
                    what: "non-finite mole fraction",
                });
            }
            if *frac < 0.0 {
                return Err(FluidError::NonPhysical {
                    what: "negative mole fraction",
                });
            }
            sum += frac;
        }

        if sum <= 0.0 || !sum.is_finite() {
            return Err(FluidError::NonPhysical {
                what: "mole fractions sum to zero or non-finite",
            });
        }

        // Merge duplicate entries, normalize, and drop negligible components.
        let mut merged: Vec<(Component, f64)> = Vec::new();
        for component in Component::ALL {
            let fraction: f64 = fractions
                .iter()
                .filter(|(c, _)| *c == component)
                .map(|(_, f)| f / sum)
                .sum();
            if fraction > 1e-15 {
                merged.push((component, fraction));
            }
        }

        if merged.is_empty() {
            return Err(FluidError::NonPhysical {
                what: "all mole fractions negligible",
            });
        }

        Ok(Self { items: merged })
    }

    /// Create a composition from component names and mole fractions.
    pub fn from_names(fractions: &[(&str, f64)]) -> FluidResult<Self> {
        let mut resolved = Vec::with_capacity(fractions.len());
        for (name, frac) in fractions {
            resolved.push((Component::from_name(name)?, *frac));
        }
        Self::new_mole_fractions(resolved)
    }

    /// Get mole fraction of a component (0.0 if not present).
    pub fn mole_fraction(&self, component: Component) -> f64 {
        self.items
            .iter()
            .find(|(c, _)| *c == component)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }

    /// Iterate over all components with non-zero mole fractions.
    pub fn iter(&self) -> impl Iterator<Item = (Component, f64)> + '_ {
        self.items.iter().copied()
    }

    /// Compute mixture molar mass [kg/mol] from component mole fractions.
    pub fn molar_mass(&self) -> f64 {
        self.items
            .iter()
            .map(|(component, mole_frac)| component.molar_mass() * mole_frac)
            .sum()
    }

    /// Mix with another composition, weighting by molar amounts.
    ///
    /// `self_moles` and `other_moles` are relative molar amounts (any common
    /// unit). When one amount is zero the other composition is returned
    /// unchanged.
    pub fn mix(&self, other: &FluidComposition, self_moles: f64, other_moles: f64) -> FluidResult<Self> {
        if self_moles < 0.0 || other_moles < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "negative molar amount in mixing",
            });
        }
        if self_moles == 0.0 && other_moles == 0.0 {
            return Err(FluidError::InvalidArg {
                what: "mixing two zero-amount compositions",
            });
        }
        if self_moles == 0.0 {
            return Ok(other.clone());
        }
        if other_moles == 0.0 {
            return Ok(self.clone());
        }

        let mut mixed = Vec::new();
        for component in Component::ALL {
            let amount =
                self.mole_fraction(component) * self_moles + other.mole_fraction(component) * other_moles;
            if amount > 0.0 {
                mixed.push((component, amount));
            }
        }
        Self::new_mole_fractions(mixed)
    }

    /// Check whether the composition sums to 1 within tolerance.
    pub fn is_normalized(&self) -> bool {
        let sum: f64 = self.items.iter().map(|(_, f)| f).sum();
        nearly_equal(
            sum,
            1.0,
            Tolerances {
                abs: 1e-9,
                rel: 1e-9,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_composition() {
        let comp = FluidComposition::pure(Component::Methane);
        assert_eq!(comp.mole_fraction(Component::Methane), 1.0);
        assert_eq!(comp.mole_fraction(Component::Ethane), 0.0);
        assert!(comp.is_normalized());
    }

    #[test]
    fn mixture_normalization_non_unit_sum() {
        let comp = FluidComposition::new_mole_fractions(vec![
            (Component::Methane, 2.0),
            (Component::Ethane, 8.0),
        ])
        .unwrap();

        assert!((comp.mole_fraction(Component::Methane) - 0.2).abs() < 1e-12);
        assert!((comp.mole_fraction(Component::Ethane) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn from_names_resolves_aliases() {
        let comp = FluidComposition::from_names(&[("methane", 0.9), ("co2", 0.1)]).unwrap();
        assert!((comp.mole_fraction(Component::CarbonDioxide) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn invalid_fractions_rejected() {
        assert!(FluidComposition::new_mole_fractions(vec![(Component::Methane, -0.5)]).is_err());
        assert!(FluidComposition::new_mole_fractions(vec![(Component::Methane, f64::NAN)]).is_err());
        assert!(FluidComposition::new_mole_fractions(vec![]).is_err());
        assert!(
            FluidComposition::new_mole_fractions(vec![
                (Component::Methane, 0.0),
                (Component::Ethane, 0.0),
            ])
            .is_err()
        );
    }

    #[test]
    fn molar_mass_of_mixture() {
        let comp = FluidComposition::new_mole_fractions(vec![
            (Component::Methane, 0.5),
            (Component::Ethane, 0.5),
        ])
        .unwrap();
        let expected = 0.5 * 0.016_042_5 + 0.5 * 0.030_069_0;
        assert!((comp.molar_mass() - expected).abs() < 1e-9);
    }

    #[test]
    fn mixing_is_mole_weighted() {
        let a = FluidComposition::pure(Component::Methane);
        let b = FluidComposition::pure(Component::Ethane);
        let mixed = a.mix(&b, 3.0, 1.0).unwrap();
        assert!((mixed.mole_fraction(Component::Methane) - 0.75).abs() < 1e-12);
        assert!((mixed.mole_fraction(Component::Ethane) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn mixing_with_zero_amount_returns_other() {
        let a = FluidComposition::pure(Component::Methane);
        let b = FluidComposition::pure(Component::Ethane);
        assert_eq!(a.mix(&b, 0.0, 1.0).unwrap(), b);
        assert_eq!(a.mix(&b, 1.0, 0.0).unwrap(), a);
        assert!(a.mix(&b, 0.0, 0.0).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalized_sum_is_one(fracs in prop::collection::vec(0.0_f64..1.0_f64, 1..6)) {
            let input: Vec<(Component, f64)> = fracs
                .iter()
                .enumerate()
                .map(|(i, &f)| (Component::ALL[i % Component::ALL.len()], f))
                .collect();

            if let Ok(comp) = FluidComposition::new_mole_fractions(input) {
                let sum: f64 = comp.iter().map(|(_, f)| f).sum();
                prop_assert!((sum - 1.0).abs() < 1e-9);
            }
        }
    }
}
