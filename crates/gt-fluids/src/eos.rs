//! Equation-of-state model selection.

use serde::{Deserialize, Serialize};

/// Which equation of state the thermodynamic backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EoSModel {
    #[serde(rename = "SRK")]
    Srk,
    #[serde(rename = "PR")]
    Pr,
    #[serde(rename = "GERG_SRK")]
    GergSrk,
    #[serde(rename = "GERG_PR")]
    GergPr,
}

/// The two cubic forms the native backend implements.
///
/// The GERG variants keep their identity in configuration and results but
/// dispatch to the corresponding cubic parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubicForm {
    Srk,
    Pr,
}

impl EoSModel {
    pub fn cubic_form(&self) -> CubicForm {
        match self {
            EoSModel::Srk | EoSModel::GergSrk => CubicForm::Srk,
            EoSModel::Pr | EoSModel::GergPr => CubicForm::Pr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gerg_variants_dispatch_to_cubic_forms() {
        assert_eq!(EoSModel::Srk.cubic_form(), CubicForm::Srk);
        assert_eq!(EoSModel::GergSrk.cubic_form(), CubicForm::Srk);
        assert_eq!(EoSModel::Pr.cubic_form(), CubicForm::Pr);
        assert_eq!(EoSModel::GergPr.cubic_form(), CubicForm::Pr);
    }
}
