//! Analysis parameters, deserialized from a TOML file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Result, TgfError};

fn default_baseline_year() -> i64 {
    2020
}

fn default_tolerance() -> f64 {
    0.05
}

/// Global settings shared by every disease, plus one block of settings per disease.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Parameters {
    pub start_year: i64,
    pub end_year: i64,
    /// Last year for which all scenarios are expected to agree
    #[serde(default = "default_baseline_year")]
    pub baseline_year: i64,
    #[serde(default)]
    pub historic_first_year: Option<i64>,
    #[serde(default)]
    pub years_for_funding: Vec<i64>,
    #[serde(rename = "constants", default)]
    pub constants: BTreeMap<String, f64>,
    #[serde(rename = "scenario", default)]
    pub scenarios: Vec<ScenarioDefinition>,
    #[serde(rename = "counterfactual", default)]
    pub counterfactuals: Vec<ScenarioDefinition>,
    #[serde(rename = "disease", default)]
    pub diseases: BTreeMap<String, DiseaseParameters>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Only meaningful for counterfactuals
    #[serde(default)]
    pub is_historic: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DiseaseParameters {
    #[serde(default)]
    pub portfolio_countries: BTreeSet<String>,
    #[serde(default)]
    pub modelled_countries: BTreeSet<String>,
    #[serde(default)]
    pub funding_fractions: Vec<f64>,
    #[serde(default = "default_tolerance")]
    pub tolerance_to_partner_and_pf_data: f64,
    #[serde(default)]
    pub partner_data_years: Vec<i64>,
    #[serde(default)]
    pub pf_data_years: Vec<i64>,
    /// Scenario whose model results define the Gp trajectory. All scenarios are summed if unset.
    #[serde(default)]
    pub gp_scenario: Option<String>,
    #[serde(rename = "indicator", default)]
    pub indicators: Vec<IndicatorDefinition>,
    /// Indicator name -> (year -> scaling factor)
    #[serde(rename = "innovation_scaling", default)]
    pub innovation_scaling: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndicatorDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub indicator_type: IndicatorType,
    #[serde(default)]
    pub use_scaling: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IndicatorType {
    Count,
    Rate,
    Fraction,
}

impl Parameters {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let parameters: Parameters = toml::from_str(contents)?;
        parameters.validate()?;
        debug!("parameters: {parameters:?}");
        Ok(parameters)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Reading parameters from {}", path.as_ref().display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Checks the semantic constraints that deserialization alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(TgfError::Parameters(format!(
                "START_YEAR ({}) is after END_YEAR ({})",
                self.start_year, self.end_year
            )));
        }
        check_unique(
            "scenario",
            self.scenarios
                .iter()
                .chain(self.counterfactuals.iter())
                .map(|s| s.name.as_str()),
        )?;
        for (name, disease) in &self.diseases {
            if disease.tolerance_to_partner_and_pf_data < 0.0 {
                return Err(TgfError::Parameters(format!(
                    "{name}: TOLERANCE_TO_PARTNER_AND_PF_DATA must not be negative"
                )));
            }
            if let Some(ff) = disease
                .funding_fractions
                .iter()
                .find(|ff| !(**ff > 0.0 && **ff <= 1.0))
            {
                return Err(TgfError::Parameters(format!(
                    "{name}: funding fraction {ff} is outside (0, 1]"
                )));
            }
            check_unique(
                &format!("{name} indicator"),
                disease.indicators.iter().map(|i| i.name.as_str()),
            )?;
        }
        Ok(())
    }

    pub fn disease(&self, name: &str) -> Result<&DiseaseParameters> {
        self.diseases
            .get(name)
            .ok_or_else(|| TgfError::UnknownDisease(name.to_string()))
    }

    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn counterfactual_names(&self) -> Vec<&str> {
        self.counterfactuals.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn historic_counterfactuals(&self) -> Vec<&str> {
        self.counterfactuals
            .iter()
            .filter(|s| s.is_historic)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// All years from `START_YEAR` to `END_YEAR` inclusive
    pub fn years(&self) -> Vec<i64> {
        (self.start_year..=self.end_year).collect()
    }

    pub fn constant(&self, name: &str) -> Option<f64> {
        self.constants.get(name).copied()
    }
}

impl DiseaseParameters {
    pub fn indicator(&self, name: &str) -> Option<&IndicatorDefinition> {
        self.indicators.iter().find(|i| i.name == name)
    }

    pub fn indicator_names(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn scaling_indicators(&self) -> Vec<&str> {
        self.indicators
            .iter()
            .filter(|i| i.use_scaling)
            .map(|i| i.name.as_str())
            .collect()
    }

    pub fn indicators_of_type(&self, indicator_type: IndicatorType) -> Vec<&str> {
        self.indicators
            .iter()
            .filter(|i| i.indicator_type == indicator_type)
            .map(|i| i.name.as_str())
            .collect()
    }

    pub fn innovation_scaling(&self, indicator: &str, year: i64) -> Option<f64> {
        self.innovation_scaling
            .get(indicator)
            .and_then(|by_year| by_year.get(&year.to_string()))
            .copied()
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(TgfError::Parameters(format!("duplicate {kind} name '{name}'")));
        }
    }
    Ok(())
}
