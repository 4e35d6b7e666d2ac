//! Shared fixtures: a small but complete database for one disease with two countries, two
//! funding scenarios at two funding fractions, and one counterfactual.

use polars::prelude::*;

use crate::config::Parameters;
use crate::data::{Gp, ModelResults, PFInputData, PartnerData};
use crate::database::Database;
use crate::error::DataFormatError;
use crate::COL;

pub const DISEASE: &str = "diseaseX";

pub const PARAMETERS: &str = r#"
START_YEAR = 2019
END_YEAR = 2022
BASELINE_YEAR = 2020
YEARS_FOR_FUNDING = [2021, 2022]

[[scenario]]
name = "default"
description = "Default coverage"

[[scenario]]
name = "alternative"
description = "Alternative coverage"

[[counterfactual]]
name = "null"
description = "No programme"
is_historic = true

[disease.diseaseX]
MODELLED_COUNTRIES = ["A", "B"]
PORTFOLIO_COUNTRIES = ["A", "B"]
FUNDING_FRACTIONS = [0.8, 1.0]
TOLERANCE_TO_PARTNER_AND_PF_DATA = 0.05
PARTNER_DATA_YEARS = [2019, 2020]
PF_DATA_YEARS = [2021]

[[disease.diseaseX.indicator]]
name = "cases"
description = "Number of cases"
type = "count"
use_scaling = true

[[disease.diseaseX.indicator]]
name = "deaths"
description = "Number of deaths"
type = "count"
use_scaling = true

[[disease.diseaseX.indicator]]
name = "coverage"
description = "Treatment coverage"
type = "fraction"
use_scaling = false
"#;

pub const COUNTRIES: [&str; 2] = ["A", "B"];
pub const INDICATORS: [&str; 3] = ["cases", "deaths", "coverage"];
pub const YEARS: [i64; 4] = [2019, 2020, 2021, 2022];
pub const SCENARIOS: [(&str, &[f64]); 3] = [
    ("default", &[0.8, 1.0]),
    ("alternative", &[0.8, 1.0]),
    ("null", &[1.0]),
];

pub fn parameters() -> Parameters {
    Parameters::from_toml_str(PARAMETERS).expect("fixture parameters are valid")
}

pub fn base_value(country: &str, indicator: &str) -> f64 {
    match (country, indicator) {
        (_, "coverage") => 0.5,
        ("A", "cases") => 100.0,
        ("A", "deaths") => 10.0,
        ("B", "cases") => 200.0,
        _ => 20.0,
    }
}

/// Identical across scenarios up to the baseline year, diverging afterwards.
pub fn model_value(scenario: &str, ff: f64, country: &str, year: i64, indicator: &str) -> f64 {
    let base = base_value(country, indicator);
    if year <= 2020 {
        return base;
    }
    match scenario {
        "null" => base * 1.5,
        "alternative" => base * (1.0 - 0.02 * ff) * 0.99,
        _ => base * (1.0 - 0.02 * ff),
    }
}

/// Model results with central values produced by `central`.
pub fn model_df_with<F>(central: F) -> PolarsResult<DataFrame>
where
    F: Fn(&str, f64, &str, i64, &str) -> f64,
{
    let mut scenarios: Vec<&str> = vec![];
    let mut ffs: Vec<f64> = vec![];
    let mut countries: Vec<&str> = vec![];
    let mut years: Vec<i64> = vec![];
    let mut indicators: Vec<&str> = vec![];
    let mut lows: Vec<f64> = vec![];
    let mut centrals: Vec<f64> = vec![];
    let mut highs: Vec<f64> = vec![];
    for (scenario, scenario_ffs) in SCENARIOS {
        for ff in scenario_ffs {
            for country in COUNTRIES {
                for year in YEARS {
                    for indicator in INDICATORS {
                        let value = central(scenario, *ff, country, year, indicator);
                        scenarios.push(scenario);
                        ffs.push(*ff);
                        countries.push(country);
                        years.push(year);
                        indicators.push(indicator);
                        lows.push(value * 0.9);
                        centrals.push(value);
                        highs.push(value * 1.1);
                    }
                }
            }
        }
    }
    df!(
        COL::SCENARIO_DESCRIPTOR => scenarios,
        COL::FUNDING_FRACTION => ffs,
        COL::COUNTRY => countries,
        COL::YEAR => years,
        COL::INDICATOR => indicators,
        COL::LOW => lows,
        COL::CENTRAL => centrals,
        COL::HIGH => highs
    )
}

pub fn model_df() -> PolarsResult<DataFrame> {
    model_df_with(model_value)
}

pub fn model_results() -> anyhow::Result<ModelResults> {
    Ok(ModelResults::from_df(DISEASE, model_df()?, "model_results")?)
}

/// One raw partner track: base values for the partner data years.
pub fn partner_track() -> PolarsResult<DataFrame> {
    let mut countries: Vec<&str> = vec![];
    let mut years: Vec<i64> = vec![];
    let mut indicators: Vec<&str> = vec![];
    let mut centrals: Vec<f64> = vec![];
    for country in COUNTRIES {
        for year in [2019i64, 2020] {
            for indicator in INDICATORS {
                countries.push(country);
                years.push(year);
                indicators.push(indicator);
                centrals.push(base_value(country, indicator));
            }
        }
    }
    df!(
        COL::COUNTRY => countries,
        COL::YEAR => years,
        COL::INDICATOR => indicators,
        COL::CENTRAL => centrals
    )
}

pub fn partner_data_from(track: DataFrame) -> Result<PartnerData, DataFormatError> {
    PartnerData::from_tracks(
        DISEASE,
        vec![
            ("default".to_string(), track.clone()),
            ("alternative".to_string(), track),
        ],
        "partner_data",
    )
}

pub fn partner_data() -> anyhow::Result<PartnerData> {
    Ok(partner_data_from(partner_track()?)?)
}

/// Programme targets for 2021, matching the default scenario at full funding.
pub fn pf_input_df() -> PolarsResult<DataFrame> {
    let mut scenarios: Vec<&str> = vec![];
    let mut countries: Vec<&str> = vec![];
    let mut years: Vec<i64> = vec![];
    let mut indicators: Vec<&str> = vec![];
    let mut centrals: Vec<f64> = vec![];
    for scenario in ["default", "alternative"] {
        for country in COUNTRIES {
            for indicator in INDICATORS {
                scenarios.push(scenario);
                countries.push(country);
                years.push(2021);
                indicators.push(indicator);
                centrals.push(model_value("default", 1.0, country, 2021, indicator));
            }
        }
    }
    df!(
        COL::SCENARIO_DESCRIPTOR => scenarios,
        COL::COUNTRY => countries,
        COL::YEAR => years,
        COL::INDICATOR => indicators,
        COL::CENTRAL => centrals
    )
}

pub fn pf_input_data() -> anyhow::Result<PFInputData> {
    Ok(PFInputData::from_df(DISEASE, pf_input_df()?, "pf_input_data")?)
}

pub fn database_with(
    model_results: ModelResults,
    partner_data: PartnerData,
    parameters: Parameters,
) -> anyhow::Result<Database> {
    let gp = Gp::derive(&model_results, Some(&partner_data), &parameters)?;
    Ok(Database::new(
        model_results,
        partner_data,
        pf_input_data()?,
        Some(gp),
        parameters,
    )?)
}

pub fn database() -> anyhow::Result<Database> {
    database_with(model_results()?, partner_data()?, parameters())
}
