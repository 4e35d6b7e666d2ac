//! The standard battery of consistency checks applied to every disease.

use std::collections::{BTreeMap, BTreeSet};

use itertools::{iproduct, izip, Itertools};
use log::debug;
use polars::prelude::*;

use crate::checks::{CheckRegistry, CheckResult, DatabaseChecks, Figure, FigureSeries, Severity};
use crate::config::{IndicatorType, Parameters};
use crate::data::TableData;
use crate::database::Database;
use crate::error::Result;
use crate::selection::{Selection, YearRange};
use crate::table::{FundingFraction, RowKey};
use crate::COL;

/// `|a - b| <= rtol * |b|`, with `b` as the reference magnitude.
fn within_tolerance(a: f64, b: f64, rtol: f64) -> bool {
    (a - b).abs() <= rtol * b.abs()
}

fn join_values<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values.into_iter().map(|v| v.to_string()).join(", ")
}

/// Checks with expectations fixed from the parameters at construction.
#[derive(Debug, Clone)]
pub struct CommonChecks {
    disease_name: String,
    expected_countries: BTreeSet<String>,
    baseline_year: i64,
    tolerance: f64,
}

impl CommonChecks {
    pub fn new(parameters: &Parameters, disease_name: &str) -> Result<Self> {
        let disease = parameters.disease(disease_name)?;
        Ok(Self {
            disease_name: disease_name.to_string(),
            expected_countries: disease.modelled_countries.clone(),
            baseline_year: parameters.baseline_year,
            tolerance: disease.tolerance_to_partner_and_pf_data,
        })
    }

    pub fn with_expected_countries(mut self, countries: BTreeSet<String>) -> Self {
        self.expected_countries = countries;
        self
    }

    fn no_negatives(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let failures = db
            .model_results()
            .table()
            .rows()
            .filter(|(_, datum)| datum.present().any(|(_, v)| v < 0.0))
            .map(|(key, _)| key.to_string())
            .collect();
        Ok(CheckResult::from_failures(failures))
    }

    fn all_expected_countries_in_model_results(
        &self,
        db: &Database,
    ) -> anyhow::Result<CheckResult> {
        let actual = db.model_results().countries();
        if *actual == self.expected_countries {
            return Ok(CheckResult::pass());
        }
        let missing = self.expected_countries.difference(actual);
        let extra = actual.difference(&self.expected_countries);
        Ok(CheckResult::fail(format!(
            "Some missing/extra countries in the Model Results. Missing: [{}]. Extra: [{}].",
            join_values(missing),
            join_values(extra)
        )))
    }

    /// Builds, per (country, indicator), a year-indexed table with one column per funding
    /// scenario and funding fraction, restricted to years up to the baseline, and requires every
    /// column to be identical.
    fn all_scenarios_have_same_beginning(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let model_results = db.model_results();
        let table = model_results.table();
        let scenarios = model_results.scenario_descriptors(db.parameters());
        let mut failures = vec![];
        for (indicator, country) in iproduct!(model_results.indicators(), model_results.countries())
        {
            let selection = Selection::new()
                .country(country.clone())
                .indicator(indicator.clone())
                .years(YearRange::Before(self.baseline_year));
            let mut columns: BTreeMap<(String, FundingFraction), BTreeMap<i64, f64>> =
                BTreeMap::new();
            for (key, datum) in table.select(&selection) {
                let (Some(scenario), Some(ff), Some(central)) =
                    (&key.scenario_descriptor, key.funding_fraction, datum.central)
                else {
                    continue;
                };
                if scenarios.contains(&scenario.as_str()) {
                    columns
                        .entry((scenario.clone(), ff))
                        .or_default()
                        .insert(key.year, central);
                }
            }
            let years: BTreeSet<i64> = columns.values().flat_map(|c| c.keys().copied()).collect();
            let mut series = vec![Series::new(COL::YEAR, years.iter().copied().collect::<Vec<_>>())];
            for ((scenario, ff), values) in &columns {
                let aligned: Vec<Option<f64>> = years.iter().map(|y| values.get(y).copied()).collect();
                series.push(Series::new(&format!("{scenario}@{ff}"), aligned));
            }
            let combined = DataFrame::new(series)?;
            let value_columns = &combined.get_columns()[1..];
            let consistent = value_columns
                .iter()
                .tuple_windows()
                .all(|(a, b)| a.equals_missing(b));
            if !consistent {
                debug!("Scenarios diverge before {}: {combined}", self.baseline_year);
                failures.push(format!(
                    "Some scenarios are different: country='{country}', indicator='{indicator}'"
                ));
            }
        }
        Ok(CheckResult::from_failures(failures))
    }

    /// Compares model central values with partner central values for every combination that
    /// has partner data, dropping years where either side is missing.
    fn all_scenarios_match_partner_data_within_a_tolerance(
        &self,
        db: &Database,
    ) -> anyhow::Result<CheckResult> {
        let model_results = db.model_results();
        let partner_data = db.partner_data();
        let by_scenario = model_results.table().funding_fractions_by_scenario();
        let mut failures = vec![];
        for country in model_results.countries() {
            for scenario in partner_data.get_scenarios() {
                let Some(ffs) = by_scenario.get(scenario) else {
                    continue;
                };
                for (ff, indicator) in iproduct!(ffs, partner_data.indicators()) {
                    if !model_results.indicators().contains(indicator) {
                        continue;
                    }
                    let df = db.get_country(country, scenario, ff.0, indicator)?;
                    let mut compared = 0;
                    let mut matches = true;
                    for (model, partner) in izip!(
                        df.column(COL::MODEL_CENTRAL)?.f64()?,
                        df.column(COL::PARTNER_CENTRAL)?.f64()?
                    ) {
                        if let (Some(model), Some(partner)) = (model, partner) {
                            if model.is_nan() || partner.is_nan() {
                                continue;
                            }
                            compared += 1;
                            matches &= within_tolerance(model, partner, self.tolerance);
                        }
                    }
                    if compared > 0 && !matches {
                        failures.push(format!(
                            "Some calibration mismatch for: country='{country}', scenario_descriptor='{scenario}', funding_fraction={ff}, indicator='{indicator}'"
                        ));
                    }
                }
            }
        }
        Ok(CheckResult::from_failures(failures))
    }

    fn correct_bounds_order(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let failures = db
            .model_results()
            .table()
            .rows()
            .filter(|(_, d)| match (d.low, d.central, d.high) {
                (Some(low), Some(central), Some(high)) => !(low <= central && central <= high),
                _ => false,
            })
            .map(|(key, _)| key.to_string())
            .collect();
        Ok(CheckResult::from_failures(failures))
    }

    fn proportions_between_zero_and_one(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let fractions = db.disease().indicators_of_type(IndicatorType::Fraction);
        let failures = db
            .model_results()
            .table()
            .rows()
            .filter(|(key, _)| fractions.contains(&key.indicator.as_str()))
            .filter(|(_, d)| d.present().any(|(_, v)| !(0.0..=1.0).contains(&v)))
            .map(|(key, _)| key.to_string())
            .collect();
        Ok(CheckResult::from_failures(failures))
    }

    /// Names each scaled-indicator row with a zero in any of low, central or high.
    fn no_zeros_in_epi_indicators(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let scaling = db.disease().scaling_indicators();
        let failures = db
            .model_results()
            .table()
            .rows()
            .filter(|(key, _)| scaling.contains(&key.indicator.as_str()))
            .filter_map(|(key, d)| {
                let zeros: Vec<&str> = d
                    .present()
                    .filter(|(_, v)| *v == 0.0)
                    .map(|(column, _)| column)
                    .collect();
                (!zeros.is_empty()).then(|| format!("{key} (zero: {})", zeros.join(", ")))
            })
            .collect();
        Ok(CheckResult::from_failures(failures))
    }

    /// Each counterfactual has exactly one funding fraction; each funding scenario has every
    /// configured funding fraction.
    fn correct_number_of_scenarios(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let parameters = db.parameters();
        let expected_ffs = db.disease().funding_fractions.len();
        let by_scenario = db.model_results().table().funding_fractions_by_scenario();
        let absent = BTreeSet::new();
        let expected = parameters
            .counterfactual_names()
            .into_iter()
            .map(|scenario| (scenario, 1))
            .chain(
                parameters
                    .scenario_names()
                    .into_iter()
                    .map(|scenario| (scenario, expected_ffs)),
            )
            .collect::<BTreeMap<&str, usize>>();

        let mut failures = vec![];
        for (scenario, expected) in &expected {
            let ffs = by_scenario.get(*scenario).unwrap_or(&absent);
            if ffs.len() != *expected {
                failures.push(format!(
                    "Scenario '{scenario}' has {} funding fractions [{}], expected {expected}",
                    ffs.len(),
                    join_values(ffs)
                ));
            }
        }
        for scenario in by_scenario.keys() {
            if !expected.contains_key(scenario.as_str()) {
                failures.push(format!(
                    "Scenario '{scenario}' is not a known scenario or counterfactual"
                ));
            }
        }
        Ok(CheckResult::from_failures(failures))
    }

    /// Every funding scenario x funding fraction x country x year x scaling indicator must be
    /// present. Gaps are summarised per (scenario, country).
    fn scenario_and_funding_for_each_country(
        &self,
        db: &Database,
    ) -> anyhow::Result<CheckResult> {
        let parameters = db.parameters();
        let disease = db.disease();
        let table = db.model_results().table();
        let missing: Vec<RowKey> = iproduct!(
            parameters.scenario_names(),
            &disease.funding_fractions,
            &self.expected_countries,
            parameters.years(),
            disease.scaling_indicators()
        )
        .map(|(scenario, ff, country, year, indicator)| RowKey {
            scenario_descriptor: Some(scenario.to_string()),
            funding_fraction: Some(FundingFraction(*ff)),
            country: Some(country.clone()),
            year,
            indicator: indicator.to_string(),
        })
        .filter(|key| table.get(key).is_none())
        .collect();
        if missing.is_empty() {
            return Ok(CheckResult::pass());
        }

        let grouped = missing
            .iter()
            .map(|key| {
                (
                    (
                        key.scenario_descriptor.clone().unwrap_or_default(),
                        key.country.clone().unwrap_or_default(),
                    ),
                    key,
                )
            })
            .into_group_map();
        let mut scenario_col: Vec<String> = vec![];
        let mut country_col: Vec<String> = vec![];
        let mut count_col: Vec<u32> = vec![];
        let mut ff_col: Vec<String> = vec![];
        let mut indicator_col: Vec<String> = vec![];
        let mut year_col: Vec<String> = vec![];
        for ((scenario, country), keys) in grouped.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
            scenario_col.push(scenario);
            country_col.push(country);
            count_col.push(keys.len() as u32);
            ff_col.push(join_values(
                keys.iter().filter_map(|k| k.funding_fraction).sorted().dedup(),
            ));
            indicator_col.push(join_values(
                keys.iter().map(|k| k.indicator.as_str()).sorted().dedup(),
            ));
            year_col.push(join_values(keys.iter().map(|k| k.year).sorted().dedup()));
        }
        let summary = df!(
            COL::SCENARIO_DESCRIPTOR => scenario_col,
            COL::COUNTRY => country_col,
            "missing" => count_col,
            COL::FUNDING_FRACTION => ff_col,
            COL::INDICATOR => indicator_col,
            COL::YEAR => year_col
        )?;
        Ok(CheckResult::fail(summary))
    }

    /// Model central values of funding scenarios agree with programme targets in the PF years.
    /// PF rows for counterfactuals or for countries the model does not cover are not compared.
    fn model_output_matches_pf_data(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let model_results = db.model_results();
        let by_scenario = model_results.table().funding_fractions_by_scenario();
        let funding_scenarios = db.parameters().scenario_names();
        let pf_years = &db.disease().pf_data_years;
        let mut failures = vec![];
        for (key, datum) in db.pf_input_data().table().rows() {
            let (Some(scenario), Some(country), Some(pf)) =
                (&key.scenario_descriptor, &key.country, datum.central)
            else {
                continue;
            };
            if !pf_years.contains(&key.year)
                || !funding_scenarios.contains(&scenario.as_str())
                || !model_results.countries().contains(country)
            {
                continue;
            }
            let Some(ffs) = by_scenario.get(scenario) else {
                continue;
            };
            for ff in ffs {
                let model = model_results
                    .get(scenario, ff.0, country, key.year, &key.indicator)
                    .and_then(|d| d.central);
                if let Some(model) = model {
                    if !within_tolerance(model, pf, self.tolerance) {
                        failures.push(format!(
                            "PF data mismatch for: scenario_descriptor='{scenario}', funding_fraction={ff}, country='{country}', year={}, indicator='{}' (model={model}, pf={pf})",
                            key.year, key.indicator
                        ));
                    }
                }
            }
        }
        Ok(CheckResult::from_failures(failures))
    }

    fn table_of_model_results_coverage(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let df = db
            .model_results()
            .df()
            .clone()
            .lazy()
            .group_by([col(COL::SCENARIO_DESCRIPTOR), col(COL::FUNDING_FRACTION)])
            .agg([
                col(COL::COUNTRY).n_unique().alias("countries"),
                col(COL::INDICATOR).n_unique().alias("indicators"),
                col(COL::YEAR).min().alias("first_year"),
                col(COL::YEAR).max().alias("last_year"),
                col(COL::CENTRAL).count().alias("rows"),
            ])
            .sort(
                [COL::SCENARIO_DESCRIPTOR, COL::FUNDING_FRACTION],
                SortMultipleOptions::default(),
            )
            .collect()?;
        Ok(CheckResult::pass_with(df))
    }

    /// One figure per indicator, with the portfolio central trajectory of each scenario and
    /// funding fraction.
    fn figures_of_central_trajectories(&self, db: &Database) -> anyhow::Result<CheckResult> {
        let mut totals: BTreeMap<&str, BTreeMap<String, BTreeMap<i64, f64>>> = BTreeMap::new();
        for (key, datum) in db.model_results().table().rows() {
            let (Some(scenario), Some(ff), Some(central)) =
                (&key.scenario_descriptor, key.funding_fraction, datum.central)
            else {
                continue;
            };
            *totals
                .entry(key.indicator.as_str())
                .or_default()
                .entry(format!("{scenario} ({ff})"))
                .or_default()
                .entry(key.year)
                .or_default() += central;
        }
        let figures = totals
            .into_iter()
            .map(|(indicator, by_label)| Figure {
                title: format!("{}: {indicator}", self.disease_name),
                x_label: COL::YEAR.to_string(),
                y_label: indicator.to_string(),
                series: by_label
                    .into_iter()
                    .map(|(label, points)| FigureSeries {
                        label,
                        points: points.into_iter().map(|(x, y)| (x as f64, y)).collect(),
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();
        Ok(CheckResult::pass_with(figures))
    }
}

impl DatabaseChecks for CommonChecks {
    fn title(&self) -> String {
        format!("Standard checks for {}", self.disease_name)
    }

    fn description(&self) -> String {
        "Consistency of model results with expectations, partner data and programme data.".into()
    }

    fn registry(&self) -> CheckRegistry<Self> {
        CheckRegistry::new()
            .register(
                "all_expected_countries_in_model_results",
                Severity::NonCritical,
                "The model results contain exactly the expected countries.",
                Self::all_expected_countries_in_model_results,
            )
            .register(
                "all_scenarios_have_same_beginning",
                Severity::NonCritical,
                "All funding scenarios agree up to the baseline year.",
                Self::all_scenarios_have_same_beginning,
            )
            .register(
                "all_scenarios_match_partner_data_within_a_tolerance",
                Severity::NonCritical,
                "Model results are calibrated to partner data.",
                Self::all_scenarios_match_partner_data_within_a_tolerance,
            )
            .register(
                "correct_bounds_order",
                Severity::Critical,
                "Low, central and high estimates are ordered.",
                Self::correct_bounds_order,
            )
            .register(
                "correct_number_of_scenarios",
                Severity::Critical,
                "Each scenario has the expected number of funding fractions.",
                Self::correct_number_of_scenarios,
            )
            .register(
                "figures_of_central_trajectories",
                Severity::NonCritical,
                "Portfolio central trajectories for each indicator.",
                Self::figures_of_central_trajectories,
            )
            .register(
                "model_output_matches_pf_data",
                Severity::NonCritical,
                "Model results agree with programme targets.",
                Self::model_output_matches_pf_data,
            )
            .register(
                "no_negatives",
                Severity::Critical,
                "No negative values in the model results.",
                Self::no_negatives,
            )
            .register(
                "no_zeros_in_epi_indicators",
                Severity::Critical,
                "No zero central values for scaled indicators.",
                Self::no_zeros_in_epi_indicators,
            )
            .register(
                "proportions_between_zero_and_one",
                Severity::Critical,
                "Fraction indicators lie between zero and one.",
                Self::proportions_between_zero_and_one,
            )
            .register(
                "scenario_and_funding_for_each_country",
                Severity::Critical,
                "Every funding scenario and funding fraction is present for every country.",
                Self::scenario_and_funding_for_each_country,
            )
            .register(
                "table_of_model_results_coverage",
                Severity::NonCritical,
                "Coverage of the model results by scenario and funding fraction.",
                Self::table_of_model_results_coverage,
            )
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::checks::{Message, RunOptions};
    use crate::data::{ModelResults, PFInputData};
    use crate::report::ConsolidatedChecksReport;
    use crate::test_utils;

    fn run(db: &Database) -> anyhow::Result<ConsolidatedChecksReport> {
        let checks = CommonChecks::new(db.parameters(), db.disease_name())?;
        Ok(checks.run(
            db,
            &RunOptions {
                suppress_error: true,
            },
        )?)
    }

    fn database_with_model<F>(central: F) -> anyhow::Result<Database>
    where
        F: Fn(&str, f64, &str, i64, &str) -> f64,
    {
        let model_results = ModelResults::from_df(
            test_utils::DISEASE,
            test_utils::model_df_with(central)?,
            "model_results",
        )?;
        test_utils::database_with(
            model_results,
            test_utils::partner_data()?,
            test_utils::parameters(),
        )
    }

    fn failures(report: &ConsolidatedChecksReport, name: &str) -> anyhow::Result<Vec<String>> {
        let check = report
            .get(name)
            .ok_or_else(|| anyhow!("no report for {name}"))?;
        match &check.message {
            Message::TextList(items) => Ok(items.clone()),
            Message::Text(text) => Ok(vec![text.clone()]),
            Message::Empty => Ok(vec![]),
            other => Err(anyhow!("unexpected payload {}", other.as_ref())),
        }
    }

    #[test]
    fn fixture_database_passes_every_check() -> anyhow::Result<()> {
        let db = test_utils::database()?;
        let report = run(&db)?;
        let failing: Vec<&str> = report
            .reports()
            .iter()
            .filter(|r| !r.passes)
            .map(|r| r.name.as_str())
            .collect();
        assert!(failing.is_empty(), "Unexpected failures: {failing:?}");
        assert_eq!(report.reports().len(), 12);
        Ok(())
    }

    #[test]
    fn negative_value_fails_and_is_named() -> anyhow::Result<()> {
        let db = database_with_model(|scenario, ff, country, year, indicator| {
            if (scenario, ff, country, year, indicator) == ("alternative", 0.8, "B", 2022, "deaths")
            {
                -1.0
            } else {
                test_utils::model_value(scenario, ff, country, year, indicator)
            }
        })?;
        let report = run(&db)?;
        let check = report.get("no_negatives").ok_or_else(|| anyhow!("missing"))?;
        assert!(!check.passes);
        assert!(check.is_critical());
        assert_eq!(
            failures(&report, "no_negatives")?,
            vec!["scenario_descriptor='alternative', funding_fraction=0.8, country='B', year=2022, indicator='deaths'"]
        );
        Ok(())
    }

    #[test]
    fn non_negative_model_results_pass_without_message() -> anyhow::Result<()> {
        let report = run(&test_utils::database()?)?;
        let check = report.get("no_negatives").ok_or_else(|| anyhow!("missing"))?;
        assert!(check.passes);
        assert!(check.message.is_empty());
        Ok(())
    }

    #[test]
    fn country_set_must_match_exactly() -> anyhow::Result<()> {
        let db = test_utils::database()?;
        let expected = |countries: &[&str]| countries.iter().map(|c| c.to_string()).collect();
        let outcome = |countries: &[&str]| -> anyhow::Result<bool> {
            let checks = CommonChecks::new(db.parameters(), db.disease_name())?
                .with_expected_countries(expected(countries));
            Ok(checks.all_expected_countries_in_model_results(&db)?.passes)
        };
        assert!(outcome(&["A", "B"])?);
        assert!(!outcome(&["A", "B", "C"])?);
        assert!(!outcome(&["A"])?);

        let checks = CommonChecks::new(db.parameters(), db.disease_name())?
            .with_expected_countries(expected(&["A", "C"]));
        let result = checks.all_expected_countries_in_model_results(&db)?;
        assert!(
            matches!(&result.message, Message::Text(text) if text.contains("Missing: [C]") && text.contains("Extra: [B]"))
        );
        Ok(())
    }

    #[test]
    fn divergence_before_baseline_names_the_pair() -> anyhow::Result<()> {
        let db = database_with_model(|scenario, ff, country, year, indicator| {
            let value = test_utils::model_value(scenario, ff, country, year, indicator);
            if (scenario, country, year, indicator) == ("alternative", "A", 2020, "cases") {
                value + 1.0
            } else {
                value
            }
        })?;
        let report = run(&db)?;
        assert_eq!(
            failures(&report, "all_scenarios_have_same_beginning")?,
            vec!["Some scenarios are different: country='A', indicator='cases'"]
        );
        Ok(())
    }

    #[test]
    fn divergence_after_baseline_passes() -> anyhow::Result<()> {
        let db = database_with_model(|scenario, ff, country, year, indicator| {
            let value = test_utils::model_value(scenario, ff, country, year, indicator);
            if scenario == "alternative" && year > 2020 {
                value * 2.0
            } else {
                value
            }
        })?;
        let report = run(&db)?;
        let check = report
            .get("all_scenarios_have_same_beginning")
            .ok_or_else(|| anyhow!("missing"))?;
        assert!(check.passes);
        Ok(())
    }

    fn calibration_with_partner_value(value: f64) -> anyhow::Result<Vec<String>> {
        let mut track = test_utils::partner_track()?;
        let centrals: Vec<f64> = izip!(
            track.column(COL::COUNTRY)?.str()?,
            track.column(COL::YEAR)?.i64()?,
            track.column(COL::INDICATOR)?.str()?,
            track.column(COL::CENTRAL)?.f64()?
        )
        .map(|(country, year, indicator, central)| {
            match (country, year, indicator) {
                (Some("A"), Some(2019), Some("cases")) => value,
                _ => central.unwrap_or_default(),
            }
        })
        .collect();
        track.with_column(Series::new(COL::CENTRAL, centrals))?;
        let db = test_utils::database_with(
            test_utils::model_results()?,
            test_utils::partner_data_from(track)?,
            test_utils::parameters(),
        )?;
        failures(
            &run(&db)?,
            "all_scenarios_match_partner_data_within_a_tolerance",
        )
    }

    #[test]
    fn calibration_within_tolerance_passes() -> anyhow::Result<()> {
        // Model central is 100; |100 - 96| = 4 <= 0.05 * 96
        assert!(calibration_with_partner_value(96.0)?.is_empty());
        Ok(())
    }

    #[test]
    fn calibration_outside_tolerance_names_the_combination() -> anyhow::Result<()> {
        let failures = calibration_with_partner_value(90.0)?;
        // Both partner tracks, each at both funding fractions
        assert_eq!(failures.len(), 4);
        assert!(failures.contains(
            &"Some calibration mismatch for: country='A', scenario_descriptor='default', funding_fraction=1, indicator='cases'"
                .to_string()
        ));
        Ok(())
    }

    #[test]
    fn bounds_and_proportions_are_checked() -> anyhow::Result<()> {
        let db = database_with_model(|scenario, ff, country, year, indicator| {
            let value = test_utils::model_value(scenario, ff, country, year, indicator);
            if (scenario, ff, country, year, indicator) == ("default", 1.0, "A", 2022, "coverage") {
                1.2
            } else {
                value
            }
        })?;
        let report = run(&db)?;
        assert_eq!(failures(&report, "proportions_between_zero_and_one")?.len(), 1);
        assert!(failures(&report, "correct_bounds_order")?.is_empty());
        Ok(())
    }

    #[test]
    fn zeros_in_scaled_indicators_fail() -> anyhow::Result<()> {
        let db = database_with_model(|scenario, ff, country, year, indicator| {
            if (country, year, indicator) == ("B", 2022, "cases") {
                0.0
            } else {
                test_utils::model_value(scenario, ff, country, year, indicator)
            }
        })?;
        let report = run(&db)?;
        // 2 scenarios x 2 funding fractions plus the counterfactual
        let zeros = failures(&report, "no_zeros_in_epi_indicators")?;
        assert_eq!(zeros.len(), 5);
        assert!(zeros[0].ends_with("(zero: low, central, high)"));
        Ok(())
    }

    #[test]
    fn zero_lower_bound_in_scaled_indicator_fails() -> anyhow::Result<()> {
        let is_row = col(COL::SCENARIO_DESCRIPTOR)
            .eq(lit("default"))
            .and(col(COL::FUNDING_FRACTION).eq(lit(0.8)))
            .and(col(COL::COUNTRY).eq(lit("A")))
            .and(col(COL::YEAR).eq(lit(2019i64)))
            .and(col(COL::INDICATOR).eq(lit("cases")));
        let df = test_utils::model_df()?
            .lazy()
            .with_column(
                when(is_row)
                    .then(lit(0.0))
                    .otherwise(col(COL::LOW))
                    .alias(COL::LOW),
            )
            .collect()?;
        let model_results = ModelResults::from_df(test_utils::DISEASE, df, "model_results")?;
        let db = test_utils::database_with(
            model_results,
            test_utils::partner_data()?,
            test_utils::parameters(),
        )?;
        let report = run(&db)?;
        assert_eq!(
            failures(&report, "no_zeros_in_epi_indicators")?,
            vec!["scenario_descriptor='default', funding_fraction=0.8, country='A', year=2019, indicator='cases' (zero: low)"]
        );
        Ok(())
    }

    #[test]
    fn missing_counterfactual_is_reported() -> anyhow::Result<()> {
        let df = test_utils::model_df()?
            .lazy()
            .filter(col(COL::SCENARIO_DESCRIPTOR).neq(lit("null")))
            .collect()?;
        let model_results = ModelResults::from_df(test_utils::DISEASE, df, "model_results")?;
        let db = test_utils::database_with(
            model_results,
            test_utils::partner_data()?,
            test_utils::parameters(),
        )?;
        let report = run(&db)?;
        let check = report
            .get("correct_number_of_scenarios")
            .ok_or_else(|| anyhow!("missing"))?;
        assert!(!check.passes);
        assert!(check.is_critical());
        assert_eq!(
            failures(&report, "correct_number_of_scenarios")?,
            vec!["Scenario 'null' has 0 funding fractions [], expected 1"]
        );
        Ok(())
    }

    #[test]
    fn missing_funding_fraction_is_summarised() -> anyhow::Result<()> {
        let df = test_utils::model_df()?
            .lazy()
            .filter(
                col(COL::SCENARIO_DESCRIPTOR)
                    .eq(lit("alternative"))
                    .and(col(COL::FUNDING_FRACTION).eq(lit(0.8)))
                    .not(),
            )
            .collect()?;
        let model_results = ModelResults::from_df(test_utils::DISEASE, df, "model_results")?;
        let db = test_utils::database_with(
            model_results,
            test_utils::partner_data()?,
            test_utils::parameters(),
        )?;
        let report = run(&db)?;

        assert!(failures(&report, "correct_number_of_scenarios")?[0].contains("'alternative'"));
        let check = report
            .get("scenario_and_funding_for_each_country")
            .ok_or_else(|| anyhow!("missing"))?;
        assert!(!check.passes);
        match &check.message {
            Message::Table(summary) => {
                // One row per country of the alternative scenario
                assert_eq!(summary.height(), 2);
                let ffs: Vec<&str> = summary
                    .column(COL::FUNDING_FRACTION)?
                    .str()?
                    .into_iter()
                    .flatten()
                    .collect();
                assert_eq!(ffs, vec!["0.8", "0.8"]);
            }
            other => panic!("Expected a table, got {}", other.as_ref()),
        }
        Ok(())
    }

    #[test]
    fn pf_mismatch_is_reported() -> anyhow::Result<()> {
        let db = database_with_model(|scenario, ff, country, year, indicator| {
            let value = test_utils::model_value(scenario, ff, country, year, indicator);
            if (scenario, country, year, indicator) == ("default", "A", 2021, "deaths") {
                value * 2.0
            } else {
                value
            }
        })?;
        let report = run(&db)?;
        // Both funding fractions of the default scenario
        assert_eq!(failures(&report, "model_output_matches_pf_data")?.len(), 2);
        Ok(())
    }

    #[test]
    fn pf_rows_outside_funding_scenarios_and_modelled_countries_are_ignored(
    ) -> anyhow::Result<()> {
        let mut pf = test_utils::pf_input_df()?;
        pf.vstack_mut(&df!(
            COL::SCENARIO_DESCRIPTOR => &["null", "default"],
            COL::COUNTRY => &["A", "Z"],
            COL::YEAR => &[2021i64, 2021],
            COL::INDICATOR => &["cases", "cases"],
            COL::CENTRAL => &[1.0, 1.0]
        )?)?;
        let db = Database::new(
            test_utils::model_results()?,
            test_utils::partner_data()?,
            PFInputData::from_df(test_utils::DISEASE, pf, "pf_input_data")?,
            None,
            test_utils::parameters(),
        )?;
        let report = run(&db)?;
        assert!(failures(&report, "model_output_matches_pf_data")?.is_empty());
        Ok(())
    }

    #[test]
    fn informational_checks_always_pass() -> anyhow::Result<()> {
        let db = database_with_model(|_, _, _, _, _| -5.0)?;
        let report = run(&db)?;
        let table = report
            .get("table_of_model_results_coverage")
            .ok_or_else(|| anyhow!("missing"))?;
        assert!(table.passes);
        assert!(matches!(&table.message, Message::Table(df) if df.height() == 5));
        let figures = report
            .get("figures_of_central_trajectories")
            .ok_or_else(|| anyhow!("missing"))?;
        assert!(figures.passes);
        match &figures.message {
            Message::FigureList(figures) => {
                assert_eq!(figures.len(), 3);
                assert_eq!(figures[0].series.len(), 5);
            }
            other => panic!("Expected figures, got {}", other.as_ref()),
        }
        Ok(())
    }
}
