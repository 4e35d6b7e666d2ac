use std::collections::BTreeSet;

use itertools::izip;
use log::{debug, info};
use polars::prelude::*;

use crate::config::Parameters;
use crate::data::{require_columns, ModelResults, PartnerData, TableData};
use crate::error::{DataFormatError, Result};
use crate::table::{Dimension, Table, TableSchema};
use crate::COL;

pub const GP_SCHEMA: TableSchema = TableSchema {
    index: &[Dimension::Year, Dimension::Indicator],
    values: &[COL::CENTRAL],
    nullable_values: false,
};

/// Portfolio-level reference trajectory, one central value per (year, indicator).
#[derive(Debug, Clone)]
pub struct Gp {
    disease_name: String,
    table: Table,
}

/// Sums central values by (year, indicator), ignoring missing values.
fn sum_by_year_and_indicator(lf: LazyFrame) -> LazyFrame {
    lf.filter(
        col(COL::CENTRAL)
            .is_not_null()
            .and(col(COL::CENTRAL).is_not_nan()),
    )
    .group_by([col(COL::YEAR), col(COL::INDICATOR)])
    .agg([col(COL::CENTRAL).sum()])
    .select([col(COL::YEAR), col(COL::INDICATOR), col(COL::CENTRAL)])
}

impl Gp {
    /// Sums model central values across countries and funding fractions. When the disease names
    /// a `GP_SCENARIO` only that scenario contributes. Years in `PARTNER_DATA_YEARS` that the
    /// model does not cover are filled from the summed partner data of the same scenario.
    pub fn derive(
        model_results: &ModelResults,
        partner_data: Option<&PartnerData>,
        parameters: &Parameters,
    ) -> Result<Self> {
        let disease_name = model_results.disease_name();
        let disease = parameters.disease(disease_name)?;

        let mut model = model_results.df().clone().lazy();
        if let Some(scenario) = &disease.gp_scenario {
            model = model.filter(col(COL::SCENARIO_DESCRIPTOR).eq(lit(scenario.clone())));
        }
        let mut df = sum_by_year_and_indicator(model).collect()?;

        if let Some(partner_data) = partner_data {
            let track = disease
                .gp_scenario
                .clone()
                .filter(|s| partner_data.get_scenarios().contains(s))
                .or_else(|| partner_data.get_scenarios().iter().next().cloned());
            if let Some(track) = track {
                let years = Series::new("years", disease.partner_data_years.clone());
                let partner = sum_by_year_and_indicator(
                    partner_data
                        .df()
                        .clone()
                        .lazy()
                        .filter(col(COL::SCENARIO_DESCRIPTOR).eq(lit(track.clone())))
                        .filter(col(COL::YEAR).is_in(lit(years))),
                )
                .collect()?;

                let covered: BTreeSet<(i64, String)> = izip!(
                    df.column(COL::YEAR)?.i64()?,
                    df.column(COL::INDICATOR)?.str()?
                )
                .filter_map(|(year, indicator)| Some((year?, indicator?.to_string())))
                .collect();
                let mask: BooleanChunked = izip!(
                    partner.column(COL::YEAR)?.i64()?,
                    partner.column(COL::INDICATOR)?.str()?
                )
                .map(|(year, indicator)| match (year, indicator) {
                    (Some(year), Some(indicator)) => {
                        !covered.contains(&(year, indicator.to_string()))
                    }
                    _ => false,
                })
                .collect();
                let fill = partner.filter(&mask)?;
                debug!("Filling {} Gp rows from partner track '{track}'", fill.height());
                df.vstack_mut(&fill)?;
            }
        }

        let table = Table::from_df(df, GP_SCHEMA, "gp (derived)")?;
        info!("Derived Gp for {disease_name} with {} rows", table.len());
        Ok(Self {
            disease_name: disease_name.to_string(),
            table,
        })
    }

    /// Builds from a pre-computed trajectory, summing any finer breakdown (e.g. by country)
    /// by (year, indicator).
    pub fn from_fixed_gp(
        disease_name: &str,
        df: DataFrame,
        source_name: &str,
    ) -> std::result::Result<Self, DataFormatError> {
        require_columns(&df, &[COL::YEAR, COL::INDICATOR, COL::CENTRAL], source_name)?;
        let df = sum_by_year_and_indicator(df.lazy().with_columns([
            col(COL::YEAR).strict_cast(DataType::Int64),
            col(COL::CENTRAL).strict_cast(DataType::Float64),
        ]))
        .collect()
        .map_err(|e| DataFormatError::Unparseable {
            source_name: source_name.to_string(),
            column: COL::CENTRAL.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            disease_name: disease_name.to_string(),
            table: Table::from_df(df, GP_SCHEMA, source_name)?,
        })
    }

    /// (year, central) pairs for one indicator, in year order
    pub fn trajectory(&self, indicator: &str) -> Vec<(i64, f64)> {
        self.table
            .rows()
            .filter(|(key, _)| key.indicator == indicator)
            .filter_map(|(key, datum)| datum.central.map(|c| (key.year, c)))
            .collect()
    }
}

impl TableData for Gp {
    fn disease_name(&self) -> &str {
        &self.disease_name
    }

    fn table(&self) -> &Table {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn gp_sums_across_countries_and_funding_fractions() -> anyhow::Result<()> {
        let parameters = test_utils::parameters();
        let model_results = test_utils::model_results()?;
        let gp = Gp::derive(&model_results, None, &parameters)?;
        // A and B cases at 2019: 100 + 200, for 2 scenarios x 2 funding fractions plus the
        // counterfactual at full funding.
        let trajectory = gp.trajectory("cases");
        assert_eq!(trajectory.first(), Some(&(2019, 300.0 * 5.0)));
        assert_eq!(trajectory.len(), 4);
        Ok(())
    }

    #[test]
    fn gp_scenario_restricts_the_sum_and_partner_data_fills_gaps() -> anyhow::Result<()> {
        let mut parameters = test_utils::parameters();
        let disease = parameters
            .diseases
            .get_mut(test_utils::DISEASE)
            .expect("fixture disease");
        disease.gp_scenario = Some("default".to_string());
        disease.partner_data_years = vec![2018, 2019];

        let model_results = test_utils::model_results()?;
        let partner = df!(
            COL::COUNTRY => &["A", "B", "A"],
            COL::YEAR => &[2018i64, 2018, 2019],
            COL::INDICATOR => &["cases", "cases", "cases"],
            COL::CENTRAL => &[50.0, 60.0, 1.0]
        )?;
        let partner_data = PartnerData::from_tracks(
            test_utils::DISEASE,
            vec![("default".to_string(), partner)],
            "partner",
        )?;
        let gp = Gp::derive(&model_results, Some(&partner_data), &parameters)?;
        let trajectory = gp.trajectory("cases");
        assert_eq!(trajectory[0], (2018, 110.0));
        // 2019 is covered by the model: two funding fractions of the default scenario.
        assert_eq!(trajectory[1], (2019, 600.0));
        Ok(())
    }

    #[test]
    fn fixed_gp_is_summed_by_year_and_indicator() -> anyhow::Result<()> {
        let df = df!(
            COL::COUNTRY => &["A", "B", "A"],
            COL::YEAR => &[2020i64, 2020, 2021],
            COL::INDICATOR => &["cases", "cases", "cases"],
            COL::CENTRAL => &[1.0, 2.0, 4.0]
        )?;
        let gp = Gp::from_fixed_gp("diseaseX", df, "fixed_gp")?;
        assert_eq!(gp.trajectory("cases"), vec![(2020, 3.0), (2021, 4.0)]);
        assert!(gp.countries().is_empty());
        Ok(())
    }
}
