use std::path::Path;

use polars::prelude::DataFrame;

use crate::config::Parameters;
use crate::data::{read_csv, TableData};
use crate::error::DataFormatError;
use crate::table::{Datum, Dimension, FundingFraction, RowKey, Table, TableSchema};
use crate::COL;

pub const MODEL_RESULTS_SCHEMA: TableSchema = TableSchema {
    index: &[
        Dimension::ScenarioDescriptor,
        Dimension::FundingFraction,
        Dimension::Country,
        Dimension::Year,
        Dimension::Indicator,
    ],
    values: &[COL::LOW, COL::CENTRAL, COL::HIGH],
    nullable_values: false,
};

/// Model outputs in long form, one low/central/high estimate per
/// (scenario, funding fraction, country, year, indicator).
#[derive(Debug, Clone)]
pub struct ModelResults {
    disease_name: String,
    table: Table,
}

impl ModelResults {
    pub fn from_df(
        disease_name: &str,
        df: DataFrame,
        source_name: &str,
    ) -> Result<Self, DataFormatError> {
        Ok(Self {
            disease_name: disease_name.to_string(),
            table: Table::from_df(df, MODEL_RESULTS_SCHEMA, source_name)?,
        })
    }

    pub fn from_path<P: AsRef<Path>>(disease_name: &str, path: P) -> Result<Self, DataFormatError> {
        let df = read_csv(path.as_ref())?;
        Self::from_df(disease_name, df, &path.as_ref().display().to_string())
    }

    pub fn get(
        &self,
        scenario_descriptor: &str,
        funding_fraction: f64,
        country: &str,
        year: i64,
        indicator: &str,
    ) -> Option<&Datum> {
        self.table.get(&RowKey {
            scenario_descriptor: Some(scenario_descriptor.to_string()),
            funding_fraction: Some(FundingFraction(funding_fraction)),
            country: Some(country.to_string()),
            year,
            indicator: indicator.to_string(),
        })
    }

    /// Funding scenarios present in the data, in catalog order
    pub fn scenario_descriptors<'a>(&self, parameters: &'a Parameters) -> Vec<&'a str> {
        parameters
            .scenario_names()
            .into_iter()
            .filter(|s| self.get_scenarios().contains(*s))
            .collect()
    }

    /// Counterfactuals present in the data, in catalog order
    pub fn counterfactuals<'a>(&self, parameters: &'a Parameters) -> Vec<&'a str> {
        parameters
            .counterfactual_names()
            .into_iter()
            .filter(|s| self.get_scenarios().contains(*s))
            .collect()
    }
}

impl TableData for ModelResults {
    fn disease_name(&self) -> &str {
        &self.disease_name
    }

    fn table(&self) -> &Table {
        &self.table
    }
}
