//! The data model variants. Each one reshapes its own raw source into a canonical [`Table`] and
//! exposes the shared accessor contract through [`TableData`].

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use log::info;
use polars::prelude::*;

use crate::error::DataFormatError;
use crate::table::Table;

pub mod gp;
pub mod model_results;
pub mod partner_data;
pub mod pf_input_data;

pub use gp::Gp;
pub use model_results::ModelResults;
pub use partner_data::PartnerData;
pub use pf_input_data::PFInputData;

/// Accessors shared by every data model variant.
pub trait TableData {
    fn disease_name(&self) -> &str;

    fn table(&self) -> &Table;

    fn df(&self) -> &DataFrame {
        self.table().df()
    }

    fn countries(&self) -> &BTreeSet<String> {
        self.table().countries()
    }

    fn indicators(&self) -> &BTreeSet<String> {
        self.table().indicators()
    }

    fn funding_fractions(&self) -> Vec<f64> {
        self.table().funding_fractions()
    }

    fn get_scenarios(&self) -> &BTreeSet<String> {
        self.table().get_scenarios()
    }

    fn years(&self) -> &BTreeSet<i64> {
        self.table().years()
    }

    fn get_country(
        &self,
        country: &str,
        scenario_descriptor: Option<&str>,
        funding_fraction: Option<f64>,
        indicator: Option<&str>,
    ) -> PolarsResult<DataFrame> {
        self.table()
            .get_country(country, scenario_descriptor, funding_fraction, indicator)
    }
}

/// Reads a delimited text file with a header row.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame, DataFormatError> {
    let source_name = path.as_ref().display().to_string();
    info!("Attempting to load dataframe from {source_name}");
    let file = File::open(path.as_ref()).map_err(|error| DataFormatError::Io {
        source_name: source_name.clone(),
        error,
    })?;
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| DataFormatError::Read {
            source_name: source_name.clone(),
            reason: e.to_string(),
        })?;
    info!("Loaded {source_name} with shape: {:?}", df.shape());
    Ok(df)
}

/// Checks that every column in `columns` is present in `df`.
pub(crate) fn require_columns(
    df: &DataFrame,
    columns: &[&str],
    source_name: &str,
) -> Result<(), DataFormatError> {
    let present = df.get_column_names();
    match columns.iter().find(|c| !present.contains(c)) {
        Some(column) => Err(DataFormatError::MissingColumn {
            source_name: source_name.to_string(),
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}
