use std::path::Path;

use polars::prelude::DataFrame;

use crate::data::partner_data::PARTNER_DATA_SCHEMA;
use crate::data::{read_csv, TableData};
use crate::error::DataFormatError;
use crate::table::{Table, TableSchema};

/// Program-input data shares the partner data index.
pub const PF_INPUT_DATA_SCHEMA: TableSchema = PARTNER_DATA_SCHEMA;

/// Country-submitted programmatic targets, already in long form.
#[derive(Debug, Clone)]
pub struct PFInputData {
    disease_name: String,
    table: Table,
}

impl PFInputData {
    pub fn from_df(
        disease_name: &str,
        df: DataFrame,
        source_name: &str,
    ) -> Result<Self, DataFormatError> {
        Ok(Self {
            disease_name: disease_name.to_string(),
            table: Table::from_df(df, PF_INPUT_DATA_SCHEMA, source_name)?,
        })
    }

    pub fn from_path<P: AsRef<Path>>(disease_name: &str, path: P) -> Result<Self, DataFormatError> {
        let df = read_csv(path.as_ref())?;
        Self::from_df(disease_name, df, &path.as_ref().display().to_string())
    }
}

impl TableData for PFInputData {
    fn disease_name(&self) -> &str {
        &self.disease_name
    }

    fn table(&self) -> &Table {
        &self.table
    }
}
