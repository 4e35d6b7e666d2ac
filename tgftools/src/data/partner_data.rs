use std::path::Path;

use log::info;
use polars::prelude::*;

use crate::data::{read_csv, require_columns, TableData};
use crate::error::DataFormatError;
use crate::table::{Dimension, Table, TableSchema};
use crate::COL;

pub const PARTNER_DATA_SCHEMA: TableSchema = TableSchema {
    index: &[
        Dimension::ScenarioDescriptor,
        Dimension::Country,
        Dimension::Year,
        Dimension::Indicator,
    ],
    values: &[COL::CENTRAL],
    nullable_values: true,
};

/// Columns each raw partner track must provide
const TRACK_COLUMNS: [&str; 4] = [COL::COUNTRY, COL::YEAR, COL::INDICATOR, COL::CENTRAL];

/// Externally reported values, one flat series per scenario. Missing values are kept as nulls.
#[derive(Debug, Clone)]
pub struct PartnerData {
    disease_name: String,
    table: Table,
}

impl PartnerData {
    /// Merges named raw tracks into one table, labelling each track's rows with its name as the
    /// scenario descriptor.
    pub fn from_tracks(
        disease_name: &str,
        tracks: Vec<(String, DataFrame)>,
        source_name: &str,
    ) -> Result<Self, DataFormatError> {
        let mut lfs: Vec<LazyFrame> = vec![];
        for (track_name, df) in tracks {
            require_columns(&df, &TRACK_COLUMNS, &format!("{source_name}[{track_name}]"))?;
            lfs.push(
                df.lazy()
                    .select([
                        lit(track_name).alias(COL::SCENARIO_DESCRIPTOR),
                        col(COL::COUNTRY).strict_cast(DataType::String),
                        col(COL::YEAR).strict_cast(DataType::Int64),
                        col(COL::INDICATOR).strict_cast(DataType::String),
                        col(COL::CENTRAL).strict_cast(DataType::Float64),
                    ]),
            );
        }
        let df = polars::prelude::concat(lfs, UnionArgs::default())
            .and_then(|lf| lf.collect())
            .map_err(|e| DataFormatError::Read {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;
        info!("Merged partner tracks with shape: {:?}", df.shape());
        Self::from_df(disease_name, df, source_name)
    }

    /// Uses one raw file for every named track.
    pub fn from_path<P: AsRef<Path>>(
        disease_name: &str,
        path: P,
        track_names: &[&str],
    ) -> Result<Self, DataFormatError> {
        let df = read_csv(path.as_ref())?;
        let tracks = track_names
            .iter()
            .map(|name| (name.to_string(), df.clone()))
            .collect();
        Self::from_tracks(disease_name, tracks, &path.as_ref().display().to_string())
    }

    /// Builds from data that already carries a scenario descriptor column.
    pub fn from_df(
        disease_name: &str,
        df: DataFrame,
        source_name: &str,
    ) -> Result<Self, DataFormatError> {
        Ok(Self {
            disease_name: disease_name.to_string(),
            table: Table::from_df(df, PARTNER_DATA_SCHEMA, source_name)?,
        })
    }
}

impl TableData for PartnerData {
    fn disease_name(&self) -> &str {
        &self.disease_name
    }

    fn table(&self) -> &Table {
        &self.table
    }
}
