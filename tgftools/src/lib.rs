use std::path::PathBuf;

use log::info;
use polars::frame::DataFrame;

use crate::config::Parameters;
use crate::data::{read_csv, Gp, ModelResults, PFInputData, PartnerData};
use crate::database::Database;
use crate::error::Result;

// Re-exports
pub use column_names as COL;

// Modules
pub mod checks;
pub mod column_names;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod formatters;
pub mod report;
pub mod selection;
pub mod stats;
pub mod table;
#[cfg(test)]
pub(crate) mod test_utils;

/// How the Gp reference trajectory is obtained
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GpSource {
    #[default]
    None,
    /// Derived from the model results and partner data
    Derived,
    /// Summed from a pre-computed trajectory file
    Fixed(PathBuf),
}

/// Locations of the raw sources for one disease.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSources {
    pub model_results: PathBuf,
    /// (track name, file) pairs merged into one partner data table
    pub partner_data: Vec<(String, PathBuf)>,
    pub pf_input_data: PathBuf,
    pub gp: GpSource,
}

/// Loads every source for `disease_name` and assembles the database. Any load failure aborts;
/// no partial database is returned.
pub fn load_database(
    disease_name: &str,
    parameters: Parameters,
    sources: &DataSources,
) -> Result<Database> {
    info!("Loading database for {disease_name}");
    let model_results = ModelResults::from_path(disease_name, &sources.model_results)?;
    let tracks = sources
        .partner_data
        .iter()
        .map(|(name, path)| -> Result<(String, DataFrame)> {
            Ok((name.clone(), read_csv(path)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let partner_source = sources
        .partner_data
        .iter()
        .map(|(_, path)| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" + ");
    let partner_data = PartnerData::from_tracks(disease_name, tracks, &partner_source)?;
    let pf_input_data = PFInputData::from_path(disease_name, &sources.pf_input_data)?;
    let gp = match &sources.gp {
        GpSource::None => None,
        GpSource::Derived => Some(Gp::derive(
            &model_results,
            Some(&partner_data),
            &parameters,
        )?),
        GpSource::Fixed(path) => Some(Gp::from_fixed_gp(
            disease_name,
            read_csv(path)?,
            &path.display().to_string(),
        )?),
    };
    Database::new(model_results, partner_data, pf_input_data, gp, parameters)
}
