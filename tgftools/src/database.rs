//! The single read-only object handed to every check and analysis step.

use log::{debug, info};
use polars::prelude::*;

use crate::config::{DiseaseParameters, Parameters};
use crate::data::{Gp, ModelResults, PFInputData, PartnerData, TableData};
use crate::error::{Result, TgfError};
use crate::selection::Selection;
use crate::COL;

#[derive(Debug, Clone)]
pub struct Database {
    disease_name: String,
    model_results: ModelResults,
    partner_data: PartnerData,
    pf_input_data: PFInputData,
    gp: Option<Gp>,
    parameters: Parameters,
    disease: DiseaseParameters,
}

impl Database {
    /// Assembles a database, requiring every source to describe the same disease and the
    /// disease to be configured in `parameters`.
    pub fn new(
        model_results: ModelResults,
        partner_data: PartnerData,
        pf_input_data: PFInputData,
        gp: Option<Gp>,
        parameters: Parameters,
    ) -> Result<Self> {
        let disease_name = model_results.disease_name().to_string();
        let others = [
            Some(partner_data.disease_name()),
            Some(pf_input_data.disease_name()),
            gp.as_ref().map(|gp| gp.disease_name()),
        ];
        if let Some(found) = others.into_iter().flatten().find(|d| *d != disease_name) {
            return Err(TgfError::DiseaseMismatch {
                expected: disease_name,
                found: found.to_string(),
            });
        }
        let disease = parameters.disease(&disease_name)?.clone();
        info!(
            "Database for {disease_name}: {} model rows, {} partner rows, {} pf rows",
            model_results.table().len(),
            partner_data.table().len(),
            pf_input_data.table().len()
        );
        Ok(Self {
            disease_name,
            model_results,
            partner_data,
            pf_input_data,
            gp,
            parameters,
            disease,
        })
    }

    pub fn disease_name(&self) -> &str {
        &self.disease_name
    }

    pub fn model_results(&self) -> &ModelResults {
        &self.model_results
    }

    pub fn partner_data(&self) -> &PartnerData {
        &self.partner_data
    }

    pub fn pf_input_data(&self) -> &PFInputData {
        &self.pf_input_data
    }

    pub fn gp(&self) -> Option<&Gp> {
        self.gp.as_ref()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Parameters of this database's disease
    pub fn disease(&self) -> &DiseaseParameters {
        &self.disease
    }

    /// Names of the sources the database was built from
    pub fn sources(&self) -> Vec<String> {
        let mut sources = vec![
            self.model_results.table().source_name().to_string(),
            self.partner_data.table().source_name().to_string(),
            self.pf_input_data.table().source_name().to_string(),
        ];
        sources.extend(self.gp.as_ref().map(|gp| gp.table().source_name().to_string()));
        sources
    }

    /// All sources for one (country, scenario, funding fraction, indicator) side by side, keyed
    /// by year. Years missing from a source hold nulls in its columns.
    pub fn get_country(
        &self,
        country: &str,
        scenario_descriptor: &str,
        funding_fraction: f64,
        indicator: &str,
    ) -> Result<DataFrame> {
        let selection = Selection::new()
            .country(country)
            .scenario_descriptor(scenario_descriptor)
            .funding_fraction(funding_fraction)
            .indicator(indicator);

        let model = self
            .model_results
            .table()
            .filter(&selection)?
            .lazy()
            .select([
                col(COL::YEAR),
                col(COL::LOW).alias(COL::MODEL_LOW),
                col(COL::CENTRAL).alias(COL::MODEL_CENTRAL),
                col(COL::HIGH).alias(COL::MODEL_HIGH),
            ]);
        let pf = self
            .pf_input_data
            .table()
            .filter(&selection)?
            .lazy()
            .select([col(COL::YEAR), col(COL::CENTRAL).alias(COL::PF_CENTRAL)]);
        let partner = self
            .partner_data
            .table()
            .filter(&selection)?
            .lazy()
            .select([col(COL::YEAR), col(COL::CENTRAL).alias(COL::PARTNER_CENTRAL)]);

        let years = polars::prelude::concat(
            [
                model.clone().select([col(COL::YEAR)]),
                pf.clone().select([col(COL::YEAR)]),
                partner.clone().select([col(COL::YEAR)]),
            ],
            UnionArgs::default(),
        )?
        .unique_stable(None, UniqueKeepStrategy::First);

        let df = years
            .join(
                model,
                [col(COL::YEAR)],
                [col(COL::YEAR)],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                pf,
                [col(COL::YEAR)],
                [col(COL::YEAR)],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                partner,
                [col(COL::YEAR)],
                [col(COL::YEAR)],
                JoinArgs::new(JoinType::Left),
            )
            .sort([COL::YEAR], SortMultipleOptions::default())
            .collect()?;
        debug!(
            "Combined sources for {country}/{scenario_descriptor}/{funding_fraction}/{indicator}: {:?}",
            df.shape()
        );
        Ok(df)
    }
}
