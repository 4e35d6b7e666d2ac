//! Named numeric results produced by analysis steps, alongside any tables they want reported.

use std::collections::BTreeMap;

use log::info;
use polars::prelude::*;

use crate::data::TableData;
use crate::database::Database;
use crate::error::{Result, TgfError};
use crate::COL;

pub enum StatsOutput {
    /// Named numbers, e.g. counts or ratios
    Stats(BTreeMap<String, f64>),
    Table(DataFrame),
}

pub type StatsFn<T> = fn(&T) -> anyhow::Result<StatsOutput>;

pub struct StatsRegistry<T> {
    functions: BTreeMap<&'static str, StatsFn<T>>,
}

impl<T> Default for StatsRegistry<T> {
    fn default() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }
}

impl<T> StatsRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &'static str, func: StatsFn<T>) -> Self {
        self.functions.entry(name).or_insert(func);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisResults {
    pub title: String,
    pub files: Vec<String>,
    /// Function name -> key -> value
    pub stats: BTreeMap<String, BTreeMap<String, f64>>,
    pub tables: Vec<(String, DataFrame)>,
}

impl AnalysisResults {
    /// All named numbers as one (Function, Key, Value) table
    pub fn main_table(&self) -> PolarsResult<DataFrame> {
        let (functions, (keys, values)): (Vec<&str>, (Vec<&str>, Vec<f64>)) = self
            .stats
            .iter()
            .flat_map(|(function, stats)| {
                stats
                    .iter()
                    .map(move |(key, value)| (function.as_str(), (key.as_str(), *value)))
            })
            .unzip();
        df!(
            COL::FUNCTION => functions,
            COL::KEY => keys,
            COL::VALUE => values
        )
    }

    pub fn stat(&self, function: &str, key: &str) -> Option<f64> {
        self.stats.get(function).and_then(|s| s.get(key)).copied()
    }
}

pub trait StatsReport: Sized {
    fn title(&self) -> String;

    fn files(&self) -> Vec<String> {
        vec![]
    }

    fn registry(&self) -> StatsRegistry<Self>;

    /// Runs every registered function in name order.
    fn report(&self) -> Result<AnalysisResults> {
        let mut results = AnalysisResults {
            title: self.title(),
            files: self.files(),
            ..Default::default()
        };
        for (name, func) in self.registry().functions {
            info!("Computing {name}");
            match func(self).map_err(|source| TgfError::AnalysisErrored {
                name: name.to_string(),
                source,
            })? {
                StatsOutput::Stats(stats) => {
                    results.stats.insert(name.to_string(), stats);
                }
                StatsOutput::Table(df) => results.tables.push((name.to_string(), df)),
            }
        }
        Ok(results)
    }
}

/// Descriptive statistics of a database.
pub struct DatabaseSummary<'a> {
    db: &'a Database,
}

impl<'a> DatabaseSummary<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn dimensions(&self) -> anyhow::Result<StatsOutput> {
        let model_results = self.db.model_results();
        let stats = [
            ("countries", model_results.countries().len()),
            ("indicators", model_results.indicators().len()),
            ("scenario_descriptors", model_results.get_scenarios().len()),
            ("funding_fractions", model_results.funding_fractions().len()),
            ("years", model_results.years().len()),
            ("rows", model_results.table().len()),
        ]
        .into_iter()
        .map(|(key, count)| (key.to_string(), count as f64))
        .collect();
        Ok(StatsOutput::Stats(stats))
    }

    fn partner_data_completeness(&self) -> anyhow::Result<StatsOutput> {
        let table = self.db.partner_data().table();
        let rows = table.len() as f64;
        let missing = table.rows().filter(|(_, d)| d.central.is_none()).count() as f64;
        let mut stats = BTreeMap::from([
            ("rows".to_string(), rows),
            ("missing".to_string(), missing),
        ]);
        if rows > 0.0 {
            stats.insert("fraction_missing".to_string(), missing / rows);
        }
        Ok(StatsOutput::Stats(stats))
    }

    /// Gp totals over the funding years, per indicator
    fn gp_funding_totals(&self) -> anyhow::Result<StatsOutput> {
        let years = &self.db.parameters().years_for_funding;
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        if let Some(gp) = self.db.gp() {
            for (key, datum) in gp.table().rows() {
                if let (true, Some(central)) = (years.contains(&key.year), datum.central) {
                    *totals.entry(key.indicator.clone()).or_default() += central;
                }
            }
        }
        Ok(StatsOutput::Stats(totals))
    }

    fn gp_trajectory(&self) -> anyhow::Result<StatsOutput> {
        match self.db.gp() {
            Some(gp) => Ok(StatsOutput::Table(gp.df().clone())),
            None => Ok(StatsOutput::Stats(BTreeMap::new())),
        }
    }
}

impl StatsReport for DatabaseSummary<'_> {
    fn title(&self) -> String {
        format!("Summary of {} database", self.db.disease_name())
    }

    fn files(&self) -> Vec<String> {
        self.db.sources()
    }

    fn registry(&self) -> StatsRegistry<Self> {
        StatsRegistry::new()
            .register("dimensions", Self::dimensions)
            .register("gp_funding_totals", Self::gp_funding_totals)
            .register("gp_trajectory", Self::gp_trajectory)
            .register("partner_data_completeness", Self::partner_data_completeness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn database_summary_should_report() -> anyhow::Result<()> {
        let db = test_utils::database()?;
        let results = DatabaseSummary::new(&db).report()?;
        assert_eq!(results.stat("dimensions", "countries"), Some(2.0));
        assert_eq!(results.stat("dimensions", "funding_fractions"), Some(2.0));
        // 3 indicators x 2 countries x 2 years x 2 tracks
        assert_eq!(results.stat("partner_data_completeness", "rows"), Some(24.0));
        assert_eq!(
            results.stat("partner_data_completeness", "fraction_missing"),
            Some(0.0)
        );
        assert!(results.stat("gp_funding_totals", "cases").is_some());
        assert_eq!(results.tables.len(), 1);
        assert_eq!(results.tables[0].0, "gp_trajectory");
        Ok(())
    }

    #[test]
    fn main_table_lists_every_named_number() -> anyhow::Result<()> {
        let mut results = AnalysisResults::default();
        results.stats.insert(
            "f".to_string(),
            BTreeMap::from([("a".to_string(), 1.0), ("b".to_string(), 2.0)]),
        );
        results
            .stats
            .insert("g".to_string(), BTreeMap::from([("c".to_string(), 3.0)]));
        let df = results.main_table()?;
        assert_eq!(df.shape(), (3, 3));
        let keys: Vec<&str> = df.column(COL::KEY)?.str()?.into_iter().flatten().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        Ok(())
    }
}
