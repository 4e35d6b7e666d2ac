//! The tabular data container shared by every data model variant: a `DataFrame` sorted by its
//! index columns together with a parsed, ordered view of its rows keyed by index tuple.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use log::{debug, info};
use polars::prelude::*;
use strum_macros::Display;

use crate::error::DataFormatError;
use crate::selection::Selection;
use crate::COL;

/// The dimensions a table can be indexed by, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Dimension {
    ScenarioDescriptor,
    FundingFraction,
    Country,
    Year,
    Indicator,
}

impl Dimension {
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::ScenarioDescriptor => COL::SCENARIO_DESCRIPTOR,
            Dimension::FundingFraction => COL::FUNDING_FRACTION,
            Dimension::Country => COL::COUNTRY,
            Dimension::Year => COL::YEAR,
            Dimension::Indicator => COL::INDICATOR,
        }
    }

    fn dtype(&self) -> DataType {
        match self {
            Dimension::FundingFraction => DataType::Float64,
            Dimension::Year => DataType::Int64,
            _ => DataType::String,
        }
    }
}

/// Shape of a canonical table: which dimensions index it and which value columns it holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableSchema {
    pub index: &'static [Dimension],
    pub values: &'static [&'static str],
    /// Whether value columns may hold missing entries (nulls or NaN)
    pub nullable_values: bool,
}

impl TableSchema {
    pub fn has(&self, dimension: Dimension) -> bool {
        self.index.contains(&dimension)
    }

    pub fn index_columns(&self) -> Vec<&'static str> {
        self.index.iter().map(Dimension::column).collect()
    }

    fn typed_columns(&self) -> Vec<(&'static str, DataType)> {
        self.index
            .iter()
            .map(|d| (d.column(), d.dtype()))
            .chain(self.values.iter().map(|v| (*v, DataType::Float64)))
            .collect()
    }
}

/// A funding fraction usable as an ordered map key.
#[derive(Clone, Copy, Debug)]
pub struct FundingFraction(pub f64);

impl PartialEq for FundingFraction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FundingFraction {}

impl PartialOrd for FundingFraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FundingFraction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for FundingFraction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl fmt::Display for FundingFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One index tuple. Dimensions a table is not indexed by are `None`; field order gives the
/// canonical sort order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    pub scenario_descriptor: Option<String>,
    pub funding_fraction: Option<FundingFraction>,
    pub country: Option<String>,
    pub year: i64,
    pub indicator: String,
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![];
        if let Some(scenario_descriptor) = &self.scenario_descriptor {
            parts.push(format!("scenario_descriptor='{scenario_descriptor}'"));
        }
        if let Some(funding_fraction) = &self.funding_fraction {
            parts.push(format!("funding_fraction={funding_fraction}"));
        }
        if let Some(country) = &self.country {
            parts.push(format!("country='{country}'"));
        }
        parts.push(format!("year={}", self.year));
        parts.push(format!("indicator='{}'", self.indicator));
        write!(f, "{}", parts.join(", "))
    }
}

/// Values stored against one index tuple. Tables with a single value column only fill `central`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Datum {
    pub low: Option<f64>,
    pub central: Option<f64>,
    pub high: Option<f64>,
}

impl Datum {
    pub fn get(&self, column: &str) -> Option<f64> {
        match column {
            COL::LOW => self.low,
            COL::CENTRAL => self.central,
            COL::HIGH => self.high,
            _ => None,
        }
    }

    /// The values that are present, in low, central, high order
    pub fn present(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            (COL::LOW, self.low),
            (COL::CENTRAL, self.central),
            (COL::HIGH, self.high),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }

    fn set(&mut self, column: &str, value: Option<f64>) {
        match column {
            COL::LOW => self.low = value,
            COL::CENTRAL => self.central = value,
            COL::HIGH => self.high = value,
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    source_name: String,
    schema: TableSchema,
    df: DataFrame,
    rows: BTreeMap<RowKey, Datum>,
    scenario_descriptors: BTreeSet<String>,
    funding_fractions: BTreeSet<FundingFraction>,
    countries: BTreeSet<String>,
    years: BTreeSet<i64>,
    indicators: BTreeSet<String>,
}

fn string_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<String>>> {
    Ok(df
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn float_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<f64>>> {
    Ok(df
        .column(column)?
        .f64()?
        .into_iter()
        .map(|v| v.filter(|v| !v.is_nan()))
        .collect())
}

fn int_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<i64>>> {
    Ok(df.column(column)?.i64()?.into_iter().collect())
}

impl Table {
    /// Reshapes `df` into the canonical indexed form described by `schema`. Extra columns are
    /// dropped; index columns are coerced to their canonical types and value columns to floats.
    pub fn from_df(
        df: DataFrame,
        schema: TableSchema,
        source_name: &str,
    ) -> Result<Self, DataFormatError> {
        let read_error = |e: PolarsError| DataFormatError::Read {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        };

        let present = df.get_column_names();
        let mut coerced: Vec<Series> = vec![];
        for (column, dtype) in schema.typed_columns() {
            if !present.contains(&column) {
                return Err(DataFormatError::MissingColumn {
                    source_name: source_name.to_string(),
                    column: column.to_string(),
                });
            }
            let series = df
                .column(column)
                .and_then(|s| s.strict_cast(&dtype))
                .map_err(|e| DataFormatError::Unparseable {
                    source_name: source_name.to_string(),
                    column: column.to_string(),
                    reason: e.to_string(),
                })?;
            coerced.push(series);
        }
        let df = DataFrame::new(coerced).map_err(read_error)?;
        let rows = Self::parse_rows(&df, schema, source_name)?;
        let df = df
            .sort(schema.index_columns(), SortMultipleOptions::default())
            .map_err(read_error)?;
        debug!("Built {source_name} with shape: {:?}", df.shape());

        let mut table = Table {
            source_name: source_name.to_string(),
            schema,
            df,
            rows: BTreeMap::new(),
            scenario_descriptors: BTreeSet::new(),
            funding_fractions: BTreeSet::new(),
            countries: BTreeSet::new(),
            years: BTreeSet::new(),
            indicators: BTreeSet::new(),
        };
        for key in rows.keys() {
            table.scenario_descriptors.extend(key.scenario_descriptor.clone());
            table.funding_fractions.extend(key.funding_fraction);
            table.countries.extend(key.country.clone());
            table.years.insert(key.year);
            table.indicators.insert(key.indicator.clone());
        }
        table.rows = rows;
        Ok(table)
    }

    fn parse_rows(
        df: &DataFrame,
        schema: TableSchema,
        source_name: &str,
    ) -> Result<BTreeMap<RowKey, Datum>, DataFormatError> {
        let read_error = |e: PolarsError| DataFormatError::Read {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        };
        let height = df.height();
        let strings = |dimension: Dimension| -> Result<Vec<Option<String>>, DataFormatError> {
            if schema.has(dimension) {
                string_values(df, dimension.column()).map_err(read_error)
            } else {
                Ok(vec![None; height])
            }
        };
        let scenario_descriptors = strings(Dimension::ScenarioDescriptor)?;
        let countries = strings(Dimension::Country)?;
        let indicators = string_values(df, COL::INDICATOR).map_err(read_error)?;
        let years = int_values(df, COL::YEAR).map_err(read_error)?;
        let funding_fractions = if schema.has(Dimension::FundingFraction) {
            float_values(df, COL::FUNDING_FRACTION).map_err(read_error)?
        } else {
            vec![None; height]
        };
        let values = schema
            .values
            .iter()
            .map(|column| float_values(df, column).map(|v| (*column, v)))
            .collect::<PolarsResult<Vec<_>>>()
            .map_err(read_error)?;

        let null_in_dimension = |dimension: Dimension, row: usize| DataFormatError::NullInDimension {
            source_name: source_name.to_string(),
            column: dimension.column().to_string(),
            row,
        };
        let required = |dimension: Dimension, present: bool, row: usize| {
            if schema.has(dimension) && !present {
                Err(null_in_dimension(dimension, row))
            } else {
                Ok(())
            }
        };

        let mut rows = BTreeMap::new();
        for row in 0..height {
            required(
                Dimension::ScenarioDescriptor,
                scenario_descriptors[row].is_some(),
                row,
            )?;
            required(
                Dimension::FundingFraction,
                funding_fractions[row].is_some(),
                row,
            )?;
            required(Dimension::Country, countries[row].is_some(), row)?;
            let year = years[row].ok_or_else(|| null_in_dimension(Dimension::Year, row))?;
            let indicator = indicators[row]
                .clone()
                .ok_or_else(|| null_in_dimension(Dimension::Indicator, row))?;

            let key = RowKey {
                scenario_descriptor: scenario_descriptors[row].clone(),
                funding_fraction: funding_fractions[row].map(FundingFraction),
                country: countries[row].clone(),
                year,
                indicator,
            };
            let mut datum = Datum::default();
            for (column, column_values) in &values {
                let value = column_values[row];
                if value.is_none() && !schema.nullable_values {
                    return Err(DataFormatError::NullValue {
                        source_name: source_name.to_string(),
                        column: column.to_string(),
                        row,
                    });
                }
                datum.set(column, value);
            }
            if rows.contains_key(&key) {
                return Err(DataFormatError::DuplicateKey {
                    source_name: source_name.to_string(),
                    key: key.to_string(),
                });
            }
            rows.insert(key, datum);
        }
        Ok(rows)
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn schema(&self) -> TableSchema {
        self.schema
    }

    /// The table as a `DataFrame` sorted by its index columns
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in index order
    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &Datum)> {
        self.rows.iter()
    }

    pub fn get(&self, key: &RowKey) -> Option<&Datum> {
        self.rows.get(key)
    }

    /// Rows matching `selection`, in index order
    pub fn select<'a>(
        &'a self,
        selection: &'a Selection,
    ) -> impl Iterator<Item = (&'a RowKey, &'a Datum)> + 'a {
        self.rows.iter().filter(|(key, _)| selection.matches(key))
    }

    /// Rows matching `selection` as a `DataFrame`
    pub fn filter(&self, selection: &Selection) -> PolarsResult<DataFrame> {
        match selection.to_expr(self.schema.index) {
            Some(expr) => self.df.clone().lazy().filter(expr).collect(),
            None => Ok(self.df.clone()),
        }
    }

    /// Sub-table for one country. Unset filters match every value.
    pub fn get_country(
        &self,
        country: &str,
        scenario_descriptor: Option<&str>,
        funding_fraction: Option<f64>,
        indicator: Option<&str>,
    ) -> PolarsResult<DataFrame> {
        let selection = Selection {
            scenario_descriptor: scenario_descriptor.map(str::to_string),
            funding_fraction,
            country: Some(country.to_string()),
            years: None,
            indicator: indicator.map(str::to_string),
        };
        info!("Selecting from {}: {selection:?}", self.source_name);
        self.filter(&selection)
    }

    pub fn get_scenarios(&self) -> &BTreeSet<String> {
        &self.scenario_descriptors
    }

    pub fn countries(&self) -> &BTreeSet<String> {
        &self.countries
    }

    pub fn indicators(&self) -> &BTreeSet<String> {
        &self.indicators
    }

    pub fn funding_fractions(&self) -> Vec<f64> {
        self.funding_fractions.iter().map(|ff| ff.0).collect()
    }

    pub fn years(&self) -> &BTreeSet<i64> {
        &self.years
    }

    /// Funding fractions present for each scenario descriptor
    pub fn funding_fractions_by_scenario(&self) -> BTreeMap<String, BTreeSet<FundingFraction>> {
        self.rows
            .keys()
            .filter_map(|key| {
                key.scenario_descriptor
                    .clone()
                    .zip(key.funding_fraction)
            })
            .into_group_map()
            .into_iter()
            .map(|(scenario, ffs)| (scenario, ffs.into_iter().collect()))
            .collect()
    }
}
