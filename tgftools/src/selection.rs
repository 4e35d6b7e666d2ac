//! Filters over the canonical index dimensions, usable both as polars expressions on a table's
//! `DataFrame` and as predicates on its parsed row keys.

use std::str::FromStr;

use polars::lazy::dsl::{col, lit, Expr};
use serde::{Deserialize, Serialize};

use crate::error::TgfError;
use crate::table::{Dimension, RowKey};
use crate::COL;

/// Inclusive range of years.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum YearRange {
    Before(i64),
    After(i64),
    Between(i64, i64),
}

impl YearRange {
    pub fn contains(&self, year: i64) -> bool {
        match self {
            YearRange::Before(end) => year <= *end,
            YearRange::After(start) => year >= *start,
            YearRange::Between(start, end) => *start <= year && year <= *end,
        }
    }
}

impl From<YearRange> for Expr {
    fn from(value: YearRange) -> Self {
        match value {
            YearRange::Before(year) => col(COL::YEAR).lt_eq(lit(year)),
            YearRange::After(year) => col(COL::YEAR).gt_eq(lit(year)),
            YearRange::Between(start, end) => col(COL::YEAR)
                .gt_eq(lit(start))
                .and(col(COL::YEAR).lt_eq(lit(end))),
        }
    }
}

/// Parses `2015`, `...2020`, `2010...` or `2010...2020`. Both bounds are inclusive.
impl FromStr for YearRange {
    type Err = TgfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TgfError::InvalidYearRange {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let year = |value: &str| -> Result<Option<i64>, TgfError> {
            let value = value.trim();
            if value.is_empty() {
                return Ok(None);
            }
            value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid(&format!("'{value}' is not a year")))
        };
        let bounds = match s.split_once("...") {
            Some((start, end)) => (year(start)?, year(end)?),
            None => {
                let single = year(s)?;
                (single, single)
            }
        };
        match bounds {
            (Some(start), Some(end)) if start > end => {
                Err(invalid("first year is after the last year"))
            }
            (Some(start), Some(end)) => Ok(YearRange::Between(start, end)),
            (None, Some(end)) => Ok(YearRange::Before(end)),
            (Some(start), None) => Ok(YearRange::After(start)),
            (None, None) => Err(invalid("no year given")),
        }
    }
}

/// A conjunction of optional filters. Unset fields match every value.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Selection {
    pub scenario_descriptor: Option<String>,
    pub funding_fraction: Option<f64>,
    pub country: Option<String>,
    pub years: Option<YearRange>,
    pub indicator: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scenario_descriptor(mut self, scenario_descriptor: impl Into<String>) -> Self {
        self.scenario_descriptor = Some(scenario_descriptor.into());
        self
    }

    pub fn funding_fraction(mut self, funding_fraction: f64) -> Self {
        self.funding_fraction = Some(funding_fraction);
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn years(mut self, years: YearRange) -> Self {
        self.years = Some(years);
        self
    }

    pub fn indicator(mut self, indicator: impl Into<String>) -> Self {
        self.indicator = Some(indicator.into());
        self
    }

    /// Builds the filter expression for a table indexed by `index`. Filters on dimensions the
    /// table does not have are ignored.
    pub fn to_expr(&self, index: &[Dimension]) -> Option<Expr> {
        let mut exprs: Vec<Expr> = vec![];
        for dimension in index {
            let expr = match dimension {
                Dimension::ScenarioDescriptor => self
                    .scenario_descriptor
                    .as_ref()
                    .map(|s| col(COL::SCENARIO_DESCRIPTOR).eq(lit(s.clone()))),
                Dimension::FundingFraction => self
                    .funding_fraction
                    .map(|ff| col(COL::FUNDING_FRACTION).eq(lit(ff))),
                Dimension::Country => self
                    .country
                    .as_ref()
                    .map(|c| col(COL::COUNTRY).eq(lit(c.clone()))),
                Dimension::Year => self.years.map(Expr::from),
                Dimension::Indicator => self
                    .indicator
                    .as_ref()
                    .map(|i| col(COL::INDICATOR).eq(lit(i.clone()))),
            };
            exprs.extend(expr);
        }
        exprs.into_iter().reduce(|query, expr| query.and(expr))
    }

    pub fn matches(&self, key: &RowKey) -> bool {
        fn matches_dimension<T: PartialEq + ?Sized>(filter: Option<&T>, value: Option<&T>) -> bool {
            match (filter, value) {
                (Some(filter), Some(value)) => filter == value,
                _ => true,
            }
        }
        matches_dimension(
            self.scenario_descriptor.as_deref(),
            key.scenario_descriptor.as_deref(),
        ) && matches_dimension(
            self.funding_fraction.as_ref(),
            key.funding_fraction.as_ref().map(|ff| &ff.0),
        ) && matches_dimension(self.country.as_deref(), key.country.as_deref())
            && self.years.map_or(true, |years| years.contains(key.year))
            && self.indicator.as_deref().map_or(true, |i| i == key.indicator)
    }
}
