//! The check engine: named checks registered on a collection, executed in name order against a
//! [`Database`] and collected into a [`ConsolidatedChecksReport`].

use std::collections::BTreeMap;

use log::{info, warn};
use polars::frame::DataFrame;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::database::Database;
use crate::error::{Result, TgfError};
use crate::report::{CheckReport, ConsolidatedChecksReport};

pub mod common;

pub use common::CommonChecks;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// A declarative line chart. Rendering is left to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<FigureSeries>,
}

/// Payload attached to a check result.
#[derive(Debug, Clone, Default, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Message {
    #[default]
    Empty,
    Text(String),
    TextList(Vec<String>),
    Table(DataFrame),
    TableList(Vec<DataFrame>),
    FigureList(Vec<Figure>),
}

impl Message {
    pub fn is_empty(&self) -> bool {
        match self {
            Message::Empty => true,
            Message::Text(text) => text.is_empty(),
            Message::TextList(items) => items.is_empty(),
            Message::Table(df) => df.height() == 0,
            Message::TableList(tables) => tables.iter().all(|df| df.height() == 0),
            Message::FigureList(figures) => figures.is_empty(),
        }
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_string())
    }
}

impl From<Vec<String>> for Message {
    fn from(value: Vec<String>) -> Self {
        Message::TextList(value)
    }
}

impl From<DataFrame> for Message {
    fn from(value: DataFrame) -> Self {
        Message::Table(value)
    }
}

impl From<Vec<DataFrame>> for Message {
    fn from(value: Vec<DataFrame>) -> Self {
        Message::TableList(value)
    }
}

impl From<Vec<Figure>> for Message {
    fn from(value: Vec<Figure>) -> Self {
        Message::FigureList(value)
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passes: bool,
    pub message: Message,
}

impl CheckResult {
    pub fn pass() -> Self {
        Self {
            passes: true,
            message: Message::Empty,
        }
    }

    /// A passing result carrying informational content
    pub fn pass_with(message: impl Into<Message>) -> Self {
        Self {
            passes: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<Message>) -> Self {
        Self {
            passes: false,
            message: message.into(),
        }
    }

    /// Passes iff there are no failures, otherwise reports one entry per failure.
    pub fn from_failures(failures: Vec<String>) -> Self {
        if failures.is_empty() {
            Self::pass()
        } else {
            Self::fail(failures)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum Severity {
    #[strum(serialize = "CRITICAL")]
    Critical,
    #[strum(serialize = "NON-CRITICAL")]
    NonCritical,
}

pub type CheckFn<T> = fn(&T, &Database) -> anyhow::Result<CheckResult>;

pub struct Check<T> {
    pub description: &'static str,
    pub severity: Severity,
    pub func: CheckFn<T>,
}

/// Checks keyed by name. Iteration is in lexical name order.
pub struct CheckRegistry<T> {
    checks: BTreeMap<&'static str, Check<T>>,
}

impl<T> Default for CheckRegistry<T> {
    fn default() -> Self {
        Self {
            checks: BTreeMap::new(),
        }
    }
}

impl<T> CheckRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a check. A name can only be registered once; later registrations are ignored.
    pub fn register(
        mut self,
        name: &'static str,
        severity: Severity,
        description: &'static str,
        func: CheckFn<T>,
    ) -> Self {
        if self.checks.contains_key(name) {
            warn!("Check '{name}' is already registered, ignoring duplicate");
            return self;
        }
        self.checks.insert(
            name,
            Check {
                description,
                severity,
                func,
            },
        );
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.checks.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Check<T>)> {
        self.checks.iter().map(|(name, check)| (*name, check))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Return the report even when checks fail instead of `TgfError::ChecksFailed`
    pub suppress_error: bool,
}

/// A named collection of checks over a [`Database`].
pub trait DatabaseChecks: Sized {
    fn title(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }

    fn registry(&self) -> CheckRegistry<Self>;

    /// Runs every registered check in name order. A check that returns an error aborts the run
    /// with `TgfError::CheckErrored`; data-quality failures are collected and, unless
    /// suppressed, returned as `TgfError::ChecksFailed` once every check has run.
    fn run(&self, db: &Database, options: &RunOptions) -> Result<ConsolidatedChecksReport> {
        let registry = self.registry();
        info!("Running {} checks: {}", registry.len(), self.title());
        let mut reports: Vec<CheckReport> = Vec::with_capacity(registry.len());
        for (name, check) in registry.iter() {
            info!("Running check {name}");
            let mut result = (check.func)(self, db).map_err(|source| TgfError::CheckErrored {
                name: name.to_string(),
                source,
            })?;
            if !result.passes && result.message.is_empty() {
                result.message = Message::Text(format!("Check '{name}' failed."));
            }
            if result.passes {
                info!("Check {name} passed");
            } else {
                warn!("Check {name} failed ({})", check.severity);
            }
            reports.push(CheckReport {
                name: name.to_string(),
                description: check.description.to_string(),
                severity: check.severity,
                passes: result.passes,
                message: result.message,
            });
        }
        let report =
            ConsolidatedChecksReport::new(self.title(), self.description(), db.sources(), reports);
        info!("{}", report.outcome());
        if report.any_fails() && !options.suppress_error {
            return Err(TgfError::ChecksFailed(Box::new(report)));
        }
        Ok(report)
    }
}
