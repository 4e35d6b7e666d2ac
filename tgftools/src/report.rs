//! Collation of check results and analysis results into a payload-agnostic [`Document`] that
//! the renderers in `formatters` consume.

use strum_macros::Display;

use crate::checks::{Message, Severity};
use crate::stats::AnalysisResults;

/// The outcome of one check within a run.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub passes: bool,
    pub message: Message,
}

impl CheckReport {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Outcome {
    #[strum(serialize = "All checks passed.")]
    AllPassed,
    #[strum(serialize = "Some checks have failed, but none are CRITICAL.")]
    NonCriticalFailures,
    #[strum(serialize = "Some checks have failed, including some that are CRITICAL.")]
    CriticalFailures,
}

/// Every check outcome of one run, in the order the checks were run.
#[derive(Debug, Clone)]
pub struct ConsolidatedChecksReport {
    pub title: String,
    pub description: String,
    /// Sources the checked database was built from
    pub files: Vec<String>,
    reports: Vec<CheckReport>,
}

impl ConsolidatedChecksReport {
    pub fn new(
        title: String,
        description: String,
        files: Vec<String>,
        reports: Vec<CheckReport>,
    ) -> Self {
        Self {
            title,
            description,
            files,
            reports,
        }
    }

    pub fn reports(&self) -> &[CheckReport] {
        &self.reports
    }

    pub fn get(&self, name: &str) -> Option<&CheckReport> {
        self.reports.iter().find(|r| r.name == name)
    }

    pub fn passing_checks(&self) -> impl Iterator<Item = &CheckReport> {
        self.reports.iter().filter(|r| r.passes)
    }

    pub fn critical_failing_checks(&self) -> impl Iterator<Item = &CheckReport> {
        self.reports.iter().filter(|r| !r.passes && r.is_critical())
    }

    pub fn non_critical_failing_checks(&self) -> impl Iterator<Item = &CheckReport> {
        self.reports.iter().filter(|r| !r.passes && !r.is_critical())
    }

    pub fn any_fails(&self) -> bool {
        self.reports.iter().any(|r| !r.passes)
    }

    pub fn outcome(&self) -> Outcome {
        if self.critical_failing_checks().next().is_some() {
            Outcome::CriticalFailures
        } else if self.any_fails() {
            Outcome::NonCriticalFailures
        } else {
            Outcome::AllPassed
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub name: String,
    pub description: String,
    /// "PASS"/"FAIL" for checks; absent for analysis results
    pub status: Option<String>,
    pub payload: Message,
}

#[derive(Debug, Clone)]
pub struct DocumentSection {
    pub heading: String,
    pub entries: Vec<DocumentEntry>,
}

/// A collated report ready for rendering.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub description: String,
    pub files: Vec<String>,
    pub verdict: Option<String>,
    pub sections: Vec<DocumentSection>,
}

fn check_entry(report: &CheckReport) -> DocumentEntry {
    DocumentEntry {
        name: report.name.clone(),
        description: report.description.clone(),
        status: Some(if report.passes { "PASS" } else { "FAIL" }.to_string()),
        payload: report.message.clone(),
    }
}

impl From<&ConsolidatedChecksReport> for Document {
    fn from(report: &ConsolidatedChecksReport) -> Self {
        let section = |heading: &str, entries: Vec<DocumentEntry>| DocumentSection {
            heading: heading.to_string(),
            entries,
        };
        Document {
            title: report.title.clone(),
            description: report.description.clone(),
            files: report.files.clone(),
            verdict: Some(report.outcome().to_string()),
            sections: vec![
                section(
                    "CRITICAL FAILING CHECKS",
                    report.critical_failing_checks().map(check_entry).collect(),
                ),
                section(
                    "NON-CRITICAL FAILING CHECKS",
                    report.non_critical_failing_checks().map(check_entry).collect(),
                ),
                section(
                    "PASSING CHECKS",
                    report.passing_checks().map(check_entry).collect(),
                ),
            ],
        }
    }
}

impl TryFrom<&AnalysisResults> for Document {
    type Error = polars::error::PolarsError;

    fn try_from(results: &AnalysisResults) -> Result<Self, Self::Error> {
        let mut entries = vec![DocumentEntry {
            name: "stats".to_string(),
            description: "Named numeric results".to_string(),
            status: None,
            payload: Message::Table(results.main_table()?),
        }];
        entries.extend(results.tables.iter().map(|(name, df)| DocumentEntry {
            name: name.clone(),
            description: String::new(),
            status: None,
            payload: Message::Table(df.clone()),
        }));
        Ok(Document {
            title: results.title.clone(),
            description: String::new(),
            files: results.files.clone(),
            verdict: None,
            sections: vec![DocumentSection {
                heading: "RESULTS".to_string(),
                entries,
            }],
        })
    }
}
