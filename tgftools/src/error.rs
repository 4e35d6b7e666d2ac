//! Error types.

use crate::report::ConsolidatedChecksReport;

/// Errors raised while reshaping a raw source into the canonical indexed table. Each variant
/// names the offending source so a failed load can be traced back to the file.
#[derive(thiserror::Error, Debug)]
pub enum DataFormatError {
    #[error("{source_name}: could not read delimited text: {reason}")]
    Read { source_name: String, reason: String },
    #[error("{source_name}: could not open file: {error}")]
    Io {
        source_name: String,
        error: std::io::Error,
    },
    #[error("{source_name}: required column '{column}' is missing")]
    MissingColumn { source_name: String, column: String },
    #[error("{source_name}: column '{column}' has unparseable values: {reason}")]
    Unparseable {
        source_name: String,
        column: String,
        reason: String,
    },
    #[error("{source_name}: missing value in index column '{column}' at row {row}")]
    NullInDimension {
        source_name: String,
        column: String,
        row: usize,
    },
    #[error("{source_name}: missing value in column '{column}' at row {row}")]
    NullValue {
        source_name: String,
        column: String,
        row: usize,
    },
    #[error("{source_name}: duplicate index key ({key})")]
    DuplicateKey { source_name: String, key: String },
}

#[derive(thiserror::Error, Debug)]
pub enum TgfError {
    #[error("Data format error: {0}")]
    DataFormat(#[from] DataFormatError),
    #[error("Invalid parameters: {0}")]
    Parameters(String),
    #[error("Invalid parameters file: {0}")]
    ParametersToml(#[from] toml::de::Error),
    #[error("Invalid year range '{input}': {reason}")]
    InvalidYearRange { input: String, reason: String },
    #[error("Disease not found in parameters: {0}")]
    UnknownDisease(String),
    #[error("Data sources refer to different diseases: expected '{expected}', found '{found}'")]
    DiseaseMismatch { expected: String, found: String },
    #[error("Check '{name}' raised an error")]
    CheckErrored {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Analysis function '{name}' raised an error")]
    AnalysisErrored {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Some checks have failed.")]
    ChecksFailed(Box<ConsolidatedChecksReport>),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TgfError>;

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_anyhow() {
        let anyhow_error = anyhow!("An anyhow error");
        let tgf_error: TgfError = anyhow_error.into();
        assert_eq!(tgf_error.to_string(), "Wrapped anyhow error: An anyhow error");
    }

    #[test]
    fn data_format_error_names_source_and_column() {
        let error: TgfError = DataFormatError::MissingColumn {
            source_name: "model_results.csv".into(),
            column: "year".into(),
        }
        .into();
        let message = error.to_string();
        assert!(message.contains("model_results.csv"));
        assert!(message.contains("'year'"));
    }
}
