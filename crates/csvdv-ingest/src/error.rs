//! Error types for CSV ingestion.
//!
//! Configuration errors are fatal and raised before any data is read.
//! Tokenizer and coercion errors are scoped to one record: the engine skips
//! the offending line unless `stop_on_invalid_record` is set, in which case
//! they surface as [`IngestError::InvalidRecord`].

use std::num::{ParseFloatError, ParseIntError};

use csvdv_model::{ColumnType, SchemaError, SinkError};
use thiserror::Error;

use crate::timestamp::TimestampParseError;

/// Invalid parser configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    // === Task decoding ===
    /// The task document could not be decoded.
    #[error("invalid parser task: {0}")]
    Task(String),

    /// The declared columns do not form a valid schema.
    #[error("invalid columns: {0}")]
    Schema(#[from] SchemaError),

    // === Tokenizer options ===
    #[error("'header_line' option is invalid if 'skip_header_lines' is set")]
    HeaderLineConflict,

    #[error("\"{option}\" option accepts only 1 character")]
    MultiCharacter { option: &'static str },

    #[error("\"delimiter\" option must not be empty")]
    EmptyDelimiter,

    #[error("unknown charset '{0}'")]
    UnknownCharset(String),

    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),

    // === Default values ===
    #[error("Unknown value_type '{0}', supported types are immediate, null")]
    UnknownPolicyKind(String),

    #[error("column {0} is not found")]
    UnknownDefaultColumn(String),

    #[error("default value are allowed for only long, double, timestamp (column '{column}' is {column_type})")]
    DisallowedDefaultType {
        column: String,
        column_type: ColumnType,
    },

    #[error("default_value is not set to column '{0}'")]
    MissingDefaultLiteral(String),

    #[error("default_value is set to column '{0}', even though type is null")]
    UnexpectedDefaultLiteral(String),

    #[error("null value is not allowed for {column_type} (column '{column}')")]
    NullDefaultForNumeric {
        column: String,
        column_type: ColumnType,
    },
}

/// Errors raised while splitting lines into fields.
#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("Too few columns")]
    TooFewColumns,

    #[error("Too many columns")]
    TooManyColumns,

    #[error("{0}")]
    InvalidValue(String),

    #[error("The size of the quoted value exceeds the limit size ({limit})")]
    QuotedSizeLimitExceeded { limit: usize },

    #[error("no current line to read fields from")]
    NoCurrentLine,

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenizeError {
    /// True for malformed-data errors that only invalidate the current record.
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            Self::TooFewColumns
                | Self::TooManyColumns
                | Self::InvalidValue(_)
                | Self::QuotedSizeLimitExceeded { .. }
        )
    }
}

/// Why a raw field could not be turned into its declared type.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("{0}")]
    Integer(#[from] ParseIntError),
    #[error("{0}")]
    Float(#[from] ParseFloatError),
    #[error("'{0}' is not a decimal number")]
    FloatSpelling(String),
    #[error("{0}")]
    Timestamp(#[from] TimestampParseError),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// A field that could not be coerced and had no usable default.
#[derive(Debug, Error)]
pub enum CoercionError {
    #[error("failed to parse '{value}' as {column_type} for column '{column}': {cause}")]
    Parse {
        column: String,
        column_type: ColumnType,
        value: String,
        #[source]
        cause: ParseFailure,
    },

    #[error("failed to apply default value '{literal}' to column '{column}': {cause}")]
    DefaultLiteral {
        column: String,
        literal: String,
        #[source]
        cause: ParseFailure,
    },
}

/// Failure while building one record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// A default value policy that can never apply to its column.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RecordError {
    /// True when the engine may skip the line and keep going.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Tokenize(err) => err.is_invalid_format(),
            Self::Coercion(_) => true,
            Self::Config(_) => false,
        }
    }
}

/// Errors that end an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A bad record under `stop_on_invalid_record`.
    #[error("Invalid record at line {line_number}: {line}")]
    InvalidRecord {
        file_index: usize,
        line_number: u64,
        line: String,
        #[source]
        source: RecordError,
    },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("tokenizer error: {0}")]
    Tokenizer(TokenizeError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

impl From<TokenizeError> for IngestError {
    fn from(err: TokenizeError) -> Self {
        match err {
            TokenizeError::Io(io) => Self::Io(io),
            other => Self::Tokenizer(other),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::UnknownDefaultColumn("longCol".to_string());
        assert_eq!(err.to_string(), "column longCol is not found");

        let err = TokenizeError::QuotedSizeLimitExceeded { limit: 16 };
        assert_eq!(
            err.to_string(),
            "The size of the quoted value exceeds the limit size (16)"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(RecordError::from(TokenizeError::TooFewColumns).is_recoverable());
        assert!(!RecordError::from(TokenizeError::Io(std::io::Error::other("boom"))).is_recoverable());
        assert!(
            !RecordError::from(ConfigError::NullDefaultForNumeric {
                column: "n".to_string(),
                column_type: ColumnType::Long,
            })
            .is_recoverable()
        );
    }

    #[test]
    fn test_tokenize_io_maps_to_ingest_io() {
        let err: IngestError = TokenizeError::Io(std::io::Error::other("boom")).into();
        assert!(matches!(err, IngestError::Io(_)));
    }
}
