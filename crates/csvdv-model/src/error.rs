use thiserror::Error;

/// Errors raised while resolving a schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema must declare at least one column")]
    Empty,
    #[error("column name must not be empty (index {index})")]
    EmptyColumnName { index: usize },
    #[error("duplicate column name '{name}'")]
    DuplicateColumn { name: String },
}

/// Errors reported by a record sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record is incomplete: column {index} was never set")]
    IncompleteRecord { index: usize },
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
