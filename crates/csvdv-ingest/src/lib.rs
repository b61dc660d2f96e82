//! Tolerant typed CSV ingestion.
//!
//! Raw delimited text is split into fields by [`CsvTokenizer`], each field is
//! parsed into its column's declared type by [`ColumnCoercer`], and
//! [`ParserEngine`] drives whole records into a [`RecordSink`], skipping (or
//! failing on) records that cannot be read.
//!
//! When a numeric or timestamp field does not parse, a per-column default
//! value policy may substitute a configured literal or an explicit null.
//!
//! # Example
//!
//! ```ignore
//! use csvdv_ingest::{ParserEngine, ParserTask};
//! use csvdv_model::VecSink;
//!
//! let task = ParserTask::from_json_str(r#"{
//!     "columns": [{"name": "id", "type": "long"}, {"name": "name", "type": "string"}],
//!     "skip_header_lines": 1
//! }"#)?;
//! let engine = ParserEngine::from_task(task)?;
//! let mut sink = VecSink::new();
//! let summary = engine.run_files(["people.csv"], &mut sink)?;
//! println!("{} records, {} skipped", summary.records, summary.skipped_count());
//! ```
//!
//! [`RecordSink`]: csvdv_model::RecordSink

pub mod coerce;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod source;
pub mod summary;
pub mod timestamp;
pub mod tokenizer;

pub use coerce::{ColumnCoercer, TRUE_STRINGS, parse_double, parse_typed};
pub use config::{
    ColumnConfig, DefaultValueConfig, EscapeChar, Newline, ParserConfig, ParserTask, PolicyKind,
    QuoteChar, TokenizerOptions,
};
pub use defaults::{DefaultTarget, DefaultValuePolicy, DefaultValueResolver};
pub use engine::ParserEngine;
pub use error::{
    CoercionError, ConfigError, IngestError, ParseFailure, RecordError, Result, TokenizeError,
};
pub use source::{DecodingLineSource, Input, LineSource, MemoryLineSource, split_lines};
pub use summary::{RunSummary, SkippedLine};
pub use timestamp::{ColumnTimezone, TimestampParseError, TimestampParser};
pub use tokenizer::{CsvTokenizer, encode_field, encode_record};
