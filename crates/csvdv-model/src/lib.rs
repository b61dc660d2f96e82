//! Data model shared by the csvdv crates.
//!
//! - [`Schema`] / [`Column`] / [`ColumnType`]: the resolved, ordered column list
//! - [`Value`] / [`TypedRecord`]: typed output values
//! - [`RecordSink`] / [`RecordBuilder`]: where committed records go

pub mod error;
pub mod schema;
pub mod sink;
pub mod value;

pub use error::{Result, SchemaError, SinkError};
pub use schema::{Column, ColumnType, Schema};
pub use sink::{RecordBuilder, RecordSink, VecSink};
pub use value::{TypedRecord, Value};
