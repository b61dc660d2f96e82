//! Parser configuration: the deserializable task and its normalized form.

mod options;
mod task;

pub use options::{EscapeChar, Newline, ParserConfig, QuoteChar, TokenizerOptions};
pub use task::{
    ColumnConfig, DEFAULT_MAX_QUOTED_SIZE_LIMIT, DefaultValueConfig, ParserTask, PolicyKind,
};
