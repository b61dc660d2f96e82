//! Normalized, immutable parser configuration.

use std::collections::BTreeMap;

use csvdv_model::Schema;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use super::task::DefaultValueConfig;
use crate::error::ConfigError;
use crate::timestamp::TimestampParser;

/// Separator re-inserted between the physical lines of a multi-line quoted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Newline {
    #[default]
    #[serde(rename = "CRLF")]
    Crlf,
    #[serde(rename = "LF")]
    Lf,
    #[serde(rename = "CR")]
    Cr,
}

impl Newline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Newline::Crlf => "\r\n",
            Newline::Lf => "\n",
            Newline::Cr => "\r",
        }
    }
}

/// Quote character; `None` disables quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteChar(Option<char>);

impl QuoteChar {
    pub const fn new(c: char) -> Self {
        Self(Some(c))
    }

    pub const fn none() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<char> {
        self.0
    }

    /// Resolves the `quote` option. An empty string falls back to `"`.
    pub fn from_option(value: Option<&str>) -> Result<Self, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::none());
        };
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (None, _) => {
                tracing::warn!(
                    "Setting '' (empty string) to \"quote\" option is obsoleted. \
                     It falls back to '\"'; please set '\"' explicitly."
                );
                Ok(Self::new('"'))
            }
            (Some(c), None) => Ok(Self::new(c)),
            (Some(_), Some(_)) => Err(ConfigError::MultiCharacter { option: "quote" }),
        }
    }
}

impl Default for QuoteChar {
    fn default() -> Self {
        Self::new('"')
    }
}

/// Escape character used inside quoted values; `None` disables escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeChar(Option<char>);

impl EscapeChar {
    pub const fn new(c: char) -> Self {
        Self(Some(c))
    }

    pub const fn none() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<char> {
        self.0
    }

    /// Resolves the `escape` option. An empty string disables escaping.
    pub fn from_option(value: Option<&str>) -> Result<Self, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::none());
        };
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (None, _) => {
                tracing::warn!(
                    "Setting '' (empty string) to \"escape\" option is obsoleted. \
                     It disables escaping; please set \"escape: null\" explicitly."
                );
                Ok(Self::none())
            }
            (Some(c), None) => Ok(Self::new(c)),
            (Some(_), Some(_)) => Err(ConfigError::MultiCharacter { option: "escape" }),
        }
    }
}

impl Default for EscapeChar {
    fn default() -> Self {
        Self::new('\\')
    }
}

/// Options consumed by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerOptions {
    pub delimiter: String,
    pub quote: QuoteChar,
    pub escape: EscapeChar,
    pub newline: Newline,
    pub null_string: Option<String>,
    pub trim_if_not_quoted: bool,
    pub max_quoted_size_limit: usize,
    pub comment_line_marker: Option<String>,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            quote: QuoteChar::default(),
            escape: EscapeChar::default(),
            newline: Newline::default(),
            null_string: None,
            trim_if_not_quoted: false,
            max_quoted_size_limit: super::task::DEFAULT_MAX_QUOTED_SIZE_LIMIT as usize,
            comment_line_marker: None,
        }
    }
}

/// Fully resolved configuration shared read-only by engine instances.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub schema: Schema,
    pub tokenizer: TokenizerOptions,
    pub skip_header_lines: usize,
    pub allow_optional_columns: bool,
    pub allow_extra_columns: bool,
    pub stop_on_invalid_record: bool,
    /// Raw per-column default value settings, validated when an engine is built.
    pub default_values: BTreeMap<String, DefaultValueConfig>,
    /// One parser per column; `Some` only for timestamp columns.
    pub timestamp_parsers: Vec<Option<TimestampParser>>,
    pub charset: &'static Encoding,
}

impl ParserConfig {
    pub fn timestamp_parser(&self, index: usize) -> Option<&TimestampParser> {
        self.timestamp_parsers.get(index).and_then(Option::as_ref)
    }
}
