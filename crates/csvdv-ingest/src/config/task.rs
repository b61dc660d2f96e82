//! Parser task: the user-facing configuration document.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use csvdv_model::{ColumnType, Schema};
use serde::{Deserialize, Deserializer, Serialize};

use super::options::{EscapeChar, Newline, ParserConfig, QuoteChar, TokenizerOptions};
use crate::error::ConfigError;
use crate::timestamp::{DEFAULT_TIMESTAMP_FORMAT, DEFAULT_TIMEZONE, TimestampParser};

/// 128 KiB.
pub const DEFAULT_MAX_QUOTED_SIZE_LIMIT: u64 = 131_072;

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Timestamp format for this column (defaults to `default_timestamp_format`).
    #[serde(default)]
    pub format: Option<String>,
    /// Timezone for timestamps without an offset (defaults to `default_timezone`).
    #[serde(default)]
    pub timezone: Option<String>,
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            format: None,
            timezone: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Kind of a default value policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolicyKind {
    #[default]
    Immediate,
    Null,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Immediate => "immediate",
            PolicyKind::Null => "null",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(PolicyKind::Immediate),
            "null" => Ok(PolicyKind::Null),
            other => Err(ConfigError::UnknownPolicyKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for PolicyKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PolicyKind> for String {
    fn from(kind: PolicyKind) -> Self {
        kind.as_str().to_string()
    }
}

/// `default_values.<column>` entry as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultValueConfig {
    #[serde(default, deserialize_with = "deserialize_literal")]
    pub default_value: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: PolicyKind,
}

impl DefaultValueConfig {
    pub fn immediate(literal: impl Into<String>) -> Self {
        Self {
            default_value: Some(literal.into()),
            kind: PolicyKind::Immediate,
        }
    }

    pub fn null() -> Self {
        Self {
            default_value: None,
            kind: PolicyKind::Null,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarLiteral {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

/// Accepts strings and JSON scalars, keeping their textual form (`123` -> `"123"`).
fn deserialize_literal<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let literal = Option::<ScalarLiteral>::deserialize(deserializer)?;
    Ok(literal.map(|literal| match literal {
        ScalarLiteral::Text(text) => text,
        ScalarLiteral::Integer(value) => value.to_string(),
        ScalarLiteral::Float(value) => value.to_string(),
        ScalarLiteral::Boolean(value) => value.to_string(),
    }))
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_quote() -> Option<String> {
    Some("\"".to_string())
}

fn default_escape() -> Option<String> {
    Some("\\".to_string())
}

fn default_max_quoted_size_limit() -> u64 {
    DEFAULT_MAX_QUOTED_SIZE_LIMIT
}

fn default_charset() -> String {
    "utf-8".to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

/// Parser options as loaded from a task document.
///
/// Call [`ParserTask::normalize`] once to obtain the immutable [`ParserConfig`]
/// the engine runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserTask {
    pub columns: Vec<ColumnConfig>,

    /// Legacy switch; `true` is the same as `skip_header_lines: 1`.
    #[serde(default)]
    pub header_line: Option<bool>,

    #[serde(default)]
    pub skip_header_lines: usize,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// `null` disables quoting.
    #[serde(default = "default_quote")]
    pub quote: Option<String>,

    /// `null` disables escaping.
    #[serde(default = "default_escape")]
    pub escape: Option<String>,

    #[serde(default)]
    pub null_string: Option<String>,

    #[serde(default)]
    pub trim_if_not_quoted: bool,

    #[serde(default = "default_max_quoted_size_limit")]
    pub max_quoted_size_limit: u64,

    #[serde(default)]
    pub comment_line_marker: Option<String>,

    #[serde(default)]
    pub allow_optional_columns: bool,

    #[serde(default)]
    pub allow_extra_columns: bool,

    #[serde(default)]
    pub stop_on_invalid_record: bool,

    #[serde(default)]
    pub default_values: BTreeMap<String, DefaultValueConfig>,

    #[serde(default = "default_charset")]
    pub charset: String,

    #[serde(default)]
    pub newline: Newline,

    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    #[serde(default = "default_timestamp_format")]
    pub default_timestamp_format: String,
}

impl ParserTask {
    /// Task with the given columns and every other option at its default.
    pub fn new(columns: Vec<ColumnConfig>) -> Self {
        Self {
            columns,
            header_line: None,
            skip_header_lines: 0,
            delimiter: default_delimiter(),
            quote: default_quote(),
            escape: default_escape(),
            null_string: None,
            trim_if_not_quoted: false,
            max_quoted_size_limit: DEFAULT_MAX_QUOTED_SIZE_LIMIT,
            comment_line_marker: None,
            allow_optional_columns: false,
            allow_extra_columns: false,
            stop_on_invalid_record: false,
            default_values: BTreeMap::new(),
            charset: default_charset(),
            newline: Newline::default(),
            default_timezone: default_timezone(),
            default_timestamp_format: default_timestamp_format(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Task(e.to_string()))
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Task(e.to_string()))
    }

    /// Header lines to skip per file after folding in the legacy `header_line` flag.
    pub fn resolved_skip_header_lines(&self) -> Result<usize, ConfigError> {
        match self.header_line {
            Some(_) if self.skip_header_lines > 0 => Err(ConfigError::HeaderLineConflict),
            Some(true) => Ok(1),
            Some(false) => Ok(0),
            None => Ok(self.skip_header_lines),
        }
    }

    /// Validates and resolves every option into a [`ParserConfig`].
    pub fn normalize(self) -> Result<ParserConfig, ConfigError> {
        let skip_header_lines = self.resolved_skip_header_lines()?;

        if self.delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        let quote = QuoteChar::from_option(self.quote.as_deref())?;
        let escape = EscapeChar::from_option(self.escape.as_deref())?;
        let charset = encoding_rs::Encoding::for_label(self.charset.trim().as_bytes())
            .ok_or_else(|| ConfigError::UnknownCharset(self.charset.clone()))?;

        let schema = Schema::from_columns(
            self.columns
                .iter()
                .map(|column| (column.name.clone(), column.column_type)),
        )?;

        // Validate the default timezone even when no column uses it.
        TimestampParser::new(self.default_timestamp_format.as_str(), &self.default_timezone)?;
        let timestamp_parsers = self
            .columns
            .iter()
            .map(|column| match column.column_type {
                ColumnType::Timestamp => {
                    let format = column
                        .format
                        .as_deref()
                        .unwrap_or(&self.default_timestamp_format);
                    let timezone = column.timezone.as_deref().unwrap_or(&self.default_timezone);
                    TimestampParser::new(format, timezone).map(Some)
                }
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tokenizer = TokenizerOptions {
            delimiter: self.delimiter,
            quote,
            escape,
            newline: self.newline,
            null_string: self.null_string,
            trim_if_not_quoted: self.trim_if_not_quoted,
            max_quoted_size_limit: usize::try_from(self.max_quoted_size_limit).unwrap_or(usize::MAX),
            comment_line_marker: self.comment_line_marker.filter(|marker| !marker.is_empty()),
        };

        Ok(ParserConfig {
            schema,
            tokenizer,
            skip_header_lines,
            allow_optional_columns: self.allow_optional_columns,
            allow_extra_columns: self.allow_extra_columns,
            stop_on_invalid_record: self.stop_on_invalid_record,
            default_values: self.default_values,
            timestamp_parsers,
            charset,
        })
    }
}
