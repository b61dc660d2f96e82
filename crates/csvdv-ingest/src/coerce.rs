//! Turning raw fields into typed values, column by column.

use csvdv_model::{Column, ColumnType, RecordBuilder, RecordSink, Value};

use crate::config::ParserConfig;
use crate::defaults::{DefaultTarget, DefaultValueResolver};
use crate::error::{CoercionError, ConfigError, ParseFailure, RecordError};
use crate::source::LineSource;
use crate::timestamp::TimestampParser;
use crate::tokenizer::CsvTokenizer;

/// Field values read as `true` by boolean columns. Anything else is `false`.
pub const TRUE_STRINGS: [&str; 14] = [
    "true", "True", "TRUE", "yes", "Yes", "YES", "t", "T", "y", "Y", "on", "On", "ON", "1",
];

/// Parses one non-null field as `column_type`.
///
/// `timestamp` is the column's parser and only consulted for timestamp columns.
pub fn parse_typed(
    column_type: ColumnType,
    raw: &str,
    timestamp: Option<&TimestampParser>,
) -> Result<Value, ParseFailure> {
    match column_type {
        ColumnType::Boolean => Ok(Value::Boolean(TRUE_STRINGS.contains(&raw))),
        ColumnType::Long => Ok(Value::Long(raw.parse()?)),
        ColumnType::Double => Ok(Value::Double(parse_double(raw)?)),
        ColumnType::String => Ok(Value::String(raw.to_string())),
        ColumnType::Timestamp => {
            let parsed = match timestamp {
                Some(parser) => parser.parse(raw)?,
                None => TimestampParser::default().parse(raw)?,
            };
            Ok(Value::Timestamp(parsed))
        }
        ColumnType::Json => Ok(Value::Json(serde_json::from_str(raw)?)),
    }
}

/// Parses a double, accepting only `NaN` and `Infinity` (optionally signed)
/// as non-numeric spellings. Surrounding whitespace is ignored.
pub fn parse_double(raw: &str) -> Result<f64, ParseFailure> {
    let text = raw.trim();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let special = matches!(unsigned, "NaN" | "Infinity");
    if !special && unsigned.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return Err(ParseFailure::FloatSpelling(text.to_string()));
    }
    Ok(text.parse()?)
}

#[derive(Debug, Clone)]
struct ColumnPlan {
    column: Column,
    timestamp: Option<TimestampParser>,
}

impl ColumnPlan {
    fn default_target(&self) -> Option<DefaultTarget<'_>> {
        match self.column.column_type {
            ColumnType::Long => Some(DefaultTarget::Long),
            ColumnType::Double => Some(DefaultTarget::Double),
            ColumnType::Timestamp => self.timestamp.as_ref().map(DefaultTarget::Timestamp),
            ColumnType::Boolean | ColumnType::String | ColumnType::Json => None,
        }
    }
}

/// Fills one record of a [`RecordBuilder`] from the tokenizer.
#[derive(Debug, Clone)]
pub struct ColumnCoercer {
    plans: Vec<ColumnPlan>,
    defaults: DefaultValueResolver,
    allow_optional_columns: bool,
}

impl ColumnCoercer {
    /// Resolves per-column parsers and validates the configured default values.
    pub fn new(config: &ParserConfig) -> Result<Self, ConfigError> {
        let defaults = DefaultValueResolver::validate(&config.schema, &config.default_values)?;
        let plans = config
            .schema
            .iter()
            .map(|column| ColumnPlan {
                column: column.clone(),
                timestamp: (column.column_type == ColumnType::Timestamp).then(|| {
                    config
                        .timestamp_parser(column.index)
                        .cloned()
                        .unwrap_or_default()
                }),
            })
            .collect();
        Ok(Self {
            plans,
            defaults,
            allow_optional_columns: config.allow_optional_columns,
        })
    }

    /// Stages one value (or null) per column. Returns how many defaults were substituted.
    ///
    /// Nothing is committed here; on error the caller discards the staged values.
    pub fn coerce_record<L, S>(
        &self,
        tokenizer: &mut CsvTokenizer<L>,
        builder: &mut RecordBuilder<S>,
    ) -> Result<usize, RecordError>
    where
        L: LineSource,
        S: RecordSink,
    {
        let mut defaults_applied = 0;
        for plan in &self.plans {
            let raw = if self.allow_optional_columns && !tokenizer.has_more_fields_in_record() {
                None
            } else {
                tokenizer.next_field_or_null()?
            };
            let Some(raw) = raw else {
                builder.set_null(&plan.column);
                continue;
            };

            match parse_typed(plan.column.column_type, &raw, plan.timestamp.as_ref()) {
                Ok(value) => builder.set_value(&plan.column, value),
                Err(cause) => {
                    let value = self.fall_back(plan, raw, cause)?;
                    defaults_applied += 1;
                    match value {
                        Some(value) => builder.set_value(&plan.column, value),
                        None => builder.set_null(&plan.column),
                    }
                }
            }
        }
        Ok(defaults_applied)
    }

    fn fall_back(
        &self,
        plan: &ColumnPlan,
        raw: String,
        cause: ParseFailure,
    ) -> Result<Option<Value>, RecordError> {
        let column = &plan.column;
        let policy = self.defaults.resolve(&column.name);
        let (Some(policy), Some(target)) = (policy, plan.default_target()) else {
            return Err(CoercionError::Parse {
                column: column.name.clone(),
                column_type: column.column_type,
                value: raw,
                cause,
            }
            .into());
        };
        let value = policy.apply(&column.name, target)?;
        tracing::warn!(
            column = %column.name,
            value = %raw,
            error = %cause,
            "Applying default value due to fail to parse"
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnConfig, DefaultValueConfig, ParserTask};
    use crate::source::MemoryLineSource;
    use csvdv_model::VecSink;

    fn coerce_line(task: ParserTask, line: &str) -> (Result<usize, RecordError>, VecSink) {
        let config = task.normalize().unwrap();
        let coercer = ColumnCoercer::new(&config).unwrap();
        let mut tokenizer = CsvTokenizer::new(
            MemoryLineSource::from_texts([line]),
            config.tokenizer.clone(),
        );
        assert!(tokenizer.start_next_file().unwrap());
        assert!(tokenizer.start_next_record().unwrap());

        let mut sink = VecSink::new();
        let result = {
            let mut builder = RecordBuilder::new(&mut sink, config.schema.len());
            let result = coercer.coerce_record(&mut tokenizer, &mut builder);
            if result.is_ok() {
                builder.add_record().unwrap();
            }
            result
        };
        (result, sink)
    }

    #[test]
    fn test_parse_boolean_truthy_set() {
        for raw in TRUE_STRINGS {
            assert_eq!(
                parse_typed(ColumnType::Boolean, raw, None).unwrap(),
                Value::Boolean(true)
            );
        }
        for raw in ["false", "tRUE", "no", "2", ""] {
            assert_eq!(
                parse_typed(ColumnType::Boolean, raw, None).unwrap(),
                Value::Boolean(false)
            );
        }
    }

    #[test]
    fn test_parse_numbers_and_json() {
        assert_eq!(
            parse_typed(ColumnType::Long, "-42", None).unwrap(),
            Value::Long(-42)
        );
        assert!(parse_typed(ColumnType::Long, " 42", None).is_err());
        assert_eq!(
            parse_typed(ColumnType::Double, " 1.5 ", None).unwrap(),
            Value::Double(1.5)
        );
        assert_eq!(
            parse_typed(ColumnType::Json, r#"{"a":[1,2]}"#, None).unwrap(),
            Value::Json(serde_json::json!({"a": [1, 2]}))
        );
        assert!(matches!(
            parse_typed(ColumnType::Json, "{", None),
            Err(ParseFailure::Json(_))
        ));
    }

    #[test]
    fn test_immediate_default_replaces_unparsable_long() {
        let mut task = ParserTask::new(vec![
            ColumnConfig::new("id", ColumnType::String),
            ColumnConfig::new("longCol", ColumnType::Long),
            ColumnConfig::new("doubleCol", ColumnType::Double),
        ]);
        task.default_values
            .insert("longCol".to_string(), DefaultValueConfig::immediate("123"));
        task.default_values
            .insert("doubleCol".to_string(), DefaultValueConfig::immediate("123"));

        let (result, sink) = coerce_line(task, "a,abc,xyz");
        assert_eq!(result.unwrap(), 2);
        assert_eq!(
            sink.records[0].values(),
            &[
                Some(Value::String("a".to_string())),
                Some(Value::Long(123)),
                Some(Value::Double(123.0)),
            ]
        );
    }

    #[test]
    fn test_parse_double_special_spellings() {
        for raw in ["inf", "-inf", "infinity", "INFINITY", "nan", "NAN", "+nan", "1.5x"] {
            assert!(
                matches!(parse_double(raw), Err(ParseFailure::FloatSpelling(_))),
                "{raw}"
            );
        }
        assert_eq!(parse_double("Infinity").unwrap(), f64::INFINITY);
        assert_eq!(parse_double(" -Infinity ").unwrap(), f64::NEG_INFINITY);
        assert!(parse_double("NaN").unwrap().is_nan());
        assert_eq!(parse_double("-1.5E3").unwrap(), -1500.0);
        assert_eq!(parse_double("2e-1").unwrap(), 0.2);
    }

    #[test]
    fn test_immediate_default_replaces_rust_only_float_spellings() {
        let mut task = ParserTask::new(vec![ColumnConfig::new("d", ColumnType::Double)]);
        task.default_values
            .insert("d".to_string(), DefaultValueConfig::immediate("123"));
        for line in ["inf", "nan", "infinity"] {
            let (result, sink) = coerce_line(task.clone(), line);
            assert_eq!(result.unwrap(), 1, "{line}");
            assert_eq!(sink.records[0].values(), &[Some(Value::Double(123.0))]);
        }
    }

    #[test]
    fn test_null_default_for_timestamp() {
        let mut task = ParserTask::new(vec![ColumnConfig::new("ts", ColumnType::Timestamp)]);
        task.default_values
            .insert("ts".to_string(), DefaultValueConfig::null());
        let (result, sink) = coerce_line(task, "not-a-date");
        assert_eq!(result.unwrap(), 1);
        assert!(sink.records[0].is_null(0));
    }

    #[test]
    fn test_parse_failure_without_default() {
        let task = ParserTask::new(vec![ColumnConfig::new("n", ColumnType::Long)]);
        let (result, sink) = coerce_line(task, "abc");
        let err = result.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "failed to parse 'abc' as long for column 'n': invalid digit found in string"
        );
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_optional_columns_become_null() {
        let mut task = ParserTask::new(vec![
            ColumnConfig::new("a", ColumnType::Long),
            ColumnConfig::new("b", ColumnType::Long),
            ColumnConfig::new("c", ColumnType::String),
        ]);
        task.allow_optional_columns = true;
        let (result, sink) = coerce_line(task, "1");
        assert_eq!(result.unwrap(), 0);
        assert_eq!(sink.records[0].values(), &[Some(Value::Long(1)), None, None]);
    }

    #[test]
    fn test_short_record_without_optional_columns() {
        let task = ParserTask::new(vec![
            ColumnConfig::new("a", ColumnType::Long),
            ColumnConfig::new("b", ColumnType::Long),
        ]);
        let (result, _) = coerce_line(task, "1");
        assert!(matches!(
            result,
            Err(RecordError::Tokenize(crate::error::TokenizeError::TooFewColumns))
        ));
    }
}
