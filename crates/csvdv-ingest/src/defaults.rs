//! Per-column fallbacks applied when a field fails to parse.

use std::collections::{BTreeMap, HashMap};

use csvdv_model::{ColumnType, Schema, Value};

use crate::coerce::parse_double;
use crate::config::{DefaultValueConfig, PolicyKind};
use crate::error::{CoercionError, ConfigError, ParseFailure, RecordError};
use crate::timestamp::TimestampParser;

/// Validated fallback for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValuePolicy {
    /// Substitute this literal, parsed as the column's type.
    Immediate(String),
    /// Substitute an explicit null.
    Null,
}

/// The column type a policy is applied to.
#[derive(Debug, Clone, Copy)]
pub enum DefaultTarget<'a> {
    Long,
    Double,
    Timestamp(&'a TimestampParser),
}

impl DefaultTarget<'_> {
    fn column_type(&self) -> ColumnType {
        match self {
            DefaultTarget::Long => ColumnType::Long,
            DefaultTarget::Double => ColumnType::Double,
            DefaultTarget::Timestamp(_) => ColumnType::Timestamp,
        }
    }
}

impl DefaultValuePolicy {
    /// Checks the literal against the kind; the column type is checked by the resolver.
    pub fn from_config(column: &str, config: &DefaultValueConfig) -> Result<Self, ConfigError> {
        match (config.kind, &config.default_value) {
            (PolicyKind::Immediate, Some(literal)) => Ok(Self::Immediate(literal.clone())),
            (PolicyKind::Immediate, None) => {
                Err(ConfigError::MissingDefaultLiteral(column.to_string()))
            }
            (PolicyKind::Null, None) => Ok(Self::Null),
            (PolicyKind::Null, Some(_)) => {
                Err(ConfigError::UnexpectedDefaultLiteral(column.to_string()))
            }
        }
    }

    /// Produces the substitute value for `column`.
    ///
    /// A literal that does not parse is a coercion error; a null default on a
    /// numeric column is a configuration error.
    pub fn apply(
        &self,
        column: &str,
        target: DefaultTarget<'_>,
    ) -> Result<Option<Value>, RecordError> {
        let literal_error = |literal: &str, cause: ParseFailure| {
            RecordError::from(CoercionError::DefaultLiteral {
                column: column.to_string(),
                literal: literal.to_string(),
                cause,
            })
        };

        match (self, target) {
            (Self::Immediate(literal), DefaultTarget::Long) => literal
                .parse::<i64>()
                .map(|v| Some(Value::Long(v)))
                .map_err(|e| literal_error(literal, e.into())),
            (Self::Immediate(literal), DefaultTarget::Double) => parse_double(literal)
                .map(|v| Some(Value::Double(v)))
                .map_err(|e| literal_error(literal, e)),
            (Self::Immediate(literal), DefaultTarget::Timestamp(parser)) => parser
                .parse(literal)
                .map(|v| Some(Value::Timestamp(v)))
                .map_err(|e| literal_error(literal, e.into())),
            (Self::Null, DefaultTarget::Timestamp(_)) => Ok(None),
            (Self::Null, DefaultTarget::Long | DefaultTarget::Double) => {
                Err(ConfigError::NullDefaultForNumeric {
                    column: column.to_string(),
                    column_type: target.column_type(),
                }
                .into())
            }
        }
    }
}

/// Column name to policy lookup, built once per engine.
#[derive(Debug, Clone, Default)]
pub struct DefaultValueResolver {
    policies: HashMap<String, DefaultValuePolicy>,
}

impl DefaultValueResolver {
    /// Validates every configured policy against the schema.
    pub fn validate(
        schema: &Schema,
        configured: &BTreeMap<String, DefaultValueConfig>,
    ) -> Result<Self, ConfigError> {
        let mut policies = HashMap::with_capacity(configured.len());
        for (name, config) in configured {
            let column = schema
                .lookup(name)
                .ok_or_else(|| ConfigError::UnknownDefaultColumn(name.clone()))?;
            if !column.column_type.accepts_default_value() {
                return Err(ConfigError::DisallowedDefaultType {
                    column: name.clone(),
                    column_type: column.column_type,
                });
            }
            let policy = DefaultValuePolicy::from_config(name, config)?;
            if policy == DefaultValuePolicy::Null
                && matches!(column.column_type, ColumnType::Long | ColumnType::Double)
            {
                return Err(ConfigError::NullDefaultForNumeric {
                    column: name.clone(),
                    column_type: column.column_type,
                });
            }
            policies.insert(name.clone(), policy);
        }
        Ok(Self { policies })
    }

    pub fn resolve(&self, column: &str) -> Option<&DefaultValuePolicy> {
        self.policies.get(column)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
