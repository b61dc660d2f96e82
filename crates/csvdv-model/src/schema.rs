use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchemaError};

/// Declared type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    #[serde(alias = "integer", alias = "int")]
    Long,
    #[serde(alias = "float")]
    Double,
    String,
    Timestamp,
    Json,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        }
    }

    /// Returns true for the types whose parse failures may fall back to a default value.
    pub fn accepts_default_value(&self) -> bool {
        matches!(
            self,
            ColumnType::Long | ColumnType::Double | ColumnType::Timestamp
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" => Ok(ColumnType::Boolean),
            "long" | "integer" | "int" => Ok(ColumnType::Long),
            "double" | "float" => Ok(ColumnType::Double),
            "string" => Ok(ColumnType::String),
            "timestamp" => Ok(ColumnType::Timestamp),
            "json" => Ok(ColumnType::Json),
            _ => Err(format!("Unknown column type: {}", s)),
        }
    }
}

/// A resolved schema column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub index: usize,
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(index: usize, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            index,
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered, read-only sequence of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema from `(name, type)` pairs, assigning ordinal indexes in order.
    pub fn from_columns<I, N>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, ColumnType)>,
        N: Into<String>,
    {
        let mut resolved = Vec::new();
        let mut by_name = HashMap::new();
        for (index, (name, column_type)) in columns.into_iter().enumerate() {
            let name = name.into();
            if name.is_empty() {
                return Err(SchemaError::EmptyColumnName { index });
            }
            if by_name.insert(name.clone(), index).is_some() {
                return Err(SchemaError::DuplicateColumn { name });
            }
            resolved.push(Column::new(index, name, column_type));
        }
        if resolved.is_empty() {
            return Err(SchemaError::Empty);
        }
        Ok(Self {
            columns: resolved,
            by_name,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn lookup(&self, name: &str) -> Option<&Column> {
        self.by_name.get(name).map(|&idx| &self.columns[idx])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_assigns_indexes() {
        let schema = Schema::from_columns([
            ("id", ColumnType::Long),
            ("name", ColumnType::String),
        ])
        .unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.lookup("name").map(|c| c.index), Some(1));
        assert_eq!(schema.column(0).map(|c| c.column_type), Some(ColumnType::Long));
        assert!(schema.lookup("missing").is_none());
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = Schema::from_columns([("a", ColumnType::Long), ("a", ColumnType::Double)])
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateColumn {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_schema_rejects_empty() {
        let columns: Vec<(String, ColumnType)> = Vec::new();
        assert_eq!(Schema::from_columns(columns).unwrap_err(), SchemaError::Empty);
    }

    #[test]
    fn test_column_type_from_str() {
        assert_eq!("LONG".parse::<ColumnType>(), Ok(ColumnType::Long));
        assert_eq!("integer".parse::<ColumnType>(), Ok(ColumnType::Long));
        assert_eq!("float".parse::<ColumnType>(), Ok(ColumnType::Double));
        assert!("decimal".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_default_value_types() {
        assert!(ColumnType::Long.accepts_default_value());
        assert!(ColumnType::Double.accepts_default_value());
        assert!(ColumnType::Timestamp.accepts_default_value());
        assert!(!ColumnType::Boolean.accepts_default_value());
        assert!(!ColumnType::String.accepts_default_value());
        assert!(!ColumnType::Json.accepts_default_value());
    }
}
