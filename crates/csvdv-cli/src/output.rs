//! Record sinks writing committed records to a byte stream.

use std::io::{BufWriter, Write};

use csvdv_ingest::{TokenizerOptions, encode_record};
use csvdv_model::{RecordSink, Schema, SinkError, TypedRecord, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Output encodings supported by `csvdv run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line, keyed by column name.
    #[default]
    JsonLines,
    /// Comma-separated with a header row; nulls are empty unquoted fields.
    Csv,
}

/// Text form of a value in CSV output.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Long(n) => n.to_string(),
        Value::Double(d) => d.to_string(),
        Value::String(s) => s.clone(),
        Value::Timestamp(ts) => ts.to_rfc3339(),
        Value::Json(json) => json.to_string(),
    }
}

pub struct JsonLinesSink<W: Write> {
    names: Vec<String>,
    out: BufWriter<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(schema: &Schema, out: W) -> Self {
        Self {
            names: schema.names().map(str::to_string).collect(),
            out: BufWriter::new(out),
        }
    }
}

/// A record as a JSON object with keys in schema order.
struct RecordObject<'a> {
    names: &'a [String],
    record: &'a TypedRecord,
}

impl Serialize for RecordObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, value) in self.names.iter().zip(self.record.values()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn add_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        let object = RecordObject {
            names: &self.names,
            record: &record,
        };
        serde_json::to_writer(&mut self.out, &object)
            .map_err(|e| SinkError::Message(e.to_string()))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

pub struct CsvSink<W: Write> {
    options: TokenizerOptions,
    header: Option<String>,
    out: BufWriter<W>,
}

impl<W: Write> CsvSink<W> {
    /// Writes with the default tokenizer options: `,` delimiter, `"` quote, `\` escape.
    pub fn new(schema: &Schema, out: W) -> Self {
        let options = TokenizerOptions::default();
        let header = encode_record(schema.names().map(Some), &options);
        Self {
            options,
            header: Some(header),
            out: BufWriter::new(out),
        }
    }

    fn write_header(&mut self) -> Result<(), SinkError> {
        if let Some(header) = self.header.take() {
            writeln!(self.out, "{header}")?;
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn add_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        self.write_header()?;
        let fields: Vec<Option<String>> = record
            .values()
            .iter()
            .map(|value| value.as_ref().map(value_to_text))
            .collect();
        let line = encode_record(fields.iter().map(Option::as_deref), &self.options);
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    /// Emits the header even when no record was written.
    fn finish(&mut self) -> Result<(), SinkError> {
        self.write_header()?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvdv_model::ColumnType;

    fn schema() -> Schema {
        Schema::from_columns([
            ("id", ColumnType::Long),
            ("name", ColumnType::String),
            ("ok", ColumnType::Boolean),
        ])
        .unwrap()
    }

    fn record() -> TypedRecord {
        TypedRecord::new(vec![
            Some(Value::Long(7)),
            Some(Value::String("a, b".to_string())),
            None,
        ])
    }

    #[test]
    fn test_json_lines_sink() {
        let mut out = Vec::new();
        {
            let mut sink = JsonLinesSink::new(&schema(), &mut out);
            sink.add_record(record()).unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"id\":7,\"name\":\"a, b\",\"ok\":null}\n"
        );
    }

    #[test]
    fn test_csv_sink_quotes_and_nulls() {
        let mut out = Vec::new();
        {
            let mut sink = CsvSink::new(&schema(), &mut out);
            sink.add_record(record()).unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "id,name,ok\n7,\"a, b\",\n");
    }

    #[test]
    fn test_csv_sink_header_without_records() {
        let mut out = Vec::new();
        {
            let mut sink = CsvSink::new(&schema(), &mut out);
            sink.finish().unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "id,name,ok\n");
    }

    #[test]
    fn test_json_keys_follow_schema_order() {
        let schema = Schema::from_columns([("z", ColumnType::Long), ("a", ColumnType::Double)]).unwrap();
        let mut out = Vec::new();
        {
            let mut sink = JsonLinesSink::new(&schema, &mut out);
            sink.add_record(TypedRecord::new(vec![Some(Value::Long(1)), Some(Value::Double(0.5))]))
                .unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "{\"z\":1,\"a\":0.5}\n");
    }
}
