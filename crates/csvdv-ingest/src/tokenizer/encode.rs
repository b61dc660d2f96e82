//! Writing fields back out in a form [`CsvTokenizer`](super::CsvTokenizer) reads unchanged.

use crate::config::TokenizerOptions;

fn needs_quoting(value: &str, options: &TokenizerOptions) -> bool {
    let delimiter_head = options.delimiter.chars().next();
    value.is_empty()
        || value.starts_with(' ')
        || value.ends_with(' ')
        || value.chars().any(|c| {
            c == '\r'
                || c == '\n'
                || Some(c) == delimiter_head
                || Some(c) == options.quote.get()
                || Some(c) == options.escape.get()
        })
}

/// Encodes one field. `None` becomes the null string, or an empty unquoted field.
///
/// Without a quote character the value is written as-is.
pub fn encode_field(value: Option<&str>, options: &TokenizerOptions) -> String {
    let Some(value) = value else {
        return options.null_string.clone().unwrap_or_default();
    };
    let Some(quote) = options.quote.get() else {
        return value.to_string();
    };
    if !needs_quoting(value, options) {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        if c == quote {
            out.push(options.escape.get().unwrap_or(quote));
            out.push(c);
        } else if Some(c) == options.escape.get() {
            out.push(c);
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out.push(quote);
    out
}

/// Encodes a record as one logical line, without a trailing newline.
pub fn encode_record<'a, I>(fields: I, options: &TokenizerOptions) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut line = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push_str(&options.delimiter);
        }
        let mut encoded = encode_field(field, options);
        let comment_like = i == 0
            && options
                .comment_line_marker
                .as_deref()
                .is_some_and(|marker| encoded.starts_with(marker));
        if comment_like && let (Some(quote), Some(value)) = (options.quote.get(), field) {
            encoded = format!("{quote}{value}{quote}");
        }
        line.push_str(&encoded);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EscapeChar, Newline, QuoteChar};
    use crate::source::MemoryLineSource;
    use crate::tokenizer::CsvTokenizer;
    use proptest::prelude::*;

    fn read_back(text: &str, options: &TokenizerOptions) -> Vec<Vec<Option<String>>> {
        let mut tokenizer =
            CsvTokenizer::new(MemoryLineSource::from_texts([text]), options.clone());
        assert!(tokenizer.start_next_file().unwrap());
        let mut records = Vec::new();
        while tokenizer.start_next_record().unwrap() {
            let mut record = Vec::new();
            while tokenizer.has_more_fields_in_record() {
                record.push(tokenizer.next_field_or_null().unwrap());
            }
            records.push(record);
        }
        records
    }

    #[test]
    fn test_encode_field_quoting() {
        let options = TokenizerOptions::default();
        assert_eq!(encode_field(Some("plain"), &options), "plain");
        assert_eq!(encode_field(Some(""), &options), "\"\"");
        assert_eq!(encode_field(None, &options), "");
        assert_eq!(encode_field(Some("a,b"), &options), "\"a,b\"");
        assert_eq!(encode_field(Some("say \"hi\""), &options), r#""say \"hi\"""#);
        assert_eq!(encode_field(Some("c:\\tmp"), &options), r#""c:\\tmp""#);
    }

    #[test]
    fn test_encode_field_without_escape_doubles_quotes() {
        let options = TokenizerOptions {
            escape: EscapeChar::none(),
            ..TokenizerOptions::default()
        };
        assert_eq!(encode_field(Some("a\"b"), &options), "\"a\"\"b\"");
    }

    #[test]
    fn test_encode_field_without_quote() {
        let options = TokenizerOptions {
            quote: QuoteChar::none(),
            null_string: Some("NULL".to_string()),
            ..TokenizerOptions::default()
        };
        assert_eq!(encode_field(Some(" a "), &options), " a ");
        assert_eq!(encode_field(None, &options), "NULL");
    }

    #[test]
    fn test_encode_record_quotes_comment_marker() {
        let options = TokenizerOptions {
            comment_line_marker: Some("#".to_string()),
            ..TokenizerOptions::default()
        };
        let line = encode_record([Some("#1"), Some("#2")], &options);
        assert_eq!(line, "\"#1\",#2");
        assert_eq!(
            read_back(&line, &options),
            vec![vec![Some("#1".to_string()), Some("#2".to_string())]]
        );
    }

    #[test]
    fn test_multi_line_value_round_trip() {
        let options = TokenizerOptions {
            newline: Newline::Lf,
            ..TokenizerOptions::default()
        };
        let line = encode_record([Some("a\nb"), Some("c")], &options);
        assert_eq!(
            read_back(&line, &options),
            vec![vec![Some("a\nb".to_string()), Some("c".to_string())]]
        );
    }

    fn field_strategy() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-z ,;:\"'\\\\|#]{0,12}")
    }

    proptest! {
        #[test]
        fn test_records_round_trip(
            records in prop::collection::vec(prop::collection::vec(field_strategy(), 2..5), 1..6),
            delimiter in prop::sample::select(vec![",", ";", "\t", "::", "|"]),
            escape in prop::sample::select(vec![Some('\\'), Some('"'), None]),
            trim in any::<bool>(),
        ) {
            let options = TokenizerOptions {
                delimiter: delimiter.to_string(),
                escape: EscapeChar::from_option(escape.map(String::from).as_deref()).unwrap(),
                trim_if_not_quoted: trim,
                ..TokenizerOptions::default()
            };
            let text: String = records
                .iter()
                .map(|r| encode_record(r.iter().map(Option::as_deref), &options) + "\n")
                .collect();
            prop_assert_eq!(read_back(&text, &options), records);
        }
    }
}
