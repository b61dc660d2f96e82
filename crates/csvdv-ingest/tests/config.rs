//! Task decoding and normalization.

use csvdv_ingest::config::DEFAULT_MAX_QUOTED_SIZE_LIMIT;
use csvdv_ingest::{
    ConfigError, EscapeChar, Newline, ParserEngine, ParserTask, PolicyKind, QuoteChar,
};
use csvdv_model::ColumnType;

fn task(json: &str) -> ParserTask {
    ParserTask::from_json_str(json).expect("task")
}

#[test]
fn minimal_task_uses_documented_defaults() {
    let task = task(r#"{"columns": [{"name": "a", "type": "string"}]}"#);
    assert_eq!(task.header_line, None);
    assert_eq!(task.skip_header_lines, 0);
    assert_eq!(task.delimiter, ",");
    assert_eq!(task.quote.as_deref(), Some("\""));
    assert_eq!(task.escape.as_deref(), Some("\\"));
    assert_eq!(task.null_string, None);
    assert!(!task.trim_if_not_quoted);
    assert_eq!(task.max_quoted_size_limit, DEFAULT_MAX_QUOTED_SIZE_LIMIT);
    assert_eq!(task.comment_line_marker, None);
    assert!(!task.allow_optional_columns);
    assert!(!task.allow_extra_columns);
    assert!(!task.stop_on_invalid_record);
    assert!(task.default_values.is_empty());
    assert_eq!(task.charset, "utf-8");
    assert_eq!(task.newline, Newline::Crlf);

    let config = task.normalize().expect("normalize");
    assert_eq!(config.tokenizer.quote, QuoteChar::new('"'));
    assert_eq!(config.tokenizer.escape, EscapeChar::new('\\'));
    assert_eq!(config.tokenizer.max_quoted_size_limit, 131_072);
    assert_eq!(config.schema.len(), 1);
}

#[test]
fn columns_are_required() {
    let err = ParserTask::from_json_str("{}").expect_err("missing columns");
    assert!(err.to_string().contains("missing field `columns`"), "{err}");
}

#[test]
fn unknown_column_type_is_rejected() {
    let err = ParserTask::from_json_str(r#"{"columns": [{"name": "a", "type": "decimal"}]}"#)
        .expect_err("unknown type");
    assert!(matches!(err, ConfigError::Task(_)));
}

#[test]
fn null_quote_and_escape_disable_them() {
    let config = task(r#"{"columns": [{"name": "a", "type": "string"}], "quote": null, "escape": null}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(config.tokenizer.quote, QuoteChar::none());
    assert_eq!(config.tokenizer.escape, EscapeChar::none());
}

#[test]
fn empty_quote_and_escape_fall_back() {
    let config = task(r#"{"columns": [{"name": "a", "type": "string"}], "quote": "", "escape": ""}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(config.tokenizer.quote, QuoteChar::new('"'));
    assert_eq!(config.tokenizer.escape, EscapeChar::none());
}

#[test]
fn multi_character_quote_is_rejected() {
    let err = task(r#"{"columns": [{"name": "a", "type": "string"}], "quote": "''"}"#)
        .normalize()
        .expect_err("two-character quote");
    insta::assert_snapshot!(err.to_string(), @r#""quote" option accepts only 1 character"#);
}

#[test]
fn header_line_conflicts_with_skip_header_lines() {
    let err = task(
        r#"{"columns": [{"name": "a", "type": "string"}], "header_line": true, "skip_header_lines": 2}"#,
    )
    .normalize()
    .expect_err("conflict");
    assert!(matches!(err, ConfigError::HeaderLineConflict));
}

#[test]
fn unknown_charset_and_timezone_are_rejected() {
    let err = task(r#"{"columns": [{"name": "a", "type": "string"}], "charset": "klingon"}"#)
        .normalize()
        .expect_err("charset");
    assert!(matches!(err, ConfigError::UnknownCharset(name) if name == "klingon"));

    let err = task(r#"{"columns": [{"name": "a", "type": "timestamp", "timezone": "Mars/Olympus"}]}"#)
        .normalize()
        .expect_err("timezone");
    assert!(matches!(err, ConfigError::InvalidTimezone(_)));
}

#[test]
fn named_timezones_are_accepted() {
    let config = task(
        r#"{"columns": [{"name": "t", "type": "timestamp", "timezone": "Asia/Tokyo"}],
            "default_timezone": "Europe/Paris"}"#,
    )
    .normalize()
    .expect("normalize");
    let parser = config.timestamp_parser(0).expect("timestamp parser");
    assert_eq!(parser.timezone().to_string(), "Asia/Tokyo");
}

#[test]
fn duplicate_columns_are_rejected() {
    let err = task(r#"{"columns": [{"name": "a", "type": "string"}, {"name": "a", "type": "long"}]}"#)
        .normalize()
        .expect_err("duplicate");
    assert!(matches!(err, ConfigError::Schema(_)));
}

#[test]
fn unknown_policy_kind_is_rejected() {
    let err = ParserTask::from_json_str(
        r#"{"columns": [{"name": "n", "type": "long"}],
            "default_values": {"n": {"default_value": "1", "type": "hoge"}}}"#,
    )
    .expect_err("unknown kind");
    assert!(
        err.to_string()
            .contains("Unknown value_type 'hoge', supported types are immediate, null"),
        "{err}"
    );
}

#[test]
fn default_values_decode_scalars_and_kinds() {
    let task = task(
        r#"{
            "columns": [
                {"name": "n", "type": "long"},
                {"name": "d", "type": "double"},
                {"name": "t", "type": "timestamp"}
            ],
            "default_values": {
                "n": {"default_value": 123},
                "d": {"default_value": 1.5, "type": "immediate"},
                "t": {"type": "null"}
            }
        }"#,
    );
    assert_eq!(task.default_values["n"].default_value.as_deref(), Some("123"));
    assert_eq!(task.default_values["n"].kind, PolicyKind::Immediate);
    assert_eq!(task.default_values["d"].default_value.as_deref(), Some("1.5"));
    assert_eq!(task.default_values["t"].kind, PolicyKind::Null);

    let engine = ParserEngine::from_task(task).expect("engine");
    assert_eq!(engine.config().schema.lookup("t").map(|c| c.column_type), Some(ColumnType::Timestamp));
}

#[test]
fn default_values_on_disallowed_types_fail_at_construction() {
    for column_type in ["boolean", "string", "json"] {
        let task = task(&format!(
            r#"{{"columns": [{{"name": "c", "type": "{column_type}"}}],
                "default_values": {{"c": {{"default_value": "x"}}}}}}"#
        ));
        let err = ParserEngine::from_task(task).expect_err("disallowed type");
        assert!(matches!(err, ConfigError::DisallowedDefaultType { .. }), "{column_type}");
    }
}

#[test]
fn immediate_without_literal_and_null_with_literal_fail() {
    let err = ParserEngine::from_task(task(
        r#"{"columns": [{"name": "n", "type": "long"}], "default_values": {"n": {"type": "immediate"}}}"#,
    ))
    .expect_err("missing literal");
    assert!(matches!(err, ConfigError::MissingDefaultLiteral(_)));

    let err = ParserEngine::from_task(task(
        r#"{"columns": [{"name": "t", "type": "timestamp"}],
            "default_values": {"t": {"type": "null", "default_value": "2020-01-01"}}}"#,
    ))
    .expect_err("unexpected literal");
    assert!(matches!(err, ConfigError::UnexpectedDefaultLiteral(_)));
}

#[test]
fn parser_config_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<csvdv_ingest::ParserConfig>();
    assert_send_sync::<ParserEngine>();
}
