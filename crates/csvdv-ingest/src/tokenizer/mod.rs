//! CSV tokenizer: a field-at-a-time cursor over a [`LineSource`].
//!
//! The cursor is driven record by record:
//!
//! 1. [`CsvTokenizer::start_next_file`] moves to the next input and resets
//!    the line counter.
//! 2. [`CsvTokenizer::start_next_record`] reads the next non-empty,
//!    non-comment line. It fails with [`TokenizeError::TooManyColumns`] when
//!    the previous record still had unread fields.
//! 3. [`CsvTokenizer::next_field_or_null`] yields fields until
//!    [`CsvTokenizer::has_more_fields_in_record`] turns false. Quoted fields
//!    may span several physical lines.
//! 4. On a bad record, [`CsvTokenizer::discard_rest_of_line`] abandons the
//!    record. When the record spanned several lines, only its first line is
//!    dropped and the following lines are read again as new records.

mod encode;

pub use encode::{encode_field, encode_record};

use std::collections::VecDeque;

use crate::config::TokenizerOptions;
use crate::error::TokenizeError;
use crate::source::LineSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordState {
    NotEnd,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Begin,
    Value,
    QuotedValue,
    AfterQuotedValue,
    FirstTrim,
    LastTrimOrValue,
}

pub struct CsvTokenizer<L> {
    source: L,
    options: TokenizerOptions,
    delimiter_char: char,
    delimiter_following: Option<String>,
    record_state: RecordState,
    line_number: u64,
    line: Option<String>,
    line_pos: usize,
    was_quoted_field: bool,
    quoted_value_lines: Vec<String>,
    unread_lines: VecDeque<String>,
}

impl<L: LineSource> CsvTokenizer<L> {
    pub fn new(source: L, options: TokenizerOptions) -> Self {
        let mut delimiter = options.delimiter.chars();
        let delimiter_char = delimiter.next().unwrap_or(',');
        let following = delimiter.as_str();
        let delimiter_following = (!following.is_empty()).then(|| following.to_string());
        Self {
            source,
            options,
            delimiter_char,
            delimiter_following,
            record_state: RecordState::End,
            line_number: 0,
            line: None,
            line_pos: 0,
            was_quoted_field: false,
            quoted_value_lines: Vec::new(),
            unread_lines: VecDeque::new(),
        }
    }

    /// 1-based number of the current physical line within the current file.
    pub fn current_line_number(&self) -> u64 {
        self.line_number
    }

    pub fn start_next_file(&mut self) -> Result<bool, TokenizeError> {
        let next = self.source.next_file()?;
        if next {
            self.line_number = 0;
            self.line = None;
            self.line_pos = 0;
            self.record_state = RecordState::End;
            self.quoted_value_lines.clear();
            self.unread_lines.clear();
        }
        Ok(next)
    }

    /// Discards one physical line. Returns `false` if the file ended first.
    pub fn skip_header_line(&mut self) -> Result<bool, TokenizeError> {
        let skipped = self.source.poll_line()?.is_some();
        if skipped {
            self.line_number += 1;
        }
        Ok(skipped)
    }

    pub fn start_next_record(&mut self) -> Result<bool, TokenizeError> {
        if self.record_state != RecordState::End {
            return Err(TokenizeError::TooManyColumns);
        }
        if self.next_line(true)? {
            self.record_state = RecordState::NotEnd;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn has_more_fields_in_record(&self) -> bool {
        self.record_state == RecordState::NotEnd
    }

    /// Whether the last field returned was quoted.
    pub fn was_quoted_field(&self) -> bool {
        self.was_quoted_field
    }

    /// Next field with null substitution applied.
    ///
    /// Without `null_string`, an unquoted empty field is null and a quoted
    /// empty field is `""`. With `null_string`, fields equal to it are null.
    pub fn next_field_or_null(&mut self) -> Result<Option<String>, TokenizeError> {
        let value = self.next_field()?;
        let is_null = match &self.options.null_string {
            None => value.is_empty() && !self.was_quoted_field,
            Some(null_string) => value == *null_string,
        };
        Ok((!is_null).then_some(value))
    }

    /// Consumes every field left in the current record. Returns how many were dropped.
    pub fn skip_remaining_fields(&mut self) -> Result<usize, TokenizeError> {
        let mut skipped = 0;
        while self.has_more_fields_in_record() {
            self.next_field()?;
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Abandons the current record and returns the line it started on.
    pub fn discard_rest_of_line(&mut self) -> String {
        let skipped = if self.quoted_value_lines.is_empty() {
            self.line.clone().unwrap_or_default()
        } else {
            let mut lines = std::mem::take(&mut self.quoted_value_lines).into_iter();
            let first = lines.next().unwrap_or_default();
            let mut reread: Vec<String> = lines.collect();
            self.line_number -= reread.len() as u64;
            if let Some(line) = self.line.take() {
                reread.push(line);
                self.line_number -= 1;
            }
            for line in reread.into_iter().rev() {
                self.unread_lines.push_front(line);
            }
            first
        };
        self.record_state = RecordState::End;
        skipped
    }

    /// Next raw field of the current record, quotes and escapes removed.
    pub fn next_field(&mut self) -> Result<String, TokenizeError> {
        if !self.has_more_fields_in_record() {
            return Err(TokenizeError::TooFewColumns);
        }

        self.was_quoted_field = false;
        self.quoted_value_lines.clear();

        let field = self.read_field();
        if field.is_ok() {
            // Lines of a completed field are never read again.
            self.quoted_value_lines.clear();
        }
        field
    }

    fn read_field(&mut self) -> Result<String, TokenizeError> {
        let trim = self.options.trim_if_not_quoted;
        let mut value_start = self.line_pos;
        let mut value_end = 0;
        let mut quoted = String::new();
        let mut state = FieldState::Begin;

        loop {
            let char_start = self.line_pos;
            let c = self.next_char()?;

            match state {
                FieldState::Begin => {
                    if self.at_delimiter(c) {
                        return Ok(String::new());
                    }
                    match c {
                        None => {
                            self.record_state = RecordState::End;
                            return Ok(String::new());
                        }
                        Some(' ') if trim => state = FieldState::FirstTrim,
                        Some(ch) if self.is_quote(ch) => {
                            value_start = self.line_pos;
                            self.was_quoted_field = true;
                            quoted.clear();
                            state = FieldState::QuotedValue;
                        }
                        Some(_) => state = FieldState::Value,
                    }
                }

                FieldState::FirstTrim => {
                    if self.at_delimiter(c) {
                        return Ok(String::new());
                    }
                    match c {
                        None => {
                            self.record_state = RecordState::End;
                            return Ok(String::new());
                        }
                        Some(ch) if self.is_quote(ch) => {
                            value_start = self.line_pos;
                            self.was_quoted_field = true;
                            quoted.clear();
                            state = FieldState::QuotedValue;
                        }
                        Some(' ') => {}
                        Some(_) => {
                            value_start = char_start;
                            state = FieldState::Value;
                        }
                    }
                }

                FieldState::Value => {
                    if self.at_delimiter(c) {
                        return Ok(self.slice(value_start, char_start).to_string());
                    }
                    match c {
                        None => {
                            self.record_state = RecordState::End;
                            return Ok(self.slice(value_start, char_start).to_string());
                        }
                        Some(' ') if trim => {
                            value_end = char_start;
                            state = FieldState::LastTrimOrValue;
                        }
                        Some(_) => {}
                    }
                }

                FieldState::LastTrimOrValue => {
                    if self.at_delimiter(c) {
                        return Ok(self.slice(value_start, value_end).to_string());
                    }
                    match c {
                        None => {
                            self.record_state = RecordState::End;
                            return Ok(self.slice(value_start, value_end).to_string());
                        }
                        Some(' ') => {}
                        Some(_) => state = FieldState::Value,
                    }
                }

                FieldState::QuotedValue => match c {
                    None => {
                        // The quoted value continues on the next physical line.
                        quoted.push_str(self.slice(value_start, char_start));
                        quoted.push_str(self.options.newline.as_str());
                        if let Some(line) = self.line.take() {
                            self.quoted_value_lines.push(line);
                        }
                        if !self.next_line(false)? {
                            return Err(TokenizeError::InvalidValue(
                                "Unexpected end of line during parsing a quoted value".to_string(),
                            ));
                        }
                        value_start = 0;
                    }
                    Some(ch) if self.is_quote(ch) => {
                        let next = self.peek_char();
                        if next.is_some_and(|n| self.is_quote(n)) {
                            // Doubled quote: keep one.
                            quoted.push_str(self.slice(value_start, self.line_pos));
                            self.line_pos += ch.len_utf8();
                            value_start = self.line_pos;
                        } else {
                            quoted.push_str(self.slice(value_start, char_start));
                            state = FieldState::AfterQuotedValue;
                        }
                    }
                    Some(ch) if self.is_escape(ch) => {
                        if let Some(next) = self
                            .peek_char()
                            .filter(|&n| self.is_quote(n) || self.is_escape(n))
                        {
                            quoted.push_str(self.slice(value_start, char_start));
                            quoted.push(next);
                            self.line_pos += next.len_utf8();
                            value_start = self.line_pos;
                        }
                    }
                    Some(_) => {
                        let size = (self.line_pos - value_start) + quoted.len();
                        if size > self.options.max_quoted_size_limit {
                            return Err(TokenizeError::QuotedSizeLimitExceeded {
                                limit: self.options.max_quoted_size_limit,
                            });
                        }
                    }
                },

                FieldState::AfterQuotedValue => {
                    if self.at_delimiter(c) {
                        return Ok(quoted);
                    }
                    match c {
                        None => {
                            self.record_state = RecordState::End;
                            return Ok(quoted);
                        }
                        Some(' ') => {}
                        Some(ch) => {
                            return Err(TokenizeError::InvalidValue(format!(
                                "Unexpected extra character '{}' after a value quoted by '{}'",
                                ch,
                                self.options.quote.get().unwrap_or('"')
                            )));
                        }
                    }
                }
            }
        }
    }

    fn next_line(&mut self, skip_empty_line: bool) -> Result<bool, TokenizeError> {
        loop {
            let line = match self.unread_lines.pop_front() {
                Some(line) => line,
                None => match self.source.poll_line()? {
                    Some(line) => line,
                    None => {
                        self.line = None;
                        return Ok(false);
                    }
                },
            };
            self.line_pos = 0;
            self.line_number += 1;

            let skip = skip_empty_line
                && (line.is_empty()
                    || self
                        .options
                        .comment_line_marker
                        .as_deref()
                        .is_some_and(|marker| line.starts_with(marker)));
            self.line = Some(line);
            if !skip {
                return Ok(true);
            }
        }
    }

    /// Next character of the current line, `None` at end of line.
    fn next_char(&mut self) -> Result<Option<char>, TokenizeError> {
        let line = self.line.as_deref().ok_or(TokenizeError::NoCurrentLine)?;
        let c = line[self.line_pos..].chars().next();
        if let Some(c) = c {
            self.line_pos += c.len_utf8();
        }
        Ok(c)
    }

    fn peek_char(&self) -> Option<char> {
        self.line
            .as_deref()
            .and_then(|line| line[self.line_pos..].chars().next())
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        self.line.as_deref().map_or("", |line| &line[start..end])
    }

    /// True if `c` starts a delimiter; a multi-character delimiter's tail is consumed.
    fn at_delimiter(&mut self, c: Option<char>) -> bool {
        if c != Some(self.delimiter_char) {
            return false;
        }
        let Some(following) = self.delimiter_following.as_deref() else {
            return true;
        };
        let matches = self
            .line
            .as_deref()
            .is_some_and(|line| line[self.line_pos..].starts_with(following));
        if matches {
            self.line_pos += following.len();
        }
        matches
    }

    fn is_quote(&self, c: char) -> bool {
        self.options.quote.get() == Some(c)
    }

    fn is_escape(&self, c: char) -> bool {
        self.options.escape.get() == Some(c)
    }
}
