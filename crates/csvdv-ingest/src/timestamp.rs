//! Timestamp parsing for `timestamp` columns.
//!
//! Formats use `chrono` strftime syntax. A value is tried, in order, as an
//! offset-aware datetime, as a naive datetime in the column timezone, and as
//! a date at midnight. When the format carries an offset directive (`%z`,
//! `%:z`), values without an offset are accepted too and read in the column
//! timezone.
//!
//! Column timezones are `UTC`, a fixed offset such as `+09:00`, or an IANA
//! name such as `Asia/Tokyo`. Named zones follow their daylight saving rules;
//! an ambiguous local time resolves to the earlier instant.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::error::ConfigError;

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";
pub const DEFAULT_TIMEZONE: &str = "UTC";

const OFFSET_DIRECTIVES: [&str; 4] = [" %:z", " %z", "%:z", "%z"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not parse '{text}' with format '{format}'")]
pub struct TimestampParseError {
    pub text: String,
    pub format: String,
}

/// Zone that offset-less values are read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTimezone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl ColumnTimezone {
    fn to_utc(self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(offset) => offset
                .from_local_datetime(naive)
                .single()
                .map(|local| local.with_timezone(&Utc)),
            Self::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc)),
        }
    }
}

impl fmt::Display for ColumnTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Parser bound to one column's format and timezone.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    format: String,
    without_offset: Option<String>,
    timezone: ColumnTimezone,
}

impl TimestampParser {
    pub fn new(format: impl Into<String>, timezone: &str) -> Result<Self, ConfigError> {
        let format = format.into();
        let timezone =
            parse_timezone(timezone).ok_or_else(|| ConfigError::InvalidTimezone(timezone.to_string()))?;
        let without_offset = OFFSET_DIRECTIVES
            .iter()
            .find(|directive| format.contains(*directive))
            .map(|directive| format.replacen(directive, "", 1));
        Ok(Self {
            format,
            without_offset,
            timezone,
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn timezone(&self) -> ColumnTimezone {
        self.timezone
    }

    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>, TimestampParseError> {
        if let Ok(parsed) = DateTime::parse_from_str(text, &self.format) {
            return Ok(parsed.with_timezone(&Utc));
        }
        if let Some(parsed) = self.parse_local(text, &self.format) {
            return Ok(parsed);
        }
        if let Some(format) = &self.without_offset {
            if let Some(parsed) = self.parse_local(text, format) {
                return Ok(parsed);
            }
        }
        Err(TimestampParseError {
            text: text.to_string(),
            format: self.format.clone(),
        })
    }

    fn parse_local(&self, text: &str, format: &str) -> Option<DateTime<Utc>> {
        let naive = match NaiveDateTime::parse_from_str(text, format) {
            Ok(naive) => naive,
            Err(_) => NaiveDate::parse_from_str(text, format)
                .ok()?
                .and_hms_opt(0, 0, 0)?,
        };
        self.timezone.to_utc(&naive)
    }
}

impl Default for TimestampParser {
    /// [`DEFAULT_TIMESTAMP_FORMAT`] in UTC.
    fn default() -> Self {
        Self {
            format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            without_offset: Some(DEFAULT_TIMESTAMP_FORMAT.replacen(" %z", "", 1)),
            timezone: ColumnTimezone::Fixed(Utc.fix()),
        }
    }
}

/// Accepts `UTC`, `GMT`, `Z`, a fixed offset such as `+09:00`, or an IANA zone name.
pub fn parse_timezone(value: &str) -> Option<ColumnTimezone> {
    let trimmed = value.trim();
    if ["UTC", "GMT", "Z"]
        .iter()
        .any(|name| trimmed.eq_ignore_ascii_case(name))
    {
        return Some(ColumnTimezone::Fixed(Utc.fix()));
    }
    if let Ok(offset) = trimmed.parse::<FixedOffset>() {
        return Some(ColumnTimezone::Fixed(offset));
    }
    trimmed.parse::<Tz>().ok().map(ColumnTimezone::Named)
}
