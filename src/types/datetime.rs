// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timestamps embedded in device payloads.
//!
//! Tasmota reports its local time without an offset (`"Time"`), while
//! zigbee2mqtt reports `last_seen` either as ISO 8601 with an offset or as
//! epoch milliseconds, depending on its configuration.
//!
//! # Supported Formats
//!
//! - ISO 8601 without timezone: `"2024-01-15T10:30:00"`
//! - ISO 8601 with timezone: `"2024-01-15T10:30:00+01:00"` or `"2024-01-15T10:30:00+0100"`
//! - Unix epoch seconds: `"1705318200"`
//! - Unix epoch milliseconds: `"1705318200000"`

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Error returned when parsing a datetime string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeParseError {
    input: String,
}

impl DateTimeParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }

    /// Returns the input string that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl std::fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to parse datetime: '{}' (expected ISO 8601 or Unix epoch)",
            self.input
        )
    }
}

impl std::error::Error for DateTimeParseError {}

/// A datetime reported by a device.
///
/// Keeps the wall-clock value as sent and the offset when one was present.
///
/// # Examples
///
/// ```
/// use brigid::types::DeviceDateTime;
///
/// let dt: DeviceDateTime = "2024-01-15T10:30:00+0100".parse().unwrap();
/// assert!(dt.has_timezone());
/// assert_eq!(dt.to_utc().to_rfc3339(), "2024-01-15T09:30:00+00:00");
///
/// let naive: DeviceDateTime = "2024-01-15T10:30:00".parse().unwrap();
/// assert!(!naive.has_timezone());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDateTime {
    naive: NaiveDateTime,
    /// Seconds east of UTC, if known.
    offset_secs: Option<i32>,
}

impl DeviceDateTime {
    /// Builds a datetime from epoch milliseconds.
    #[must_use]
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        let datetime = Utc.timestamp_millis_opt(millis).single()?;
        Some(Self {
            naive: datetime.naive_utc(),
            offset_secs: Some(0),
        })
    }

    fn parse_epoch(s: &str) -> Option<Self> {
        let timestamp: i64 = s.parse().ok()?;
        if timestamp < 0 {
            return None;
        }

        // Seconds have at most 10 digits until year 2286
        if timestamp > 9_999_999_999 {
            Self::from_epoch_millis(timestamp)
        } else {
            let datetime = Utc.timestamp_opt(timestamp, 0).single()?;
            Some(Self {
                naive: datetime.naive_utc(),
                offset_secs: Some(0),
            })
        }
    }

    fn parse_iso_with_tz(s: &str) -> Option<Self> {
        let datetime = DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .ok()?;
        Some(Self {
            naive: datetime.naive_local(),
            offset_secs: Some(datetime.offset().local_minus_utc()),
        })
    }

    fn parse_iso_naive(s: &str) -> Option<Self> {
        let formats = [
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];

        formats.iter().find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .map(|naive| Self {
                    naive,
                    offset_secs: None,
                })
        })
    }

    /// Returns the wall-clock datetime as reported.
    #[must_use]
    pub const fn naive(&self) -> NaiveDateTime {
        self.naive
    }

    /// Returns the timezone offset, if known.
    #[must_use]
    pub fn timezone_offset(&self) -> Option<FixedOffset> {
        self.offset_secs.and_then(FixedOffset::east_opt)
    }

    /// Returns true if the timezone is known.
    #[must_use]
    pub const fn has_timezone(&self) -> bool {
        self.offset_secs.is_some()
    }

    /// Converts to UTC.
    ///
    /// A datetime without an offset is taken to already be UTC.
    #[must_use]
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.timezone_offset()
            .and_then(|tz| self.naive.and_local_timezone(tz).single())
            .map_or_else(
                || self.naive.and_utc(),
                |datetime| datetime.with_timezone(&Utc),
            )
    }
}

impl FromStr for DeviceDateTime {
    type Err = DateTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if !s.is_empty()
            && s.chars().all(|c| c.is_ascii_digit())
            && let Some(dt) = Self::parse_epoch(s)
        {
            return Ok(dt);
        }

        if let Some(dt) = Self::parse_iso_with_tz(s) {
            return Ok(dt);
        }

        Self::parse_iso_naive(s).ok_or_else(|| DateTimeParseError::new(s))
    }
}

impl From<NaiveDateTime> for DeviceDateTime {
    fn from(naive: NaiveDateTime) -> Self {
        Self {
            naive,
            offset_secs: None,
        }
    }
}
