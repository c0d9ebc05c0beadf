// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Telemetry samples and the line parser
//!
//! The device emits one record per line: `light,distance,temperature`,
//! three decimal numbers in that fixed order, no header row.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

use crate::error::ParseError;

/// Number of fields in a raw telemetry record
pub const FIELD_COUNT: usize = 3;

/// Field separator of a raw telemetry record
pub const FIELD_SEPARATOR: char = ',';

/// One of the three sensor value streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Ambient light level (raw ADC units, 0-1023 on the reference board)
    Light,
    /// Distance to the nearest object in centimetres
    Distance,
    /// Temperature in degrees Celsius
    Temperature,
}

impl Channel {
    /// All channels, in record order
    pub const ALL: [Channel; 3] = [Channel::Light, Channel::Distance, Channel::Temperature];

    /// Stable lowercase name, used for labels and JSON keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Light => "light",
            Channel::Distance => "distance",
            Channel::Temperature => "temperature",
        }
    }

    /// Parse a channel name as produced by [`Channel::as_str`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "light" => Some(Channel::Light),
            "distance" => Some(Channel::Distance),
            "temperature" | "temp" => Some(Channel::Temperature),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed telemetry reading
///
/// Samples are only produced by [`Sample::parse`] (or built directly in
/// tests) and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Light level
    pub light: f64,
    /// Distance in centimetres
    pub distance_cm: f64,
    /// Temperature in degrees Celsius
    pub temperature_c: f64,
    /// Local time at which the line was parsed
    pub captured_at: DateTime<Local>,
}

impl Sample {
    /// Create a sample captured now
    pub fn new(light: f64, distance_cm: f64, temperature_c: f64) -> Self {
        Self::at(light, distance_cm, temperature_c, Local::now())
    }

    /// Create a sample with an explicit capture time
    pub fn at(
        light: f64,
        distance_cm: f64,
        temperature_c: f64,
        captured_at: DateTime<Local>,
    ) -> Self {
        Self {
            light,
            distance_cm,
            temperature_c,
            captured_at,
        }
    }

    /// Parse a raw line, stamping it with the current local time
    pub fn parse(raw_line: &str) -> Result<Self, ParseError> {
        Self::parse_at(raw_line, Local::now())
    }

    /// Parse a raw line with an explicit capture time
    ///
    /// A record either fully parses or is rejected; there is no partial
    /// acceptance.
    pub fn parse_at(raw_line: &str, captured_at: DateTime<Local>) -> Result<Self, ParseError> {
        let line = raw_line.trim();
        if line.is_empty() {
            return Err(ParseError::malformed(raw_line, "empty line"));
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(ParseError::malformed(
                raw_line,
                format!("expected {} fields, got {}", FIELD_COUNT, fields.len()),
            ));
        }

        let mut values = [0.0f64; FIELD_COUNT];
        for (slot, (field, channel)) in values
            .iter_mut()
            .zip(fields.iter().zip(Channel::ALL.iter()))
        {
            *slot = parse_field(raw_line, field, *channel)?;
        }

        Ok(Self::at(values[0], values[1], values[2], captured_at))
    }

    /// Value of a single channel
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Light => self.light,
            Channel::Distance => self.distance_cm,
            Channel::Temperature => self.temperature_c,
        }
    }
}

fn parse_field(raw_line: &str, field: &str, channel: Channel) -> Result<f64, ParseError> {
    let token = field.trim();
    let value: f64 = token.parse().map_err(|_| {
        ParseError::malformed(raw_line, format!("{} field {:?} is not a number", channel, token))
    })?;

    // "nan" and "inf" parse as f64
    if !value.is_finite() {
        return Err(ParseError::malformed(
            raw_line,
            format!("{} field {:?} is not finite", channel, token),
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        let sample = Sample::parse("312.0,45.5,21.25").unwrap();
        assert_eq!(sample.light, 312.0);
        assert_eq!(sample.distance_cm, 45.5);
        assert_eq!(sample.temperature_c, 21.25);
    }

    #[test]
    fn test_parse_trims_whitespace_and_crlf() {
        let sample = Sample::parse(" 100 , 50 ,25\r\n").unwrap();
        assert_eq!(sample.light, 100.0);
        assert_eq!(sample.distance_cm, 50.0);
        assert_eq!(sample.temperature_c, 25.0);
    }

    #[test]
    fn test_parse_integers_and_negatives() {
        let sample = Sample::parse("0,1000,-4.5").unwrap();
        assert_eq!(sample.temperature_c, -4.5);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(Sample::parse(""), Err(ParseError::Malformed { .. })));
        assert!(matches!(Sample::parse("   \r"), Err(ParseError::Malformed { .. })));
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(Sample::parse("1,2").is_err());
        assert!(Sample::parse("1,2,3,4").is_err());
        assert!(Sample::parse("1,2,").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = Sample::parse("abc,2,3").unwrap_err();
        let ParseError::Malformed { line, reason } = err;
        assert_eq!(line, "abc,2,3");
        assert!(reason.contains("light"));
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert!(Sample::parse("NaN,2,3").is_err());
        assert!(Sample::parse("1,inf,3").is_err());
    }

    #[test]
    fn test_parse_at_keeps_timestamp() {
        let ts = Local::now();
        let sample = Sample::parse_at("1,2,3", ts).unwrap();
        assert_eq!(sample.captured_at, ts);
    }

    #[test]
    fn test_channel_names() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_name(channel.as_str()), Some(channel));
        }
        assert_eq!(Channel::from_name("temp"), Some(Channel::Temperature));
        assert_eq!(Channel::from_name("humidity"), None);
    }

    #[test]
    fn test_sample_value_by_channel() {
        let sample = Sample::new(1.0, 2.0, 3.0);
        assert_eq!(sample.value(Channel::Light), 1.0);
        assert_eq!(sample.value(Channel::Distance), 2.0);
        assert_eq!(sample.value(Channel::Temperature), 3.0);
    }
}
