//! Serde adapters for operator-entered local date-times.
//!
//! Browser `datetime-local` inputs produce `2025-01-02T10:00`, optionally with
//! seconds. Values are written back without seconds so the form can re-read them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serializer};

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";
const INPUT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn parse_local(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| format!("invalid local date-time: {raw:?}"))
}

pub fn format_local(value: &NaiveDateTime) -> String {
    value.format(OUTPUT_FORMAT).to_string()
}

pub mod local {
    use super::*;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_local(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_local(&raw).map_err(serde::de::Error::custom)
    }
}

pub mod local_option {
    use super::*;

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&format_local(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_local(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::{format_local, parse_local};

    #[test]
    fn accepts_minutes_precision_from_forms() {
        let parsed = parse_local("2025-01-02T10:00").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn accepts_seconds_and_drops_them_on_output() {
        let parsed = parse_local("2025-01-02T10:00:42").unwrap();
        assert_eq!(parsed.second(), 42);
        assert_eq!(format_local(&parsed), "2025-01-02T10:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_local("tomorrow morning").is_err());
    }
}
