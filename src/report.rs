//! Report types - the sighting record and its inbound payload
//!
//! A report moves through three shapes:
//! - `CreateReport`: the raw JSON payload as submitted by a client
//! - `NewReport`: validated and normalized, ready to be inserted
//! - `Report`: the persisted record, including store-assigned fields

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum length of an event type, in characters
pub const MAX_EVENT_TYPE_LEN: usize = 50;

/// Maximum length of a description, in characters
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Naive layouts accepted for `observed_at`, interpreted as UTC
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Years that fit the fixed four-digit storage format
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// A persisted sighting report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub event_type: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Payload accepted by `POST /reports`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReport {
    pub event_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "deserialize_observed_at")]
    pub observed_at: Option<DateTime<Utc>>,
}

/// A validated, normalized report that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub event_type: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

impl NewReport {
    /// Validate and normalize a payload.
    ///
    /// `now` is used for `observed_at` when the client omitted it; callers pass
    /// the time the request was received.
    pub fn from_payload(payload: CreateReport, now: DateTime<Utc>) -> Result<Self> {
        if let Some(description) = &payload.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(Error::Validation(format!(
                    "description must be at most {} characters",
                    MAX_DESCRIPTION_LEN
                )));
            }
        }

        let event_type = normalize_event_type(&payload.event_type);
        if event_type.is_empty() {
            return Err(Error::Validation("event_type must not be empty".to_string()));
        }
        if event_type.chars().count() > MAX_EVENT_TYPE_LEN {
            return Err(Error::Validation(format!(
                "event_type must be at most {} characters",
                MAX_EVENT_TYPE_LEN
            )));
        }

        if !payload.latitude.is_finite() || !payload.longitude.is_finite() {
            return Err(Error::Validation(
                "latitude and longitude must be finite numbers".to_string(),
            ));
        }

        let observed_at = check_storable_year(payload.observed_at.unwrap_or(now))?;

        Ok(Self {
            event_type,
            description: normalize_description(payload.description.as_deref()),
            latitude: payload.latitude,
            longitude: payload.longitude,
            observed_at,
        })
    }
}

impl TryFrom<CreateReport> for NewReport {
    type Error = Error;

    fn try_from(payload: CreateReport) -> Result<Self> {
        Self::from_payload(payload, Utc::now())
    }
}

/// Lowercase and trim an event type
pub fn normalize_event_type(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trim a description; blank input becomes `None`
pub fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse an ISO-8601 timestamp.
///
/// RFC 3339 input with an offset is converted to UTC. Naive input without an
/// offset is taken to already be UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NAIVE_TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| Error::Timestamp(raw.to_string()))?,
    };

    check_storable_year(parsed)
}

/// Reject timestamps whose year falls outside 0000-9999
fn check_storable_year(dt: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if STORABLE_YEARS.contains(&dt.year()) {
        Ok(dt)
    } else {
        Err(Error::Validation(format!(
            "timestamp year must be between 0000 and 9999, got {}",
            dt.year()
        )))
    }
}

/// Format a timestamp for storage.
///
/// Fixed-width microsecond precision keeps lexical and chronological order equal.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn deserialize_observed_at<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom))
        .transpose()
}
