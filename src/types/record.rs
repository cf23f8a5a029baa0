//! The flat row shapes that cross the serialization boundary: [`Record`] going out
//! (remote document, CSV, table view) and [`RawRow`] coming in (remote document,
//! spreadsheet/CSV, form input).

use crate::types::error::RecordError;
use crate::types::source::Source;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use serde_json::Value;

pub const FIELD_ID: &str = "ID";
pub const FIELD_DATE: &str = "Datum";
pub const FIELD_TEMPERATURE: &str = "Temperatur";
pub const FIELD_PRECIPITATION: &str = "Niederschlag";
pub const FIELD_SUNSHINE: &str = "Sonnenstunden";
pub const FIELD_SOURCE: &str = "Quelle";
pub const FIELD_LOCATION: &str = "Standort";
pub const FIELD_TEMP_MIN: &str = "Temp_min";
pub const FIELD_TEMP_MAX: &str = "Temp_max";

/// Column order of the record view, as written to the remote document and CSV header.
pub const RECORD_FIELDS: [&str; 9] = [
    FIELD_ID,
    FIELD_DATE,
    FIELD_TEMPERATURE,
    FIELD_PRECIPITATION,
    FIELD_SUNSHINE,
    FIELD_SOURCE,
    FIELD_LOCATION,
    FIELD_TEMP_MIN,
    FIELD_TEMP_MAX,
];

/// Timestamp format used on the wire.
pub const DATUM_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// One measurement flattened into its serialized form.
///
/// Optional numeric fields are already normalized: `temperature` is the stored mean or
/// the derived min/max midpoint (0 when neither is available), precipitation and sunshine
/// default to 0. Only `temp_min` / `temp_max` may remain `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Datum", serialize_with = "serialize_datum")]
    pub date: NaiveDateTime,
    #[serde(rename = "Temperatur")]
    pub temperature: f64,
    #[serde(rename = "Niederschlag")]
    pub precipitation: f64,
    #[serde(rename = "Sonnenstunden")]
    pub sunshine_hours: f64,
    #[serde(rename = "Quelle")]
    pub source: Source,
    #[serde(rename = "Standort")]
    pub location: String,
    #[serde(rename = "Temp_min")]
    pub temp_min: Option<f64>,
    #[serde(rename = "Temp_max")]
    pub temp_max: Option<f64>,
}

impl Record {
    /// Calendar date of the observation.
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

fn serialize_datum<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(DATUM_FORMAT))
}

/// One inbound row as read from a document or file; an `Err` marks a row that could not be
/// read at all and is reported as skipped on import.
pub type RowResult = Result<RawRow, RecordError>;

/// An unvalidated inbound row, with every field optional.
///
/// Numbers have already been read leniently (numeric strings are accepted), the date and
/// provenance are still text and are interpreted by the measurement constructor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub id: Option<String>,
    pub date: Option<String>,
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub sunshine_hours: Option<f64>,
    pub source: Option<String>,
    pub location: Option<String>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
}

impl RawRow {
    /// Reads a row from one entry of the remote JSON array.
    ///
    /// Keys are matched against the capitalized display names (`Datum`, `Temperatur`, ...)
    /// and, as a fallback, against the lowercase constructor names (`date`, `temperature`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidNumber`] if a numeric field holds text that is not a number.
    /// A value that is not a JSON object yields an all-empty row, which the constructor rejects
    /// for its missing date.
    pub fn from_json(value: &Value) -> Result<Self, RecordError> {
        let lookup = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .find_map(|name| value.get(*name))
                .and_then(json_text)
        };
        Self::from_lookup(lookup)
    }

    /// Reads a row through a cell lookup keyed by column name, used by tabular sources.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, RecordError>
    where
        F: Fn(&[&str]) -> Option<String>,
    {
        let number = |field: &'static str, aliases: &[&str]| -> Result<Option<f64>, RecordError> {
            match lookup(aliases) {
                Some(text) => parse_optional_number(field, &text),
                None => Ok(None),
            }
        };

        Ok(RawRow {
            id: lookup(&[FIELD_ID, "id"]).filter(|s| !s.trim().is_empty()),
            date: lookup(&[FIELD_DATE, "date", "Date", "timestamp"]),
            temperature: number(FIELD_TEMPERATURE, &[FIELD_TEMPERATURE, "temperature"])?,
            precipitation: number(FIELD_PRECIPITATION, &[FIELD_PRECIPITATION, "precipitation"])?,
            sunshine_hours: number(FIELD_SUNSHINE, &[FIELD_SUNSHINE, "sunshine_hours"])?,
            source: lookup(&[FIELD_SOURCE, "source"]),
            location: lookup(&[FIELD_LOCATION, "location"]),
            temp_min: number(FIELD_TEMP_MIN, &[FIELD_TEMP_MIN, "temp_min"])?,
            temp_max: number(FIELD_TEMP_MAX, &[FIELD_TEMP_MAX, "temp_max"])?,
        })
    }
}

impl From<&Record> for RawRow {
    fn from(record: &Record) -> Self {
        RawRow {
            id: Some(record.id.clone()),
            date: Some(record.date.format(DATUM_FORMAT).to_string()),
            temperature: Some(record.temperature),
            precipitation: Some(record.precipitation),
            sunshine_hours: Some(record.sunshine_hours),
            source: Some(record.source.to_string()),
            location: Some(record.location.clone()),
            temp_min: record.temp_min,
            temp_max: record.temp_max,
        }
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Parses a numeric cell. Empty cells and the usual spreadsheet null markers are `None`;
/// a decimal comma is accepted.
pub(crate) fn parse_optional_number(
    field: &'static str,
    text: &str,
) -> Result<Option<f64>, RecordError> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
    {
        return Ok(None);
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| RecordError::InvalidNumber {
            field,
            value: text.to_string(),
        })
}

/// Parses the timestamp formats seen in stored documents and spreadsheets.
///
/// Date-only inputs resolve to midnight; time zones are dropped in favour of the local
/// wall-clock time, since only the calendar date matters for identity.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, RecordError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RecordError::MissingDate);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
        .ok_or_else(|| RecordError::InvalidDate(text.to_string()))
}
