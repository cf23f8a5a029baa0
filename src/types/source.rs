//! Defines the provenance tag attached to every measurement.

use crate::types::error::RecordError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Where a measurement came from.
///
/// The wire representation (remote document, CSV) uses the lowercase German labels
/// `manuell`, `simuliert` and `live`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    /// Entered by hand by an operator.
    #[default]
    Manual,
    /// Generated by the built-in simulation.
    Simulated,
    /// Fetched from the live weather provider.
    Live,
}

impl Source {
    /// All variants, in the order a front end offers them as filter choices.
    pub const ALL: [Source; 3] = [Source::Manual, Source::Simulated, Source::Live];

    pub(crate) fn wire_label(&self) -> &'static str {
        match self {
            Source::Manual => "manuell",
            Source::Simulated => "simuliert",
            Source::Live => "live",
        }
    }

    /// Parses a provenance label, falling back to [`Source::Manual`] for anything unknown.
    ///
    /// The second element carries a warning describing the fallback, so that callers can
    /// surface it instead of silently reclassifying the row. Missing labels fall back
    /// without a warning.
    pub fn parse_lenient(label: Option<&str>) -> (Source, Option<String>) {
        match label {
            None => (Source::Manual, None),
            Some(raw) if raw.trim().is_empty() => (Source::Manual, None),
            Some(raw) => match raw.parse::<Source>() {
                Ok(source) => (source, None),
                Err(e) => (Source::Manual, Some(format!("{e}; treated as manuell"))),
            },
        }
    }
}

impl FromStr for Source {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = match s.trim().to_lowercase().as_str() {
            "manual" => "manuell".to_string(),
            "simulated" => "simuliert".to_string(),
            other => other.to_string(),
        };
        Source::ALL
            .into_iter()
            .find(|source| source.wire_label() == label)
            .ok_or_else(|| RecordError::UnknownSource(s.to_string()))
    }
}

/// Allows formatting a `Source` using its wire label.
///
/// # Examples
///
/// ```
/// use wetterweiser::Source;
///
/// assert_eq!(Source::Simulated.to_string(), "simuliert");
/// ```
impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_label())
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_label())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
