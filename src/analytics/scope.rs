use crate::types::record::Record;
use crate::types::source::Source;

/// Location part of a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationFilter {
    #[default]
    All,
    /// Exact, case-sensitive match on the location label.
    Exact(String),
}

/// Maps a front-end selection to a filter; `"Alle"`, `"all"` and the empty string select all
/// locations.
impl From<&str> for LocationFilter {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("alle")
            || trimmed.eq_ignore_ascii_case("all")
        {
            LocationFilter::All
        } else {
            LocationFilter::Exact(trimmed.to_string())
        }
    }
}

/// The subset of the table an analytic runs over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    pub location: LocationFilter,
    /// `None` keeps every provenance.
    pub source: Option<Source>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn location(location: impl Into<String>) -> Self {
        Self {
            location: LocationFilter::Exact(location.into()),
            source: None,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        let location_ok = match &self.location {
            LocationFilter::All => true,
            LocationFilter::Exact(location) => record.location == *location,
        };
        location_ok && self.source.map_or(true, |s| s == record.source)
    }
}

impl From<LocationFilter> for Scope {
    fn from(location: LocationFilter) -> Self {
        Self {
            location,
            source: None,
        }
    }
}
