use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Anything that can serve as the timestamp of a measurement.
///
/// Only the calendar date carries meaning, so zoned values keep their local wall-clock time
/// and plain dates resolve to midnight.
pub trait IntoTimestamp {
    fn into_timestamp(self) -> NaiveDateTime;
}

impl IntoTimestamp for NaiveDateTime {
    fn into_timestamp(self) -> NaiveDateTime {
        self
    }
}

impl IntoTimestamp for NaiveDate {
    fn into_timestamp(self) -> NaiveDateTime {
        self.and_time(NaiveTime::MIN)
    }
}

impl IntoTimestamp for DateTime<Local> {
    fn into_timestamp(self) -> NaiveDateTime {
        self.naive_local()
    }
}

impl IntoTimestamp for DateTime<Utc> {
    fn into_timestamp(self) -> NaiveDateTime {
        self.naive_utc()
    }
}

impl IntoTimestamp for DateTime<FixedOffset> {
    fn into_timestamp(self) -> NaiveDateTime {
        self.naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_resolves_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let ts = date.into_timestamp();
        assert_eq!(ts.date(), date);
        assert_eq!(ts.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_offset_keeps_local_calendar_date() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dt = offset.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).unwrap();
        assert_eq!(
            dt.into_timestamp().date(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }
}
