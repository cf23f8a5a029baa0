//! Read-only analytics over the store's table view.

use crate::analytics::forecast::{Forecast, ForecastStrategy};
use crate::analytics::scope::{LocationFilter, Scope};
use crate::store::error::TableError;
use crate::store::measurement_store::MeasurementStore;
use crate::store::tabular::records_to_dataframe;
use crate::types::record::{Record, FIELD_LOCATION, FIELD_SOURCE};
use crate::utils::round1;
use chrono::{Datelike, Days, NaiveDate};
use ordered_float::OrderedFloat;
use polars::prelude::{col, lit, IntoLazy, LazyFrame};
use rand::Rng;
use std::cmp::Reverse;

/// Hottest and coldest day of a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Extremes {
    /// Row with the highest `temp_max`.
    pub hottest: Record,
    /// Row with the lowest `temp_min`.
    pub coldest: Record,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearStatistics {
    /// Rows in scope.
    pub count: usize,
    /// Mean of the record temperature; `None` for an empty scope.
    pub mean_temperature: Option<f64>,
    pub total_precipitation: f64,
    pub total_sunshine_hours: f64,
    /// Extremes over the rows that carry both bounds.
    pub extremes: Option<Extremes>,
}

/// Precipitation and sunshine summed over one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub precipitation: f64,
    pub sunshine_hours: f64,
}

/// Precipitation and sunshine summed over one calendar month (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonthTotals {
    pub month: u32,
    pub precipitation: f64,
    pub sunshine_hours: f64,
}

/// Month-by-month totals of one year next to the previous year.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyComparison {
    pub year: i32,
    pub current: [MonthTotals; 12],
    pub previous: [MonthTotals; 12],
}

impl MonthlyComparison {
    /// Whether any month of either year has a non-zero total.
    pub fn has_data(&self) -> bool {
        self.current
            .iter()
            .chain(self.previous.iter())
            .any(|m| m.precipitation != 0.0 || m.sunshine_hours != 0.0)
    }
}

/// Analytics over a snapshot of a [`MeasurementStore`].
///
/// The snapshot is the date-sorted [`MeasurementStore::as_table`] view taken at construction;
/// nothing here mutates the store. Every method takes a [`Scope`] and never fails on an empty
/// scope: it returns zeros, empty collections or `None` instead.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use wetterweiser::{Analytics, Measurement, MeasurementStore, Scope};
///
/// let mut store = MeasurementStore::new();
/// for (day, rain) in [(1, 0.0), (2, 3.5), (3, 0.0), (4, 1.0)] {
///     store.add(
///         Measurement::builder()
///             .timestamp(NaiveDate::from_ymd_opt(2024, 6, day).unwrap())
///             .location("Ulm")
///             .precipitation(rain)
///             .build(),
///     );
/// }
///
/// let analytics = Analytics::new(&store);
/// assert_eq!(analytics.rain_probability(4, &Scope::location("Ulm")), 50.0);
/// assert_eq!(analytics.rain_probability(4, &Scope::location("Graz")), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Analytics {
    table: Vec<Record>,
}

impl MeasurementStore {
    pub fn analytics(&self) -> Analytics {
        Analytics::new(self)
    }
}

impl Analytics {
    pub fn new(store: &MeasurementStore) -> Self {
        Self {
            table: store.as_table(),
        }
    }

    /// Rows in scope, in date order.
    pub fn scoped<'a>(
        &'a self,
        scope: &'a Scope,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        self.table.iter().filter(move |r| scope.matches(r))
    }

    /// The scoped table as a Polars `LazyFrame`, for display.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Frame`] if the table cannot be converted.
    pub fn scoped_frame(&self, scope: &Scope) -> Result<LazyFrame, TableError> {
        let mut frame = records_to_dataframe(&self.table)?.lazy();
        if let LocationFilter::Exact(location) = &scope.location {
            frame = frame.filter(col(FIELD_LOCATION).eq(lit(location.as_str())));
        }
        if let Some(source) = scope.source {
            frame = frame.filter(col(FIELD_SOURCE).eq(lit(source.wire_label())));
        }
        Ok(frame)
    }

    /// Hottest day by `temp_max` and coldest day by `temp_min`.
    ///
    /// Rows without the relevant bound are ignored; ties resolve to the earliest row. Returns
    /// `None` if no row in scope has a `temp_max` or none has a `temp_min`.
    pub fn extremes(&self, scope: &Scope) -> Option<Extremes> {
        extremes_of(self.scoped(scope))
    }

    /// Mean temperature, precipitation and sunshine totals, and the extremes over rows with
    /// both bounds present.
    pub fn year_statistics(&self, scope: &Scope) -> YearStatistics {
        let rows: Vec<&Record> = self.scoped(scope).collect();
        if rows.is_empty() {
            return YearStatistics::default();
        }
        let count = rows.len();
        let temperature_sum: f64 = rows.iter().map(|r| r.temperature).sum();
        YearStatistics {
            count,
            mean_temperature: Some(temperature_sum / count as f64),
            total_precipitation: rows.iter().map(|r| r.precipitation).sum(),
            total_sunshine_hours: rows.iter().map(|r| r.sunshine_hours).sum(),
            extremes: extremes_of(
                rows.iter()
                    .copied()
                    .filter(|r| r.temp_min.is_some() && r.temp_max.is_some()),
            ),
        }
    }

    /// Share of rainy rows among the most recent `days` rows in scope, in percent, rounded to
    /// one decimal.
    ///
    /// The denominator is always `days`, also when fewer rows exist. `days == 0` yields 0.
    pub fn rain_probability(&self, days: usize, scope: &Scope) -> f64 {
        if days == 0 {
            return 0.0;
        }
        let rows: Vec<&Record> = self.scoped(scope).collect();
        let recent = &rows[rows.len().saturating_sub(days)..];
        let rainy = recent.iter().filter(|r| r.precipitation > 0.0).count();
        round1(rainy as f64 / days as f64 * 100.0)
    }

    /// Forecasts temperature and precipitation for the `horizon` days after `today`.
    ///
    /// An empty scope yields an empty [`Forecast`].
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        scope: &Scope,
        horizon: usize,
        strategy: ForecastStrategy,
        today: NaiveDate,
        rng: &mut R,
    ) -> Forecast {
        let rows: Vec<&Record> = self.scoped(scope).collect();
        if rows.is_empty() {
            return Forecast::default();
        }
        let temperatures: Vec<f64> = rows.iter().map(|r| r.temperature).collect();
        let precipitation: Vec<f64> = rows.iter().map(|r| r.precipitation).collect();
        Forecast {
            days: (1..=horizon as u64)
                .filter_map(|i| today.checked_add_days(Days::new(i)))
                .collect(),
            temperature: strategy.apply(&temperatures, horizon, false, rng),
            precipitation: strategy.apply(&precipitation, horizon, true, rng),
        }
    }

    /// Per-day totals for the seven days ending with `today`, oldest first. Days without data
    /// are zero.
    pub fn weekly_comparison(&self, scope: &Scope, today: NaiveDate) -> Vec<DailyTotals> {
        (0..7u64)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|date| {
                let (precipitation, sunshine_hours) = self
                    .scoped(scope)
                    .filter(|r| r.day() == date)
                    .fold((0.0, 0.0), |(p, s), r| {
                        (p + r.precipitation, s + r.sunshine_hours)
                    });
                DailyTotals {
                    date,
                    precipitation,
                    sunshine_hours,
                }
            })
            .collect()
    }

    /// Monthly totals of `year` and `year - 1`, zero-filled.
    pub fn monthly_comparison(&self, scope: &Scope, year: i32) -> MonthlyComparison {
        let empty = || -> [MonthTotals; 12] {
            std::array::from_fn(|i| MonthTotals {
                month: i as u32 + 1,
                ..MonthTotals::default()
            })
        };
        let mut comparison = MonthlyComparison {
            year,
            current: empty(),
            previous: empty(),
        };
        for record in self.scoped(scope) {
            let date = record.day();
            let bucket = if date.year() == year {
                &mut comparison.current
            } else if date.year() == year - 1 {
                &mut comparison.previous
            } else {
                continue;
            };
            let month = &mut bucket[date.month0() as usize];
            month.precipitation += record.precipitation;
            month.sunshine_hours += record.sunshine_hours;
        }
        comparison
    }
}

fn extremes_of<'a>(rows: impl Iterator<Item = &'a Record> + Clone) -> Option<Extremes> {
    // min_by_key keeps the first of equal keys, so Reverse gives the earliest maximum
    let hottest = rows
        .clone()
        .filter_map(|r| r.temp_max.map(|t| (r, t)))
        .min_by_key(|(_, t)| Reverse(OrderedFloat(*t)))?;
    let coldest = rows
        .filter_map(|r| r.temp_min.map(|t| (r, t)))
        .min_by_key(|(_, t)| OrderedFloat(*t))?;
    Some(Extremes {
        hottest: hottest.0.clone(),
        coldest: coldest.0.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::measurement::Measurement;
    use crate::types::source::Source;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rain_probability_scenario() {
        let mut store = MeasurementStore::new();
        for (i, rain) in [0.0, 0.0, 5.0, 0.0, 0.0, 2.0, 0.0].iter().enumerate() {
            store.add(
                Measurement::builder()
                    .timestamp(date(2024, 4, i as u32 + 1))
                    .location("Ulm")
                    .precipitation(*rain)
                    .build(),
            );
        }
        let analytics = store.analytics();
        assert_eq!(analytics.rain_probability(7, &Scope::location("Ulm")), 28.6);
        assert_eq!(analytics.rain_probability(3, &Scope::all()), 33.3);
        assert_eq!(analytics.rain_probability(0, &Scope::all()), 0.0);
    }

    #[test]
    fn test_rain_probability_keeps_requested_denominator() {
        let mut store = MeasurementStore::new();
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 4, 1))
                .location("Ulm")
                .precipitation(1.0)
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 4, 2))
                .location("Ulm")
                .precipitation(1.0)
                .build(),
        );
        assert_eq!(store.analytics().rain_probability(7, &Scope::all()), 28.6);
    }

    #[test]
    fn test_extremes_scenario() {
        let mut store = MeasurementStore::new();
        for (i, (min, max)) in [(10.0, 20.0), (5.0, 30.0), (15.0, 18.0)].iter().enumerate() {
            store.add(
                Measurement::builder()
                    .timestamp(date(2024, 5, i as u32 + 1))
                    .location("Ulm")
                    .temp_min(*min)
                    .temp_max(*max)
                    .id(format!("r{i}"))
                    .build(),
            );
        }
        let extremes = store.analytics().extremes(&Scope::location("Ulm")).unwrap();
        assert_eq!(extremes.hottest.id, "r1");
        assert_eq!(extremes.coldest.id, "r1");
    }

    #[test]
    fn test_extremes_use_bounds_not_mean_and_earliest_tie() {
        let mut store = MeasurementStore::new();
        store.add(
            Measurement::builder().timestamp(date(2024, 5, 1)).location("Ulm")
                .temperature(25.0)
                .temp_min(20.0)
                .temp_max(28.0)
                .id("warm-mean")
                .build(),
        );
        store.add(
            Measurement::builder().timestamp(date(2024, 5, 2)).location("Ulm")
                .temperature(15.0)
                .temp_min(2.0)
                .temp_max(31.0)
                .id("first-peak")
                .build(),
        );
        store.add(
            Measurement::builder().timestamp(date(2024, 5, 3)).location("Ulm")
                .temp_min(2.0)
                .temp_max(31.0)
                .id("second-peak")
                .build(),
        );
        let extremes = store.analytics().extremes(&Scope::all()).unwrap();
        assert_eq!(extremes.hottest.id, "first-peak");
        assert_eq!(extremes.coldest.id, "first-peak");
    }

    #[test]
    fn test_year_statistics() {
        let mut store = MeasurementStore::new();
        store.add(
            Measurement::builder().timestamp(date(2024, 1, 1)).location("Ulm")
                .temperature(4.0)
                .precipitation(2.0)
                .sunshine_hours(1.0)
                .build(),
        );
        store.add(
            Measurement::builder().timestamp(date(2024, 1, 2)).location("Ulm")
                .temp_min(0.0)
                .temp_max(12.0)
                .precipitation(1.0)
                .sunshine_hours(3.0)
                .id("bounded")
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 1, 2))
                .location("Graz")
                .temperature(30.0)
                .build(),
        );

        let stats = store.analytics().year_statistics(&Scope::location("Ulm"));
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_temperature, Some(5.0));
        assert_eq!(stats.total_precipitation, 3.0);
        assert_eq!(stats.total_sunshine_hours, 4.0);
        let extremes = stats.extremes.unwrap();
        assert_eq!(extremes.hottest.id, "bounded");
        assert_eq!(extremes.coldest.id, "bounded");
    }

    #[test]
    fn test_scope_filters_by_source() {
        let mut store = MeasurementStore::new();
        store.add(
            Measurement::builder().timestamp(date(2024, 1, 1)).location("Ulm")
                .precipitation(1.0)
                .source(Source::Live)
                .build(),
        );
        store.add(
            Measurement::builder().timestamp(date(2024, 1, 2)).location("Ulm")
                .precipitation(0.0)
                .source(Source::Simulated)
                .build(),
        );
        let analytics = store.analytics();
        let live = Scope::location("Ulm").with_source(Source::Live);
        assert_eq!(analytics.year_statistics(&live).count, 1);
        assert_eq!(analytics.rain_probability(1, &live), 100.0);
    }

    #[test]
    fn test_empty_store_returns_neutral_results() -> Result<(), Box<dyn std::error::Error>> {
        let analytics = MeasurementStore::new().analytics();
        let scope = Scope::all();
        let today = date(2024, 6, 30);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(analytics.extremes(&scope).is_none());
        assert_eq!(analytics.year_statistics(&scope), YearStatistics::default());
        assert_eq!(analytics.rain_probability(7, &scope), 0.0);
        for strategy in ForecastStrategy::ALL {
            assert!(analytics
                .forecast(&scope, 3, strategy, today, &mut rng)
                .is_empty());
        }
        let weekly = analytics.weekly_comparison(&scope, today);
        assert_eq!(weekly.len(), 7);
        assert!(weekly.iter().all(|d| d.precipitation == 0.0 && d.sunshine_hours == 0.0));
        assert!(!analytics.monthly_comparison(&scope, 2024).has_data());
        assert_eq!(analytics.scoped_frame(&scope)?.collect()?.height(), 0);
        Ok(())
    }

    #[test]
    fn test_forecast_bundle() {
        let mut store = MeasurementStore::new();
        for (i, (t, p)) in [(10.0, 4.0), (12.0, 2.0), (14.0, 0.0)].iter().enumerate() {
            store.add(
                Measurement::builder()
                    .timestamp(date(2024, 6, i as u32 + 1))
                    .location("Ulm")
                    .temperature(*t)
                    .precipitation(*p)
                    .build(),
            );
        }
        let mut rng = StdRng::seed_from_u64(1);
        let forecast = store.analytics().forecast(
            &Scope::all(),
            3,
            ForecastStrategy::Trend,
            date(2024, 6, 3),
            &mut rng,
        );
        assert_eq!(
            forecast.days,
            vec![date(2024, 6, 4), date(2024, 6, 5), date(2024, 6, 6)]
        );
        assert_eq!(forecast.temperature, vec![18.0, 20.0, 22.0]);
        assert_eq!(forecast.precipitation, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_weekly_comparison_sums_per_day() {
        let today = date(2024, 3, 10);
        let mut store = MeasurementStore::new();
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 3, 10))
                .location("Ulm")
                .precipitation(1.5)
                .sunshine_hours(2.0)
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 3, 10))
                .location("Graz")
                .precipitation(0.5)
                .sunshine_hours(1.0)
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 3, 4))
                .location("Ulm")
                .precipitation(3.0)
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 3, 3))
                .location("Ulm")
                .precipitation(9.0)
                .build(),
        );

        let weekly = store.analytics().weekly_comparison(&Scope::all(), today);
        assert_eq!(weekly.first().map(|d| d.date), Some(date(2024, 3, 4)));
        assert_eq!(weekly[0].precipitation, 3.0);
        assert_eq!(weekly[6].date, today);
        assert_eq!(weekly[6].precipitation, 2.0);
        assert_eq!(weekly[6].sunshine_hours, 3.0);
        assert_eq!(weekly[3].precipitation, 0.0);
    }

    #[test]
    fn test_monthly_comparison_aligns_years() {
        let mut store = MeasurementStore::new();
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 2, 1))
                .location("Ulm")
                .precipitation(4.0)
                .sunshine_hours(1.0)
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 2, 20))
                .location("Ulm")
                .precipitation(1.0)
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2023, 12, 31))
                .location("Ulm")
                .sunshine_hours(5.0)
                .build(),
        );
        store.add(
            Measurement::builder()
                .timestamp(date(2022, 2, 1))
                .location("Ulm")
                .precipitation(100.0)
                .build(),
        );

        let comparison = store.analytics().monthly_comparison(&Scope::all(), 2024);
        assert!(comparison.has_data());
        assert_eq!(comparison.current[1].month, 2);
        assert_eq!(comparison.current[1].precipitation, 5.0);
        assert_eq!(comparison.current[1].sunshine_hours, 1.0);
        assert_eq!(comparison.previous[11].sunshine_hours, 5.0);
        let all_years: f64 = comparison
            .current
            .iter()
            .chain(comparison.previous.iter())
            .map(|m| m.precipitation)
            .sum();
        assert_eq!(all_years, 5.0);
    }

    #[test]
    fn test_scoped_frame_filters_rows() -> Result<(), Box<dyn std::error::Error>> {
        let mut store = MeasurementStore::new();
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 1, 1))
                .location("Ulm")
                .source(Source::Live)
                .build(),
        );
        store.add(Measurement::builder().timestamp(date(2024, 1, 2)).location("Ulm").build());
        store.add(
            Measurement::builder()
                .timestamp(date(2024, 1, 3))
                .location("Graz")
                .source(Source::Live)
                .build(),
        );

        let analytics = store.analytics();
        let frame = analytics
            .scoped_frame(&Scope::location("Ulm").with_source(Source::Live))?
            .collect()?;
        assert_eq!(frame.height(), 1);
        assert_eq!(analytics.scoped_frame(&Scope::all())?.collect()?.height(), 3);
        Ok(())
    }
}
