use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;
use crate::errors::StorageError;
use crate::models::sample::Sample;
use crate::smoothing::smooth;
use crate::store::TimeSeriesStore;

/// One series as stored and as smoothed for display
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub raw: Vec<Option<f64>>,
    pub smoothed: Vec<Option<f64>>,
}

impl Series {
    fn new(raw: Vec<Option<f64>>, window: usize) -> Self {
        let smoothed = smooth(&raw, window);
        Self { raw, smoothed }
    }
}

/// Day view of the stored samples, all vectors have the same length as 'times'
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DaySeries {
    pub date: NaiveDate,
    pub times: Vec<String>,
    pub temperature: Series,
    pub humidity: Series,
    pub dew_point: Series,
}

impl DaySeries {
    /// Builds the day view from samples in ascending time order
    ///
    /// # Arguments
    ///
    /// * 'date' - the civil day the samples belong to
    /// * 'samples' - the samples
    /// * 'window' - smoothing window
    pub fn from_samples(date: NaiveDate, samples: &[Sample], window: usize) -> Self {
        let times = samples.iter().map(|s| s.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false)).collect();
        let series = |f: fn(&Sample) -> f64| {
            Series::new(samples.iter().map(|s| Some(f(s))).collect(), window)
        };

        Self {
            date,
            times,
            temperature: series(|s| s.temperature_c),
            humidity: series(|s| s.humidity_percent),
            dew_point: series(|s| s.dew_point_c),
        }
    }
}

/// Reads one civil day from the store and returns its day view
///
/// # Arguments
///
/// * 'store' - the measurement store
/// * 'date' - the civil day
/// * 'window' - smoothing window
pub fn day_series(store: &TimeSeriesStore, date: NaiveDate, window: usize) -> Result<DaySeries, StorageError> {
    let samples = store.day(date)?;

    Ok(DaySeries::from_samples(date, &samples, window))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use chrono::TimeZone;
    use chrono_tz::Europe::Berlin;
    use crate::store::testing::TempDir;
    use super::*;

    fn sample(h: u32, m: u32, t: f64) -> Sample {
        Sample {
            timestamp: Berlin.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap(),
            temperature_c: t,
            humidity_percent: 60.0,
            dew_point_c: t - 5.0,
        }
    }

    #[test]
    fn series_are_aligned_with_times() {
        let samples = vec![sample(0, 0, 10.0), sample(0, 15, 12.0), sample(0, 30, 14.0)];
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let view = DaySeries::from_samples(date, &samples, 2);

        assert_eq!(view.times, vec!["2024-05-01T00:00:00+02:00", "2024-05-01T00:15:00+02:00", "2024-05-01T00:30:00+02:00"]);
        assert_eq!(view.temperature.raw, vec![Some(10.0), Some(12.0), Some(14.0)]);
        assert_eq!(view.temperature.smoothed, vec![Some(10.0), Some(11.0), Some(13.0)]);
        assert_eq!(view.dew_point.raw, vec![Some(5.0), Some(7.0), Some(9.0)]);
        assert_eq!(view.humidity.smoothed.len(), 3);
    }

    #[test]
    fn reads_one_day_from_store() {
        let dir = TempDir::new("history");
        let path = dir.path().join("history.db");
        let store = TimeSeriesStore::new(path.to_str().unwrap(), Duration::from_secs(1), 6, Berlin);
        store.init().unwrap();

        store.insert(&sample(23, 0, 8.0)).unwrap();
        store.insert(&sample(9, 0, 11.0)).unwrap();
        store.insert(&Sample { timestamp: Berlin.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(), ..sample(0, 0, 1.0) }).unwrap();

        let view = day_series(&store, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 4).unwrap();

        assert_eq!(view.times, vec!["2024-05-01T09:00:00+02:00", "2024-05-01T23:00:00+02:00"]);
        assert_eq!(view.temperature.smoothed, vec![Some(11.0), Some(9.5)]);
    }

    #[test]
    fn repeated_hour_on_fall_back_day_keeps_distinct_times() {
        let local = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap().and_hms_opt(2, 30, 0).unwrap();
        let first = Berlin.from_local_datetime(&local).earliest().unwrap();
        let second = Berlin.from_local_datetime(&local).latest().unwrap();
        let samples = vec![
            Sample { timestamp: first, ..sample(0, 0, 10.0) },
            Sample { timestamp: second, ..sample(0, 0, 11.0) },
        ];

        let view = DaySeries::from_samples(local.date(), &samples, 4);

        assert_eq!(view.times, vec!["2024-10-27T02:30:00+02:00", "2024-10-27T02:30:00+01:00"]);
    }

    #[test]
    fn empty_day_is_empty() {
        let view = DaySeries::from_samples(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), &[], 4);
        assert!(view.times.is_empty());
        assert!(view.temperature.smoothed.is_empty());
    }
}
