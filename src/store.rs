use std::time::Duration;
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, TimeDelta, TimeZone};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use crate::errors::StorageError;
use crate::models::sample::Sample;

const CREATE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS measurements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    temperature_c REAL NOT NULL,
    humidity_percent REAL NOT NULL,
    dew_point_c REAL NOT NULL
);";

const CREATE_INDEX_SQL: &str = "CREATE INDEX IF NOT EXISTS idx_measurements_ts ON measurements (ts);";

/// Append only store of outdoor samples backed by SQLite in WAL mode
///
/// Every operation opens its own short lived connection, so a reader never waits on the
/// scheduler for longer than one write transaction.
pub struct TimeSeriesStore {
    path: String,
    timeout: Duration,
    retention_months: u32,
    tz: Tz,
}

impl TimeSeriesStore {
    /// Returns a new TimeSeriesStore, the schema is not touched until init is called
    ///
    /// # Arguments
    ///
    /// * 'path' - path to the database file
    /// * 'timeout' - how long to wait for a lock held by another connection
    /// * 'retention_months' - samples older than this many calendar months are pruned
    /// * 'tz' - civil timezone used for the stored timestamps
    pub fn new(path: &str, timeout: Duration, retention_months: u32, tz: Tz) -> Self {
        Self { path: path.to_string(), timeout, retention_months, tz }
    }

    /// Creates table and index if they don't exist
    pub fn init(&self) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        conn.execute_batch(CREATE_INDEX_SQL)?;

        Ok(())
    }

    /// Appends a sample and prunes old samples in the same transaction
    ///
    /// # Arguments
    ///
    /// * 'sample' - the sample to store
    pub fn insert(&self, sample: &Sample) -> Result<(), StorageError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO measurements (ts, temperature_c, humidity_percent, dew_point_c) VALUES (?1, ?2, ?3, ?4)",
            params![self.to_iso(&sample.timestamp), sample.temperature_c, sample.humidity_percent, sample.dew_point_c],
        )?;
        self.prune_in(&tx, sample.timestamp)?;

        tx.commit()?;

        Ok(())
    }

    /// Deletes every sample older than the retention window counted back from 'now'
    ///
    /// Returns the number of deleted samples
    ///
    /// # Arguments
    ///
    /// * 'now' - the point in time the retention window ends at
    pub fn prune<T: TimeZone>(&self, now: DateTime<T>) -> Result<usize, StorageError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let deleted = self.prune_in(&tx, now)?;
        tx.commit()?;

        Ok(deleted)
    }

    /// Returns the sample with the latest timestamp, if any
    pub fn latest(&self) -> Result<Option<Sample>, StorageError> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT ts, temperature_c, humidity_percent, dew_point_c FROM measurements ORDER BY ts DESC LIMIT 1",
                [],
                raw_row,
            )
            .optional()?;

        row.map(|r| self.to_sample(r)).transpose()
    }

    /// Returns all samples with start <= timestamp <= end in ascending order
    ///
    /// # Arguments
    ///
    /// * 'start' - first point in time to include
    /// * 'end' - last point in time to include
    pub fn range<T: TimeZone>(&self, start: DateTime<T>, end: DateTime<T>) -> Result<Vec<Sample>, StorageError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT ts, temperature_c, humidity_percent, dew_point_c FROM measurements
             WHERE ts >= ?1 AND ts <= ?2
             ORDER BY ts ASC",
        )?;

        let rows = stmt
            .query_map(params![self.to_iso(&start), self.to_iso(&end)], raw_row)?
            .collect::<Result<Vec<RawRow>, rusqlite::Error>>()?;

        rows.into_iter().map(|r| self.to_sample(r)).collect()
    }

    /// Returns all samples of one civil day
    ///
    /// # Arguments
    ///
    /// * 'date' - the day in the store's timezone
    pub fn day(&self, date: NaiveDate) -> Result<Vec<Sample>, StorageError> {
        let (start, end) = day_bounds(date, self.tz);
        self.range(start, end)
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;

        Ok(conn)
    }

    fn prune_in<T: TimeZone>(&self, tx: &Transaction, now: DateTime<T>) -> Result<usize, StorageError> {
        let cutoff = retention_cutoff(now.with_timezone(&self.tz), self.retention_months);
        let deleted = tx.execute("DELETE FROM measurements WHERE ts < ?1", params![self.to_iso(&cutoff)])?;

        Ok(deleted)
    }

    fn to_iso<T: TimeZone>(&self, date_time: &DateTime<T>) -> String {
        date_time.with_timezone(&self.tz).to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    fn to_sample(&self, row: RawRow) -> Result<Sample, StorageError> {
        let timestamp = DateTime::parse_from_rfc3339(&row.0)?.with_timezone(&self.tz);

        Ok(Sample {
            timestamp,
            temperature_c: row.1,
            humidity_percent: row.2,
            dew_point_c: row.3,
        })
    }
}

type RawRow = (String, f64, f64, f64);

fn raw_row(row: &Row) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Subtracts whole calendar months from a point in time
///
/// The year is rolled back as long as the month ends up at or below zero. A day that
/// doesn't exist in the target month is clamped to the last day of that month.
///
/// # Arguments
///
/// * 'now' - point in time to count back from
/// * 'months' - number of months to subtract
pub fn retention_cutoff(now: DateTime<Tz>, months: u32) -> DateTime<Tz> {
    let mut month = now.month() as i64 - months as i64;
    let mut year = now.year();
    while month <= 0 {
        month += 12;
        year -= 1;
    }
    let month = month as u32;

    let date = (1..=now.day())
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .unwrap_or_default();
    let naive = date.and_time(now.time());

    let tz = now.timezone();
    tz.from_local_datetime(&naive)
        .earliest()
        // a wall time inside a spring forward gap is read with the offset before the gap
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// First and last representable instant of a civil day
///
/// # Arguments
///
/// * 'date' - the day
/// * 'tz' - the civil timezone
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Tz>, DateTime<Tz>) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end = date.and_hms_micro_opt(23, 59, 59, 999_999).unwrap_or_default();

    (
        tz.from_local_datetime(&start).earliest().unwrap_or_else(|| tz.from_utc_datetime(&start)),
        tz.from_local_datetime(&end).latest().unwrap_or_else(|| tz.from_utc_datetime(&end)),
    )
}

#[cfg(test)]
pub mod testing {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Directory under the system temp dir that is removed when dropped
    pub struct TempDir(PathBuf);

    impl TempDir {
        pub fn new(prefix: &str) -> Self {
            let n = COUNTER.fetch_add(1, Ordering::SeqCst);
            let path = std::env::temp_dir()
                .join(format!("hausserver-{}-{}-{}", prefix, std::process::id(), n));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }

        pub fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use chrono::Utc;
    use chrono_tz::Europe::Berlin;
    use super::*;
    use super::testing::TempDir;

    fn store(dir: &TempDir, retention_months: u32) -> TimeSeriesStore {
        let path = dir.path().join("test.db");
        let store = TimeSeriesStore::new(path.to_str().unwrap(), Duration::from_secs(1), retention_months, Berlin);
        store.init().unwrap();
        store
    }

    fn sample(y: i32, m: u32, d: u32, h: u32, t: f64) -> Sample {
        Sample {
            timestamp: Berlin.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            temperature_c: t,
            humidity_percent: 50.0,
            dew_point_c: 9.27,
        }
    }

    #[test]
    fn cutoff_rolls_year_back() {
        let now = Berlin.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap();
        let cutoff = retention_cutoff(now, 6);
        assert_eq!(cutoff, Berlin.with_ymd_and_hms(2023, 8, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn cutoff_rolls_more_than_a_year() {
        let now = Berlin.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(retention_cutoff(now, 8), Berlin.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap());
        assert_eq!(retention_cutoff(now, 18), Berlin.with_ymd_and_hms(2022, 12, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn cutoff_clamps_missing_day() {
        let now = Berlin.with_ymd_and_hms(2024, 8, 31, 8, 0, 0).unwrap();
        assert_eq!(retention_cutoff(now, 6), Berlin.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap());
    }

    #[test]
    fn insert_then_latest() {
        let dir = TempDir::new("store-latest");
        let store = store(&dir, 6);
        assert_eq!(store.latest().unwrap(), None);

        store.insert(&sample(2024, 5, 1, 10, 12.0)).unwrap();
        store.insert(&sample(2024, 5, 1, 11, 13.0)).unwrap();

        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest, sample(2024, 5, 1, 11, 13.0));
    }

    #[test]
    fn range_is_inclusive_and_ascending() {
        let dir = TempDir::new("store-range");
        let store = store(&dir, 6);
        for h in [13, 10, 12, 11, 14] {
            store.insert(&sample(2024, 5, 1, h, h as f64)).unwrap();
        }

        let start = Berlin.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        let end = Berlin.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let temps = store.range(start, end).unwrap().iter().map(|s| s.temperature_c).collect::<Vec<f64>>();

        assert_eq!(temps, vec![11.0, 12.0, 13.0]);
    }

    #[test]
    fn empty_range_is_empty() {
        let dir = TempDir::new("store-empty");
        let store = store(&dir, 6);
        store.insert(&sample(2024, 5, 1, 10, 1.0)).unwrap();

        let start = Berlin.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let end = Berlin.with_ymd_and_hms(2024, 5, 2, 23, 0, 0).unwrap();
        assert!(store.range(start, end).unwrap().is_empty());
    }

    #[test]
    fn day_covers_whole_civil_day() {
        let dir = TempDir::new("store-day");
        let store = store(&dir, 6);
        store.insert(&sample(2024, 5, 1, 0, 1.0)).unwrap();
        store.insert(&sample(2024, 5, 1, 23, 2.0)).unwrap();
        store.insert(&sample(2024, 5, 2, 0, 3.0)).unwrap();

        let day = store.day(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).unwrap();
        assert_eq!(day.len(), 2);
    }

    #[test]
    fn insert_prunes_samples_outside_retention() {
        let dir = TempDir::new("store-prune");
        let store = store(&dir, 6);
        store.insert(&sample(2023, 8, 9, 12, 1.0)).unwrap();
        store.insert(&sample(2023, 8, 10, 13, 2.0)).unwrap();
        store.insert(&sample(2024, 2, 10, 12, 3.0)).unwrap();

        let start = Berlin.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Berlin.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let temps = store.range(start, end).unwrap().iter().map(|s| s.temperature_c).collect::<Vec<f64>>();

        assert_eq!(temps, vec![2.0, 3.0]);
    }

    #[test]
    fn prune_reports_deleted_count() {
        let dir = TempDir::new("store-prune-count");
        let store = store(&dir, 1);
        store.insert(&sample(2024, 1, 1, 12, 1.0)).unwrap();
        store.insert(&sample(2024, 1, 20, 12, 2.0)).unwrap();

        let now = Berlin.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
        assert_eq!(store.prune(now).unwrap(), 1);
        assert_eq!(store.prune(now).unwrap(), 0);
    }

    #[test]
    fn cutoff_in_spring_forward_gap() {
        let now = Berlin.with_ymd_and_hms(2024, 10, 31, 2, 30, 0).unwrap();
        let cutoff = retention_cutoff(now, 7);

        assert_eq!(cutoff.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap());
    }

    #[test]
    fn readers_run_alongside_the_writer() {
        let dir = TempDir::new("store-concurrent");
        let path = dir.path().join("test.db");
        let store = TimeSeriesStore::new(path.to_str().unwrap(), Duration::from_secs(10), 6, Berlin);
        store.init().unwrap();

        let start = Berlin.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = start + TimeDelta::days(1);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            let writer = s.spawn(|| {
                let result = (0..100).try_for_each(|i: i64| {
                    store.insert(&Sample {
                        timestamp: start + TimeDelta::minutes(i),
                        temperature_c: i as f64,
                        humidity_percent: 50.0,
                        dew_point_c: 9.27,
                    })
                });
                done.store(true, Ordering::SeqCst);
                result
            });

            let mut readers = Vec::new();
            for _ in 0..2 {
                readers.push(s.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        let rows = store.range(start, end)?;
                        assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
                        store.latest()?;
                    }
                    Ok::<(), StorageError>(())
                }));
            }

            writer.join().unwrap().unwrap();
            for reader in readers {
                reader.join().unwrap().unwrap();
            }
        });

        assert_eq!(store.range(start, end).unwrap().len(), 100);
        assert_eq!(store.latest().unwrap().unwrap().temperature_c, 99.0);
    }
}
