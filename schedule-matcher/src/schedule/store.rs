//! Schedule store: the timetables in effect today, per route.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{MatchError, RouteId, StopId, local_to_utc};
use crate::timetable::{MetadataDocument, Timetable, TimetableVariant};

use super::resolve;

/// Default name of the metadata document inside the schedules directory.
pub const DEFAULT_METADATA_FILE: &str = "schedules.json";

/// Where timetables are read from and how their times are interpreted.
#[derive(Debug, Clone)]
pub struct ScheduleStoreConfig {
    /// Directory holding the timetable CSVs.
    pub dir: PathBuf,
    /// Metadata document. Relative paths are resolved against `dir`.
    pub metadata_file: PathBuf,
    /// Timezone the printed times are in, unless the metadata overrides it.
    pub timezone: Tz,
}

impl ScheduleStoreConfig {
    /// Create a config for `dir` with the default metadata file name.
    pub fn new(dir: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            dir: dir.into(),
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            timezone,
        }
    }

    /// Use a different metadata document.
    pub fn with_metadata_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_file = path.into();
        self
    }

    /// Full path of the metadata document.
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(&self.metadata_file)
    }
}

/// An immutable view of the timetables in effect on one service day.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSnapshot {
    date: Option<NaiveDate>,
    /// Every route that has at least one timetable file, in effect or not.
    known_routes: HashSet<RouteId>,
    /// Variants in effect, sorted by start time.
    variants: HashMap<RouteId, Vec<TimetableVariant>>,
}

impl ScheduleSnapshot {
    /// Select and anchor the timetables in effect on `today`.
    ///
    /// A timetable runs today if today's weekday is one of its valid days.
    /// A timetable valid yesterday is also kept, anchored to yesterday, when
    /// its last run continues past today's midnight, so a vehicle seen at
    /// 00:20 can still be matched against the late-night service.
    pub fn build(timetables: &[Timetable], today: NaiveDate) -> Result<Self, MatchError> {
        let yesterday = today
            .pred_opt()
            .ok_or_else(|| MatchError::malformed("", "date out of range"))?;
        let mut known_routes = HashSet::new();
        let mut variants: HashMap<RouteId, Vec<TimetableVariant>> = HashMap::new();

        for table in timetables {
            let meta = table.meta();
            known_routes.insert(meta.route_id);

            if meta.valid_days.contains(today.weekday()) {
                variants
                    .entry(meta.route_id)
                    .or_default()
                    .push(table.anchor(today)?);
            }

            if meta.valid_days.contains(yesterday.weekday()) {
                let carried = table.anchor(yesterday)?;
                let midnight = local_midnight(today, meta.timezone).ok_or_else(|| {
                    MatchError::malformed(table.source(), "local midnight does not exist")
                })?;
                if carried.end_time() > midnight {
                    debug!(
                        file = %table.source().display(),
                        "carrying yesterday's service past midnight"
                    );
                    variants.entry(meta.route_id).or_default().push(carried);
                }
            }
        }

        for list in variants.values_mut() {
            list.sort_by_key(TimetableVariant::start_time);
        }

        Ok(Self {
            date: Some(today),
            known_routes,
            variants,
        })
    }

    /// The service day this snapshot was built for.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Variants of `route` in effect, sorted by start time.
    pub fn variants_for_route(&self, route: RouteId) -> Result<&[TimetableVariant], MatchError> {
        match self.variants.get(&route) {
            Some(list) if !list.is_empty() => Ok(list.as_slice()),
            _ if self.known_routes.contains(&route) => {
                Err(MatchError::NoValidScheduleToday(route))
            }
            _ => Err(MatchError::UnknownRoute(route)),
        }
    }

    /// Nearest scheduled time at `stop` on `route` to `reported`.
    pub fn nearest_time(
        &self,
        route: RouteId,
        stop: StopId,
        reported: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, MatchError> {
        resolve::nearest_time(self.variants_for_route(route)?, route, stop, reported)
    }

    /// Number of variants in effect across all routes.
    pub fn variant_count(&self) -> usize {
        self.variants.values().map(Vec::len).sum()
    }

    pub fn route_count(&self) -> usize {
        self.known_routes.len()
    }
}

fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    local_to_utc(tz, date.and_time(NaiveTime::MIN))
}

/// Read every timetable CSV in the configured directory.
///
/// Files are processed in name order. Any failure aborts the whole load.
pub fn load_timetables(config: &ScheduleStoreConfig) -> Result<Vec<Timetable>, MatchError> {
    let metadata = MetadataDocument::load(&config.metadata_path())?;

    let entries = std::fs::read_dir(&config.dir)
        .map_err(|e| MatchError::malformed(&config.dir, format!("cannot read directory: {e}")))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            MatchError::malformed(&config.dir, format!("cannot read directory entry: {e}"))
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let file_name = file_name(path)?;
            let meta = metadata.resolve(file_name, path, config.timezone)?;
            debug!(file = file_name, route = %meta.route_id, "parsing timetable");
            Timetable::from_path(path, meta)
        })
        .collect()
}

fn file_name(path: &Path) -> Result<&str, MatchError> {
    path.file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MatchError::malformed(path, "file name is not valid UTF-8"))
}

/// Thread-safe schedule store with whole-snapshot refresh.
///
/// Readers take the current snapshot and drop the lock straight away, so a
/// refresh never waits on a slow reader and readers never see a half-built
/// schedule.
#[derive(Clone)]
pub struct ScheduleStore {
    inner: Arc<RwLock<Arc<ScheduleSnapshot>>>,
    config: Arc<ScheduleStoreConfig>,
}

impl ScheduleStore {
    /// Create an empty store. Call [`refresh`](Self::refresh) to load it.
    pub fn new(config: ScheduleStoreConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(ScheduleSnapshot::default()))),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ScheduleStoreConfig {
        &self.config
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<ScheduleSnapshot> {
        self.inner.read().await.clone()
    }

    /// Reload timetables for today's date in the configured timezone.
    pub async fn refresh(&self) -> Result<usize, MatchError> {
        let today = Utc::now().with_timezone(&self.config.timezone).date_naive();
        self.refresh_for(today).await
    }

    /// Reload timetables for an explicit local service day.
    ///
    /// On success the new snapshot replaces the current one and the number of
    /// variants in effect is returned. On failure the current snapshot is
    /// kept.
    pub async fn refresh_for(&self, today: NaiveDate) -> Result<usize, MatchError> {
        let config = Arc::clone(&self.config);
        let snapshot = tokio::task::spawn_blocking(move || {
            let timetables = load_timetables(&config)?;
            ScheduleSnapshot::build(&timetables, today)
        })
        .await
        .map_err(|e| {
            MatchError::malformed(&self.config.dir, format!("refresh task failed: {e}"))
        })??;

        let count = snapshot.variant_count();
        info!(
            date = %today,
            routes = snapshot.route_count(),
            variants = count,
            "schedules refreshed"
        );
        self.install(snapshot).await;
        Ok(count)
    }

    /// Replace the current snapshot.
    pub async fn install(&self, snapshot: ScheduleSnapshot) {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.inner.write().await;
        *guard = snapshot;
    }

    /// Variants of `route` in effect today, sorted by start time.
    pub async fn variants_for_route(
        &self,
        route: RouteId,
    ) -> Result<Vec<TimetableVariant>, MatchError> {
        Ok(self.snapshot().await.variants_for_route(route)?.to_vec())
    }

    /// Nearest scheduled time at `stop` on `route` to `reported`.
    pub async fn nearest_time(
        &self,
        route: RouteId,
        stop: StopId,
        reported: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, MatchError> {
        self.snapshot().await.nearest_time(route, stop, reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use tempfile::{TempDir, tempdir};

    const RED: RouteId = RouteId(4011456);
    const GRAY: RouteId = RouteId(4011458);
    const STOP: StopId = StopId(4132090);

    const METADATA: &str = r#"{
        "file_info": {
            "red_weekday.csv": {"route_id": 4011456, "valid_days": [0, 1, 2, 3, 4], "name": "Red Weekday"},
            "red_morning.csv": {"route_id": 4011456, "valid_days": [0, 1, 2, 3, 4]},
            "red_saturday.csv": {"route_id": 4011456, "valid_days": [5]},
            "gray_night.csv": {"route_id": 4011458, "valid_days": [4]}
        }
    }"#;

    /// 2018-10-08 is a Monday.
    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 10, d).unwrap()
    }

    /// UTC instant for a New York wall-clock time in October 2018 (EDT).
    fn edt(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 10, d, h, m, 0).unwrap() + chrono::Duration::hours(4)
    }

    fn schedules_dir() -> TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_METADATA_FILE), METADATA).unwrap();
        std::fs::write(
            dir.path().join("red_morning.csv"),
            "4132090,4208464\n06:00am,06:10am\n06:30am,06:40am\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("red_weekday.csv"),
            "4208464,4132090\n08:00am,08:10am\n08:30am,08:40am\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("red_saturday.csv"),
            "4132090\n10:00am\n11:00am\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("gray_night.csv"),
            "4132090,4220778\n11:00pm,11:10pm\n11:50pm,12:05am\n12:30am,12:40am\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a timetable").unwrap();
        dir
    }

    fn store(dir: &TempDir) -> ScheduleStore {
        ScheduleStore::new(ScheduleStoreConfig::new(dir.path(), New_York))
    }

    #[tokio::test]
    async fn weekday_selects_matching_variants_in_start_order() {
        let dir = schedules_dir();
        let store = store(&dir);
        let count = store.refresh_for(day(8)).await.unwrap();
        assert_eq!(count, 2);

        let red = store.variants_for_route(RED).await.unwrap();
        assert_eq!(red.len(), 2);
        assert_eq!(red[0].start_time(), edt(8, 6, 0));
        assert_eq!(red[1].start_time(), edt(8, 8, 0));
        assert_eq!(red[1].name(), Some("Red Weekday"));
    }

    #[tokio::test]
    async fn saturday_uses_saturday_timetable() {
        let dir = schedules_dir();
        let store = store(&dir);
        store.refresh_for(day(13)).await.unwrap();

        let red = store.variants_for_route(RED).await.unwrap();
        assert_eq!(red.len(), 1);
        assert_eq!(red[0].times_at(STOP).unwrap(), &[edt(13, 10, 0), edt(13, 11, 0)]);
    }

    #[tokio::test]
    async fn late_night_service_carries_into_next_day() {
        let dir = schedules_dir();
        let store = store(&dir);
        // Gray night runs Fridays (12th) until 00:40 on Saturday.
        store.refresh_for(day(13)).await.unwrap();

        let gray = store.variants_for_route(GRAY).await.unwrap();
        assert_eq!(gray.len(), 1);
        assert_eq!(gray[0].start_time(), edt(12, 23, 0));

        let nearest = store.nearest_time(GRAY, STOP, edt(13, 0, 20)).await.unwrap();
        assert_eq!(nearest, edt(13, 0, 30));
    }

    #[tokio::test]
    async fn known_route_without_service_today() {
        let dir = schedules_dir();
        let store = store(&dir);
        // Sunday: no red timetable, and gray's Friday service ended Saturday.
        store.refresh_for(day(14)).await.unwrap();

        assert_eq!(
            store.variants_for_route(RED).await.unwrap_err(),
            MatchError::NoValidScheduleToday(RED)
        );
        assert_eq!(
            store.variants_for_route(GRAY).await.unwrap_err(),
            MatchError::NoValidScheduleToday(GRAY)
        );
    }

    #[tokio::test]
    async fn unknown_route() {
        let dir = schedules_dir();
        let store = store(&dir);
        store.refresh_for(day(8)).await.unwrap();

        assert_eq!(
            store.variants_for_route(RouteId(1)).await.unwrap_err(),
            MatchError::UnknownRoute(RouteId(1))
        );
    }

    #[tokio::test]
    async fn empty_store_knows_nothing() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(
            store.nearest_time(RED, STOP, edt(8, 8, 0)).await,
            Err(MatchError::UnknownRoute(RED))
        );
    }

    #[tokio::test]
    async fn nearest_time_spans_variants() {
        let dir = schedules_dir();
        let store = store(&dir);
        store.refresh_for(day(8)).await.unwrap();

        // Morning ends 06:30 at the stop, weekday starts 08:10 there.
        assert_eq!(store.nearest_time(RED, STOP, edt(8, 7, 0)).await.unwrap(), edt(8, 6, 30));
        assert_eq!(store.nearest_time(RED, STOP, edt(8, 7, 30)).await.unwrap(), edt(8, 8, 10));
        assert_eq!(
            store.nearest_time(RED, StopId(1), edt(8, 7, 30)).await,
            Err(MatchError::UnknownStop {
                route: RED,
                stop: StopId(1)
            })
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let dir = schedules_dir();
        let store = store(&dir);
        store.refresh_for(day(8)).await.unwrap();

        std::fs::write(dir.path().join("red_weekday.csv"), "4208464\nsoon\n").unwrap();
        let err = store.refresh_for(day(9)).await.unwrap_err();
        assert!(matches!(err, MatchError::MalformedSchedule { .. }));

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.date(), Some(day(8)));
        assert_eq!(store.variants_for_route(RED).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn csv_without_metadata_fails_refresh() {
        let dir = schedules_dir();
        std::fs::write(dir.path().join("green_weekday.csv"), "1\n08:00am\n").unwrap();
        let err = store(&dir).refresh_for(day(8)).await.unwrap_err();
        assert!(err.to_string().contains("no metadata entry"), "{err}");
    }

    #[tokio::test]
    async fn missing_metadata_document_fails_refresh() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "1\n08:00am\n").unwrap();
        let err = store(&dir).refresh_for(day(8)).await.unwrap_err();
        assert!(err.to_string().contains("cannot read metadata"), "{err}");
    }

    #[tokio::test]
    async fn custom_metadata_location() {
        let dir = schedules_dir();
        let meta_dir = tempdir().unwrap();
        let meta_path = meta_dir.path().join("info.json");
        std::fs::rename(dir.path().join(DEFAULT_METADATA_FILE), &meta_path).unwrap();

        let config = ScheduleStoreConfig::new(dir.path(), New_York).with_metadata_file(&meta_path);
        assert_eq!(config.metadata_path(), meta_path);
        let store = ScheduleStore::new(config);
        assert_eq!(store.refresh_for(day(8)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn readers_hold_their_snapshot_across_refresh() {
        let dir = schedules_dir();
        let store = store(&dir);
        store.refresh_for(day(8)).await.unwrap();

        let before = store.snapshot().await;
        store.refresh_for(day(13)).await.unwrap();
        store.install(ScheduleSnapshot::default()).await;

        assert_eq!(before.date(), Some(day(8)));
        assert_eq!(before.variants_for_route(RED).unwrap().len(), 2);
        assert_eq!(store.snapshot().await.date(), None);
        assert_eq!(
            store.variants_for_route(RED).await.unwrap_err(),
            MatchError::UnknownRoute(RED)
        );
    }

    #[tokio::test]
    async fn refresh_around_spring_forward() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_METADATA_FILE),
            r#"{"file_info": {"gray_night.csv": {"route_id": 4011458, "valid_days": [0, 1, 2, 3, 4, 5, 6]}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("gray_night.csv"),
            "4132090\n11:30pm\n01:50am\n02:30am\n03:10am\n",
        )
        .unwrap();
        let store = store(&dir);
        let march = |d| NaiveDate::from_ymd_opt(2018, 3, d).unwrap();
        let utc = |d, h, m| Utc.with_ymd_and_hms(2018, 3, d, h, m, 0).unwrap();

        // Saturday's run crosses the gap early on Sunday 2018-03-11.
        assert_eq!(store.refresh_for(march(10)).await.unwrap(), 2);
        assert_eq!(store.refresh_for(march(11)).await.unwrap(), 2);

        let gray = store.variants_for_route(GRAY).await.unwrap();
        assert_eq!(
            gray[0].times_at(STOP).unwrap(),
            &[utc(11, 4, 30), utc(11, 6, 50), utc(11, 7, 0), utc(11, 7, 10)]
        );
        assert_eq!(
            store.nearest_time(GRAY, STOP, utc(11, 7, 3)).await.unwrap(),
            utc(11, 7, 0)
        );

        assert_eq!(store.refresh_for(march(12)).await.unwrap(), 2);
        assert_eq!(store.snapshot().await.date(), Some(march(12)));
    }

    #[test]
    fn yesterday_service_ending_before_midnight_is_dropped() {
        let table = Timetable::from_reader(
            "1\n09:00pm\n11:30pm\n".as_bytes(),
            Path::new("late.csv"),
            crate::timetable::TimetableMeta::new(
                RouteId(9),
                crate::domain::ValidDays::from_indices([0]).unwrap(),
                New_York,
            ),
        )
        .unwrap();

        // Tuesday: valid yesterday (Monday), but finished before midnight.
        let snapshot = ScheduleSnapshot::build(&[table], day(9)).unwrap();
        assert_eq!(snapshot.variant_count(), 0);
        assert_eq!(
            snapshot.variants_for_route(RouteId(9)).unwrap_err(),
            MatchError::NoValidScheduleToday(RouteId(9))
        );
    }
}
