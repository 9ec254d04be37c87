//! CSV timetable parsing.
//!
//! A timetable file looks like the printed schedule it was typed from:
//!
//! ```text
//! 4211460,4132090,4208462
//! 10:00pm,10:05pm,10:12pm
//! 11:30pm,none,11:42pm
//! 12:00am,12:05am,12:12am
//! ```
//!
//! The first row lists stop ids. Every following cell is a 12-hour time or
//! `none` for a stop skipped on that loop. Cells are read left to right,
//! top to bottom, and the column they belong to is the header cycled over
//! the whole file: a row may be shorter or longer than the header, in which
//! case the next row continues where the previous one left off.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::domain::{DateAnchor, MatchError, StopId, local_to_utc, parse_clock_time};

use super::metadata::TimetableMeta;
use super::variant::TimetableVariant;

/// Cell marking a stop that is not served on that loop.
const NO_SERVICE: &str = "none";

/// A timetable file parsed into local clock times, not yet placed on a date.
///
/// Parsing once and anchoring many times lets the schedule store place the
/// same file on both today and yesterday without re-reading it.
#[derive(Debug, Clone)]
pub struct Timetable {
    source: PathBuf,
    meta: TimetableMeta,
    header: Vec<StopId>,
    /// Row-major cells; `None` is the no-service sentinel.
    cells: Vec<Option<NaiveTime>>,
}

impl Timetable {
    /// Parse the timetable at `path`.
    pub fn from_path(path: &Path, meta: TimetableMeta) -> Result<Self, MatchError> {
        let file = File::open(path)
            .map_err(|e| MatchError::malformed(path, format!("cannot open: {e}")))?;
        Self::from_reader(file, path, meta)
    }

    /// Parse a timetable from any reader; `source` names it in errors.
    pub fn from_reader<R: Read>(
        reader: R,
        source: &Path,
        meta: TimetableMeta,
    ) -> Result<Self, MatchError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = rdr.records();

        let header_record = records
            .next()
            .ok_or_else(|| MatchError::malformed(source, "empty file"))?
            .map_err(|e| MatchError::malformed(source, e.to_string()))?;

        let header = header_record
            .iter()
            .map(|cell| {
                cell.parse::<u64>().map(StopId).map_err(|_| {
                    MatchError::malformed(source, format!("header cell {cell:?} is not a stop id"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if header.is_empty() {
            return Err(MatchError::malformed(source, "header has no columns"));
        }

        let mut cells = Vec::new();
        for (row, record) in records.enumerate() {
            let record = record.map_err(|e| MatchError::malformed(source, e.to_string()))?;
            for cell in record.iter() {
                if cell.eq_ignore_ascii_case(NO_SERVICE) {
                    cells.push(None);
                    continue;
                }
                let time = parse_clock_time(cell).map_err(|e| {
                    // +2: one for the header, one for 1-based numbering
                    MatchError::malformed(source, format!("row {}: {e}", row + 2))
                })?;
                cells.push(Some(time));
            }
        }

        if cells.iter().all(Option::is_none) {
            return Err(MatchError::malformed(source, "no scheduled times"));
        }

        Ok(Self {
            source: source.to_path_buf(),
            meta,
            header,
            cells,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn meta(&self) -> &TimetableMeta {
        &self.meta
    }

    /// Stop ids in header order, duplicates included.
    pub fn header(&self) -> &[StopId] {
        &self.header
    }

    /// Place the timetable on `date` (the local service day of its first
    /// run) and convert every time to UTC.
    ///
    /// Fails if a stop's times would go backwards, which means the file is
    /// out of order in a way rollover detection cannot explain.
    pub fn anchor(&self, date: NaiveDate) -> Result<TimetableVariant, MatchError> {
        let tz = self.meta.timezone;
        let mut anchor = DateAnchor::new(date);
        let mut stop_times: HashMap<StopId, Vec<DateTime<Utc>>> = HashMap::new();

        for (index, cell) in self.cells.iter().enumerate() {
            let stop = self.header[index % self.header.len()];
            let Some(time) = cell else {
                continue;
            };

            let local = anchor
                .place(*time)
                .ok_or_else(|| MatchError::malformed(&self.source, "date out of range"))?;
            let instant = local_to_utc(tz, local).ok_or_else(|| {
                let reason = format!("{local} does not exist in {}", tz.name());
                MatchError::malformed(&self.source, reason)
            })?;

            let times = stop_times.entry(stop).or_default();
            if let Some(&prev) = times.last()
                && instant < prev
            {
                return Err(MatchError::malformed(
                    &self.source,
                    format!("times at stop {stop} go backwards ({prev} then {instant})"),
                ));
            }
            times.push(instant);
        }

        TimetableVariant::new(
            self.meta.route_id,
            self.meta.name.clone(),
            self.meta.valid_days,
            stop_times,
        )
        .ok_or_else(|| MatchError::malformed(&self.source, "no scheduled times"))
    }
}

/// Parse a timetable and place it on `date` in one step.
pub fn parse_timetable<R: Read>(
    reader: R,
    source: &Path,
    meta: TimetableMeta,
    date: NaiveDate,
) -> Result<TimetableVariant, MatchError> {
    Timetable::from_reader(reader, source, meta)?.anchor(date)
}
