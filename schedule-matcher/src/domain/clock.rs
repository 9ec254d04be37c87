//! Wall-clock times as printed on paper timetables.
//!
//! Timetables give times as 12-hour "HH:MMam" strings in the agency's local
//! timezone. This module parses them, places a run of them on calendar dates
//! (handling services that run past midnight) and converts the result to UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Error returned when parsing an invalid clock time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time {input:?}: expected 12-hour HH:MMam or HH:MMpm")]
pub struct InvalidClockTime {
    input: String,
}

/// Parse a 12-hour clock time such as `"08:15am"` or `"12:05PM"`.
///
/// Surrounding whitespace is ignored and the am/pm suffix is
/// case-insensitive.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use schedule_matcher::domain::parse_clock_time;
///
/// assert_eq!(parse_clock_time("08:15am").unwrap(), NaiveTime::from_hms_opt(8, 15, 0).unwrap());
/// assert_eq!(parse_clock_time("12:05am").unwrap(), NaiveTime::from_hms_opt(0, 5, 0).unwrap());
/// assert_eq!(parse_clock_time(" 11:59PM ").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
/// assert!(parse_clock_time("13:00pm").is_err());
/// assert!(parse_clock_time("08:15").is_err());
/// ```
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, InvalidClockTime> {
    let normalized = s.trim().to_ascii_uppercase();
    NaiveTime::parse_from_str(&normalized, "%I:%M%p").map_err(|_| InvalidClockTime {
        input: s.to_string(),
    })
}

/// Places a chronological run of clock times on calendar dates.
///
/// Printed timetables never show dates. A run that starts in the evening and
/// continues past midnight shows up as a PM time followed by an AM time; at
/// that point the anchor moves to the next day.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use schedule_matcher::domain::DateAnchor;
///
/// let date = NaiveDate::from_ymd_opt(2018, 10, 12).unwrap();
/// let mut anchor = DateAnchor::new(date);
///
/// let late = anchor.place(NaiveTime::from_hms_opt(23, 40, 0).unwrap()).unwrap();
/// let early = anchor.place(NaiveTime::from_hms_opt(0, 10, 0).unwrap()).unwrap();
/// assert_eq!(late.date(), date);
/// assert_eq!(early.date(), date.succ_opt().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct DateAnchor {
    date: NaiveDate,
    prev: Option<NaiveTime>,
}

impl DateAnchor {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, prev: None }
    }

    /// The date the next time will be placed on, barring a rollover.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Attach `time` to the running date, advancing a day on PM → AM.
    ///
    /// Returns `None` only if the date would overflow chrono's range.
    pub fn place(&mut self, time: NaiveTime) -> Option<NaiveDateTime> {
        if let Some(prev) = self.prev
            && prev.hour() >= 12
            && time.hour() < 12
        {
            self.date = self.date.succ_opt()?;
        }
        self.prev = Some(time);
        Some(self.date.and_time(time))
    }
}

/// Convert a local wall-clock datetime in `tz` to UTC.
///
/// During the autumn fold the earlier of the two instants is used. A local
/// time that does not exist (inside the spring-forward gap) maps to the first
/// instant after the gap, so a run of times crossing the gap stays in order.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use chrono_tz::America::New_York;
/// use schedule_matcher::domain::local_to_utc;
///
/// let winter = NaiveDate::from_ymd_opt(2018, 1, 15).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let summer = NaiveDate::from_ymd_opt(2018, 7, 15).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// assert_eq!(local_to_utc(New_York, winter), Utc.with_ymd_and_hms(2018, 1, 15, 13, 0, 0).single());
/// assert_eq!(local_to_utc(New_York, summer), Utc.with_ymd_and_hms(2018, 7, 15, 12, 0, 0).single());
/// ```
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return Some(dt.with_timezone(&Utc));
    }

    // Transitions fall on whole minutes; walk forward to the end of the gap.
    let start = local.with_second(0)?.with_nanosecond(0)?;
    (1..=MAX_GAP_MINUTES)
        .find_map(|minutes| {
            let probe = start.checked_add_signed(Duration::minutes(minutes))?;
            tz.from_local_datetime(&probe).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Longest clock jump searched when resolving a non-existent local time.
/// A whole day covers every transition in the tz database.
const MAX_GAP_MINUTES: i64 = 24 * 60;
