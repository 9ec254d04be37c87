//! Nearest scheduled time lookup.
//!
//! A route usually has several variants in effect on a given day (early
//! morning, daytime, late night). Each covers a span of the day for the
//! stops it serves. Searching them in start order, a reported arrival either
//! falls inside one variant's span for the stop, in the gap between two
//! spans, or after all of them.

use chrono::{DateTime, Utc};

use crate::domain::{MatchError, RouteId, StopId};
use crate::timetable::TimetableVariant;

/// Find the scheduled time at `stop` closest to `reported`.
///
/// `variants` must be sorted by start time. When `reported` is exactly
/// halfway between two candidates, the later one wins.
///
/// # Errors
///
/// `UnknownRoute` if `variants` is empty, `UnknownStop` if none of them
/// serves `stop`.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use chrono::{TimeZone, Utc};
/// use schedule_matcher::domain::{RouteId, StopId, ValidDays};
/// use schedule_matcher::schedule::nearest_time;
/// use schedule_matcher::timetable::TimetableVariant;
///
/// let at = |h, m| Utc.with_ymd_and_hms(2018, 10, 8, h, m, 0).unwrap();
/// let mut times = HashMap::new();
/// times.insert(StopId(1), vec![at(8, 0), at(8, 15), at(8, 30)]);
/// let variant = TimetableVariant::new(RouteId(1), None, ValidDays::ALL, times).unwrap();
///
/// let nearest = nearest_time(&[variant], RouteId(1), StopId(1), at(8, 7)).unwrap();
/// assert_eq!(nearest, at(8, 0));
/// ```
pub fn nearest_time(
    variants: &[TimetableVariant],
    route: RouteId,
    stop: StopId,
    reported: DateTime<Utc>,
) -> Result<DateTime<Utc>, MatchError> {
    if variants.is_empty() {
        return Err(MatchError::UnknownRoute(route));
    }

    // End of the most recent variant whose span finished before `reported`.
    // `None` stands for "no earlier anchor".
    let mut last_end: Option<DateTime<Utc>> = None;

    for variant in variants {
        let Some(times) = variant.times_at(stop) else {
            continue;
        };
        let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
            continue;
        };

        if reported < first && last_end.is_none_or(|end| end < reported) {
            // Before this variant starts: in the gap after the previous one,
            // or before anything at all.
            return Ok(match last_end {
                Some(end) => closer(end, first, reported),
                None => first,
            });
        }

        if reported > last {
            last_end = Some(last);
            continue;
        }

        return Ok(within(times, reported));
    }

    last_end.ok_or(MatchError::UnknownStop { route, stop })
}

/// Nearest entry of `times` for a `reported` inside `[first, last]`.
fn within(times: &[DateTime<Utc>], reported: DateTime<Utc>) -> DateTime<Utc> {
    for pair in times.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if reported <= cur {
            return if reported == cur {
                cur
            } else {
                closer(prev, cur, reported)
            };
        }
    }
    // Single-entry sequence, equal to `reported`.
    times[0]
}

/// Whichever of `earlier` and `later` is nearer to `reported`; ties go to
/// `later`.
fn closer(
    earlier: DateTime<Utc>,
    later: DateTime<Utc>,
    reported: DateTime<Utc>,
) -> DateTime<Utc> {
    if reported - earlier < later - reported {
        earlier
    } else {
        later
    }
}
