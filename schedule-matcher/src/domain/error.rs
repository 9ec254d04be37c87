//! Matching error types.
//!
//! These cover stale or missing schedule and topology data. Transport
//! failures talking to the live feed live in `transloc::TransLocError`.

use std::path::PathBuf;

use super::{RouteId, StopId};

/// Errors raised while loading schedules or matching a report against them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// Route id not present in topology or schedule data
    #[error("unknown route {0}")]
    UnknownRoute(RouteId),

    /// Route is known but none of its timetables serves the stop
    #[error("stop {stop} is not served by any timetable of route {route}")]
    UnknownStop { route: RouteId, stop: StopId },

    /// A timetable source could not be turned into a schedule
    #[error("malformed schedule {}: {reason}", file.display())]
    MalformedSchedule { file: PathBuf, reason: String },

    /// Route has timetables, but none of them runs today
    #[error("no timetable of route {0} is valid today")]
    NoValidScheduleToday(RouteId),
}

impl MatchError {
    pub(crate) fn malformed(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MatchError::MalformedSchedule {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
