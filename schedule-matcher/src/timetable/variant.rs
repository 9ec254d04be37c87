//! Parsed timetable variants.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{RouteId, StopId, ValidDays};

/// One printed timetable pattern, placed on a concrete date.
///
/// Each served stop maps to its scheduled arrival instants in ascending
/// order. Stops the pattern does not serve are simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct TimetableVariant {
    route_id: RouteId,
    name: Option<String>,
    valid_days: ValidDays,
    stop_times: HashMap<StopId, Vec<DateTime<Utc>>>,
    start_time: DateTime<Utc>,
}

impl TimetableVariant {
    /// Build a variant from per-stop sequences.
    ///
    /// Returns `None` when no stop has any time, since such a variant has no
    /// start time. Empty sequences are dropped. Callers are responsible for
    /// passing sorted sequences.
    pub fn new(
        route_id: RouteId,
        name: Option<String>,
        valid_days: ValidDays,
        stop_times: HashMap<StopId, Vec<DateTime<Utc>>>,
    ) -> Option<Self> {
        let stop_times: HashMap<_, _> = stop_times
            .into_iter()
            .filter(|(_, times)| !times.is_empty())
            .collect();
        let start_time = stop_times.values().filter_map(|t| t.first()).min().copied()?;

        Some(Self {
            route_id,
            name,
            valid_days,
            stop_times,
            start_time,
        })
    }

    pub fn route_id(&self) -> RouteId {
        self.route_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn valid_days(&self) -> ValidDays {
        self.valid_days
    }

    /// Earliest scheduled instant across all stops.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Latest scheduled instant across all stops.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.stop_times
            .values()
            .filter_map(|t| t.last())
            .max()
            .copied()
            .unwrap_or(self.start_time)
    }

    /// Scheduled instants at `stop`, or `None` if this pattern skips it.
    pub fn times_at(&self, stop: StopId) -> Option<&[DateTime<Utc>]> {
        self.stop_times.get(&stop).map(Vec::as_slice)
    }

    pub fn serves(&self, stop: StopId) -> bool {
        self.stop_times.contains_key(&stop)
    }

    /// Stops served by this pattern, in no particular order.
    pub fn stops(&self) -> impl Iterator<Item = StopId> + '_ {
        self.stop_times.keys().copied()
    }
}
