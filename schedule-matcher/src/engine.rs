//! The matching engine.
//!
//! For each vehicle report: find the first stop on the vehicle's route that
//! the vehicle is at, suppress repeats, look up the nearest scheduled time
//! and hand the result to the sink.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, trace, warn};

use crate::debounce::ArrivalDebouncer;
use crate::directory::RouteDirectory;
use crate::domain::{MatchError, Position, Stop, StopId};
use crate::feed::VehicleReport;
use crate::schedule::ScheduleStore;
use crate::sink::{ConfirmedStop, ConfirmedStopSink, SinkError};

/// Decides whether a position counts as being at a stop.
pub trait StopDetector: Send + Sync {
    fn is_at_stop(&self, stop: &Stop, position: Position) -> bool;
}

/// A square detection area centred on each stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Side length of the square, in metres.
    pub box_size_m: f64,
}

impl BoundingBox {
    pub fn new(box_size_m: f64) -> Self {
        Self { box_size_m }
    }
}

impl StopDetector for BoundingBox {
    fn is_at_stop(&self, stop: &Stop, position: Position) -> bool {
        stop.within_box(position, self.box_size_m)
    }
}

/// Why a report was dropped.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("matching worker failed: {0}")]
    Worker(String),
}

/// What happened to one vehicle report.
#[derive(Debug)]
pub enum MatchOutcome {
    /// The vehicle arrived at a stop and was matched to the timetable.
    Confirmed(ConfirmedStop),
    /// The vehicle is not at any stop of its route.
    NotAtStop,
    /// The vehicle is still at the stop it was last confirmed at.
    Repeated(StopId),
    /// The report could not be matched.
    Dropped(EngineError),
}

impl MatchOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Matches vehicle reports against routes and timetables.
///
/// Cloning is cheap; clones share the directory, schedules, debounce state
/// and sink.
pub struct MatchingEngine<K, D = BoundingBox> {
    directory: RouteDirectory,
    schedules: ScheduleStore,
    debouncer: ArrivalDebouncer,
    detector: Arc<D>,
    sink: Arc<K>,
}

impl<K, D> Clone for MatchingEngine<K, D> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            schedules: self.schedules.clone(),
            debouncer: self.debouncer.clone(),
            detector: Arc::clone(&self.detector),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<K, D> MatchingEngine<K, D>
where
    K: ConfirmedStopSink + 'static,
    D: StopDetector + 'static,
{
    pub fn new(
        directory: RouteDirectory,
        schedules: ScheduleStore,
        debouncer: ArrivalDebouncer,
        detector: D,
        sink: K,
    ) -> Self {
        Self {
            directory,
            schedules,
            debouncer,
            detector: Arc::new(detector),
            sink: Arc::new(sink),
        }
    }

    pub fn directory(&self) -> &RouteDirectory {
        &self.directory
    }

    pub fn schedules(&self) -> &ScheduleStore {
        &self.schedules
    }

    /// Match a single report. At most one stop is confirmed per report.
    pub async fn process_report(&self, report: &VehicleReport) -> MatchOutcome {
        let vehicle = report.vehicle_id;
        let route = report.route_id;

        let stops = match self.directory.stops_for_route(route).await {
            Ok(stops) => stops,
            Err(e) => {
                warn!(vehicle = %vehicle, route = %route, error = %e, "dropping report");
                return MatchOutcome::Dropped(e.into());
            }
        };

        let Some(stop) = stops
            .iter()
            .find(|stop| self.detector.is_at_stop(stop, report.position))
        else {
            trace!(vehicle = %vehicle, route = %route, "not at a stop");
            return MatchOutcome::NotAtStop;
        };

        if !self.debouncer.confirm_arrival(vehicle, stop.id).await {
            trace!(vehicle = %vehicle, stop = %stop.id, "still at last confirmed stop");
            return MatchOutcome::Repeated(stop.id);
        }

        let expected = match self
            .schedules
            .nearest_time(route, stop.id, report.timestamp)
            .await
        {
            Ok(expected) => expected,
            Err(e) => {
                warn!(
                    vehicle = %vehicle,
                    route = %route,
                    stop = %stop.id,
                    error = %e,
                    "dropping report"
                );
                return MatchOutcome::Dropped(e.into());
            }
        };

        let confirmed = ConfirmedStop {
            vehicle_id: vehicle,
            route_id: route,
            stop_id: stop.id,
            arrival_time: report.timestamp,
            expected_time: expected,
        };

        if let Err(e) = self.sink.record(&confirmed).await {
            warn!(
                vehicle = %vehicle,
                route = %route,
                stop = %stop.id,
                error = %e,
                "could not record confirmed stop"
            );
            return MatchOutcome::Dropped(e.into());
        }

        debug!(
            vehicle = %vehicle,
            stop = %stop.id,
            name = %stop.name,
            "arrival confirmed"
        );
        MatchOutcome::Confirmed(confirmed)
    }

    /// Match every report of one poll concurrently, one task per report.
    ///
    /// Outcomes are returned in report order. A worker that panics yields
    /// `Dropped` for its report and does not affect the others.
    pub async fn process_tick(&self, reports: Vec<VehicleReport>) -> Vec<MatchOutcome> {
        let handles: Vec<_> = reports
            .into_iter()
            .map(|report| {
                let engine = self.clone();
                tokio::spawn(async move { engine.process_report(&report).await })
            })
            .collect();

        let outcomes: Vec<MatchOutcome> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    error!(error = %e, "matching worker failed");
                    MatchOutcome::Dropped(EngineError::Worker(e.to_string()))
                })
            })
            .collect();

        let confirmed = outcomes.iter().filter(|o| o.is_confirmed()).count();
        if confirmed > 0 {
            info!(reports = outcomes.len(), confirmed, "tick processed");
        }
        outcomes
    }
}
