//! Interfaces to the live transit-data source.
//!
//! The engine never talks HTTP itself. It consumes vehicle reports and route
//! topology through these traits, which `transloc::TransLocClient`
//! implements against the real feed and tests implement with fixed data.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::domain::{Position, Route, RouteId, Stop, VehicleId};

/// One position report from a vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleReport {
    pub vehicle_id: VehicleId,
    pub route_id: RouteId,
    pub position: Position,
    pub timestamp: DateTime<Utc>,
}

/// Routes and stops as published by the transit-data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub routes: Vec<Route>,
    pub stops: Vec<Stop>,
}

/// Source of live vehicle reports.
pub trait VehicleFeed: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reports for every vehicle currently active.
    fn fetch_vehicles(&self)
    -> impl Future<Output = Result<Vec<VehicleReport>, Self::Error>> + Send;
}

/// Source of route and stop data.
pub trait TopologySource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current routes (with their stops in order) and stops.
    fn fetch_topology(&self) -> impl Future<Output = Result<Topology, Self::Error>> + Send;
}
