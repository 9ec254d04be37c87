//! TransLoc wire types and their conversion to domain types.
//!
//! Only the fields the matcher uses are decoded; the feed sends many more.

use std::collections::HashMap;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{Position, Route, RouteId, Stop, StopId, VehicleId};
use crate::feed::{Topology, VehicleReport};

/// A route as listed by the `routes` endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RouteDto {
    pub id: u64,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
}

/// A stop as listed by the `stops` endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StopDto {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// `[lat, lon]`
    pub position: [f64; 2],
}

/// Ordered stop list for one route, from `stops?include_routes=true`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RouteStopsDto {
    pub id: u64,
    #[serde(default)]
    pub stops: Vec<u64>,
}

/// One entry of the `vehicle_statuses` endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VehicleDto {
    pub id: u64,
    #[serde(default)]
    pub route_id: Option<u64>,
    pub position: [f64; 2],
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl VehicleDto {
    /// Convert to a report. Vehicles not assigned to a route, or with an
    /// unrepresentable timestamp, have nothing to match against.
    pub fn into_report(self) -> Option<VehicleReport> {
        let Some(route_id) = self.route_id else {
            debug!(vehicle = self.id, "vehicle has no route, skipping");
            return None;
        };
        let timestamp = DateTime::from_timestamp_millis(self.timestamp)?;
        Some(VehicleReport {
            vehicle_id: VehicleId(self.id),
            route_id: RouteId(route_id),
            position: Position::from(self.position),
            timestamp,
        })
    }
}

impl From<StopDto> for Stop {
    fn from(dto: StopDto) -> Self {
        Stop::new(StopId(dto.id), dto.name, Position::from(dto.position))
    }
}

/// Combine the three topology listings into routes with ordered stop lists.
///
/// Routes with no stop listing get an empty list. The long name is preferred
/// over the short one.
pub fn assemble_topology(
    routes: Vec<RouteDto>,
    stops: Vec<StopDto>,
    route_stops: Vec<RouteStopsDto>,
) -> Topology {
    let mut stop_lists: HashMap<u64, Vec<u64>> =
        route_stops.into_iter().map(|r| (r.id, r.stops)).collect();

    let routes = routes
        .into_iter()
        .map(|dto| {
            let name = dto
                .long_name
                .filter(|n| !n.is_empty())
                .or(dto.short_name)
                .unwrap_or_default();
            let stops = stop_lists
                .remove(&dto.id)
                .unwrap_or_default()
                .into_iter()
                .map(StopId)
                .collect();
            Route {
                id: RouteId(dto.id),
                name,
                stops,
            }
        })
        .collect();

    Topology {
        routes,
        stops: stops.into_iter().map(Stop::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_without_route_is_skipped() {
        let dto: VehicleDto =
            serde_json::from_str(r#"{"id": 7, "route_id": null, "position": [1.0, 2.0], "timestamp": 0}"#)
                .unwrap();
        assert_eq!(dto.into_report(), None);
    }

    #[test]
    fn vehicle_report_conversion() {
        let dto: VehicleDto = serde_json::from_str(
            r#"{"id": 7, "route_id": 4011456, "position": [40.744, -74.03],
                "timestamp": 1539000000000, "heading": 90, "speed": 12.5}"#,
        )
        .unwrap();
        let report = dto.into_report().unwrap();
        assert_eq!(report.vehicle_id, VehicleId(7));
        assert_eq!(report.route_id, RouteId(4011456));
        assert_eq!(report.position, Position::new(40.744, -74.03));
        assert_eq!(report.timestamp.timestamp(), 1_539_000_000);
    }

    #[test]
    fn missing_route_field_is_treated_as_unassigned() {
        let dto: VehicleDto =
            serde_json::from_str(r#"{"id": 7, "position": [1.0, 2.0], "timestamp": 0}"#).unwrap();
        assert_eq!(dto.route_id, None);
    }

    #[test]
    fn topology_joins_stop_lists() {
        let routes = vec![
            RouteDto {
                id: 1,
                long_name: Some("Red Line".into()),
                short_name: Some("Red".into()),
            },
            RouteDto {
                id: 2,
                long_name: Some(String::new()),
                short_name: Some("Gray".into()),
            },
            RouteDto {
                id: 3,
                long_name: None,
                short_name: None,
            },
        ];
        let stops = vec![StopDto {
            id: 10,
            name: "Howe Center".into(),
            position: [40.744, -74.03],
        }];
        let route_stops = vec![RouteStopsDto {
            id: 1,
            stops: vec![10, 11],
        }];

        let topology = assemble_topology(routes, stops, route_stops);

        assert_eq!(topology.routes[0].name, "Red Line");
        assert_eq!(topology.routes[0].stops, vec![StopId(10), StopId(11)]);
        assert_eq!(topology.routes[1].name, "Gray");
        assert!(topology.routes[1].stops.is_empty());
        assert_eq!(topology.routes[2].name, "");
        assert_eq!(topology.stops.len(), 1);
        assert_eq!(topology.stops[0].id, StopId(10));
    }
}
