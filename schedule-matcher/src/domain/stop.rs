//! Stops, routes and geographic positions.

use serde::{Deserialize, Serialize};

use super::{RouteId, StopId};

/// Roughly one metre expressed in degrees of latitude/longitude.
///
/// Good enough for detection boxes a few dozen metres wide at mid latitudes.
const DEGREES_PER_METRE: f64 = 0.00001;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for Position {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

/// A stop served by one or more routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub position: Position,
}

impl Stop {
    pub fn new(id: StopId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
        }
    }

    /// Check whether `point` lies in a square `box_size_m` metres wide
    /// centred on this stop. Edges are inclusive.
    ///
    /// # Examples
    ///
    /// ```
    /// use schedule_matcher::domain::{Position, Stop, StopId};
    ///
    /// let stop = Stop::new(StopId(1), "Howe Center", Position::new(40.7449, -74.0248));
    /// assert!(stop.within_box(Position::new(40.74495, -74.0248), 30.0));
    /// assert!(!stop.within_box(Position::new(40.7460, -74.0248), 30.0));
    /// ```
    pub fn within_box(&self, point: Position, box_size_m: f64) -> bool {
        let half = box_size_m / 2.0 * DEGREES_PER_METRE;
        (self.position.lat - half..=self.position.lat + half).contains(&point.lat)
            && (self.position.lon - half..=self.position.lon + half).contains(&point.lon)
    }
}

/// A route and the stops it visits, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub stops: Vec<StopId>,
}
