//! Domain types for the schedule matcher.
//!
//! Identifiers, stops and routes, weekday sets and clock-time handling.
//! Types validate at construction so downstream code can trust them.

mod clock;
mod error;
mod ids;
mod stop;
mod weekdays;

pub use clock::{DateAnchor, InvalidClockTime, local_to_utc, parse_clock_time};
pub use error::MatchError;
pub use ids::{RouteId, StopId, VehicleId};
pub use stop::{Position, Route, Stop};
pub use weekdays::{InvalidWeekday, ValidDays};
