//! TransLoc feed client.
//!
//! Provides live vehicle positions and route topology for one agency,
//! implementing [`VehicleFeed`](crate::feed::VehicleFeed) and
//! [`TopologySource`](crate::feed::TopologySource).

mod client;
mod error;
mod types;

pub use client::{DEFAULT_AGENCY_ID, DEFAULT_BASE_URL, TransLocClient, TransLocConfig};
pub use error::TransLocError;
pub use types::{RouteDto, RouteStopsDto, StopDto, VehicleDto, assemble_topology};
