//! Identifier types for routes, stops and vehicles.
//!
//! The feed hands out plain integers for all three. Wrapping them keeps a
//! stop id from being passed where a route id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw numeric identifier.
            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a route as assigned by the transit-data source.
    ///
    /// # Examples
    ///
    /// ```
    /// use schedule_matcher::domain::RouteId;
    ///
    /// let red = RouteId(4011456);
    /// assert_eq!(red.to_string(), "4011456");
    /// assert_eq!(format!("{:?}", red), "RouteId(4011456)");
    /// ```
    RouteId
);

numeric_id!(
    /// Identifier of a stop. Timetable headers use the same numbering.
    StopId
);

numeric_id!(
    /// Identifier of a vehicle reporting positions on the live feed.
    VehicleId
);
