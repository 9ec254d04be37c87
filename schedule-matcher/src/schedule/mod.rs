//! Today's schedules and nearest-time lookup.
//!
//! The store loads every timetable file, keeps the variants in effect for
//! the current service day, and answers "which scheduled time is closest to
//! this arrival" for a route and stop.

mod resolve;
mod store;

pub use resolve::nearest_time;
pub use store::{
    DEFAULT_METADATA_FILE, ScheduleSnapshot, ScheduleStore, ScheduleStoreConfig, load_timetables,
};
