//! Shuttle schedule matcher.
//!
//! Watches live vehicle positions and answers: "this bus just reached a
//! stop; which printed departure was it running as, and how late is it?"

pub mod config;
pub mod debounce;
pub mod directory;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod schedule;
pub mod sink;
pub mod timetable;
pub mod transloc;
