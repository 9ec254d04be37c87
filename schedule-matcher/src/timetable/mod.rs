//! Paper timetables: parsing and the parsed model.
//!
//! Timetables are typed up from the agency's printed schedules into one CSV
//! per service pattern, with route and weekday information kept in a
//! separate metadata document.

mod metadata;
mod parse;
mod variant;

pub use metadata::{MetadataDocument, MetadataEntry, TimetableMeta};
pub use parse::{Timetable, parse_timetable};
pub use variant::TimetableVariant;
