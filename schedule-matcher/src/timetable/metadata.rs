//! Timetable metadata document.
//!
//! Timetable CSVs carry only stop ids and times. Which route a file belongs
//! to, and on which weekdays it runs, comes from a JSON document keyed by
//! file name:
//!
//! ```json
//! {
//!   "file_info": {
//!     "red_weekday.csv": {
//!       "route_id": 4011456,
//!       "valid_days": [0, 1, 2, 3, 4],
//!       "name": "Red Line Weekday"
//!     }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::domain::{MatchError, RouteId, ValidDays};

/// Metadata for one timetable file, as written in the document.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataEntry {
    pub route_id: RouteId,
    pub valid_days: ValidDays,
    #[serde(default)]
    pub name: Option<String>,
    /// IANA timezone name; falls back to the engine's configured timezone.
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Metadata resolved for parsing: timezone looked up and defaulted.
#[derive(Debug, Clone)]
pub struct TimetableMeta {
    pub route_id: RouteId,
    pub valid_days: ValidDays,
    pub name: Option<String>,
    pub timezone: Tz,
}

impl TimetableMeta {
    pub fn new(route_id: RouteId, valid_days: ValidDays, timezone: Tz) -> Self {
        Self {
            route_id,
            valid_days,
            name: None,
            timezone,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The whole metadata document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataDocument {
    pub file_info: HashMap<String, MetadataEntry>,
}

impl MetadataDocument {
    /// Read and decode the document at `path`.
    pub fn load(path: &Path) -> Result<Self, MatchError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| MatchError::malformed(path, format!("cannot read metadata: {e}")))?;
        Self::from_json(&json, path)
    }

    /// Decode a document; `source` is only used in error messages.
    pub fn from_json(json: &str, source: &Path) -> Result<Self, MatchError> {
        serde_json::from_str(json)
            .map_err(|e| MatchError::malformed(source, format!("invalid metadata: {e}")))
    }

    /// Resolve the metadata for `file_name`, applying `default_tz`.
    ///
    /// `file` is the timetable path reported in errors.
    pub fn resolve(
        &self,
        file_name: &str,
        file: &Path,
        default_tz: Tz,
    ) -> Result<TimetableMeta, MatchError> {
        let entry = self
            .file_info
            .get(file_name)
            .ok_or_else(|| MatchError::malformed(file, "no metadata entry"))?;

        let timezone = match &entry.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| MatchError::malformed(file, format!("unknown timezone {name:?}")))?,
            None => default_tz,
        };

        Ok(TimetableMeta {
            route_id: entry.route_id,
            valid_days: entry.valid_days,
            name: entry.name.clone(),
            timezone,
        })
    }
}
