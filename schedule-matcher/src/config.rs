//! Engine configuration.
//!
//! Every setting has a default and can be overridden from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::debounce::ArrivalDebouncer;
use crate::engine::BoundingBox;
use crate::schedule::{DEFAULT_METADATA_FILE, ScheduleStoreConfig};
use crate::transloc::{DEFAULT_AGENCY_ID, DEFAULT_BASE_URL, TransLocConfig};

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var}={value:?}: unknown timezone")]
    UnknownTimezone { var: &'static str, value: String },
}

/// Configuration for the matcher process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// TransLoc agency to track.
    pub agency_id: u32,

    /// TransLoc API base URL.
    pub base_url: String,

    /// Directory holding timetable CSVs.
    pub schedules_dir: PathBuf,

    /// Metadata document, relative to `schedules_dir` unless absolute.
    pub metadata_file: PathBuf,

    /// Timezone the printed timetables are in.
    pub timezone: Tz,

    /// Side of the square around a stop that counts as "at the stop" (metres).
    pub detection_box_m: f64,

    /// How often the vehicle feed is polled (seconds).
    pub poll_interval_secs: u64,

    /// How often routes and stops are re-fetched (seconds).
    pub topology_refresh_secs: u64,

    /// How often timetables are re-read (seconds).
    pub schedule_refresh_secs: u64,

    /// Forget a vehicle's last stop after this long without an arrival.
    /// `None` keeps it for the life of the process.
    pub vehicle_idle_secs: Option<u64>,

    /// Append confirmed stops to this JSON-lines file instead of logging them.
    pub confirmed_log: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agency_id: DEFAULT_AGENCY_ID,
            base_url: DEFAULT_BASE_URL.to_string(),
            schedules_dir: PathBuf::from("schedules/generated"),
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            timezone: chrono_tz::America::New_York,
            detection_box_m: 30.0,
            poll_interval_secs: 1,
            topology_refresh_secs: 60 * 60,
            schedule_refresh_secs: 24 * 60 * 60,
            vehicle_idle_secs: None,
            confirmed_log: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any of the recognised environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TRANSLOC_AGENCY_ID") {
            config.agency_id = parse("TRANSLOC_AGENCY_ID", v)?;
        }
        if let Some(v) = get("TRANSLOC_BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = get("SCHEDULES_DIR") {
            config.schedules_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SCHEDULES_METADATA") {
            config.metadata_file = PathBuf::from(v);
        }
        if let Some(v) = get("SCHEDULE_TIMEZONE") {
            config.timezone = v.trim().parse().map_err(|_| ConfigError::UnknownTimezone {
                var: "SCHEDULE_TIMEZONE",
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("DETECTION_BOX_METRES") {
            config.detection_box_m = parse("DETECTION_BOX_METRES", v)?;
        }
        if let Some(v) = get("POLL_INTERVAL_SECS") {
            config.poll_interval_secs = parse_positive("POLL_INTERVAL_SECS", v)?;
        }
        if let Some(v) = get("TOPOLOGY_REFRESH_SECS") {
            config.topology_refresh_secs = parse_positive("TOPOLOGY_REFRESH_SECS", v)?;
        }
        if let Some(v) = get("SCHEDULE_REFRESH_SECS") {
            config.schedule_refresh_secs = parse_positive("SCHEDULE_REFRESH_SECS", v)?;
        }
        if let Some(v) = get("VEHICLE_IDLE_SECS") {
            config.vehicle_idle_secs = Some(parse_positive("VEHICLE_IDLE_SECS", v)?);
        }
        if let Some(v) = get("CONFIRMED_STOPS_FILE") {
            config.confirmed_log = Some(PathBuf::from(v));
        }

        if !(config.detection_box_m.is_finite() && config.detection_box_m > 0.0) {
            return Err(ConfigError::Invalid {
                var: "DETECTION_BOX_METRES",
                value: config.detection_box_m.to_string(),
                reason: "must be a positive number".to_string(),
            });
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn topology_refresh(&self) -> Duration {
        Duration::from_secs(self.topology_refresh_secs)
    }

    pub fn schedule_refresh(&self) -> Duration {
        Duration::from_secs(self.schedule_refresh_secs)
    }

    pub fn vehicle_idle_ttl(&self) -> Option<Duration> {
        self.vehicle_idle_secs.map(Duration::from_secs)
    }

    pub fn transloc(&self) -> TransLocConfig {
        TransLocConfig::new(self.agency_id).with_base_url(&self.base_url)
    }

    pub fn schedule_store(&self) -> ScheduleStoreConfig {
        ScheduleStoreConfig::new(&self.schedules_dir, self.timezone)
            .with_metadata_file(&self.metadata_file)
    }

    pub fn detector(&self) -> BoundingBox {
        BoundingBox::new(self.detection_box_m)
    }

    pub fn debouncer(&self) -> ArrivalDebouncer {
        match self.vehicle_idle_ttl() {
            Some(idle) => ArrivalDebouncer::with_idle_ttl(idle),
            None => ArrivalDebouncer::new(),
        }
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

fn parse_positive(var: &'static str, value: String) -> Result<u64, ConfigError> {
    match parse(var, value.clone())? {
        0 => Err(ConfigError::Invalid {
            var,
            value,
            reason: "must be at least 1".to_string(),
        }),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.agency_id, 307);
        assert_eq!(config.base_url, "https://feeds.transloc.com/3/");
        assert_eq!(config.schedules_dir, PathBuf::from("schedules/generated"));
        assert_eq!(config.metadata_file, PathBuf::from("schedules.json"));
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.detection_box_m, 30.0);
        assert_eq!(config.vehicle_idle_secs, None);
        assert_eq!(config.confirmed_log, None);
    }

    #[test]
    fn duration_methods() {
        let config = EngineConfig::default();

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.topology_refresh(), Duration::from_secs(3600));
        assert_eq!(config.schedule_refresh(), Duration::from_secs(86400));
        assert_eq!(config.vehicle_idle_ttl(), None);
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.agency_id, 307);
        assert_eq!(config.poll_interval_secs, 1);
    }

    #[test]
    fn environment_overrides() {
        let config = from_vars(&[
            ("TRANSLOC_AGENCY_ID", "176"),
            ("SCHEDULES_DIR", "/srv/schedules"),
            ("SCHEDULES_METADATA", "meta.json"),
            ("SCHEDULE_TIMEZONE", "America/Chicago"),
            ("DETECTION_BOX_METRES", "45.5"),
            ("POLL_INTERVAL_SECS", "5"),
            ("VEHICLE_IDLE_SECS", "900"),
            ("CONFIRMED_STOPS_FILE", "confirmed.jsonl"),
        ])
        .unwrap();

        assert_eq!(config.agency_id, 176);
        assert_eq!(config.timezone, chrono_tz::America::Chicago);
        assert_eq!(config.detection_box_m, 45.5);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.vehicle_idle_ttl(), Some(Duration::from_secs(900)));
        assert_eq!(config.confirmed_log, Some(PathBuf::from("confirmed.jsonl")));

        let store = config.schedule_store();
        assert_eq!(store.metadata_path(), PathBuf::from("/srv/schedules/meta.json"));
        assert_eq!(store.timezone, chrono_tz::America::Chicago);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = from_vars(&[("TRANSLOC_AGENCY_ID", "  ")]).unwrap();
        assert_eq!(config.agency_id, 307);
    }

    #[test]
    fn invalid_number() {
        let err = from_vars(&[("TRANSLOC_AGENCY_ID", "duke")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "TRANSLOC_AGENCY_ID",
                ..
            }
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = from_vars(&[("POLL_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "POLL_INTERVAL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn negative_box_is_rejected() {
        let err = from_vars(&[("DETECTION_BOX_METRES", "-3")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "DETECTION_BOX_METRES",
                ..
            }
        ));
    }

    #[test]
    fn unknown_timezone() {
        let err = from_vars(&[("SCHEDULE_TIMEZONE", "Mars/Olympus")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownTimezone {
                var: "SCHEDULE_TIMEZONE",
                value: "Mars/Olympus".to_string(),
            }
        );
    }

    #[test]
    fn derived_collaborator_configs() {
        let config = EngineConfig::default();
        assert_eq!(config.transloc().agency_id, 307);
        assert_eq!(config.detector(), BoundingBox::new(30.0));
    }
}
