//! Destinations for confirmed stops.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::{RouteId, StopId, VehicleId};

/// A vehicle arrival matched against the timetable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmedStop {
    pub vehicle_id: VehicleId,
    pub route_id: RouteId,
    pub stop_id: StopId,
    pub arrival_time: DateTime<Utc>,
    pub expected_time: DateTime<Utc>,
}

impl ConfirmedStop {
    /// Signed lateness; negative when early.
    pub fn delay(&self) -> chrono::Duration {
        self.arrival_time - self.expected_time
    }
}

/// Errors from recording a confirmed stop.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Somewhere to put confirmed stops.
pub trait ConfirmedStopSink: Send + Sync {
    fn record(&self, stop: &ConfirmedStop) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Writes each confirmed stop to the log at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ConfirmedStopSink for LogSink {
    async fn record(&self, stop: &ConfirmedStop) -> Result<(), SinkError> {
        info!(
            vehicle = %stop.vehicle_id,
            route = %stop.route_id,
            stop = %stop.stop_id,
            arrival = %stop.arrival_time,
            expected = %stop.expected_time,
            delay_secs = stop.delay().num_seconds(),
            "confirmed stop"
        );
        Ok(())
    }
}

/// Appends each confirmed stop as one JSON object per line.
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfirmedStopSink for JsonLinesSink {
    async fn record(&self, stop: &ConfirmedStop) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(stop)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
