//! Per-vehicle arrival debouncing.
//!
//! A vehicle sitting at a stop is inside the detection box on several
//! consecutive polls. Only the first of those is an arrival.

use std::time::Duration;

use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};

use crate::domain::{StopId, VehicleId};

/// Remembers the last confirmed stop of each vehicle.
///
/// Updates for one vehicle are serialized; different vehicles never contend.
#[derive(Clone)]
pub struct ArrivalDebouncer {
    last_stop: MokaCache<VehicleId, StopId>,
}

impl ArrivalDebouncer {
    /// A debouncer whose entries live until the process exits.
    pub fn new() -> Self {
        Self {
            last_stop: MokaCache::builder().build(),
        }
    }

    /// A debouncer that forgets a vehicle after `idle` without arrivals.
    pub fn with_idle_ttl(idle: Duration) -> Self {
        Self {
            last_stop: MokaCache::builder().time_to_idle(idle).build(),
        }
    }

    /// Record that `vehicle` is at `stop`.
    ///
    /// Returns `false` if `stop` is already the vehicle's last confirmed
    /// stop, otherwise remembers it and returns `true`.
    pub async fn confirm_arrival(&self, vehicle: VehicleId, stop: StopId) -> bool {
        let result = self
            .last_stop
            .entry(vehicle)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if *entry.value() == stop => Op::Nop,
                    _ => Op::Put(stop),
                };
                std::future::ready(op)
            })
            .await;

        matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        )
    }

    /// Last confirmed stop of `vehicle`, if remembered.
    pub async fn last_stop(&self, vehicle: VehicleId) -> Option<StopId> {
        self.last_stop.get(&vehicle).await
    }
}

impl Default for ArrivalDebouncer {
    fn default() -> Self {
        Self::new()
    }
}
