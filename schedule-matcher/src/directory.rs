//! Route and stop directory.
//!
//! Holds the last fetched topology as an immutable snapshot. A refresh
//! fetches and builds a complete new snapshot before taking the write lock,
//! so readers see either the old or the new directory, never a mix.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{MatchError, RouteId, Stop, StopId};
use crate::feed::{Topology, TopologySource};

/// One route with its stops resolved, in route order.
#[derive(Debug, Clone)]
struct RouteEntry {
    name: String,
    stops: Arc<[Stop]>,
}

#[derive(Debug, Default)]
struct DirectorySnapshot {
    routes: HashMap<RouteId, RouteEntry>,
}

impl DirectorySnapshot {
    fn build(topology: Topology) -> Self {
        let stops: HashMap<StopId, Stop> = topology.stops.into_iter().map(|s| (s.id, s)).collect();

        let routes = topology
            .routes
            .into_iter()
            .map(|route| {
                let resolved: Vec<Stop> = route
                    .stops
                    .iter()
                    .filter_map(|id| {
                        let stop = stops.get(id).cloned();
                        if stop.is_none() {
                            warn!(route = %route.id, stop = %id, "route references unknown stop");
                        }
                        stop
                    })
                    .collect();
                let entry = RouteEntry {
                    name: route.name,
                    stops: resolved.into(),
                };
                (route.id, entry)
            })
            .collect();

        Self { routes }
    }
}

/// Thread-safe route id → ordered stops lookup.
#[derive(Clone, Default)]
pub struct RouteDirectory {
    inner: Arc<RwLock<Arc<DirectorySnapshot>>>,
}

impl RouteDirectory {
    /// An empty directory; every lookup fails until the first refresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from an already fetched topology.
    pub fn from_topology(topology: Topology) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(DirectorySnapshot::build(topology)))),
        }
    }

    /// Refresh from `source`.
    ///
    /// On success, replaces the current snapshot and returns the number of
    /// routes. On failure, the existing snapshot is preserved and the error
    /// is returned.
    pub async fn refresh<S: TopologySource>(&self, source: &S) -> Result<usize, S::Error> {
        let topology = source.fetch_topology().await?;
        Ok(self.replace(topology).await)
    }

    /// Swap in a snapshot built from `topology`. Returns the route count.
    pub async fn replace(&self, topology: Topology) -> usize {
        let stop_count = topology.stops.len();
        let snapshot = Arc::new(DirectorySnapshot::build(topology));
        let routes = snapshot.routes.len();

        *self.inner.write().await = snapshot;

        info!(routes, stops = stop_count, "route directory refreshed");
        routes
    }

    /// Stops of `route` in route order.
    pub async fn stops_for_route(&self, route: RouteId) -> Result<Arc<[Stop]>, MatchError> {
        self.snapshot()
            .await
            .routes
            .get(&route)
            .map(|entry| Arc::clone(&entry.stops))
            .ok_or(MatchError::UnknownRoute(route))
    }

    /// Display name of `route`.
    pub async fn route_name(&self, route: RouteId) -> Result<String, MatchError> {
        self.snapshot()
            .await
            .routes
            .get(&route)
            .map(|entry| entry.name.clone())
            .ok_or(MatchError::UnknownRoute(route))
    }

    pub async fn route_count(&self) -> usize {
        self.snapshot().await.routes.len()
    }

    async fn snapshot(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&*self.inner.read().await)
    }
}
