//! TransLoc OpenAPI HTTP client.
//!
//! Every endpoint takes the agency as an `agencies` query parameter and wraps
//! its payload in a top-level object keyed by the resource name.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::TransLocError;
use super::types::{RouteDto, RouteStopsDto, StopDto, VehicleDto, assemble_topology};
use crate::feed::{Topology, TopologySource, VehicleFeed, VehicleReport};

/// Default base URL for the TransLoc feed.
pub const DEFAULT_BASE_URL: &str = "https://feeds.transloc.com/3/";

/// Default agency (Stevens Institute of Technology shuttles, Hoboken).
pub const DEFAULT_AGENCY_ID: u32 = 307;

/// Configuration for the TransLoc client.
#[derive(Debug, Clone)]
pub struct TransLocConfig {
    /// Agency whose routes and vehicles are fetched
    pub agency_id: u32,
    /// Base URL for the API (defaults to production TransLoc)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl TransLocConfig {
    pub fn new(agency_id: u32) -> Self {
        Self {
            agency_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for TransLocConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AGENCY_ID)
    }
}

/// Client for the TransLoc feed.
#[derive(Debug, Clone)]
pub struct TransLocClient {
    http: reqwest::Client,
    base_url: String,
    agency: String,
}

impl TransLocClient {
    pub fn new(config: TransLocConfig) -> Result<Self, TransLocError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            agency: config.agency_id.to_string(),
        })
    }

    /// All routes of the agency.
    pub async fn routes(&self) -> Result<Vec<RouteDto>, TransLocError> {
        self.get("routes", &[], "routes").await
    }

    /// All stops of the agency.
    pub async fn stops(&self) -> Result<Vec<StopDto>, TransLocError> {
        self.get("stops", &[], "stops").await
    }

    /// Ordered stop ids for each route.
    pub async fn route_stops(&self) -> Result<Vec<RouteStopsDto>, TransLocError> {
        self.get("stops", &[("include_routes", "true")], "routes")
            .await
    }

    /// Latest status of every vehicle, including those not on a route.
    pub async fn vehicle_statuses(&self) -> Result<Vec<VehicleDto>, TransLocError> {
        self.get("vehicle_statuses", &[], "vehicles").await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        key: &'static str,
    ) -> Result<T, TransLocError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "fetching");

        let response = self
            .http
            .get(&url)
            .query(&[("agencies", self.agency.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransLocError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        decode_keyed(&body, key)
    }
}

/// Decode `body` as a JSON object and deserialize the value under `key`.
fn decode_keyed<T: DeserializeOwned>(body: &str, key: &'static str) -> Result<T, TransLocError> {
    let mut object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(body).map_err(|e| TransLocError::Json {
            message: e.to_string(),
        })?;
    let value = object.remove(key).ok_or(TransLocError::MissingKey(key))?;
    serde_json::from_value(value).map_err(|e| TransLocError::Json {
        message: format!("{key}: {e}"),
    })
}

impl VehicleFeed for TransLocClient {
    type Error = TransLocError;

    async fn fetch_vehicles(&self) -> Result<Vec<VehicleReport>, TransLocError> {
        let vehicles = self.vehicle_statuses().await?;
        Ok(vehicles
            .into_iter()
            .filter_map(VehicleDto::into_report)
            .collect())
    }
}

impl TopologySource for TransLocClient {
    type Error = TransLocError;

    async fn fetch_topology(&self) -> Result<Topology, TransLocError> {
        let (routes, stops, route_stops) =
            tokio::try_join!(self.routes(), self.stops(), self.route_stops())?;
        Ok(assemble_topology(routes, stops, route_stops))
    }
}
