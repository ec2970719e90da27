//! HTTP client for the VMRA backend
//!
//! Implements [`FleetBackend`] over the backend's REST surface. The
//! simulator treats every call as advisory: failures are reported to the
//! caller and never touch the local session.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use vmra_core::{
    AllocationRequest, AllocationResponse, BackendError, ErrorBody, FleetBackend, FleetSummary,
    Prediction, ScheduleAck, VmSnapshot,
};

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Backend client
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// Base URL for the backend API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a new backend client with a 5 second request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, Duration::from_secs(5))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(network)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(network)?;
        decode(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&AllocationRequest>,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let request = self.client.post(&url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        let response = request.send().await.map_err(network)?;
        decode(response).await
    }
}

#[async_trait]
impl FleetBackend for HttpBackend {
    async fn list_vms(&self) -> Result<Vec<VmSnapshot>, BackendError> {
        self.get("/vms").await
    }

    async fn summary(&self) -> Result<FleetSummary, BackendError> {
        self.get("/summary").await
    }

    async fn predict(&self) -> Result<Vec<Prediction>, BackendError> {
        self.get("/predict").await
    }

    async fn allocate(&self, request: &AllocationRequest) -> Result<AllocationResponse, BackendError> {
        self.post("/allocate", Some(request)).await
    }

    async fn schedule(&self) -> Result<ScheduleAck, BackendError> {
        self.post("/schedule", None).await
    }
}

fn network(err: reqwest::Error) -> BackendError {
    BackendError::Network(err.to_string())
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(network)?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        warn!(status = status.as_u16(), "Backend request failed: {}", message);
        return Err(BackendError::from_status(status.as_u16(), message));
    }

    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}
