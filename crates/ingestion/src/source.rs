//! Upstream alert sources.
//!
//! Retrieval is two-step: a discovery call returns a JSON envelope pointing
//! at the current archive, which is then downloaded as raw bytes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};

/// Latest CAP bulletins for all of Spain.
pub const DEFAULT_DISCOVERY_URL: &str =
    "https://opendata.aemet.es/opendata/api/avisos_cap/ultimoelaborado/area/esp";

/// Status value the discovery envelope carries on success.
pub const ESTADO_OK: i64 = 200;

/// Discovery response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryEnvelope {
    pub estado: i64,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub datos: Option<String>,
    #[serde(default)]
    pub metadatos: Option<String>,
}

impl DiscoveryEnvelope {
    /// Archive URL of a successful envelope.
    pub fn archive_url(&self) -> Result<&str> {
        if self.estado != ESTADO_OK {
            return Err(IngestionError::DiscoveryRejected {
                estado: self.estado,
                descripcion: self.descripcion.clone(),
            });
        }
        self.datos
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                IngestionError::DiscoveryRequest("envelope has no datos URL".to_string())
            })
    }
}

/// Where ingestion gets its data from.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Call the discovery endpoint.
    async fn discover(&self) -> Result<DiscoveryEnvelope>;

    /// Download the archive the envelope points to.
    async fn fetch_archive(&self, url: &str) -> Result<Bytes>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Configuration for the HTTP source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub discovery_url: String,
    pub api_key: String,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl SourceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            discovery_url: DEFAULT_DISCOVERY_URL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Alert source backed by the AEMET OpenData HTTP API.
pub struct HttpAlertSource {
    client: Client,
    config: SourceConfig,
}

impl HttpAlertSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(IngestionError::InvalidConfig("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IngestionError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl AlertSource for HttpAlertSource {
    #[instrument(skip(self), fields(url = %self.config.discovery_url))]
    async fn discover(&self) -> Result<DiscoveryEnvelope> {
        let response = self
            .client
            .get(&self.config.discovery_url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| IngestionError::DiscoveryRequest(e.to_string()))?;

        let status = response.status();
        // The API answers errors with the same envelope, so parse before
        // looking at the HTTP status.
        let body = response
            .text()
            .await
            .map_err(|e| IngestionError::DiscoveryRequest(e.to_string()))?;

        match serde_json::from_str::<DiscoveryEnvelope>(&body) {
            Ok(envelope) => {
                debug!(estado = envelope.estado, http_status = %status, "Discovery response");
                Ok(envelope)
            }
            Err(e) if status.is_success() => Err(IngestionError::DiscoveryRequest(format!(
                "invalid envelope: {}",
                e
            ))),
            Err(_) => Err(IngestionError::DiscoveryRequest(format!("HTTP {}", status))),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_archive(&self, url: &str) -> Result<Bytes> {
        let fetch_error = |message: String| IngestionError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        debug!(bytes = bytes.len(), "Fetched archive");
        Ok(bytes)
    }

    fn name(&self) -> &str {
        "aemet"
    }
}
