//! # Remote Catalog
//!
//! Fetches the full product catalog over HTTP.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  fetch_catalog()                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GET {catalog.url} ──── transport error ──► SyncError::Network         │
//! │       │             └── timer expired ────► SyncError::Timeout         │
//! │       ▼                                                                 │
//! │  status 2xx? ───────── no ───────────────► SyncError::HttpStatus       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  JSON array of products? ── no ──────────► SyncError::Decode           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ok(Vec<Product>)   (duplicates preserved; the controller dedupes)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One attempt per call, no retries, no partial results.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};
use url::Url;

use simpless_core::Product;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// Anything that can produce the current product catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Retrieves the full catalog in a single attempt.
    async fn fetch_catalog(&self) -> SyncResult<Vec<Product>>;
}

/// HTTP catalog client.
///
/// Clone is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl CatalogClient {
    /// Creates a client for `url` with a whole-request `timeout`.
    pub fn new(url: Url, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("simpless/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(CatalogClient {
            client,
            url,
            timeout,
        })
    }

    /// Creates a client from the `[catalog]` section.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        Self::new(config.catalog_url()?, config.request_timeout())
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout)
        } else {
            SyncError::Network(err.to_string())
        }
    }

    /// Passes 2xx responses through; anything else becomes `HttpStatus`.
    async fn check_response(response: reqwest::Response) -> SyncResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SyncError::from_status(status.as_u16(), &body))
        }
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_catalog(&self) -> SyncResult<Vec<Product>> {
        debug!(url = %self.url, "Fetching catalog");

        let response = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = Self::check_response(response).await.inspect_err(|e| {
            warn!(error = %e, "Catalog request rejected");
        })?;

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        let products: Vec<Product> = serde_json::from_slice(&body)?;

        debug!(count = products.len(), "Catalog fetched");
        Ok(products)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
