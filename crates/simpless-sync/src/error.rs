//! # Sync Error Types
//!
//! Error types for catalog fetching, cache access and controller commands.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Network      │  │     Payload             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  Decode                 │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │                         │ │
//! │  │  ConfigLoad/Save│  │  HttpStatus     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │    Storage      │  │     Internal                                │  │
//! │  │                 │  │                                             │  │
//! │  │  Storage(DbErr) │  │  Internal / ShuttingDown                   │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The controller absorbs every one of these into `SyncState::last_error`;
//! only command calls hand them back to the caller.

use std::time::Duration;

use thiserror::Error;

use simpless_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Longest response body kept in [`SyncError::HttpStatus`].
const MAX_BODY_CHARS: usize = 200;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid catalog URL.
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Network Errors
    // =========================================================================
    /// Transport failure: DNS, refused connection, TLS, reset.
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Server answered with a non-success status.
    #[error("Catalog returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// Response body is not a JSON array of products.
    #[error("Failed to decode catalog: {0}")]
    Decode(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Cache read or write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync controller error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Controller is shutting down.
    #[error("Sync controller is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Constructors
// =============================================================================

impl SyncError {
    /// Builds an [`SyncError::HttpStatus`], truncating long bodies.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = if body.chars().count() > MAX_BODY_CHARS {
            let cut: String = body.chars().take(MAX_BODY_CHARS).collect();
            format!("{cut}...")
        } else {
            body.to_string()
        };
        SyncError::HttpStatus { status, body }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

/// Reading side only; `SyncConfig::save` maps its own I/O failures.
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if repeating the same operation later may succeed.
    ///
    /// ## Retryable Errors
    /// - Transport failures and timeouts
    /// - 5xx and 429 responses
    ///
    /// Nothing in this crate retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) | SyncError::Timeout(_) => true,
            SyncError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true for failures of the remote fetch itself (not decoding).
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::Timeout(_) | SyncError::HttpStatus { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
