//! Error types for kidsnote-dl
//!
//! This module provides the error taxonomy for the library:
//! - Transport errors (timeout, connect/reset failures) from the HTTP layer
//! - Authentication and session-lifetime errors, kept distinct so callers can
//!   prompt for credentials instead of retrying blindly
//! - Download errors carrying the intended final filename for diagnostics

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kidsnote-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for kidsnote-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Login response carried no session cookie
    ///
    /// Distinct from transport errors: the request succeeded but the
    /// credentials were rejected, so the caller should re-prompt rather
    /// than retry.
    #[error("authentication failed: no session cookie in login response")]
    Auth,

    /// An authenticated call returned HTTP 401
    ///
    /// The session token has been invalidated upstream; recoverable by
    /// re-authenticating.
    #[error("session expired: please log in again")]
    SessionExpired,

    /// The upstream service returned an error status (>400, non-401)
    #[error("upstream service unavailable (HTTP {status})")]
    UpstreamUnavailable {
        /// The HTTP status code returned by the service
        status: u16,
    },

    /// A single request attempt exceeded the configured timeout
    ///
    /// Timeouts are terminal; only connection resets are retried.
    #[error("request timed out")]
    Timeout,

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an API response body
    #[error("invalid API response: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Media download error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// The invocation was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration (e.g. unparseable base URL)
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable description of the configuration issue
        message: String,
    },
}

/// Media download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The media endpoint returned a non-200 status
    #[error("media request for {url} returned HTTP {status}")]
    BadStatus {
        /// The media URL that was requested
        url: String,
        /// The status code returned
        status: u16,
    },

    /// All retry attempts for one attachment were exhausted
    #[error("failed to download {final_filename} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// The filename the attachment would have been saved as
        final_filename: String,
        /// Number of attempts made
        attempts: u32,
        /// The last underlying error
        #[source]
        source: Box<Error>,
    },

    /// Failed to create the destination directory
    #[error("failed to create download directory {path}: {reason}")]
    DirectoryCreation {
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying I/O failure
        reason: String,
    },
}
