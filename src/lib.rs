//! # kidsnote-dl
//!
//! Backend library for archiving report and album media from the KidsNote
//! childcare service.
//!
//! ## Design Philosophy
//!
//! kidsnote-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to progress events, no polling required
//! - **Polite** - Strictly sequential downloads with fixed pacing between items
//! - **Resilient** - Bounded retries with atomic file placement; a partial
//!   download is never visible at its final path
//!
//! ## Quick Start
//!
//! ```no_run
//! use kidsnote_dl::{Config, KidsnoteDownloader, Category, MediaSelector, SizeRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = KidsnoteDownloader::new(Config::default())?;
//!
//!     // Subscribe to progress events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("{event}");
//!         }
//!     });
//!
//!     let session = downloader.login("user", "password").await?;
//!     let children = downloader.list_children(&session).await?;
//!
//!     let report = downloader
//!         .download(
//!             &children[0].id,
//!             &session,
//!             Category::Reports,
//!             MediaSelector::All,
//!             SizeRequest::All,
//!             "./downloads".as_ref(),
//!             None,
//!         )
//!         .await?;
//!     println!("downloaded {} items", report.downloaded_items);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Date-range filtering for dated entries
pub mod date_filter;
/// Core downloader facade and pagination
pub mod downloader;
/// Error types
pub mod error;
/// File fetching and media processing (temp file, atomic rename)
pub mod fetch;
/// Low-level HTTP request execution with connection-reset retry
pub mod http;
/// Date-bucketed entry processing
pub mod processor;
/// Bounded fixed-delay retry logic
pub mod retry;
/// Session authentication and child resolution
pub mod session;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, RetryConfig};
pub use date_filter::DateRange;
pub use downloader::KidsnoteDownloader;
pub use error::{DownloadError, Error, Result};
pub use types::{
    Category, Child, DownloadReport, Entry, Event, ImageAttachment, ListingPage, MediaSelector,
    Session, SizeRequest, VideoAttachment,
};
