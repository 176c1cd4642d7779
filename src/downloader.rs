//! Core downloader facade
//!
//! [`KidsnoteDownloader`] owns the configuration, the shared HTTP executor,
//! and the event channel, and drives the whole pipeline: login, child
//! resolution, paginated listing, and date-bucketed media download.
//!
//! Pagination is an explicit loop rather than recursion: the upstream API
//! exposes only a "next page exists" signal and a `page_size` parameter, so
//! when everything is requested the window is widened on each call
//! (`9999 × index`) until the service reports completeness, and only the
//! final response is processed.

use crate::config::Config;
use crate::date_filter::DateRange;
use crate::error::{Error, Result};
use crate::http::HttpExecutor;
use crate::processor::process_entries;
use crate::session;
use crate::types::{
    Category, Child, DownloadReport, Event, ListingPage, MediaSelector, Session, SizeRequest,
};
use std::path::Path;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// High-level client for the KidsNote service
///
/// All operations are strictly sequential; no two downloads are ever in
/// flight concurrently. Progress is reported through a broadcast [`Event`]
/// channel obtained via [`subscribe`](Self::subscribe).
pub struct KidsnoteDownloader {
    config: Config,
    base_url: Url,
    executor: HttpExecutor,
    event_tx: broadcast::Sender<Event>,
}

impl KidsnoteDownloader {
    /// Create a downloader from the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {e}", config.base_url),
        })?;
        let executor = HttpExecutor::new(&config)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            base_url,
            executor,
            event_tx,
        })
    }

    /// Subscribe to progress events
    ///
    /// Events render to human-readable log lines via `Display`. Slow
    /// subscribers may miss events; the pipeline never blocks on them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Authenticate and obtain a session token
    ///
    /// The token is short-lived and invalidated upstream; it is owned by the
    /// caller for the duration of one workflow run and never persisted.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let session =
            session::login(&self.executor, self.config.base_url.trim_end_matches('/'), username, password)
                .await?;
        self.event_tx.send(Event::LoginSucceeded).ok();
        Ok(session)
    }

    /// List the children registered to the authenticated account
    pub async fn list_children(&self, session: &Session) -> Result<Vec<Child>> {
        let result = session::list_children(
            &self.executor,
            self.config.base_url.trim_end_matches('/'),
            session,
        )
        .await;

        match &result {
            Ok(children) if children.is_empty() => {
                self.event_tx.send(Event::NoChildren).ok();
            }
            Err(Error::SessionExpired) => {
                self.event_tx.send(Event::SessionExpired).ok();
            }
            Err(Error::UpstreamUnavailable { status }) => {
                self.event_tx
                    .send(Event::UpstreamUnavailable { status: *status })
                    .ok();
            }
            _ => {}
        }
        result
    }

    /// Download a child's media with a fresh (never-cancelled) token
    ///
    /// See [`download_cancellable`](Self::download_cancellable).
    #[allow(clippy::too_many_arguments)]
    pub async fn download(
        &self,
        child_id: &str,
        session: &Session,
        category: Category,
        selector: MediaSelector,
        size: SizeRequest,
        dest_dir: &Path,
        date_range: Option<DateRange>,
    ) -> Result<DownloadReport> {
        self.download_cancellable(
            child_id,
            session,
            category,
            selector,
            size,
            1,
            dest_dir,
            date_range,
            CancellationToken::new(),
        )
        .await
    }

    /// Download a child's media, cooperatively cancellable
    ///
    /// The caller keeps the token; cancelling it stops the pipeline at the
    /// next checkpoint (before each date bucket and before each attachment).
    /// `start_page_index` is the 1-based index of the first listing call.
    ///
    /// Per-attachment failures are contained: they are logged, emitted as
    /// [`Event::AttachmentFailed`], and counted in the returned
    /// [`DownloadReport`]; the run continues.
    #[allow(clippy::too_many_arguments)]
    pub async fn download_cancellable(
        &self,
        child_id: &str,
        session: &Session,
        category: Category,
        selector: MediaSelector,
        size: SizeRequest,
        start_page_index: u32,
        dest_dir: &Path,
        date_range: Option<DateRange>,
        cancel: CancellationToken,
    ) -> Result<DownloadReport> {
        let range = date_range.unwrap_or_default();

        self.ensure_dest_dir(dest_dir).await?;

        let mut page_index = start_page_index.max(1);
        let page = loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let page = self
                .fetch_listing(child_id, session, category, size, page_index)
                .await?;

            if page_index == start_page_index.max(1) {
                self.event_tx
                    .send(Event::DownloadStarted {
                        child_id: child_id.to_string(),
                        destination: dest_dir.to_path_buf(),
                        start_date: range.start.map(|d| d.to_string()),
                        end_date: range.end.map(|d| d.to_string()),
                    })
                    .ok();
                tracing::info!(
                    child_id = %child_id,
                    destination = %dest_dir.display(),
                    category = %category,
                    "Download started"
                );
            }

            // Another page exists: widen the window and re-request
            if size == SizeRequest::All && page.next.is_some() {
                page_index += 1;
                self.event_tx
                    .send(Event::FetchingMore { page_index })
                    .ok();
                tracing::info!(page_index = page_index, "Widening listing window");
                continue;
            }

            break page;
        };

        let report = process_entries(
            self.executor.client(),
            &self.config,
            &self.event_tx,
            &cancel,
            &page.results,
            category,
            selector,
            dest_dir,
            &range,
        )
        .await?;

        self.event_tx
            .send(Event::DownloadComplete {
                downloaded_items: report.downloaded_items,
                failed_items: report.failed_items,
            })
            .ok();
        tracing::info!(
            downloaded = report.downloaded_items,
            failed = report.failed_items,
            dates = report.dates.len(),
            "Download complete"
        );

        Ok(report)
    }

    /// Fetch one listing window
    async fn fetch_listing(
        &self,
        child_id: &str,
        session: &Session,
        category: Category,
        size: SizeRequest,
        page_index: u32,
    ) -> Result<ListingPage> {
        let url = self
            .base_url
            .join(&format!(
                "/api/v1_2/children/{child_id}/{}/",
                category.path_segment()
            ))
            .map_err(|e| Error::Config {
                message: format!("invalid listing URL: {e}"),
            })?;

        let request = self
            .executor
            .client()
            .get(url)
            .query(&[
                ("page_size", size.page_size(page_index).to_string()),
                ("tz", self.config.timezone.clone()),
                ("child", child_id.to_string()),
            ])
            .header("cookie", format!("sessionid={};", session.token()));

        let (status, body) = self.executor.execute_buffered(request).await?;

        if status == 401 {
            tracing::warn!("Session expired during listing");
            self.event_tx.send(Event::SessionExpired).ok();
            return Err(Error::SessionExpired);
        }
        if status > 400 {
            tracing::warn!(status = status, "Upstream unavailable during listing");
            self.event_tx
                .send(Event::UpstreamUnavailable { status })
                .ok();
            return Err(Error::UpstreamUnavailable { status });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Create the destination directory on the first call if needed
    async fn ensure_dest_dir(&self, dest_dir: &Path) -> Result<()> {
        if !dest_dir.exists() {
            tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
                Error::Download(crate::error::DownloadError::DirectoryCreation {
                    path: dest_dir.to_path_buf(),
                    reason: e.to_string(),
                })
            })?;
            self.event_tx
                .send(Event::DirectoryCreated {
                    path: dest_dir.to_path_buf(),
                })
                .ok();
            tracing::info!(path = %dest_dir.display(), "Created download directory");
        }
        Ok(())
    }
}
