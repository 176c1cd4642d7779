//! Core types for kidsnote-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque session token proving prior successful authentication
///
/// Short-lived and invalidated upstream; a 401 on any authenticated call is
/// the only expiry signal. Never persisted across runs.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    /// Wrap a raw session token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The raw token value, as sent in the session cookie
    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keep the token out of debug logs
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session(***)")
    }
}

/// One child registered to the authenticated account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    /// Upstream identifier, used in listing URLs
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display name
    pub name: String,
    /// 1-based position in the account profile's children array
    #[serde(default)]
    pub index: usize,
}

/// Image attachment on an entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Unique attachment id, used in the final filename
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// URL of the full-resolution image
    pub original: String,
    /// Original filename, used only to derive the extension
    pub original_file_name: String,
}

/// Video attachment on an entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoAttachment {
    /// Unique attachment id, used in the final filename
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// URL of the high-quality rendition
    pub high: String,
    /// Original filename, used only to derive the extension
    pub original_file_name: String,
}

/// One dated record (report or album) returned by the listing API
///
/// Which date field is populated depends on the [`Category`]; all fields are
/// optional because the two listing shapes share this type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Report date (`YYYY-MM-DD`), present for the reports category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_written: Option<String>,
    /// Last-modified timestamp (ISO datetime), present for the albums category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// Classroom name, present for reports and included in report filenames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Child display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_name: Option<String>,
    /// Ordered image attachments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_images: Option<Vec<ImageAttachment>>,
    /// Optional single video attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_video: Option<VideoAttachment>,
}

/// One page of the listing API: `{results: [...], next: <url-or-null>}`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListingPage {
    /// Entries in this window
    #[serde(default)]
    pub results: Vec<Entry>,
    /// URL of the next page, or null when this window is complete
    #[serde(default)]
    pub next: Option<String>,
}

/// Which listing endpoint and field shape is in use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Daily reports (`date_written` carries the date, filenames include the
    /// classroom name)
    Reports,
    /// Photo albums (`modified` carries the date)
    Albums,
}

impl Category {
    /// URL path segment for this category's listing endpoint
    pub fn path_segment(&self) -> &'static str {
        match self {
            Category::Reports => "reports",
            Category::Albums => "albums",
        }
    }

    /// Extract the raw calendar-date string from an entry, if present
    ///
    /// Reports carry a plain date; albums carry an ISO datetime whose date
    /// part is taken.
    pub fn raw_date(&self, entry: &Entry) -> Option<String> {
        match self {
            Category::Reports => entry.date_written.clone(),
            Category::Albums => entry
                .modified
                .as_ref()
                .map(|m| m.split('T').next().unwrap_or(m).to_string()),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Caller choice of which attachment kinds to download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSelector {
    /// Images only
    Images,
    /// Video only
    Video,
    /// Both images and video
    All,
}

impl MediaSelector {
    /// Whether image attachments are in scope
    pub fn includes_images(&self) -> bool {
        matches!(self, MediaSelector::Images | MediaSelector::All)
    }

    /// Whether video attachments are in scope
    pub fn includes_video(&self) -> bool {
        matches!(self, MediaSelector::Video | MediaSelector::All)
    }
}

/// How many entries the caller wants listed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeRequest {
    /// Everything: the window is widened until the service reports no
    /// further pages
    All,
    /// A literal page size, requested once
    Limit(u32),
}

impl SizeRequest {
    /// Page size for the given 1-based pagination call
    ///
    /// For `All`, each successive call asks for a larger cumulative window
    /// (the upstream API exposes no cursor usable across calls, only a
    /// "next page exists" signal and a `page_size` parameter).
    pub fn page_size(&self, page_index: u32) -> u32 {
        match self {
            SizeRequest::All => 9999 * page_index,
            SizeRequest::Limit(n) => *n,
        }
    }
}

/// Event emitted during a download invocation
///
/// The caller-facing side channel: subscribe via
/// [`KidsnoteDownloader::subscribe`](crate::KidsnoteDownloader::subscribe)
/// and render with `Display` for human-readable log lines.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Login succeeded and a session token was obtained
    LoginSucceeded,

    /// The authenticated account has no registered children
    NoChildren,

    /// The destination directory did not exist and was created
    DirectoryCreated {
        /// The directory that was created
        path: PathBuf,
    },

    /// The first listing response arrived and processing is starting
    DownloadStarted {
        /// Child whose entries are being downloaded
        child_id: String,
        /// Destination directory
        destination: PathBuf,
        /// Optional inclusive start bound of the date filter
        #[serde(skip_serializing_if = "Option::is_none")]
        start_date: Option<String>,
        /// Optional inclusive end bound of the date filter
        #[serde(skip_serializing_if = "Option::is_none")]
        end_date: Option<String>,
    },

    /// The service reported another page; re-requesting a wider window
    FetchingMore {
        /// 1-based index of the upcoming listing call
        page_index: u32,
    },

    /// Processing of one date bucket is starting
    DateGroupStarted {
        /// Raw date key of the bucket
        date: String,
    },

    /// One date bucket finished
    DateGroupComplete {
        /// Raw date key of the bucket
        date: String,
        /// Items handled for this date (images + one per video)
        items: u32,
    },

    /// One attachment exhausted its retry budget and was skipped
    AttachmentFailed {
        /// The filename the attachment would have been saved as
        final_filename: String,
        /// The terminal error
        error: String,
    },

    /// All date buckets were processed
    Summary {
        /// Sorted list of date keys that were processed
        dates: Vec<String>,
    },

    /// The download invocation finished
    DownloadComplete {
        /// Attachments successfully placed at their final paths
        downloaded_items: u32,
        /// Attachments skipped after retry exhaustion
        failed_items: u32,
    },

    /// An authenticated call returned 401; re-authentication required
    SessionExpired,

    /// The upstream service returned an error status
    UpstreamUnavailable {
        /// The HTTP status code
        status: u16,
    },
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::LoginSucceeded => write!(f, "Login succeeded"),
            Event::NoChildren => write!(f, "No children registered to this account"),
            Event::DirectoryCreated { path } => {
                write!(f, "Created download directory: {}", path.display())
            }
            Event::DownloadStarted {
                child_id,
                destination,
                start_date,
                end_date,
            } => {
                write!(
                    f,
                    "Download started - child {child_id}, destination {}",
                    destination.display()
                )?;
                if start_date.is_some() || end_date.is_some() {
                    write!(
                        f,
                        " | date filter: {} ~ {}",
                        start_date.as_deref().unwrap_or("unbounded"),
                        end_date.as_deref().unwrap_or("unbounded")
                    )?;
                }
                Ok(())
            }
            Event::FetchingMore { page_index } => {
                write!(f, "More entries available, widening window (call {page_index})")
            }
            Event::DateGroupStarted { date } => write!(f, "Processing entries for {date}..."),
            Event::DateGroupComplete { date, items } => {
                write!(f, "Finished {date} ({items} items)")
            }
            Event::AttachmentFailed {
                final_filename,
                error,
            } => write!(f, "Failed to download {final_filename}: {error}"),
            Event::Summary { dates } => {
                write!(
                    f,
                    "Processed {} dates: {}",
                    dates.len(),
                    dates.join(", ")
                )
            }
            Event::DownloadComplete {
                downloaded_items,
                failed_items,
            } => write!(
                f,
                "Download complete: {downloaded_items} items ({failed_items} failed)"
            ),
            Event::SessionExpired => write!(f, "Session expired, please log in again"),
            Event::UpstreamUnavailable { status } => {
                write!(f, "Upstream service unavailable (HTTP {status})")
            }
        }
    }
}

/// Aggregate outcome of one download invocation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Sorted date keys that were processed
    pub dates: Vec<String>,
    /// Attachments successfully placed at their final paths
    pub downloaded_items: u32,
    /// Attachments skipped after retry exhaustion
    pub failed_items: u32,
}

/// Accept either a JSON number or string for upstream ids
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_id_accepts_number_or_string() {
        let from_number: Child = serde_json::from_str(r#"{"id": 17, "name": "Kim"}"#).unwrap();
        assert_eq!(from_number.id, "17");

        let from_string: Child = serde_json::from_str(r#"{"id": "17", "name": "Kim"}"#).unwrap();
        assert_eq!(from_string.id, "17");
    }

    #[test]
    fn reports_date_comes_from_date_written() {
        let entry = Entry {
            date_written: Some("2024-03-01".to_string()),
            modified: Some("2024-06-30T09:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(
            Category::Reports.raw_date(&entry),
            Some("2024-03-01".to_string())
        );
    }

    #[test]
    fn albums_date_is_date_part_of_modified() {
        let entry = Entry {
            modified: Some("2024-06-30T09:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(
            Category::Albums.raw_date(&entry),
            Some("2024-06-30".to_string())
        );
    }

    #[test]
    fn missing_date_fields_yield_none() {
        let entry = Entry::default();
        assert_eq!(Category::Reports.raw_date(&entry), None);
        assert_eq!(Category::Albums.raw_date(&entry), None);
    }

    #[test]
    fn size_request_all_escalates_per_call() {
        assert_eq!(SizeRequest::All.page_size(1), 9999);
        assert_eq!(SizeRequest::All.page_size(2), 19998);
        assert_eq!(SizeRequest::All.page_size(3), 29997);
    }

    #[test]
    fn size_request_limit_is_literal() {
        assert_eq!(SizeRequest::Limit(50).page_size(1), 50);
        assert_eq!(SizeRequest::Limit(50).page_size(7), 50);
    }

    #[test]
    fn selector_scopes() {
        assert!(MediaSelector::All.includes_images());
        assert!(MediaSelector::All.includes_video());
        assert!(MediaSelector::Images.includes_images());
        assert!(!MediaSelector::Images.includes_video());
        assert!(MediaSelector::Video.includes_video());
        assert!(!MediaSelector::Video.includes_images());
    }

    #[test]
    fn listing_page_parses_null_next() {
        let page: ListingPage =
            serde_json::from_str(r#"{"results": [], "next": null}"#).unwrap();
        assert!(page.next.is_none());
        assert!(page.results.is_empty());
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = Session::new("secret-token");
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
