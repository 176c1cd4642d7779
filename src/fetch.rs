//! File fetching and media processing
//!
//! A remote resource is streamed into a uniquely named temporary file and
//! only renamed to its final name after a fully successful transfer, so a
//! partially written file is never observable at the final path. The media
//! processor wraps the fetch in a bounded fixed-delay retry.

use crate::config::RetryConfig;
use crate::error::{DownloadError, Error, Result};
use crate::retry::{IsRetryable, retry_with_delay};
use futures::StreamExt;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;

/// Prefix of temporary download files
///
/// Anything left behind under this prefix is garbage from a failed run and
/// safe to delete.
pub const TEMP_PREFIX: &str = "temp-";

/// Build a unique temporary filename under the destination directory
fn temp_path(dest_dir: &Path, extension: &str) -> PathBuf {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(13)
        .map(char::from)
        .collect();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    dest_dir.join(format!("{TEMP_PREFIX}{token}-{timestamp}{extension}"))
}

/// Stream a remote resource into a temporary file
///
/// Issues a streaming GET through the shared client (which carries the
/// per-attempt timeout and User-Agent). Any non-200 status, transport error,
/// or write error deletes the partial temp file (best-effort) and fails.
/// Returns the temp file path on success.
pub async fn fetch_to_temp(
    client: &reqwest::Client,
    url: &str,
    extension: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let temp = temp_path(dest_dir, extension);

    let result = stream_to_file(client, url, &temp).await;
    if result.is_err() {
        // Partial file is garbage; removal failure is not worth surfacing
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result.map(|()| temp)
}

async fn stream_to_file(client: &reqwest::Client, url: &str, temp: &Path) -> Result<()> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(e)
        }
    })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::Download(DownloadError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }));
    }

    let mut file = tokio::fs::File::create(temp).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Network(e)
            }
        })?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(())
}

/// Wrapper classifying every media-download failure as retryable
///
/// Unlike the transport layer, the media processor consumes one unit of the
/// attempt budget on any failure: network, non-200 status, and filesystem
/// errors alike.
#[derive(Debug)]
struct MediaFailure(Error);

impl std::fmt::Display for MediaFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl IsRetryable for MediaFailure {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Download one attachment to its final name, with bounded retry
///
/// Ensures the destination directory exists, streams the resource to a temp
/// file, then atomically renames it to `<dest_dir>/<final_filename>`. Every
/// failure (network, non-200 status, filesystem) consumes one unit of the
/// attempt budget after a constant delay; exhaustion reports a terminal
/// error naming the intended final filename and the last underlying error.
pub async fn save_media(
    client: &reqwest::Client,
    url: &str,
    extension: &str,
    final_filename: &str,
    dest_dir: &Path,
    retry: &RetryConfig,
) -> Result<()> {
    tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
        Error::Download(DownloadError::DirectoryCreation {
            path: dest_dir.to_path_buf(),
            reason: e.to_string(),
        })
    })?;

    let final_path = dest_dir.join(final_filename);

    let result = retry_with_delay(retry, || async {
        fetch_and_rename(client, url, extension, dest_dir, &final_path)
            .await
            .map_err(MediaFailure)
    })
    .await;

    match result {
        Ok(()) => {
            tracing::debug!(file = %final_path.display(), "Attachment saved");
            Ok(())
        }
        Err(MediaFailure(e)) => {
            tracing::error!(
                error = %e,
                file = final_filename,
                attempts = retry.max_attempts,
                "Attachment download failed after all attempts"
            );
            Err(Error::Download(DownloadError::RetriesExhausted {
                final_filename: final_filename.to_string(),
                attempts: retry.max_attempts,
                source: Box::new(e),
            }))
        }
    }
}

async fn fetch_and_rename(
    client: &reqwest::Client,
    url: &str,
    extension: &str,
    dest_dir: &Path,
    final_path: &Path,
) -> Result<()> {
    let temp = fetch_to_temp(client, url, extension, dest_dir).await?;
    if let Err(e) = tokio::fs::rename(&temp, final_path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(Error::Io(e));
    }
    Ok(())
}

/// Derive the file extension (including the dot) from an original filename
pub fn extension_of(original_file_name: &str) -> String {
    Path::new(original_file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}
