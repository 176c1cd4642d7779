//! Date-bucketed entry processing
//!
//! Entries from the final listing page are filtered by the optional date
//! range, bucketed by their raw date string in a sorted map, and processed
//! strictly sequentially in ascending date order. Attachments within a date
//! bucket keep the API's original entry order. A failed attachment is
//! logged, reported as an event, and counted; it never aborts the remaining
//! buckets.

use crate::config::Config;
use crate::date_filter::DateRange;
use crate::error::{Error, Result};
use crate::fetch::{extension_of, save_media};
use crate::types::{Category, DownloadReport, Entry, Event, MediaSelector};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Filename fragment used for entries with no parseable date
const UNKNOWN_DATE: &str = "unknown_date";

/// Format an ISO date for use in a filename
///
/// Replaces the hyphens with the Korean date marker `년` and appends `일`,
/// producing a folder-free human-readable fragment
/// (`2024-03-01` → `2024년03년01일`).
pub fn format_date_fragment(raw_date: Option<&str>) -> String {
    match raw_date {
        Some(raw) => format!("{}일", raw.replace('-', "년")),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Bucket entries by their raw date string, applying the date filter
///
/// Entries that fail the range check or carry no date are discarded. The
/// result is ordered ascending by date key (lexicographic ISO ordering);
/// entries within a bucket keep their original relative order.
pub fn group_by_date<'a>(
    entries: &'a [Entry],
    category: Category,
    range: &DateRange,
) -> BTreeMap<String, Vec<&'a Entry>> {
    let mut groups: BTreeMap<String, Vec<&Entry>> = BTreeMap::new();

    for entry in entries {
        let raw_date = category.raw_date(entry);
        if !range.contains(raw_date.as_deref()) {
            continue;
        }
        let Some(date) = raw_date else {
            continue;
        };
        groups.entry(date).or_default().push(entry);
    }

    groups
}

/// Build the final filename for one attachment
///
/// Pattern: `<formatted-date>-[<class-name>-]<child-name>-<id><ext>`; the
/// classroom segment is present only for the reports category.
fn final_filename(
    category: Category,
    formatted_date: &str,
    entry: &Entry,
    attachment_id: &str,
    extension: &str,
) -> String {
    let child_name = entry.child_name.as_deref().unwrap_or_default();
    match category {
        Category::Reports => {
            let class_name = entry.class_name.as_deref().unwrap_or_default();
            format!("{formatted_date}-{class_name}-{child_name}-{attachment_id}{extension}")
        }
        Category::Albums => {
            format!("{formatted_date}-{child_name}-{attachment_id}{extension}")
        }
    }
}

/// Process the final listing page: group, filter, and download attachments
///
/// Emits narration events per date bucket plus a final summary, pausing for
/// the configured inter-item delay after every attachment. Cancellation is
/// checked before each bucket and before each attachment.
#[allow(clippy::too_many_arguments)]
pub async fn process_entries(
    client: &reqwest::Client,
    config: &Config,
    events: &broadcast::Sender<Event>,
    cancel: &CancellationToken,
    entries: &[Entry],
    category: Category,
    selector: MediaSelector,
    dest_dir: &Path,
    range: &DateRange,
) -> Result<DownloadReport> {
    let groups = group_by_date(entries, category, range);
    let mut report = DownloadReport {
        dates: groups.keys().cloned().collect(),
        ..Default::default()
    };

    for (date, group) in &groups {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        events.send(Event::DateGroupStarted { date: date.clone() }).ok();
        tracing::info!(date = %date, entries = group.len(), "Processing date bucket");

        let mut date_items = 0u32;

        for entry in group {
            let formatted = format_date_fragment(Some(date));

            if selector.includes_images()
                && let Some(images) = &entry.attached_images
            {
                for image in images {
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    let extension = extension_of(&image.original_file_name);
                    let filename =
                        final_filename(category, &formatted, entry, &image.id, &extension);
                    download_one(
                        client,
                        config,
                        events,
                        &image.original,
                        &extension,
                        &filename,
                        dest_dir,
                        &mut report,
                    )
                    .await;
                    date_items += 1;
                    tokio::time::sleep(config.item_delay).await;
                }
            }

            if selector.includes_video()
                && let Some(video) = &entry.attached_video
            {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let extension = extension_of(&video.original_file_name);
                let filename = final_filename(category, &formatted, entry, &video.id, &extension);
                download_one(
                    client,
                    config,
                    events,
                    &video.high,
                    &extension,
                    &filename,
                    dest_dir,
                    &mut report,
                )
                .await;
                date_items += 1;
                tokio::time::sleep(config.item_delay).await;
            }
        }

        events
            .send(Event::DateGroupComplete {
                date: date.clone(),
                items: date_items,
            })
            .ok();
        tracing::info!(date = %date, items = date_items, "Date bucket complete");
    }

    if !report.dates.is_empty() {
        events
            .send(Event::Summary {
                dates: report.dates.clone(),
            })
            .ok();
        tracing::info!(
            dates = report.dates.len(),
            downloaded = report.downloaded_items,
            failed = report.failed_items,
            "All date buckets processed"
        );
    }

    Ok(report)
}

/// Download a single attachment, containing any terminal failure
///
/// Retry exhaustion is logged and counted, not propagated; one bad file
/// must not abort a multi-hundred-item run.
#[allow(clippy::too_many_arguments)]
async fn download_one(
    client: &reqwest::Client,
    config: &Config,
    events: &broadcast::Sender<Event>,
    url: &str,
    extension: &str,
    final_filename: &str,
    dest_dir: &Path,
    report: &mut DownloadReport,
) {
    match save_media(client, url, extension, final_filename, dest_dir, &config.retry).await {
        Ok(()) => report.downloaded_items += 1,
        Err(e) => {
            tracing::warn!(file = final_filename, error = %e, "Skipping failed attachment");
            events
                .send(Event::AttachmentFailed {
                    final_filename: final_filename.to_string(),
                    error: e.to_string(),
                })
                .ok();
            report.failed_items += 1;
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::types::{ImageAttachment, VideoAttachment};
    use chrono::NaiveDate;
    use std::time::Duration;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report_entry(date: &str, images: usize, video: bool) -> Entry {
        Entry {
            date_written: Some(date.to_string()),
            class_name: Some("Tulip".to_string()),
            child_name: Some("Kim".to_string()),
            attached_images: (images > 0).then(|| {
                (0..images)
                    .map(|i| ImageAttachment {
                        id: format!("{date}-{i}"),
                        original: format!("http://example.invalid/{date}/{i}.jpg"),
                        original_file_name: format!("img{i}.jpg"),
                    })
                    .collect()
            }),
            attached_video: video.then(|| VideoAttachment {
                id: format!("{date}-v"),
                high: format!("http://example.invalid/{date}/v.mp4"),
                original_file_name: "v.mp4".to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn date_fragment_uses_korean_markers() {
        assert_eq!(
            format_date_fragment(Some("2024-03-01")),
            "2024년03년01일"
        );
        assert_eq!(format_date_fragment(None), "unknown_date");
    }

    #[test]
    fn grouping_sorts_dates_and_preserves_entry_order() {
        let entries = vec![
            report_entry("2024-03-02", 1, false),
            report_entry("2024-03-01", 1, false),
            report_entry("2024-03-02", 2, false),
        ];
        let groups = group_by_date(&entries, Category::Reports, &DateRange::default());

        let dates: Vec<String> = groups.keys().cloned().collect();
        assert_eq!(dates, ["2024-03-01", "2024-03-02"]);

        let second = &groups["2024-03-02"];
        assert_eq!(second.len(), 2);
        // Original relative order: the one-image entry came first
        assert_eq!(second[0].attached_images.as_ref().unwrap().len(), 1);
        assert_eq!(second[1].attached_images.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn grouping_drops_dateless_and_out_of_range_entries() {
        let dateless = Entry {
            child_name: Some("Kim".to_string()),
            ..Default::default()
        };
        let entries = vec![
            report_entry("2024-01-15", 1, false),
            report_entry("2024-06-15", 1, false),
            dateless,
        ];
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let groups = group_by_date(&entries, Category::Reports, &range);

        assert_eq!(groups.len(), 1, "out-of-range and dateless are discarded");
        assert!(groups.contains_key("2024-01-15"));
    }

    #[test]
    fn report_filenames_include_class_name() {
        let entry = report_entry("2024-03-01", 1, false);
        let name = final_filename(Category::Reports, "2024년03년01일", &entry, "77", ".jpg");
        assert_eq!(name, "2024년03년01일-Tulip-Kim-77.jpg");
    }

    #[test]
    fn album_filenames_omit_class_name() {
        let entry = Entry {
            child_name: Some("Kim".to_string()),
            ..Default::default()
        };
        let name = final_filename(Category::Albums, "2024년03년01일", &entry, "77", ".mp4");
        assert_eq!(name, "2024년03년01일-Kim-77.mp4");
    }

    fn test_config(delay_ms: u64) -> Config {
        Config {
            item_delay: Duration::from_millis(delay_ms),
            retry: RetryConfig {
                max_attempts: 2,
                delay: Duration::from_millis(10),
            },
            ..Default::default()
        }
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn buckets_are_processed_in_ascending_date_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/media/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(&server)
            .await;

        let mut e1 = report_entry("2024-03-02", 1, false);
        let mut e2 = report_entry("2024-03-01", 1, false);
        for e in [&mut e1, &mut e2] {
            for img in e.attached_images.as_mut().unwrap() {
                img.original = format!("{}/media/{}.jpg", server.uri(), img.id);
            }
        }

        let (tx, mut rx) = broadcast::channel(64);
        let dir = tempfile::tempdir().unwrap();
        let report = process_entries(
            &client(),
            &test_config(1),
            &tx,
            &CancellationToken::new(),
            &[e1, e2],
            Category::Reports,
            MediaSelector::Images,
            dir.path(),
            &DateRange::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.dates, ["2024-03-01", "2024-03-02"]);
        assert_eq!(report.downloaded_items, 2);
        assert_eq!(report.failed_items, 0);

        let mut started = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::DateGroupStarted { date } = event {
                started.push(date);
            }
        }
        assert_eq!(started, ["2024-03-01", "2024-03-02"]);
    }

    #[tokio::test]
    async fn failed_attachment_is_counted_and_run_continues() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/media/bad.*$"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/media/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let mut entry = report_entry("2024-03-01", 2, false);
        let images = entry.attached_images.as_mut().unwrap();
        images[0].original = format!("{}/media/bad.jpg", server.uri());
        images[1].original = format!("{}/media/good.jpg", server.uri());

        let (tx, mut rx) = broadcast::channel(64);
        let dir = tempfile::tempdir().unwrap();
        let report = process_entries(
            &client(),
            &test_config(1),
            &tx,
            &CancellationToken::new(),
            &[entry],
            Category::Reports,
            MediaSelector::Images,
            dir.path(),
            &DateRange::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.downloaded_items, 1);
        assert_eq!(report.failed_items, 1);

        let mut saw_failure_event = false;
        while let Ok(event) = rx.try_recv() {
            if let Event::AttachmentFailed { final_filename, .. } = event {
                saw_failure_event = true;
                assert!(final_filename.contains("2024년03년01일"));
            }
        }
        assert!(saw_failure_event, "terminal failures must be surfaced as events");
    }

    #[tokio::test]
    async fn video_selector_downloads_only_video() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/media/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"vid".to_vec()))
            .mount(&server)
            .await;

        let mut entry = report_entry("2024-03-01", 2, true);
        entry.attached_video.as_mut().unwrap().high =
            format!("{}/media/v.mp4", server.uri());

        let (tx, _rx) = broadcast::channel(64);
        let dir = tempfile::tempdir().unwrap();
        let report = process_entries(
            &client(),
            &test_config(1),
            &tx,
            &CancellationToken::new(),
            &[entry],
            Category::Reports,
            MediaSelector::Video,
            dir.path(),
            &DateRange::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.downloaded_items, 1, "images must be skipped");
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/media/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(&server)
            .await;

        let mut entry = report_entry("2024-03-01", 3, false);
        for img in entry.attached_images.as_mut().unwrap() {
            img.original = format!("{}/media/{}.jpg", server.uri(), img.id);
        }

        let cancel = CancellationToken::new();
        cancel.cancel();

        let (tx, _rx) = broadcast::channel(64);
        let dir = tempfile::tempdir().unwrap();
        let result = process_entries(
            &client(),
            &test_config(1),
            &tx,
            &cancel,
            &[entry],
            Category::Reports,
            MediaSelector::Images,
            dir.path(),
            &DateRange::default(),
        )
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
