//! JSON fixture builders mirroring the upstream listing API shapes

use serde_json::{Value, json};

/// Build an album entry with image attachments pointing at the mock server
pub fn album_entry(base: &str, modified: &str, child_name: &str, image_ids: &[u32]) -> Value {
    json!({
        "modified": modified,
        "child_name": child_name,
        "attached_images": image_ids.iter().map(|id| json!({
            "id": id,
            "original": format!("{base}/media/{id}.jpg"),
            "original_file_name": format!("IMG_{id}.jpg"),
        })).collect::<Vec<_>>(),
        "attached_video": null,
    })
}

/// Build a report entry with image attachments and an optional video
pub fn report_entry(
    base: &str,
    date_written: &str,
    class_name: &str,
    child_name: &str,
    image_ids: &[u32],
    video_id: Option<u32>,
) -> Value {
    json!({
        "date_written": date_written,
        "class_name": class_name,
        "child_name": child_name,
        "attached_images": image_ids.iter().map(|id| json!({
            "id": id,
            "original": format!("{base}/media/{id}.jpg"),
            "original_file_name": format!("IMG_{id}.jpg"),
        })).collect::<Vec<_>>(),
        "attached_video": video_id.map(|id| json!({
            "id": id,
            "high": format!("{base}/media/{id}.mp4"),
            "original_file_name": format!("VID_{id}.mp4"),
        })),
    })
}

/// Wrap entries into a listing page envelope
pub fn listing_page(results: Vec<Value>, next: Option<&str>) -> Value {
    json!({
        "results": results,
        "next": next,
    })
}

/// Account profile with the given children (id, name pairs)
pub fn profile(children: &[(u32, &str)]) -> Value {
    json!({
        "user": {"username": "parent"},
        "children": children.iter().map(|(id, name)| json!({
            "id": id,
            "name": name,
        })).collect::<Vec<_>>(),
    })
}
