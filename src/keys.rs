//! Storage key conventions.
//!
//! Every object belonging to a video lives under `{owner_id}/videos/{id}/`:
//! the original upload at `.../raw`, transcoder output under `.../hls/`.

use uuid::Uuid;

pub fn raw_video_key(owner_id: &str, video_id: &Uuid) -> String {
    format!("{owner_id}/videos/{video_id}/raw")
}

pub fn hls_dir_key(owner_id: &str, video_id: &Uuid) -> String {
    format!("{owner_id}/videos/{video_id}/hls/")
}

/// Recovers `(owner_id, video_id)` from a raw-video storage key. Returns
/// `None` for anything that is not exactly `{owner}/videos/{uuid}/raw`;
/// callers use this to check claimed keys against the request's caller
/// before any store call.
pub fn parse_raw_key(key: &str) -> Option<(&str, Uuid)> {
    let mut segments = key.split('/');
    let owner_id = segments.next()?;
    if owner_id.is_empty() || segments.next()? != "videos" {
        return None;
    }
    let video_id = Uuid::parse_str(segments.next()?).ok()?;
    if segments.next()? != "raw" || segments.next().is_some() {
        return None;
    }
    Some((owner_id, video_id))
}
