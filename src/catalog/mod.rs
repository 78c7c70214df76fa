use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::Iden;
use serde::Serialize;
use uuid::Uuid;

mod postgres;
pub use postgres::{PostgresCatalog, PostgresConfig};

use crate::errors::Result;
use crate::keys;

/// One media asset. `raw_key` always points at the original upload;
/// `hls_key` and `thumbnail_key` stay empty until the external transcoder
/// has run and flipped `is_processed`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub owner_id: String,
    pub raw_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hls_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Prefix holding every transcoder artifact of this video: the recorded
    /// manifest key with `master.m3u8` stripped, or the conventional
    /// directory when the transcoder has not run yet.
    pub fn hls_prefix(&self) -> String {
        match &self.hls_key {
            Some(hls_key) => hls_key.replace("master.m3u8", ""),
            None => keys::hls_dir_key(&self.owner_id, &self.id),
        }
    }
}

#[derive(Iden)]
pub enum Videos {
    Table,
    Id,
    Title,
    OwnerId,
    RawKey,
    HlsKey,
    ThumbnailKey,
    IsProcessed,
    CreatedAt,
}

/// Fields supplied when a video row is first written; everything else comes
/// from column defaults.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub id: Uuid,
    pub title: String,
    pub owner_id: String,
    pub raw_key: String,
}

/// Ledger row correlating an in-flight multipart upload with its owner and
/// target key. Written for observability only; the upload protocol never
/// reads it back.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_id: String,
    pub video_id: Uuid,
    pub owner_id: String,
    pub storage_key: String,
}

#[derive(Iden)]
pub enum UploadSessions {
    Table,
    UploadId,
    VideoId,
    OwnerId,
    StorageKey,
    StartedAt,
}

#[async_trait]
pub trait VideoCatalog: Clone + Send + Sync + 'static {
    async fn insert(&self, new: NewVideo) -> Result<Video>;

    async fn get(&self, id: &Uuid) -> Result<Option<Video>>;

    /// Processed videos in stable creation order. Shuffling the public
    /// listing is the caller's concern, not the catalog's.
    async fn list_processed(&self) -> Result<Vec<Video>>;

    /// Everything a user has uploaded, newest first, processed or not.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Video>>;

    async fn rename(&self, id: &Uuid, title: &str) -> Result<Option<Video>>;

    /// Removes the row and hands it back so the caller can clean up the
    /// video's stored objects.
    async fn delete(&self, id: &Uuid) -> Result<Option<Video>>;

    async fn record_session(&self, session: &UploadSession) -> Result<()>;

    async fn clear_session(&self, upload_id: &str) -> Result<()>;
}

#[cfg(test)]
mod test {
    use super::*;

    fn video(hls_key: Option<&str>) -> Video {
        Video {
            id: Uuid::parse_str("b4862b21-fb97-4435-8856-1712e8e5216a").unwrap(),
            title: String::from("demo"),
            owner_id: String::from("user-7"),
            raw_key: String::from(
                "user-7/videos/b4862b21-fb97-4435-8856-1712e8e5216a/raw",
            ),
            hls_key: hls_key.map(String::from),
            thumbnail_key: None,
            is_processed: hls_key.is_some(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn hls_prefix_strips_manifest_name() {
        let video = video(Some(
            "user-7/videos/b4862b21-fb97-4435-8856-1712e8e5216a/hls/master.m3u8",
        ));
        assert_eq!(
            video.hls_prefix(),
            "user-7/videos/b4862b21-fb97-4435-8856-1712e8e5216a/hls/",
        );
    }

    #[test]
    fn hls_prefix_falls_back_to_convention() {
        let video = video(None);
        assert_eq!(
            video.hls_prefix(),
            "user-7/videos/b4862b21-fb97-4435-8856-1712e8e5216a/hls/",
        );
    }

    #[test]
    fn serializes_camel_case_and_drops_empty_keys() {
        let serialized = serde_json::to_value(video(None)).unwrap();
        assert_eq!(serialized["ownerId"], "user-7");
        assert_eq!(serialized["isProcessed"], false);
        assert!(serialized.get("hlsKey").is_none());
        assert!(serialized.get("thumbnailKey").is_none());
        assert!(serialized.get("rawKey").is_some());
        assert!(serialized.get("createdAt").is_some());
    }
}
