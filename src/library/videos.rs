use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::catalog::{Video, VideoCatalog};
use crate::errors::{Error, Result};
use crate::objects::ObjectStore;

/// Read and lifecycle operations over the published catalog.
pub struct VideoStore<C, O>
where
    C: VideoCatalog,
    O: ObjectStore,
{
    catalog: C,
    objects: O,
}

impl<C, O> VideoStore<C, O>
where
    C: VideoCatalog,
    O: ObjectStore,
{
    pub fn new(catalog: C, objects: O) -> Self {
        Self { catalog, objects }
    }

    /// Every processed video, shuffled per call so the public listing
    /// rotates instead of always favoring the oldest uploads.
    pub async fn list_processed(&self) -> Result<Vec<Video>> {
        let mut videos = self.catalog.list_processed().await?;
        videos.shuffle(&mut rand::thread_rng());
        Ok(videos)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Video> {
        self.catalog.get(id).await?.ok_or(Error::NotFound("Video"))
    }

    /// A user's own uploads, newest first, processed or not. Only the
    /// owner may list them.
    pub async fn list_by_owner(&self, caller: &str, owner_id: &str) -> Result<Vec<Video>> {
        if caller != owner_id {
            return Err(Error::Forbidden);
        }
        self.catalog.list_by_owner(owner_id).await
    }

    pub async fn rename(&self, id: &Uuid, caller: &str, title: &str) -> Result<Video> {
        if title.is_empty() {
            return Err(Error::Validation(String::from("Video title is required")));
        }
        let video = self.get(id).await?;
        if video.owner_id != caller {
            return Err(Error::Forbidden);
        }
        self.catalog
            .rename(id, title)
            .await?
            .ok_or(Error::NotFound("Video"))
    }

    /// Removes the catalog row, then the video's objects: thumbnail, raw
    /// upload, and the whole transcoder output prefix.
    pub async fn delete(&self, id: &Uuid, caller: &str) -> Result<Video> {
        let video = self.get(id).await?;
        if video.owner_id != caller {
            return Err(Error::Forbidden);
        }

        // row first, storage after: a concurrent read must never observe a
        // video pointing at half-deleted storage
        let video = self
            .catalog
            .delete(id)
            .await?
            .ok_or(Error::NotFound("Video"))?;
        if let Some(thumbnail_key) = &video.thumbnail_key {
            self.objects.delete_object(thumbnail_key).await?;
        }
        self.objects.delete_object(&video.raw_key).await?;
        self.objects.delete_prefix(&video.hls_prefix()).await?;
        Ok(video)
    }
}
