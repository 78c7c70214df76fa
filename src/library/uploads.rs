use bytes::Bytes;
use uuid::Uuid;

use crate::catalog::{NewVideo, UploadSession, Video, VideoCatalog};
use crate::errors::{Error, Result};
use crate::keys;
use crate::objects::ObjectStore;

/// Hard cap on a whole video delivered in one request.
pub const MAX_VIDEO_BYTES: usize = 250 * 1024 * 1024;

/// Hard cap on a single multipart chunk.
pub const MAX_CHUNK_BYTES: usize = 6 * 1024 * 1024;

/// Coordinates uploads: the single-shot put and the chunked multipart
/// protocol against the object store, plus the catalog row once an upload
/// lands. No per-session state lives here; the object store is the source
/// of truth for which parts exist.
pub struct UploadStore<C, O>
where
    C: VideoCatalog,
    O: ObjectStore,
{
    catalog: C,
    objects: O,
}

/// Handle a client needs to continue a chunked upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUploadSession {
    pub upload_id: String,
    pub video_id: Uuid,
    pub storage_key: String,
}

impl<C, O> UploadStore<C, O>
where
    C: VideoCatalog,
    O: ObjectStore,
{
    pub fn new(catalog: C, objects: O) -> Self {
        Self { catalog, objects }
    }

    /// Opens a chunked upload session: picks the video id, derives the
    /// storage key under the caller's namespace and starts the multipart
    /// upload. No catalog row exists until completion.
    pub async fn initialize(&self, caller: &str, content_type: &str) -> Result<NewUploadSession> {
        let video_id = Uuid::new_v4();
        let storage_key = keys::raw_video_key(caller, &video_id);
        let upload_id = self
            .objects
            .create_multipart(&storage_key, content_type)
            .await?;

        // ledger row only; the upload continues even when it cannot be
        // written
        let session = UploadSession {
            upload_id: upload_id.clone(),
            video_id,
            owner_id: String::from(caller),
            storage_key: storage_key.clone(),
        };
        if let Err(e) = self.catalog.record_session(&session).await {
            tracing::warn!("failed to record upload session {upload_id}: {e:?}");
        }

        Ok(NewUploadSession {
            upload_id,
            video_id,
            storage_key,
        })
    }

    /// Forwards one chunk. `client_index` is the zero-based index the
    /// client assigned; the store numbers parts from one.
    pub async fn upload_chunk(
        &self,
        caller: &str,
        storage_key: &str,
        upload_id: &str,
        client_index: i32,
        body: Bytes,
    ) -> Result<String> {
        if body.len() > MAX_CHUNK_BYTES {
            return Err(Error::Validation(String::from(
                "Chunk size should be less than 6 MB",
            )));
        }
        self.authorize(caller, storage_key)?;

        self.objects
            .upload_part(storage_key, upload_id, client_index + 1, body)
            .await
    }

    /// Finishes a chunked upload and writes the catalog row. The title is
    /// checked before the store assembles anything, so a rejected request
    /// leaves the session resumable.
    pub async fn complete(
        &self,
        caller: &str,
        video_id: &Uuid,
        storage_key: &str,
        upload_id: &str,
        title: &str,
    ) -> Result<Video> {
        if title.is_empty() {
            return Err(Error::Validation(String::from("Title is required")));
        }
        let keyed_id = self.authorize(caller, storage_key)?;
        if keyed_id != *video_id {
            return Err(Error::Validation(String::from("Invalid video path")));
        }

        self.objects
            .complete_multipart(storage_key, upload_id)
            .await?;
        let video = self
            .catalog
            .insert(NewVideo {
                id: *video_id,
                title: String::from(title),
                owner_id: String::from(caller),
                raw_key: String::from(storage_key),
            })
            .await?;

        if let Err(e) = self.catalog.clear_session(upload_id).await {
            tracing::warn!("failed to clear upload session {upload_id}: {e:?}");
        }
        Ok(video)
    }

    /// Walks away from a chunked upload, discarding stored parts. Safe to
    /// repeat; aborting a finished or unknown session is a no-op.
    pub async fn abort(&self, caller: &str, storage_key: &str, upload_id: &str) -> Result<()> {
        self.authorize(caller, storage_key)?;
        self.objects.abort_multipart(storage_key, upload_id).await?;

        if let Err(e) = self.catalog.clear_session(upload_id).await {
            tracing::warn!("failed to clear upload session {upload_id}: {e:?}");
        }
        Ok(())
    }

    /// Stores a whole video in one request and writes its catalog row.
    pub async fn upload_video(
        &self,
        caller: &str,
        title: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<Video> {
        if title.is_empty() {
            return Err(Error::Validation(String::from("Title is required")));
        }
        if body.len() > MAX_VIDEO_BYTES {
            return Err(Error::Validation(String::from(
                "File size should be less than 250 MB",
            )));
        }

        let video_id = Uuid::new_v4();
        let storage_key = keys::raw_video_key(caller, &video_id);
        self.objects.put(&storage_key, body, content_type).await?;

        // an insert failure here strands the stored object; keys without a
        // catalog row are reclaimed by the storage sweep
        self.catalog
            .insert(NewVideo {
                id: video_id,
                title: String::from(title),
                owner_id: String::from(caller),
                raw_key: storage_key,
            })
            .await
    }

    /// A caller may only touch upload state under a key that is
    /// well-formed and inside their own namespace.
    fn authorize(&self, caller: &str, storage_key: &str) -> Result<Uuid> {
        let (owner_id, video_id) = keys::parse_raw_key(storage_key)
            .ok_or_else(|| Error::Validation(String::from("Invalid video path")))?;
        if owner_id != caller {
            return Err(Error::Forbidden);
        }
        Ok(video_id)
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;
    use crate::testing::{MemoryCatalog, MemoryObjects};

    fn store() -> (
        UploadStore<MemoryCatalog, MemoryObjects>,
        MemoryCatalog,
        MemoryObjects,
    ) {
        let catalog = MemoryCatalog::default();
        let objects = MemoryObjects::default();
        (
            UploadStore::new(catalog.clone(), objects.clone()),
            catalog,
            objects,
        )
    }

    #[tokio::test]
    async fn chunked_upload_end_to_end() {
        let (store, catalog, objects) = store();

        let session = store.initialize("user-7", "video/webm").await.unwrap();
        assert_eq!(
            session.storage_key,
            format!("user-7/videos/{}/raw", session.video_id),
        );
        assert!(catalog.has_session(&session.upload_id));

        // client indices arrive out of order; the store's own part listing
        // fixes the assembly order
        for index in [2i32, 0, 1] {
            let body = Bytes::from(vec![b'a' + index as u8; 8]);
            let e_tag = store
                .upload_chunk(
                    "user-7",
                    &session.storage_key,
                    &session.upload_id,
                    index,
                    body,
                )
                .await
                .unwrap();
            assert!(!e_tag.is_empty());
        }

        let video = store
            .complete(
                "user-7",
                &session.video_id,
                &session.storage_key,
                &session.upload_id,
                "Launch demo",
            )
            .await
            .unwrap();

        assert_eq!(video.id, session.video_id);
        assert_eq!(video.title, "Launch demo");
        assert_eq!(video.owner_id, "user-7");
        assert_eq!(video.raw_key, session.storage_key);
        assert!(!video.is_processed);

        let assembled = objects.object(&session.storage_key).unwrap();
        assert_eq!(
            assembled,
            [vec![b'a'; 8], vec![b'b'; 8], vec![b'c'; 8]].concat(),
        );
        assert_eq!(
            objects.content_type(&session.storage_key).as_deref(),
            Some("video/webm"),
        );
        assert!(!catalog.has_session(&session.upload_id));

        // aborting after completion is a no-op
        store
            .abort("user-7", &session.storage_key, &session.upload_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn complete_without_parts_fails_and_keeps_session() {
        let (store, catalog, objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();

        let result = store
            .complete(
                "user-7",
                &session.video_id,
                &session.storage_key,
                &session.upload_id,
                "Empty",
            )
            .await;

        assert!(matches!(result, Err(Error::ObjectsUploadHasNoParts)));
        assert_eq!(catalog.video_count(), 0);
        assert!(catalog.has_session(&session.upload_id));
        assert!(objects.has_upload(&session.upload_id));
    }

    #[tokio::test]
    async fn abort_discards_the_session_and_is_idempotent() {
        let (store, catalog, objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();
        store
            .upload_chunk(
                "user-7",
                &session.storage_key,
                &session.upload_id,
                0,
                Bytes::from_static(b"chunk"),
            )
            .await
            .unwrap();

        store
            .abort("user-7", &session.storage_key, &session.upload_id)
            .await
            .unwrap();
        assert!(!objects.has_upload(&session.upload_id));
        assert!(!catalog.has_session(&session.upload_id));
        assert!(objects.object(&session.storage_key).is_none());

        store
            .abort("user-7", &session.storage_key, &session.upload_id)
            .await
            .unwrap();
    }

    #[rstest]
    #[case::at_limit(MAX_CHUNK_BYTES, true)]
    #[case::over_limit(MAX_CHUNK_BYTES + 1, false)]
    #[tokio::test]
    async fn chunk_size_limit(#[case] size: usize, #[case] accepted: bool) {
        let (store, _catalog, _objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();

        let result = store
            .upload_chunk(
                "user-7",
                &session.storage_key,
                &session.upload_id,
                0,
                Bytes::from(vec![0u8; size]),
            )
            .await;

        match result {
            Ok(_) => assert!(accepted),
            Err(Error::Validation(message)) => {
                assert!(!accepted);
                assert_eq!(message, "Chunk size should be less than 6 MB");
            }
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }

    #[rstest]
    #[case::at_limit(MAX_VIDEO_BYTES, true)]
    #[case::over_limit(MAX_VIDEO_BYTES + 1, false)]
    #[tokio::test]
    async fn single_shot_size_limit(#[case] size: usize, #[case] accepted: bool) {
        let (store, _catalog, _objects) = store();

        let result = store
            .upload_video("user-7", "Big one", Bytes::from(vec![0u8; size]), "video/mp4")
            .await;

        match result {
            Ok(video) => {
                assert!(accepted);
                assert_eq!(video.title, "Big one");
            }
            Err(Error::Validation(message)) => {
                assert!(!accepted);
                assert_eq!(message, "File size should be less than 250 MB");
            }
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }

    #[tokio::test]
    async fn single_shot_upload_creates_row_and_object() {
        let (store, catalog, objects) = store();

        let video = store
            .upload_video(
                "user-7",
                "Launch demo",
                Bytes::from_static(b"raw bytes"),
                "video/mp4",
            )
            .await
            .unwrap();

        assert_eq!(video.title, "Launch demo");
        assert_eq!(video.owner_id, "user-7");
        assert_eq!(video.raw_key, format!("user-7/videos/{}/raw", video.id));
        assert!(!video.is_processed);
        assert_eq!(objects.object(&video.raw_key).unwrap(), b"raw bytes");
        assert_eq!(
            objects.content_type(&video.raw_key).as_deref(),
            Some("video/mp4"),
        );
        assert_eq!(catalog.video_count(), 1);
    }

    #[tokio::test]
    async fn single_shot_requires_title() {
        let (store, catalog, objects) = store();

        let result = store
            .upload_video("user-7", "", Bytes::from_static(b"raw"), "video/mp4")
            .await;

        assert!(matches!(result, Err(Error::Validation(m)) if m == "Title is required"));
        assert_eq!(catalog.video_count(), 0);
        assert!(objects.keys().is_empty());
    }

    #[tokio::test]
    async fn complete_requires_title_before_touching_the_store() {
        let (store, catalog, objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();
        store
            .upload_chunk(
                "user-7",
                &session.storage_key,
                &session.upload_id,
                0,
                Bytes::from_static(b"chunk"),
            )
            .await
            .unwrap();

        let result = store
            .complete(
                "user-7",
                &session.video_id,
                &session.storage_key,
                &session.upload_id,
                "",
            )
            .await;

        assert!(matches!(result, Err(Error::Validation(m)) if m == "Title is required"));
        // the session survives a rejected completion
        assert!(objects.has_upload(&session.upload_id));
        assert!(objects.object(&session.storage_key).is_none());
        assert_eq!(catalog.video_count(), 0);
    }

    #[tokio::test]
    async fn chunk_rejects_foreign_and_malformed_keys() {
        let (store, _catalog, _objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();

        let foreign = store
            .upload_chunk(
                "user-8",
                &session.storage_key,
                &session.upload_id,
                0,
                Bytes::from_static(b"x"),
            )
            .await;
        assert!(matches!(foreign, Err(Error::Forbidden)));

        let malformed = store
            .upload_chunk(
                "user-7",
                "user-7/not-a-video-key",
                &session.upload_id,
                0,
                Bytes::from_static(b"x"),
            )
            .await;
        assert!(matches!(malformed, Err(Error::Validation(m)) if m == "Invalid video path"));
    }

    #[tokio::test]
    async fn complete_rejects_foreign_callers_and_mismatched_ids() {
        let (store, catalog, _objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();
        store
            .upload_chunk(
                "user-7",
                &session.storage_key,
                &session.upload_id,
                0,
                Bytes::from_static(b"x"),
            )
            .await
            .unwrap();

        let foreign = store
            .complete(
                "user-8",
                &session.video_id,
                &session.storage_key,
                &session.upload_id,
                "Mine now",
            )
            .await;
        assert!(matches!(foreign, Err(Error::Forbidden)));

        // key encodes a different video id than the one claimed
        let other_id = Uuid::new_v4();
        let mismatched = store
            .complete(
                "user-7",
                &other_id,
                &session.storage_key,
                &session.upload_id,
                "Demo",
            )
            .await;
        assert!(matches!(mismatched, Err(Error::Validation(m)) if m == "Invalid video path"));

        assert_eq!(catalog.video_count(), 0);
    }

    #[tokio::test]
    async fn abort_rejects_foreign_callers() {
        let (store, _catalog, objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();

        let foreign = store
            .abort("user-8", &session.storage_key, &session.upload_id)
            .await;
        assert!(matches!(foreign, Err(Error::Forbidden)));
        assert!(objects.has_upload(&session.upload_id));
    }

    #[tokio::test]
    async fn failed_completion_writes_no_row() {
        let (store, catalog, objects) = store();
        let session = store.initialize("user-7", "video/mp4").await.unwrap();
        store
            .upload_chunk(
                "user-7",
                &session.storage_key,
                &session.upload_id,
                0,
                Bytes::from_static(b"chunk"),
            )
            .await
            .unwrap();
        objects.fail_complete();

        let result = store
            .complete(
                "user-7",
                &session.video_id,
                &session.storage_key,
                &session.upload_id,
                "Demo",
            )
            .await;

        assert!(matches!(
            result,
            Err(Error::ObjectsFailedToCompleteUpload(_))
        ));
        assert_eq!(catalog.video_count(), 0);
        assert!(catalog.has_session(&session.upload_id));
    }

    #[tokio::test]
    async fn insert_failure_leaves_the_stored_object() {
        let (store, catalog, objects) = store();
        catalog.fail_insert();

        let result = store
            .upload_video("user-7", "Orphan", Bytes::from_static(b"raw"), "video/mp4")
            .await;

        assert!(matches!(result, Err(Error::SQLXError(_))));
        // the object stays behind for the storage sweep to reclaim
        assert_eq!(objects.keys().len(), 1);
        assert_eq!(catalog.video_count(), 0);
    }
}
