use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream};
use futures::{pin_mut, TryStreamExt};

pub(crate) mod s3;
pub use s3::{S3Config, S3};

use crate::errors::{Error, Result};

/// Largest number of keys a single delete-batch request may carry.
pub const MAX_DELETE_BATCH: usize = 1000;

/// One fragment of a multipart upload as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub number: i32,
    pub e_tag: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;

    async fn create_multipart(&self, key: &str, content_type: &str) -> Result<String>;

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String>;

    /// Every part the store has accepted for `(key, upload_id)`, ascending by
    /// part number. This listing, not anything remembered by a caller, is the
    /// source of truth at completion time.
    async fn list_parts(&self, key: &str, upload_id: &str) -> Result<Vec<Part>>;

    /// Assembles the object from the store's own part listing and returns the
    /// final location. Fails when no parts were uploaded or a listed part
    /// carries no eTag.
    async fn complete_multipart(&self, key: &str, upload_id: &str) -> Result<String>;

    /// Idempotent: aborting a session the store no longer knows succeeds.
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<()>;

    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Removes every object under `prefix` and returns how many keys were
    /// deleted.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;
}

/// Validates and orders a listed part set for completion submission: at
/// least one part, every part confirmed with a non-empty eTag.
pub fn ordered_parts(mut parts: Vec<Part>) -> Result<Vec<Part>> {
    if parts.is_empty() {
        return Err(Error::ObjectsUploadHasNoParts);
    }
    parts.sort_by_key(|part| part.number);
    for part in &parts {
        match &part.e_tag {
            Some(e_tag) if !e_tag.is_empty() => {}
            _ => return Err(Error::ObjectsMissingPartETag(part.number)),
        }
    }
    Ok(parts)
}

/// One page of keys from a paginated listing. `next` carries the store's
/// continuation token when more pages remain.
pub struct KeyPage {
    pub keys: Vec<String>,
    pub next: Option<String>,
}

/// Lazy page sequence over a paginated lister. The first call passes no
/// token; every later call passes the token the previous page returned; the
/// sequence ends when a page comes back without one.
pub fn key_pages<L, F>(list: L) -> impl Stream<Item = Result<Vec<String>>>
where
    L: FnMut(Option<String>) -> F,
    F: Future<Output = Result<KeyPage>>,
{
    stream::try_unfold(
        (list, Some(None::<String>)),
        |(mut list, token)| async move {
            let token = match token {
                Some(token) => token,
                None => return Ok(None),
            };
            let page = list(token).await?;
            let next = page.next.map(Some);
            Ok(Some((page.keys, (list, next))))
        },
    )
}

/// Feeds every key produced by `list` into `delete`, never more than
/// [`MAX_DELETE_BATCH`] keys per call, and returns the total deleted.
pub async fn drain_key_pages<L, LF, D, DF>(list: L, mut delete: D) -> Result<usize>
where
    L: FnMut(Option<String>) -> LF,
    LF: Future<Output = Result<KeyPage>>,
    D: FnMut(Vec<String>) -> DF,
    DF: Future<Output = Result<()>>,
{
    let pages = key_pages(list);
    pin_mut!(pages);

    let mut deleted = 0;
    let mut pending: Vec<String> = Vec::new();
    while let Some(keys) = pages.try_next().await? {
        pending.extend(keys);
        while pending.len() >= MAX_DELETE_BATCH {
            let rest = pending.split_off(MAX_DELETE_BATCH);
            let batch = std::mem::replace(&mut pending, rest);
            deleted += batch.len();
            delete(batch).await?;
        }
    }
    if !pending.is_empty() {
        deleted += pending.len();
        delete(pending).await?;
    }
    Ok(deleted)
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use rstest::rstest;

    use super::*;

    fn part(number: i32, e_tag: Option<&str>) -> Part {
        Part {
            number,
            e_tag: e_tag.map(String::from),
        }
    }

    #[test]
    fn ordered_parts_rejects_empty_set() {
        assert!(matches!(
            ordered_parts(Vec::new()),
            Err(Error::ObjectsUploadHasNoParts)
        ));
    }

    #[rstest]
    #[case::absent(part(2, None))]
    #[case::blank(part(2, Some("")))]
    fn ordered_parts_requires_etags(#[case] bad: Part) {
        let parts = vec![part(1, Some("\"aaa\"")), bad];
        assert!(matches!(
            ordered_parts(parts),
            Err(Error::ObjectsMissingPartETag(2))
        ));
    }

    #[test]
    fn ordered_parts_sorts_ascending() {
        let parts = vec![
            part(3, Some("\"c\"")),
            part(1, Some("\"a\"")),
            part(2, Some("\"b\"")),
        ];
        let ordered = ordered_parts(parts).unwrap();
        let numbers: Vec<i32> = ordered.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn key_pages_chains_tokens() {
        let stream = key_pages(|token: Option<String>| async move {
            match token.as_deref() {
                None => Ok(KeyPage {
                    keys: vec![String::from("k0")],
                    next: Some(String::from("t1")),
                }),
                Some("t1") => Ok(KeyPage {
                    keys: vec![String::from("k1"), String::from("k2")],
                    next: None,
                }),
                Some(other) => panic!("unexpected token {other}"),
            }
        });
        pin_mut!(stream);

        let mut keys = Vec::new();
        while let Some(page) = stream.try_next().await.unwrap() {
            keys.extend(page);
        }
        assert_eq!(keys, vec!["k0", "k1", "k2"]);
    }

    #[tokio::test]
    async fn drains_in_bounded_batches() {
        // three pages of 400 keys, so the drain has to split 1200 keys into
        // a full batch of 1000 and a remainder of 200
        let batches = Arc::new(Mutex::new(Vec::new()));
        let recorded = batches.clone();

        let deleted = drain_key_pages(
            |token: Option<String>| async move {
                let page: usize = match token.as_deref() {
                    None => 0,
                    Some(token) => token.parse().unwrap(),
                };
                let keys = (0..400).map(|i| format!("k{}", page * 400 + i)).collect();
                let next = if page < 2 {
                    Some(format!("{}", page + 1))
                } else {
                    None
                };
                Ok(KeyPage { keys, next })
            },
            move |keys: Vec<String>| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push(keys.len());
                    Ok(())
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(deleted, 1200);
        assert_eq!(*batches.lock().unwrap(), vec![1000, 200]);
    }

    #[tokio::test]
    async fn empty_listing_deletes_nothing() {
        let deleted = drain_key_pages(
            |_token: Option<String>| async {
                Ok(KeyPage {
                    keys: Vec::new(),
                    next: None,
                })
            },
            |_keys: Vec<String>| async { panic!("no delete batch expected") },
        )
        .await
        .unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn lister_errors_propagate() {
        let result = drain_key_pages(
            |_token: Option<String>| async {
                Err(Error::ObjectsUnknownUpload(String::from("gone")))
            },
            |_keys: Vec<String>| async { Ok(()) },
        )
        .await;
        assert!(matches!(result, Err(Error::ObjectsUnknownUpload(_))));
    }
}
