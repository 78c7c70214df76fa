use serde::Deserialize;

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use bytes::Bytes;
use http::{StatusCode, Uri};

pub(crate) mod logging;
use crate::errors::{Error, Result};
use crate::objects::s3::logging::RequestLogger;
use crate::objects::{drain_key_pages, ordered_parts, KeyPage, ObjectStore, Part};

#[derive(Clone, Deserialize)]
pub struct S3Config {
    secret_key: String,
    access_key: String,
    hostname: String,
    bucket_name: String,
    region: String,
}

impl S3Config {
    pub async fn new_objects(&self) -> Result<S3> {
        let scp = SharedCredentialsProvider::new(
            Credentials::new(
                self.access_key.clone(),
                self.secret_key.clone(),
                None,
                None,
                "showreel",
            )
            .provide_credentials()
            .await?,
        );

        let uri = Uri::builder()
            .scheme("https")
            .authority(self.hostname.as_str())
            .path_and_query("/")
            .build()?;

        let sdk_config = aws_config::load_from_env().await;

        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .region(Region::new(self.region.clone()))
            .credentials_provider(scp)
            .endpoint_url(uri.to_string())
            .interceptor(RequestLogger)
            .build();

        let s3_client = aws_sdk_s3::Client::from_conf(config);

        Ok(S3 {
            bucket_name: self.bucket_name.clone(),
            client: s3_client,
        })
    }
}

#[derive(Clone)]
pub struct S3 {
    bucket_name: String,
    client: Client,
}

#[async_trait]
impl ObjectStore for S3 {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let _put_object_output = self
            .client
            .put_object()
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .bucket(&self.bucket_name)
            .send()
            .await?;
        Ok(())
    }

    async fn create_multipart(&self, key: &str, content_type: &str) -> Result<String> {
        let create_multipart_upload_output = self
            .client
            .create_multipart_upload()
            .key(key)
            .content_type(content_type)
            .bucket(&self.bucket_name)
            .send()
            .await?;

        match create_multipart_upload_output.upload_id {
            Some(upload_id) => Ok(upload_id),
            None => Err(Error::ObjectsFailedToInitiateUpload("missing upload id")),
        }
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let upload_part_output = self
            .client
            .upload_part()
            .upload_id(upload_id)
            .part_number(part_number)
            .key(key)
            .body(ByteStream::from(body))
            .bucket(&self.bucket_name)
            .send()
            .await?;

        match upload_part_output.e_tag {
            Some(e_tag) => Ok(e_tag),
            None => Err(Error::ObjectsMissingPartETag(part_number)),
        }
    }

    async fn list_parts(&self, key: &str, upload_id: &str) -> Result<Vec<Part>> {
        let mut parts = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_parts()
                .key(key)
                .upload_id(upload_id)
                .bucket(&self.bucket_name);
            if let Some(marker) = &marker {
                request = request.part_number_marker(marker);
            }
            let list_parts_output = request.send().await?;

            for part in list_parts_output.parts().unwrap_or_default() {
                parts.push(Part {
                    number: part.part_number(),
                    e_tag: part.e_tag().map(String::from),
                });
            }

            marker = if list_parts_output.is_truncated() {
                list_parts_output
                    .next_part_number_marker()
                    .map(String::from)
            } else {
                None
            };
            if marker.is_none() {
                break;
            }
        }
        parts.sort_by_key(|part| part.number);
        Ok(parts)
    }

    async fn complete_multipart(&self, key: &str, upload_id: &str) -> Result<String> {
        let parts = ordered_parts(self.list_parts(key, upload_id).await?)?;

        let mut mpu = CompletedMultipartUpload::builder();
        for part in parts {
            let mut pb = CompletedPart::builder();
            if let Some(e_tag) = &part.e_tag {
                pb = pb.e_tag(e_tag);
            }
            mpu = mpu.parts(pb.part_number(part.number).build());
        }

        let complete_multipart_upload_output = self
            .client
            .complete_multipart_upload()
            .multipart_upload(mpu.build())
            .upload_id(upload_id)
            .key(key)
            .bucket(&self.bucket_name)
            .send()
            .await?;

        match complete_multipart_upload_output.location {
            Some(location) => Ok(location),
            None => Err(Error::ObjectsFailedToCompleteUpload("missing location")),
        }
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<()> {
        match self
            .client
            .abort_multipart_upload()
            .upload_id(upload_id)
            .key(key)
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // the store no longer knows the upload id when the session was
            // already aborted or completed; both count as aborted
            Err(SdkError::ServiceError(e)) => {
                let http = e.raw();
                match http.status() {
                    StatusCode::NOT_FOUND => Ok(()),
                    _ => Err(SdkError::ServiceError(e).into()),
                }
            }
            Err(e) => Err(Error::AWSSDKAbortMultipartUploadError(e)),
            Ok(_) => Ok(()),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let _delete_object_output = self
            .client
            .delete_object()
            .key(key)
            .bucket(&self.bucket_name)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let client = self.client.clone();
        let bucket = self.bucket_name.clone();
        let prefix = prefix.to_string();
        let list = move |token: Option<String>| {
            let client = client.clone();
            let bucket = bucket.clone();
            let prefix = prefix.clone();
            async move {
                let mut request = client.list_objects_v2().bucket(&bucket).prefix(&prefix);
                if let Some(token) = token {
                    request = request.continuation_token(token);
                }
                let list_objects_output = request.send().await?;

                let keys = list_objects_output
                    .contents()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|object| object.key().map(String::from))
                    .collect();
                let next = if list_objects_output.is_truncated() {
                    list_objects_output
                        .next_continuation_token()
                        .map(String::from)
                } else {
                    None
                };
                Ok(KeyPage { keys, next })
            }
        };

        let client = self.client.clone();
        let bucket = self.bucket_name.clone();
        let delete = move |keys: Vec<String>| {
            let client = client.clone();
            let bucket = bucket.clone();
            async move {
                let mut del = Delete::builder();
                for key in keys {
                    del = del.objects(ObjectIdentifier::builder().key(key).build());
                }
                let delete_objects_output = client
                    .delete_objects()
                    .bucket(&bucket)
                    .delete(del.build())
                    .send()
                    .await?;
                if let Some(errors) = delete_objects_output.errors() {
                    if !errors.is_empty() {
                        tracing::warn!("{} keys under prefix failed to delete", errors.len());
                    }
                }
                Ok(())
            }
        };

        drain_key_pages(list, delete).await
    }
}
