//! S3 implementation of the Destination port
//!
//! Maps the port's capability set 1:1 onto the store's multi-part API:
//!
//! | port operation          | S3 call(s)                              |
//! |-------------------------|-----------------------------------------|
//! | `filter_uploadable_files` | `ListObjectsV2` (paginated)           |
//! | `existing_part_listing` | `ListMultipartUploads` + `ListParts`    |
//! | `init_upload`           | `CreateMultipartUpload`                 |
//! | `upload_part`           | `UploadPart` (with Content-MD5)         |
//! | `commit`                | `CompleteMultipartUpload`               |
//!
//! Every SDK failure is wrapped as a `DestinationError` naming the port
//! operation, so layers above can classify it as transient without
//! understanding S3 error shapes.

use std::collections::HashSet;

use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use objsync_core::config::DestinationSection;
use objsync_core::domain::{
    DestinationError, ListedPart, PartEtag, PartListing, PartUploadRequest, RemoteKey, UploadId,
};
use objsync_core::ports::Destination;

/// Destination adapter backed by an S3 bucket.
pub struct S3Destination {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Destination {
    /// Wrap an existing SDK client.
    #[must_use]
    pub fn new(client: Client, bucket: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Build a destination from the typed configuration section.
    ///
    /// Credentials and any unset region come from the usual provider chain
    /// (environment, shared config, instance profile). A custom `endpoint`
    /// switches to path-style addressing for S3-compatible stores.
    pub async fn from_config(section: &DestinationSection) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &section.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &section.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Ok(Self::new(
            client,
            section.bucket.clone(),
            section.prefix.clone(),
        ))
    }

    fn object_key(&self, key: &RemoteKey) -> String {
        prefixed_key(self.prefix.as_deref(), key.as_str())
    }

    /// Pending multi-part upload for `object_key`, newest first when the
    /// store reports several.
    async fn find_pending_upload(
        &self,
        object_key: &str,
    ) -> Result<Option<(String, Option<DateTime<Utc>>)>, DestinationError> {
        let response = self
            .client
            .list_multipart_uploads()
            .bucket(&self.bucket)
            .prefix(object_key)
            .send()
            .await
            .map_err(|err| DestinationError::new("getExistingPartListing", err))?;

        let pending = response
            .uploads()
            .iter()
            .filter(|upload| upload.key() == Some(object_key))
            .max_by_key(|upload| upload.initiated().map(|t| (t.secs(), t.subsec_nanos())));

        let Some(upload) = pending else {
            return Ok(None);
        };
        let upload_id = upload
            .upload_id()
            .ok_or_else(|| {
                DestinationError::new(
                    "getExistingPartListing",
                    anyhow::anyhow!("store listed an upload without an id for {object_key}"),
                )
            })?
            .to_string();
        let initiated = upload
            .initiated()
            .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()));
        Ok(Some((upload_id, initiated)))
    }
}

#[async_trait::async_trait]
impl Destination for S3Destination {
    async fn filter_uploadable_files(
        &self,
        candidates: &[String],
    ) -> Result<Vec<String>, DestinationError> {
        let mut existing: HashSet<String> = HashSet::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(self.prefix.clone())
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|err| DestinationError::new("filterUploadableFiles", err))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    existing.insert(key.to_string());
                }
            }
        }

        let uploadable: Vec<String> = candidates
            .iter()
            .filter(|candidate| {
                !existing.contains(&prefixed_key(self.prefix.as_deref(), candidate))
            })
            .cloned()
            .collect();
        debug!(
            candidates = candidates.len(),
            uploadable = uploadable.len(),
            "filtered uploadable files"
        );
        Ok(uploadable)
    }

    async fn existing_part_listing(
        &self,
        key: &RemoteKey,
    ) -> Result<Option<PartListing>, DestinationError> {
        let object_key = self.object_key(key);
        let Some((upload_id, initiated)) = self.find_pending_upload(&object_key).await? else {
            return Ok(None);
        };

        let mut parts = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .list_parts()
                .bucket(&self.bucket)
                .key(&object_key)
                .upload_id(&upload_id)
                .set_part_number_marker(marker.clone())
                .send()
                .await
                .map_err(|err| DestinationError::new("getExistingPartListing", err))?;

            for part in response.parts() {
                parts.push(ListedPart {
                    part_number: part.part_number().unwrap_or_default() as u32,
                    size: part.size().unwrap_or_default() as u64,
                    etag: unquote_etag(part.e_tag().unwrap_or_default()),
                });
            }
            if response.is_truncated().unwrap_or(false) {
                marker = response.next_part_number_marker().map(str::to_string);
            } else {
                break;
            }
        }

        let upload_id = UploadId::new(upload_id)
            .map_err(|err| DestinationError::new("getExistingPartListing", err))?;
        Ok(Some(PartListing {
            upload_id,
            initiated,
            parts,
        }))
    }

    async fn init_upload(&self, key: &RemoteKey) -> Result<UploadId, DestinationError> {
        let object_key = self.object_key(key);
        let response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|err| DestinationError::new("initUpload", err))?;

        let upload_id = response.upload_id().ok_or_else(|| {
            DestinationError::new(
                "initUpload",
                anyhow::anyhow!("store created a session without an upload id for {object_key}"),
            )
        })?;
        UploadId::new(upload_id).map_err(|err| DestinationError::new("initUpload", err))
    }

    async fn upload_part(
        &self,
        request: PartUploadRequest,
    ) -> Result<PartEtag, DestinationError> {
        let object_key = self.object_key(&request.key);
        let response = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&object_key)
            .upload_id(request.upload_id.as_str())
            .part_number(request.part_number as i32)
            .content_md5(request.content_md5.clone())
            .content_length(request.size as i64)
            .body(ByteStream::from(request.body.clone()))
            .send()
            .await
            .map_err(|err| DestinationError::new("uploadPart", err))?;

        let etag = response.e_tag().ok_or_else(|| {
            DestinationError::new(
                "uploadPart",
                anyhow::anyhow!(
                    "store accepted part {} of {object_key} without an etag",
                    request.part_number
                ),
            )
        })?;
        Ok(PartEtag::new(request.part_number, unquote_etag(etag)))
    }

    async fn commit(
        &self,
        key: &RemoteKey,
        etags: &[PartEtag],
        upload_id: &UploadId,
    ) -> Result<(), DestinationError> {
        let object_key = self.object_key(key);
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                etags
                    .iter()
                    .map(|etag| {
                        CompletedPart::builder()
                            .part_number(etag.part_number as i32)
                            .e_tag(&etag.etag)
                            .build()
                    })
                    .collect(),
            ))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&object_key)
            .upload_id(upload_id.as_str())
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|err| DestinationError::new("commit", err))?;
        debug!(key = %object_key, parts = etags.len(), "multipart upload committed");
        Ok(())
    }
}

/// Full object key under the configured prefix.
fn prefixed_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        None | Some("") => key.to_string(),
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
    }
}

/// Strip the surrounding quotes S3 puts on etags.
fn unquote_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}
