//! Object storage for processed datasets.
//!
//! [`ObjectStore`] is the seam every handler writes through. [`S3Store`] is
//! the production implementation; [`LocalDirStore`] mirrors the bucket layout
//! on disk for smoke runs and [`MemoryStore`] keeps objects in memory for tests.

mod local;
mod memory;
mod s3;

pub use local::LocalDirStore;
pub use memory::{MemoryStore, StoredObject};
pub use s3::S3Store;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

pub const CSV_CONTENT_TYPE: &str = "text/csv";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Acknowledgement returned by a successful put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutAck {
    pub bucket: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `body` to `bucket`/`key`, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<PutAck>;
}

/// Destination of one upload, bound ahead of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub key: String,
}

impl UploadTarget {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Puts `body` at this target.
    pub async fn upload<S: ObjectStore + ?Sized>(
        &self,
        store: &S,
        body: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<PutAck> {
        let body = body.into();
        let size = body.len();
        let ack = store
            .put_object(&self.bucket, &self.key, body, content_type)
            .await?;
        info!(destination = %self, bytes = size, content_type, "Object uploaded");
        Ok(ack)
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_target_display() {
        let target = UploadTarget::new("asteroid-files", "benner.csv");
        assert_eq!(target.to_string(), "s3://asteroid-files/benner.csv");
    }

    #[tokio::test]
    async fn test_upload_target_writes_through_store() {
        let store = MemoryStore::new();
        let target = UploadTarget::new("asteroid-files", "massd.json");

        let ack = target
            .upload(&store, b"{}".to_vec(), JSON_CONTENT_TYPE)
            .await
            .unwrap();

        assert_eq!(ack.bucket, "asteroid-files");
        assert_eq!(ack.key, "massd.json");
        let stored = store.get("asteroid-files", "massd.json").unwrap();
        assert_eq!(stored.body.as_ref(), b"{}");
        assert_eq!(stored.content_type, JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_put_ack_omits_missing_fields() {
        let ack = PutAck {
            bucket: "b".to_string(),
            key: "k".to_string(),
            e_tag: None,
            version_id: None,
        };
        assert_eq!(
            serde_json::to_string(&ack).unwrap(),
            r#"{"bucket":"b","key":"k"}"#
        );
    }
}
