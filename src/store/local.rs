use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{ObjectStore, PutAck};

/// Stores objects as files under `<root>/<bucket>/<key>`.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        for part in [bucket, key] {
            let escapes = Path::new(part)
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if part.is_empty() || escapes {
                bail!("'{part}' is not a usable bucket or key for a local store");
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> Result<PutAck> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, &body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "Object written locally");

        Ok(PutAck {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag: None,
            version_id: None,
        })
    }
}
