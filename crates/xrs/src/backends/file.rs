//! 📂 Previously, on "Things That Could Go Wrong With A Directory"...
//!
//! The bucket was a folder. The folder was on a laptop. The laptop was on a train with no
//! WiFi. And yet the radiographs still needed rotating.
//!
//! `FileStore` treats `{root}/{bucket}/` as a bucket and every file under it as an object whose
//! key is its relative path with `/` separators. Listings are sorted and paged with offset
//! tokens, so the lister walks the exact same pagination path it walks against real S3.
//!
//! 🧠 Knowledge graph:
//! - Config co-located: `FileStoreConfig` lives right here, next to the store that uses it.
//! - Listing walks the tree with `walkdir` on the blocking pool; get/put are `tokio::fs`.
//! - A bucket directory that doesn't exist lists as empty. Gets from it are `NotFound`.
//!
//! 🦆 (mandatory, no notes)

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;
use walkdir::WalkDir;

use crate::backends::{ListingPage, ObjectStore, StoreError, paginate};

/// 🔧 Where the pretend buckets live, and how many keys per listing page.
#[derive(Debug, Deserialize, Clone)]
pub struct FileStoreConfig {
    pub root: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

// 📏 1000, because that's what S3 hands out per page and we're doing an impression.
fn default_page_size() -> usize {
    1000
}

/// 📂 A directory cosplaying as an object store.
#[derive(Debug, Clone)]
pub struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    pub fn new(config: FileStoreConfig) -> Self {
        Self { config }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.config.root.join(bucket).join(key)
    }
}

fn collect_keys(bucket_root: &Path) -> Result<Vec<String>, StoreError> {
    if !bucket_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut keys = Vec::new();
    for entry in WalkDir::new(bucket_root) {
        let entry = entry.map_err(|e| StoreError::request("list_objects", e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(bucket_root)
            .map_err(|e| StoreError::request("list_objects", e))?;
        let key = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        keys.push(key);
    }
    keys.sort();
    Ok(keys)
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, StoreError> {
        let bucket_root = self.config.root.join(bucket);
        let all_keys = tokio::task::spawn_blocking(move || collect_keys(&bucket_root))
            .await
            .map_err(|e| StoreError::request("list_objects", e))??;

        let matching = all_keys
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        paginate(matching, self.config.page_size, continuation_token)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                trace!("📖 read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(StoreError::request("get_object", e)),
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::request("put_object", e))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| StoreError::request("put_object", e))
    }
}
