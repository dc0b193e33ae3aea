//! 🔌 Backends — where the real I/O happens.
//!
//! 🪣 Every pipeline in this crate needs exactly three things from an object store:
//! list a page of keys, get one object, put one object. That's it. That's the whole contract.
//! No multipart, no versioning, no lifecycle rules, no feelings.
//!
//! 🎭 This module is the casting agency. Need the real S3? Got it. A directory on your laptop
//! pretending to be a bucket? Got it. A `BTreeMap` in RAM that can be told to fail on cue for
//! tests? Oh, we've got that too.
//!
//! 🧠 Knowledge graph:
//! - Pattern: trait (`ObjectStore`) → concrete impls (`S3Store`, `FileStore`, `InMemoryStore`)
//!   → `StoreBackend` enum dispatching to them. Callers never care which one they hold.
//! - `StoreBackend` is built once per run by `StoreBackend::from_config` and passed by reference
//!   to every stage. No globals, no lazily-constructed session lurking at import time.
//! - `StoreError` is the shared vocabulary; pipelines wrap it with the key they were touching.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod in_mem;
pub mod s3;

pub use file::{FileStore, FileStoreConfig};
pub use in_mem::{InMemoryStore, StoreRequest};
pub use s3::{S3Store, S3StoreConfig};

use crate::app_config::{AwsConfig, StoreConfig};

/// 📦 Boxed cause — whatever the SDK or the filesystem threw at us.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 📄 One page of a listing.
///
/// If `truncated` is set, `next_token` is the cursor for the following page. A truncated page
/// without a token is a store bug; the lister refuses to guess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    pub truncated: bool,
    pub next_token: Option<String>,
}

/// 💀 Things an object store can say "no" with.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 🔍 Asked for something that isn't there.
    #[error("object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    /// 🧭 The continuation token isn't one this store handed out.
    #[error("continuation token '{token}' is not valid for this store")]
    InvalidToken { token: String },

    /// 📜 The store said "there's more" but didn't say where.
    #[error("listing page was truncated but carried no continuation token")]
    MissingToken,

    /// 📡 The request itself failed (network, auth, I/O, injected test failure...).
    #[error("{operation} failed: {detail}")]
    Request {
        operation: &'static str,
        detail: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub(crate) fn request<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Request {
            operation,
            detail: source.to_string(),
            source: Box::new(source),
        }
    }
}

/// 🪣 The three capabilities every pipeline needs.
///
/// # Contract 📜
/// - `list_page` returns one page under `prefix`; pass the previous page's `next_token` to get
///   the next one. `None` asks for the first page. Empty prefix = whole bucket.
/// - `get` returns the full object body.
/// - `put` overwrites silently if the key already exists.
/// - Every call is one request. No retries hide in here.
#[async_trait]
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError>;
}

/// 🎭 The many faces of an object store — a polymorphic casting call for buckets.
///
/// Ancient proverb: "He who hardcodes the backend, tests only in production."
#[derive(Debug)]
pub enum StoreBackend {
    S3(S3Store),
    File(FileStore),
}

impl StoreBackend {
    /// 🏗️ Build the store the config asks for. Called once per run; the result is owned by the
    /// run and lent to every stage.
    pub async fn from_config(aws: &AwsConfig, store: &StoreConfig) -> Self {
        match store {
            StoreConfig::S3(s3_config) => Self::S3(S3Store::connect(aws, s3_config).await),
            StoreConfig::File(file_config) => Self::File(FileStore::new(file_config.clone())),
        }
    }
}

#[async_trait]
impl ObjectStore for StoreBackend {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, StoreError> {
        match self {
            StoreBackend::S3(s) => s.list_page(bucket, prefix, continuation_token).await,
            StoreBackend::File(f) => f.list_page(bucket, prefix, continuation_token).await,
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        match self {
            StoreBackend::S3(s) => s.get(bucket, key).await,
            StoreBackend::File(f) => f.get(bucket, key).await,
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        match self {
            StoreBackend::S3(s) => s.put(bucket, key, body).await,
            StoreBackend::File(f) => f.put(bucket, key, body).await,
        }
    }
}

/// 🧭 Offset-based pagination shared by the stores that page through a sorted key list
/// themselves (file, in-memory). The token is the offset of the next page, as a string.
pub(crate) fn paginate(
    mut all_keys: Vec<String>,
    page_size: usize,
    continuation_token: Option<&str>,
) -> Result<ListingPage, StoreError> {
    let start = match continuation_token {
        None => 0,
        Some(token) => token
            .parse::<usize>()
            .ok()
            .filter(|offset| *offset <= all_keys.len())
            .ok_or_else(|| StoreError::InvalidToken {
                token: token.to_string(),
            })?,
    };
    let page_size = page_size.max(1);
    let end = (start + page_size).min(all_keys.len());
    let truncated = end < all_keys.len();
    let keys = all_keys.drain(start..end).collect();
    Ok(ListingPage {
        keys,
        truncated,
        next_token: truncated.then(|| end.to_string()),
    })
}
