//! # Previously, on xrs...
//!
//! 🎬 The bucket was far away. The credentials were expired. The CI runner had no network.
//! Someone had to pretend to be S3. Someone had to be brave. Someone had to write a store so
//! simple it lives entirely in RAM, gone the moment you blink.
//!
//! That someone was this module.
//!
//! `InMemoryStore` keeps objects in a `BTreeMap` (so listings come back sorted, like S3),
//! pages listings at a configurable size, writes down every request it receives, and can be
//! told to fail specific requests on cue. Great for assertions, great for trust issues, great
//! for both.
//!
//! ⚠️ This is NOT for production. This is for tests and demos. If you're deploying this to
//! prod, please also deploy a therapist.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::{ListingPage, ObjectStore, StoreError, paginate};

/// 📝 One request, as the store saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRequest {
    List {
        bucket: String,
        prefix: String,
        continuation_token: Option<String>,
    },
    Get {
        bucket: String,
        key: String,
    },
    Put {
        bucket: String,
        key: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operation {
    List,
    Get,
    Put,
}

type ObjectMap = BTreeMap<(String, String), Vec<u8>>;

/// 📦 A bucket that never forgets. Clone-able, and every clone shares the same state, so tests
/// can hand one copy to the pipeline and inspect another afterwards.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    objects: Arc<Mutex<ObjectMap>>,
    requests: Arc<Mutex<Vec<StoreRequest>>>,
    // -- (operation, key or prefix) pairs that must fail
    failures: Arc<Mutex<HashSet<(Operation, String)>>>,
    page_size: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// 🚀 Empty store, S3-sized pages (1000 keys).
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashSet::new())),
            page_size: 1000,
        }
    }

    /// 📏 Smaller pages, so pagination actually happens with a handful of keys.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub async fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), body);
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// 🗝️ All keys in `bucket`, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// 📝 Every request received so far, in order.
    pub async fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().await.clone()
    }

    /// 💣 Make every `get` of `key` fail.
    pub async fn fail_get(&self, key: &str) {
        self.failures
            .lock()
            .await
            .insert((Operation::Get, key.to_string()));
    }

    /// 💣 Make every `put` of `key` fail.
    pub async fn fail_put(&self, key: &str) {
        self.failures
            .lock()
            .await
            .insert((Operation::Put, key.to_string()));
    }

    /// 💣 Make every listing of `prefix` fail.
    pub async fn fail_list(&self, prefix: &str) {
        self.failures
            .lock()
            .await
            .insert((Operation::List, prefix.to_string()));
    }

    async fn check_injected(
        &self,
        operation: Operation,
        subject: &str,
        label: &'static str,
    ) -> Result<(), StoreError> {
        if self
            .failures
            .lock()
            .await
            .contains(&(operation, subject.to_string()))
        {
            return Err(StoreError::request(
                label,
                std::io::Error::other(format!("injected failure for '{subject}'")),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, StoreError> {
        self.requests.lock().await.push(StoreRequest::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            continuation_token: continuation_token.map(str::to_string),
        });
        self.check_injected(Operation::List, prefix, "list_objects")
            .await?;

        let the_matching_keys = self
            .keys(bucket)
            .await
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        paginate(the_matching_keys, self.page_size, continuation_token)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.requests.lock().await.push(StoreRequest::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.check_injected(Operation::Get, key, "get_object").await?;

        self.object(bucket, key)
            .await
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.requests.lock().await.push(StoreRequest::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.check_injected(Operation::Put, key, "put_object").await?;

        // 🔒 The Mutex is load-bearing. Overwrite semantics come free with insert().
        self.insert(bucket, key, body).await;
        Ok(())
    }
}
