//! 🪣📡 S3 Store — the real bucket, in the real cloud, with real credentials.
//!
//! INT. AWS CONSOLE — NIGHT. A lone bucket sits in us-east-1, bloated with radiographs.
//! Wrists. Elbows. Shoulders. Someone typed `PUT` forty thousand times and walked away.
//! The images have been waiting. Patient. Ready to be listed, a thousand keys at a time.
//!
//! 🧠 Knowledge graph:
//! - `S3StoreConfig`: region / endpoint / path-style knobs, co-located with the store.
//! - Credentials come from `aws-config`: the named profile from `[aws_config] PROFILE_NAME`
//!   when set, otherwise the default chain (env vars → ~/.aws/config → IAM role → hope).
//! - Transport: `ListObjectsV2` (one page per call, continuation token in, continuation token
//!   out), `GetObject` → `ByteStream::collect()`, `PutObject` with a `ByteStream` body.
//! - `endpoint_url` + `force_path_style` make MinIO and friends work. Also wiremock.
//!
//! 🦆 The duck has no clearance for AWS. It watches from the edge of the VPC.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use tracing::{info, trace};

use crate::app_config::AwsConfig;
use crate::backends::{ListingPage, ObjectStore, StoreError};

/// 🔧 Connection knobs for the S3 backend. All optional; the AWS profile fills the gaps.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct S3StoreConfig {
    /// 🌎 Overrides the profile's region.
    #[serde(default)]
    pub region: Option<String>,
    /// 🔗 Custom endpoint for S3-compatible stores.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// 🛣️ `http://host/bucket/key` instead of `http://bucket.host/key`.
    #[serde(default)]
    pub force_path_style: bool,
}

/// 🪣 `ObjectStore` over the AWS SDK client.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

fn sdk_failure<E>(operation: &'static str, error: E) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    // -- 🧅 DisplayErrorContext peels the whole onion; plain Display just says "service error"
    StoreError::Request {
        operation,
        detail: DisplayErrorContext(&error).to_string(),
        source: Box::new(error),
    }
}

impl S3Store {
    /// 🚀 Resolve credentials and region from the environment and the configured profile,
    /// then build the client. Nothing goes over the wire until the first request.
    pub async fn connect(aws: &AwsConfig, config: &S3StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &aws.profile_name {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(config.force_path_style);

        info!(
            "🪣 S3 store ready: profile={}, region={}, endpoint={}",
            aws.profile_name.as_deref().unwrap_or("<default chain>"),
            sdk_config
                .region()
                .map(|r| r.as_ref())
                .unwrap_or("<unset>"),
            config.endpoint_url.as_deref().unwrap_or("<aws>")
        );
        Self::from_client(Client::from_conf(builder.build()))
    }

    /// 🔌 Wrap an already-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, StoreError> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| sdk_failure("list_objects_v2", e))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        Ok(ListingPage {
            keys,
            truncated: response.is_truncated().unwrap_or(false),
            next_token: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    sdk_failure("get_object", e)
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| sdk_failure("get_object", e))?
            .into_bytes();
        trace!("🪣 hauled {} bytes out of s3://{}/{}", bytes.len(), bucket, key);
        Ok(bytes.to_vec())
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body));
        if key.ends_with(".png") {
            request = request.content_type("image/png");
        }
        request
            .send()
            .await
            .map_err(|e| sdk_failure("put_object", e))?;
        Ok(())
    }
}
