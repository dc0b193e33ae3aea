//! ✍️ Writer — encode a raster as PNG and drop it at `{prefix}/{name}`.
//!
//! One put per image, overwrite semantics, no retry. The `info!` line per write is the
//! heartbeat of a batch run: if the log goes quiet, so did the pipeline.

use tracing::info;

use crate::backends::ObjectStore;
use crate::error::PipelineError;
use crate::raster::RasterImage;

/// 🔑 `{prefix}/{name}`, without doubling a trailing slash. An empty prefix is the bucket root.
pub fn destination_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// ✍️ PNG-encode `image` and put it at `{prefix}/{name}` in `bucket`. Returns the key written.
pub async fn put_image<S>(
    store: &S,
    bucket: &str,
    prefix: &str,
    name: &str,
    image: &RasterImage,
) -> Result<String, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let key = destination_key(prefix, name);
    let body = image.encode_png().map_err(|source| PipelineError::Encode {
        key: key.clone(),
        source,
    })?;
    store
        .put(bucket, &key, body)
        .await
        .map_err(|source| PipelineError::Write {
            key: key.clone(),
            source,
        })?;
    info!("✍️ {}", key);
    Ok(key)
}
