//! 💀 Errors — the taxonomy of things that end a batch.
//!
//! 🎬 COLD OPEN — INT. RADIOLOGY ARCHIVE — 4:12 AM
//!
//! Somewhere in a bucket, object number 3 of 5 refuses to be fetched. Objects 4 and 5
//! will never know what happened. They will never be blurred. They will never be rotated.
//! That's the policy: one failure, whole batch down. No skip-and-continue, no partial
//! progress record, no heroics.
//!
//! 🧠 Knowledge graph:
//! - `PipelineError`: what the batch loops return. One variant per stage that can fail,
//!   each carrying the key (or prefix) it was working on and the underlying cause.
//! - `StoreError` lives in `backends` (it's the store's vocabulary), `RasterError` lives in
//!   `raster` (the codec's vocabulary). This enum wraps them with context.
//! - Above this layer, `anyhow` takes over — same as everywhere else in the crate. Callers who
//!   care which stage died can `downcast_ref::<PipelineError>()`.
//!
//! 🦆 The duck has reviewed every variant. The duck is not reassured.

use thiserror::Error;

use crate::backends::StoreError;
use crate::raster::RasterError;

/// 💀 Everything a pipeline batch can die of.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 📜 Listing blew up mid-pagination. No partial list is returned. Ever.
    #[error("listing s3://{bucket}/{prefix} failed")]
    Listing {
        bucket: String,
        prefix: String,
        #[source]
        source: StoreError,
    },

    /// 📥 Could not read one object. The rest of the batch goes down with it.
    #[error("fetching '{key}' failed")]
    Fetch {
        key: String,
        #[source]
        source: StoreError,
    },

    /// 🖼️ The bytes came back but they are not an image we can decode.
    #[error("decoding '{key}' failed")]
    Decode {
        key: String,
        #[source]
        source: RasterError,
    },

    /// 🧪 Something went wrong turning pixels back into PNG bytes (or resizing them).
    #[error("encoding image for '{key}' failed")]
    Encode {
        key: String,
        #[source]
        source: RasterError,
    },

    /// 📤 The store refused the write.
    #[error("writing '{key}' failed")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },

    /// 🏷️ The key has no file extension to hang the `_blured` suffix on.
    #[error("key '{key}' has no file extension; cannot derive an augmented name")]
    UnsupportedKey { key: String },
}

impl PipelineError {
    /// 🔑 The key (or prefix, for listings) the failure is about.
    pub fn subject(&self) -> &str {
        match self {
            Self::Listing { prefix, .. } => prefix,
            Self::Fetch { key, .. }
            | Self::Decode { key, .. }
            | Self::Encode { key, .. }
            | Self::Write { key, .. }
            | Self::UnsupportedKey { key } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn the_one_where_every_failure_names_what_it_was_touching() {
        let the_listing = PipelineError::Listing {
            bucket: "xray".to_string(),
            prefix: "raw/train".to_string(),
            source: StoreError::MissingToken,
        };
        assert_eq!(the_listing.subject(), "raw/train");
        assert_eq!(the_listing.to_string(), "listing s3://xray/raw/train failed");
        assert!(the_listing.source().is_some());

        let the_write = PipelineError::Write {
            key: "preprocessed/train/0_train.png".to_string(),
            source: StoreError::NotFound {
                bucket: "xray".to_string(),
                key: "preprocessed/train/0_train.png".to_string(),
            },
        };
        assert_eq!(the_write.subject(), "preprocessed/train/0_train.png");
    }
}
