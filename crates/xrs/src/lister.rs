//! 📜 Lister — turns "everything under this prefix" into one flat `Vec` of keys.
//!
//! Stores hand out listings a page at a time. The lister keeps asking, carrying each page's
//! continuation token into the next request, until a page says it's the last one. Pages are
//! concatenated in the order they arrive; inside a page, whatever order the store chose.
//!
//! 💀 Any store error mid-pagination fails the whole listing. No partial list, no retry.
//! A page that claims to be truncated but offers no token also fails: looping forever and
//! silently stopping short are both worse than an error.

use tracing::{debug, info};

use crate::backends::{ObjectStore, StoreError};
use crate::error::PipelineError;

fn listing_failure(bucket: &str, prefix: &str, source: StoreError) -> PipelineError {
    PipelineError::Listing {
        bucket: bucket.to_string(),
        prefix: prefix.to_string(),
        source,
    }
}

/// 📜 Every key under `prefix` in `bucket`, following pagination to the end.
pub async fn list_keys<S>(store: &S, bucket: &str, prefix: &str) -> Result<Vec<String>, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let mut keys = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .list_page(bucket, prefix, token.as_deref())
            .await
            .map_err(|source| listing_failure(bucket, prefix, source))?;
        pages += 1;
        debug!(
            "📄 page {} of s3://{}/{}: {} keys, truncated={}",
            pages,
            bucket,
            prefix,
            page.keys.len(),
            page.truncated
        );
        keys.extend(page.keys);

        if !page.truncated {
            break;
        }
        match page.next_token {
            Some(next) => token = Some(next),
            None => return Err(listing_failure(bucket, prefix, StoreError::MissingToken)),
        }
    }

    info!(
        "📜 listed {} keys under s3://{}/{} in {} page(s)",
        keys.len(),
        bucket,
        prefix,
        pages
    );
    Ok(keys)
}
