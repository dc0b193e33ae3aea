//! 🚂 Pipelines — list, then fetch → decode → transform → write, one key at a time.
//!
//! 🎬 COLD OPEN — INT. BUCKET — CONTINUOUS
//!
//! Thirty-six thousand radiographs stand in a single-file line. No cutting. No parallel lanes.
//! Each one is fetched, judged, maybe rotated, maybe resized, and written back before the next
//! one is even called. If one of them faints in the doorway, the line goes home.
//!
//! 🧠 Knowledge graph:
//! - `preprocess_images`: normalization batch. Gap-free counter, `{idx}_{leaf}.png` names.
//! - `augment_images`: blur batch. One output per input, `{stem}_blured.{ext}` names.
//! - `run_preprocessing` / `run_augmentation`: both splits (train, then valid) for a job.
//! - Every error is fatal to the batch. The only exception is the opt-in `skip` decode policy
//!   of the normalization job.
//! - The store is borrowed. Whoever runs the job owns it.

use tracing::{debug, info, warn};

use crate::app_config::{DecodePolicy, GaussianConfig, PreprocessingConfig};
use crate::backends::ObjectStore;
use crate::error::PipelineError;
use crate::lister::list_keys;
use crate::progress::{BatchProgress, BatchReport};
use crate::raster::RasterImage;
use crate::transforms::{NormalizeOutcome, augment, preprocess};
use crate::writer::put_image;

/// 🍃 Last path segment of a prefix: `preprocessed/train` → `train`.
pub fn leaf_folder_name(prefix: &str) -> &str {
    let trimmed = prefix.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

async fn fetch<S>(store: &S, bucket: &str, key: &str) -> Result<Vec<u8>, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    store
        .get(bucket, key)
        .await
        .map_err(|source| PipelineError::Fetch {
            key: key.to_string(),
            source,
        })
}

fn decode(key: &str, bytes: &[u8]) -> Result<RasterImage, PipelineError> {
    RasterImage::decode(bytes).map_err(|source| PipelineError::Decode {
        key: key.to_string(),
        source,
    })
}

/// 📐 Normalize every key and write the keepers to `{prefix}/{idx}_{leaf}.png`.
///
/// `idx` counts accepted images only, starting at 0, so the written names are always
/// `0..written` with no holes. The report's `written` is the accepted count.
pub async fn preprocess_images<S>(
    store: &S,
    bucket: &str,
    prefix: &str,
    keys: &[String],
    on_decode_error: DecodePolicy,
) -> Result<BatchReport, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let leaf = leaf_folder_name(prefix);
    let mut report = BatchReport::new("preprocess", prefix);
    report.listed = keys.len() as u64;
    let progress = BatchProgress::new(prefix, report.listed);

    for key in keys {
        let bytes = fetch(store, bucket, key).await?;
        let image = match decode(key, &bytes) {
            Ok(image) => image,
            Err(e) if on_decode_error == DecodePolicy::Skip => {
                warn!("🙈 skipping '{}': {}", key, e);
                report.skipped_undecodable += 1;
                progress.advance(key);
                continue;
            }
            Err(e) => return Err(e),
        };

        let outcome = preprocess(&image).map_err(|source| PipelineError::Encode {
            key: key.clone(),
            source,
        })?;
        match outcome {
            NormalizeOutcome::Accepted(normalized) => {
                let name = format!("{}_{}.png", report.written, leaf);
                put_image(store, bucket, prefix, &name, &normalized).await?;
                report.written += 1;
            }
            NormalizeOutcome::Rejected(reason) => {
                debug!("🙅 '{}' rejected: {}", key, reason);
                report.record_rejection(&reason);
            }
        }
        progress.advance(key);
    }

    report.elapsed = progress.finish();
    info!(
        "📐 {}: {} written, {} rejected, {} skipped of {} listed",
        prefix,
        report.written,
        report.rejected(),
        report.skipped_undecodable,
        report.listed
    );
    Ok(report)
}

/// 🌫️ Blur every key and write each result to `{prefix}/{stem}_blured.{ext}`.
///
/// Returning `Ok` is the success flag: every input produced exactly one output.
pub async fn augment_images<S>(
    store: &S,
    bucket: &str,
    prefix: &str,
    keys: &[String],
    sigma: f32,
) -> Result<BatchReport, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let mut report = BatchReport::new("augment", prefix);
    report.listed = keys.len() as u64;
    let progress = BatchProgress::new(prefix, report.listed);

    for key in keys {
        let bytes = fetch(store, bucket, key).await?;
        let image = decode(key, &bytes)?;
        let (name, blurred) = augment(key, &image, sigma)?;
        put_image(store, bucket, prefix, &name, &blurred).await?;
        report.written += 1;
        progress.advance(key);
    }

    report.elapsed = progress.finish();
    info!("🌫️ {}: {} blurred", prefix, report.written);
    Ok(report)
}

/// 🩻 Normalization job: train split, then valid split.
pub async fn run_preprocessing<S>(
    store: &S,
    bucket: &str,
    config: &PreprocessingConfig,
) -> Result<Vec<BatchReport>, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let splits = [
        (&config.raw_train_prefix, &config.preprocessed_train_prefix),
        (&config.raw_valid_prefix, &config.preprocessed_valid_prefix),
    ];
    let mut reports = Vec::with_capacity(splits.len());
    for (source, destination) in splits {
        let keys = list_keys(store, bucket, source).await?;
        let report =
            preprocess_images(store, bucket, destination, &keys, config.on_decode_error).await?;
        reports.push(report.with_source(source));
    }
    Ok(reports)
}

/// 🌫️ Blur job: train split, then valid split.
pub async fn run_augmentation<S>(
    store: &S,
    bucket: &str,
    config: &GaussianConfig,
) -> Result<Vec<BatchReport>, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let splits = [
        (&config.preprocessed_train_prefix, &config.gaussian_train_prefix),
        (&config.preprocessed_valid_prefix, &config.gaussian_valid_prefix),
    ];
    let mut reports = Vec::with_capacity(splits.len());
    for (source, destination) in splits {
        let keys = list_keys(store, bucket, source).await?;
        let report = augment_images(store, bucket, destination, &keys, config.sigma).await?;
        reports.push(report.with_source(source));
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{InMemoryStore, StoreRequest};
    use crate::raster::Channels;

    const BUCKET: &str = "xray";

    fn the_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        RasterImage::filled(width, height, Channels::Gray, value)
            .expect("💀 fixture")
            .encode_png()
            .expect("💀 fixture should encode")
    }

    fn the_keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    async fn the_gets(store: &InMemoryStore) -> Vec<String> {
        store
            .requests()
            .await
            .into_iter()
            .filter_map(|r| match r {
                StoreRequest::Get { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn the_one_where_the_leaf_is_the_last_folder() {
        assert_eq!(leaf_folder_name("preprocessed/train"), "train");
        assert_eq!(leaf_folder_name("preprocessed/valid/"), "valid");
        assert_eq!(leaf_folder_name("flat"), "flat");
    }

    #[tokio::test]
    async fn the_one_where_rejections_leave_no_gaps_in_the_numbering() {
        let the_store = InMemoryStore::new();
        // -- #2 is mostly black, #4 is too narrow after rotation
        the_store.insert(BUCKET, "raw/train/1.png", the_png(300, 400, 100)).await;
        the_store.insert(BUCKET, "raw/train/2.png", the_png(300, 400, 0)).await;
        the_store.insert(BUCKET, "raw/train/3.png", the_png(300, 400, 150)).await;
        the_store.insert(BUCKET, "raw/train/4.png", the_png(300, 200, 200)).await;
        the_store.insert(BUCKET, "raw/train/5.png", the_png(300, 400, 220)).await;
        let the_inputs = the_keys(&[
            "raw/train/1.png",
            "raw/train/2.png",
            "raw/train/3.png",
            "raw/train/4.png",
            "raw/train/5.png",
        ]);

        let the_report = preprocess_images(
            &the_store,
            BUCKET,
            "preprocessed/train",
            &the_inputs,
            DecodePolicy::Fail,
        )
        .await
        .expect("💀 batch should succeed");

        assert_eq!(the_report.written, 3);
        assert_eq!(the_report.rejected_mostly_empty, 1);
        assert_eq!(the_report.rejected_too_narrow, 1);

        let the_outputs: Vec<String> = the_store
            .keys(BUCKET)
            .await
            .into_iter()
            .filter(|k| k.starts_with("preprocessed/"))
            .collect();
        assert_eq!(
            the_outputs,
            vec![
                "preprocessed/train/0_train.png",
                "preprocessed/train/1_train.png",
                "preprocessed/train/2_train.png",
            ]
        );

        // -- index 1 is input #3 (value 150), resized to 400x512
        let the_second = RasterImage::decode(
            &the_store
                .object(BUCKET, "preprocessed/train/1_train.png")
                .await
                .expect("💀 output should exist"),
        )
        .expect("💀 output should decode");
        assert_eq!((the_second.width(), the_second.height()), (400, 512));
        assert!(the_second.pixels().iter().all(|p| (149..=151).contains(p)));
    }

    #[tokio::test]
    async fn the_one_where_a_failed_fetch_takes_down_the_rest_of_the_batch() {
        let the_store = InMemoryStore::new();
        let the_inputs = the_keys(&["k/1.png", "k/2.png", "k/3.png", "k/4.png", "k/5.png"]);
        for key in &the_inputs {
            the_store.insert(BUCKET, key, the_png(300, 400, 128)).await;
        }
        the_store.fail_get("k/3.png").await;

        let the_verdict =
            preprocess_images(&the_store, BUCKET, "out/train", &the_inputs, DecodePolicy::Fail)
                .await;

        assert!(matches!(
            the_verdict,
            Err(PipelineError::Fetch { ref key, .. }) if key == "k/3.png"
        ));
        assert_eq!(the_gets(&the_store).await, vec!["k/1.png", "k/2.png", "k/3.png"]);
        let the_outputs: Vec<String> = the_store
            .keys(BUCKET)
            .await
            .into_iter()
            .filter(|k| k.starts_with("out/"))
            .collect();
        assert_eq!(the_outputs, vec!["out/train/0_train.png", "out/train/1_train.png"]);
    }

    #[tokio::test]
    async fn the_one_where_garbage_bytes_fail_the_batch_by_default() {
        let the_store = InMemoryStore::new();
        the_store.insert(BUCKET, "raw/train/bad.png", b"not a png".to_vec()).await;

        let the_verdict = preprocess_images(
            &the_store,
            BUCKET,
            "preprocessed/train",
            &the_keys(&["raw/train/bad.png"]),
            DecodePolicy::Fail,
        )
        .await;
        assert!(matches!(the_verdict, Err(PipelineError::Decode { .. })));
    }

    #[tokio::test]
    async fn the_one_where_the_skip_policy_steps_over_garbage() {
        let the_store = InMemoryStore::new();
        the_store.insert(BUCKET, "raw/train/a.png", the_png(300, 400, 100)).await;
        the_store.insert(BUCKET, "raw/train/bad.png", b"not a png".to_vec()).await;
        the_store.insert(BUCKET, "raw/train/c.png", the_png(300, 400, 100)).await;

        let the_report = preprocess_images(
            &the_store,
            BUCKET,
            "preprocessed/train",
            &the_keys(&["raw/train/a.png", "raw/train/bad.png", "raw/train/c.png"]),
            DecodePolicy::Skip,
        )
        .await
        .expect("💀 skip policy should keep going");

        assert_eq!(the_report.written, 2);
        assert_eq!(the_report.skipped_undecodable, 1);
        assert!(the_store.object(BUCKET, "preprocessed/train/1_train.png").await.is_some());
    }

    #[tokio::test]
    async fn the_one_where_blurring_twice_writes_the_same_bytes() {
        let the_store = InMemoryStore::new();
        let the_gradient: Vec<u8> = (0..64 * 64).map(|i| (i % 256) as u8).collect();
        let the_source = RasterImage::new(64, 64, Channels::Gray, the_gradient)
            .expect("💀 fixture")
            .encode_png()
            .expect("💀 fixture should encode");
        the_store.insert(BUCKET, "preprocessed/train/0_train.png", the_source).await;
        let the_inputs = the_keys(&["preprocessed/train/0_train.png"]);

        let the_report = augment_images(&the_store, BUCKET, "gaussian/train", &the_inputs, 2.3)
            .await
            .expect("💀 first run");
        assert_eq!(the_report.written, 1);
        let the_first = the_store
            .object(BUCKET, "gaussian/train/0_train_blured.png")
            .await
            .expect("💀 output should exist");

        augment_images(&the_store, BUCKET, "gaussian/train", &the_inputs, 2.3)
            .await
            .expect("💀 second run");
        let the_second = the_store
            .object(BUCKET, "gaussian/train/0_train_blured.png")
            .await
            .expect("💀 output should still exist");

        assert_eq!(the_first, the_second);
    }

    #[tokio::test]
    async fn the_one_where_a_folder_marker_stops_the_blur_batch() {
        let the_store = InMemoryStore::new();
        the_store.insert(BUCKET, "preprocessed/train/", the_png(8, 8, 1)).await;

        let the_verdict = augment_images(
            &the_store,
            BUCKET,
            "gaussian/train",
            &the_keys(&["preprocessed/train/"]),
            2.3,
        )
        .await;
        assert!(matches!(the_verdict, Err(PipelineError::UnsupportedKey { .. })));
    }

    #[tokio::test]
    async fn the_one_where_both_splits_run_in_order() {
        let the_store = InMemoryStore::new().with_page_size(1);
        the_store.insert(BUCKET, "raw/train/a.png", the_png(300, 400, 90)).await;
        the_store.insert(BUCKET, "raw/train/b.png", the_png(300, 400, 90)).await;
        the_store.insert(BUCKET, "raw/valid/c.png", the_png(400, 300, 90)).await;

        let the_reports = run_preprocessing(&the_store, BUCKET, &PreprocessingConfig::default())
            .await
            .expect("💀 job should succeed");

        assert_eq!(the_reports.len(), 2);
        assert_eq!(the_reports[0].source, "raw/train");
        assert_eq!(the_reports[0].destination, "preprocessed/train");
        assert_eq!(the_reports[0].written, 2);
        assert_eq!(the_reports[1].source, "raw/valid");
        assert_eq!(the_reports[1].written, 1);
        assert!(the_store.object(BUCKET, "preprocessed/train/1_train.png").await.is_some());
        assert!(the_store.object(BUCKET, "preprocessed/valid/0_valid.png").await.is_some());

        let the_blur_reports = run_augmentation(&the_store, BUCKET, &GaussianConfig::default())
            .await
            .expect("💀 blur job should succeed");
        assert_eq!(the_blur_reports[0].written, 2);
        assert!(
            the_store
                .object(BUCKET, "gaussian/valid/0_valid_blured.png")
                .await
                .is_some()
        );
    }
}
