//! 🩻 xrs — the X-ray shuttle.
//!
//! 🎬 *[camera pans across a bucket of forty thousand radiographs]*
//! 🎬 "In a world where every wrist was photographed sideways..."
//! 🎬 "One crate dared to list them, rotate them, blur them, and put them back."
//!
//! 📦 Three jobs, one entry point:
//! - `preprocess`: raw splits → admission rules → 400x512 PNGs with gap-free names.
//! - `augment`: preprocessed splits → Gaussian blur → `_blured` copies.
//! - `relocate`: local manifests → numbered files on disk.
//!
//! The store is built once in [`run`] and lent to whichever job asked for it.

pub mod app_config;
pub mod backends;
pub mod error;
pub mod lister;
pub mod pipelines;
pub mod progress;
pub mod raster;
pub mod relocate;
pub mod transforms;
pub mod writer;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::AppConfig;
use crate::backends::StoreBackend;
use crate::progress::BatchReport;

/// 🎛️ Which job to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Preprocess,
    Augment,
    Relocate,
}

/// 🚀 Run one job end to end. Returns one report per split, train first.
pub async fn run(app_config: AppConfig, job: Job) -> Result<Vec<BatchReport>> {
    let bucket = app_config.aws_config.bucket_name.as_str();
    info!("🚀 starting {:?} against bucket '{}'", job, bucket);

    match job {
        Job::Preprocess => {
            let store = StoreBackend::from_config(&app_config.aws_config, &app_config.store).await;
            pipelines::run_preprocessing(&store, bucket, &app_config.preprocessing)
                .await
                .context("💀 The preprocessing job failed. Nothing after the failing key was processed.")
        }
        Job::Augment => {
            let store = StoreBackend::from_config(&app_config.aws_config, &app_config.store).await;
            pipelines::run_augmentation(&store, bucket, &app_config.gaussian)
                .await
                .context("💀 The augmentation job failed. Nothing after the failing key was processed.")
        }
        Job::Relocate => relocate::run_relocation(&app_config.relocate).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::StoreConfig;
    use crate::backends::{FileStoreConfig, ObjectStore};
    use crate::error::PipelineError;
    use crate::raster::{Channels, RasterImage};

    fn the_file_backed_config(root: &std::path::Path) -> AppConfig {
        AppConfig {
            store: StoreConfig::File(FileStoreConfig {
                root: root.to_path_buf(),
                page_size: 2,
            }),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn the_one_where_both_jobs_run_against_a_folder_bucket() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir refused to exist");
        let the_config = the_file_backed_config(the_dir.path());
        let the_store =
            StoreBackend::from_config(&the_config.aws_config, &the_config.store).await;
        let the_bucket = the_config.aws_config.bucket_name.clone();
        let the_png = RasterImage::filled(300, 400, Channels::Gray, 120)
            .expect("💀 fixture")
            .encode_png()
            .expect("💀 fixture should encode");
        for key in ["raw/train/a.png", "raw/train/b.png", "raw/train/c.png", "raw/valid/d.png"] {
            the_store
                .put(&the_bucket, key, the_png.clone())
                .await
                .expect("💀 seeding failed");
        }

        let the_reports = run(the_config.clone(), Job::Preprocess)
            .await
            .expect("💀 preprocessing should succeed");
        assert_eq!(the_reports.iter().map(|r| r.written).collect::<Vec<_>>(), vec![3, 1]);

        let the_reports = run(the_config, Job::Augment)
            .await
            .expect("💀 augmentation should succeed");
        assert_eq!(the_reports.iter().map(|r| r.written).collect::<Vec<_>>(), vec![3, 1]);
        assert!(
            the_dir
                .path()
                .join(&the_bucket)
                .join("gaussian/train/2_train_blured.png")
                .exists()
        );
    }

    #[tokio::test]
    async fn the_one_where_the_typed_error_survives_the_context() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir refused to exist");
        let the_config = the_file_backed_config(the_dir.path());
        let the_store =
            StoreBackend::from_config(&the_config.aws_config, &the_config.store).await;
        the_store
            .put(&the_config.aws_config.bucket_name, "raw/train/bad.png", b"nope".to_vec())
            .await
            .expect("💀 seeding failed");

        let the_error = run(the_config, Job::Preprocess)
            .await
            .expect_err("💀 garbage should fail the batch");
        assert!(matches!(
            the_error.downcast_ref::<PipelineError>(),
            Some(PipelineError::Decode { key, .. }) if key == "raw/train/bad.png"
        ));
    }
}
