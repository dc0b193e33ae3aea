//! 🚚 Relocate — move the files a manifest points at into one flat, numbered folder.
//!
//! A manifest is a text file with one relative path per line (the MURA `*_image_paths.csv`
//! files, which are CSV in name only). Each line is resolved under `data_root`. If the file is
//! there, it moves to `{destination}/image_{n}.png`, where `n` starts at 1 and only advances on
//! a move. Missing files are counted and passed over; blank lines are ignored.
//!
//! Local disk only. No object store involved. Any I/O error besides "not there" ends the job.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::app_config::RelocateConfig;
use crate::progress::{BatchProgress, BatchReport};

async fn move_file(origin: &Path, target: &Path) -> Result<()> {
    match tokio::fs::rename(origin, target).await {
        Ok(()) => Ok(()),
        // -- rename refuses to cross filesystems; copy + delete does not
        Err(rename_error) if rename_error.kind() == ErrorKind::CrossesDevices => {
            debug!(
                "🔀 rename of '{}' crossed devices ({}), copying instead",
                origin.display(),
                rename_error
            );
            tokio::fs::copy(origin, target).await.with_context(|| {
                format!(
                    "💀 Couldn't copy '{}' to '{}'",
                    origin.display(),
                    target.display()
                )
            })?;
            tokio::fs::remove_file(origin)
                .await
                .with_context(|| format!("💀 Copied '{}' but couldn't remove it", origin.display()))
        }
        Err(rename_error) => Err(rename_error).with_context(|| {
            format!(
                "💀 Couldn't move '{}' to '{}'",
                origin.display(),
                target.display()
            )
        }),
    }
}

/// 🚚 Move every existing manifest entry into `destination` as `image_{n}.png`.
pub async fn relocate_manifest(
    manifest: &Path,
    data_root: &Path,
    destination: &Path,
) -> Result<BatchReport> {
    let contents = tokio::fs::read_to_string(manifest)
        .await
        .with_context(|| format!("💀 Couldn't read manifest '{}'", manifest.display()))?;
    tokio::fs::create_dir_all(destination)
        .await
        .with_context(|| {
            format!(
                "💀 Couldn't create destination '{}'",
                destination.display()
            )
        })?;

    let entries: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut report = BatchReport::new("relocate", &destination.display().to_string())
        .with_source(&manifest.display().to_string());
    report.listed = entries.len() as u64;
    let progress = BatchProgress::new(&destination.display().to_string(), report.listed);

    for entry in entries {
        let origin = data_root.join(entry);
        let exists = tokio::fs::try_exists(&origin)
            .await
            .with_context(|| format!("💀 Couldn't check '{}'", origin.display()))?;
        if exists {
            let target: PathBuf = destination.join(format!("image_{}.png", report.written + 1));
            move_file(&origin, &target).await?;
            debug!("🚚 {} → {}", origin.display(), target.display());
            report.written += 1;
        } else {
            debug!("👻 not on disk: {}", origin.display());
            report.missing += 1;
        }
        progress.advance(entry);
    }

    report.elapsed = progress.finish();
    info!(
        "🚚 {}: {} moved, {} missing",
        manifest.display(),
        report.written,
        report.missing
    );
    Ok(report)
}

/// 🚚 Train manifest, then valid manifest. Numbering restarts at 1 for each.
pub async fn run_relocation(config: &RelocateConfig) -> Result<Vec<BatchReport>> {
    let train = relocate_manifest(
        &config.train_manifest,
        &config.data_root,
        &config.train_destination,
    )
    .await
    .context("💀 Relocating the train split failed")?;
    let valid = relocate_manifest(
        &config.valid_manifest,
        &config.data_root,
        &config.valid_destination,
    )
    .await
    .context("💀 Relocating the valid split failed")?;
    Ok(vec![train, valid])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(root: &Path, relative: &str, contents: &[u8]) {
        let the_path = root.join(relative);
        std::fs::create_dir_all(the_path.parent().expect("💀 has a parent"))
            .expect("💀 mkdir failed");
        std::fs::write(the_path, contents).expect("💀 write failed");
    }

    #[tokio::test]
    async fn the_one_where_missing_files_dont_burn_a_number() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir refused to exist");
        let the_root = the_dir.path().join("data");
        plant(&the_root, "MURA/XR_WRIST/p1/image1.png", b"one");
        plant(&the_root, "MURA/XR_WRIST/p3/image1.png", b"three");
        let the_manifest = the_dir.path().join("train_image_paths.csv");
        std::fs::write(
            &the_manifest,
            "MURA/XR_WRIST/p1/image1.png\n\nMURA/XR_WRIST/p2/image1.png\n  MURA/XR_WRIST/p3/image1.png  \n",
        )
        .expect("💀 manifest write failed");
        let the_destination = the_dir.path().join("DL_images").join("train");

        let the_report = relocate_manifest(&the_manifest, &the_root, &the_destination)
            .await
            .expect("💀 relocation should succeed");

        assert_eq!(the_report.listed, 3);
        assert_eq!(the_report.written, 2);
        assert_eq!(the_report.missing, 1);
        assert_eq!(
            std::fs::read(the_destination.join("image_1.png")).expect("💀 image_1"),
            b"one"
        );
        assert_eq!(
            std::fs::read(the_destination.join("image_2.png")).expect("💀 image_2"),
            b"three"
        );
        assert!(!the_destination.join("image_3.png").exists());
        assert!(!the_root.join("MURA/XR_WRIST/p1/image1.png").exists());
    }

    #[tokio::test]
    async fn the_one_where_each_split_counts_from_one() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir refused to exist");
        let the_root = the_dir.path().join("data");
        plant(&the_root, "t/a.png", b"a");
        plant(&the_root, "v/b.png", b"b");
        plant(&the_dir.path().join("lists"), "train.csv", b"t/a.png\n");
        plant(&the_dir.path().join("lists"), "valid.csv", b"v/b.png\n");
        let the_config = RelocateConfig {
            data_root: the_root.clone(),
            train_manifest: the_dir.path().join("lists/train.csv"),
            valid_manifest: the_dir.path().join("lists/valid.csv"),
            train_destination: the_dir.path().join("out/train"),
            valid_destination: the_dir.path().join("out/valid"),
        };

        let the_reports = run_relocation(&the_config)
            .await
            .expect("💀 relocation should succeed");

        assert_eq!(the_reports.len(), 2);
        assert!(the_dir.path().join("out/train/image_1.png").exists());
        assert!(the_dir.path().join("out/valid/image_1.png").exists());
    }

    #[tokio::test]
    async fn the_one_where_a_missing_manifest_is_an_error_with_a_name() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir refused to exist");
        let the_verdict = relocate_manifest(
            &the_dir.path().join("nope.csv"),
            the_dir.path(),
            &the_dir.path().join("out"),
        )
        .await;

        let the_error = the_verdict.expect_err("💀 a missing manifest should fail");
        assert!(format!("{the_error:#}").contains("nope.csv"));
    }

    #[tokio::test]
    async fn the_one_where_a_blocked_target_stops_the_move_and_keeps_the_origin() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir refused to exist");
        let the_root = the_dir.path().join("data");
        plant(&the_root, "t/a.png", b"a");
        let the_manifest = the_dir.path().join("train.csv");
        std::fs::write(&the_manifest, "t/a.png\n").expect("💀 manifest write failed");
        let the_destination = the_dir.path().join("out");
        // -- a non-empty directory squatting on the first name: rename can't replace it
        plant(&the_destination, "image_1.png/squatter.txt", b"mine");

        let the_error = relocate_manifest(&the_manifest, &the_root, &the_destination)
            .await
            .expect_err("💀 a directory in the way should fail the move");

        let the_message = format!("{the_error:#}");
        assert!(the_message.contains("Couldn't move"), "got: {the_message}");
        assert!(!the_message.contains("Couldn't copy"), "got: {the_message}");
        assert!(the_root.join("t/a.png").exists());
        assert!(the_destination.join("image_1.png/squatter.txt").exists());
    }
}
