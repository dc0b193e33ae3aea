//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment. `XRS_*` env vars are the base layer, an optional TOML file goes on
//! top. Nested keys in env use a double underscore: `XRS_AWS_CONFIG__BUCKET_NAME=...`.
//!
//! 🧠 Knowledge graph:
//! - Sections: `[aws_config]`, `[store]`, `[preprocessing]`, `[gaussian]`, `[relocate]`.
//! - Every section is optional. Defaults are the bucket, prefixes and paths the jobs were
//!   first run against, so an empty file still means something.
//! - Option names come in SHOUTING_CASE in the TOML files people already have. Figment lowercases
//!   env keys, so the file's keys are lowercased too before the merge. One spelling per key
//!   reaches serde, and a file key always lands on top of its env twin.

use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{FileStoreConfig, S3StoreConfig};

/// 📦 One struct to rule them all, one struct to find them, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub aws_config: AwsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub gaussian: GaussianConfig,
    #[serde(default)]
    pub relocate: RelocateConfig,
}

/// 🪣 Which bucket, and whose credentials.
#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    #[serde(default = "default_bucket_name")]
    pub bucket_name: String,
    /// 🪪 Named profile from `~/.aws/config`. Unset means the default credential chain.
    #[serde(default)]
    pub profile_name: Option<String>,
}

fn default_bucket_name() -> String {
    "images-itam-denoising-dev".to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            bucket_name: default_bucket_name(),
            profile_name: None,
        }
    }
}

/// 🎭 Which store backs the bucket. Picked with `backend = "s3"` / `backend = "file"`.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    S3(S3StoreConfig),
    File(FileStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::S3(S3StoreConfig::default())
    }
}

/// 💥 What to do with bytes that don't decode as an image.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// 💀 The batch stops. Default.
    #[default]
    Fail,
    /// 🙈 Warn, count it as skipped, keep going.
    Skip,
}

/// 🩻 Normalization job: raw splits in, preprocessed splits out.
#[derive(Debug, Deserialize, Clone)]
pub struct PreprocessingConfig {
    #[serde(default = "default_raw_train")]
    pub raw_train_prefix: String,
    #[serde(default = "default_raw_valid")]
    pub raw_valid_prefix: String,
    #[serde(default = "default_preprocessed_train")]
    pub preprocessed_train_prefix: String,
    #[serde(default = "default_preprocessed_valid")]
    pub preprocessed_valid_prefix: String,
    #[serde(default)]
    pub on_decode_error: DecodePolicy,
}

fn default_raw_train() -> String {
    "raw/train".to_string()
}
fn default_raw_valid() -> String {
    "raw/valid".to_string()
}
fn default_preprocessed_train() -> String {
    "preprocessed/train".to_string()
}
fn default_preprocessed_valid() -> String {
    "preprocessed/valid".to_string()
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            raw_train_prefix: default_raw_train(),
            raw_valid_prefix: default_raw_valid(),
            preprocessed_train_prefix: default_preprocessed_train(),
            preprocessed_valid_prefix: default_preprocessed_valid(),
            on_decode_error: DecodePolicy::default(),
        }
    }
}

/// 🌫️ Blur job: preprocessed splits in, gaussian splits out.
#[derive(Debug, Deserialize, Clone)]
pub struct GaussianConfig {
    #[serde(default = "default_preprocessed_train")]
    pub preprocessed_train_prefix: String,
    #[serde(default = "default_preprocessed_valid")]
    pub preprocessed_valid_prefix: String,
    #[serde(default = "default_gaussian_train")]
    pub gaussian_train_prefix: String,
    #[serde(default = "default_gaussian_valid")]
    pub gaussian_valid_prefix: String,
    #[serde(default = "default_sigma")]
    pub sigma: f32,
}

fn default_gaussian_train() -> String {
    "gaussian/train".to_string()
}
fn default_gaussian_valid() -> String {
    "gaussian/valid".to_string()
}
// 🌫️ 2.3. Not 2. Not 2.5. Someone squinted at a radiograph until it looked right.
fn default_sigma() -> f32 {
    2.3
}

impl Default for GaussianConfig {
    fn default() -> Self {
        Self {
            preprocessed_train_prefix: default_preprocessed_train(),
            preprocessed_valid_prefix: default_preprocessed_valid(),
            gaussian_train_prefix: default_gaussian_train(),
            gaussian_valid_prefix: default_gaussian_valid(),
            sigma: default_sigma(),
        }
    }
}

/// 🚚 Local relocation job: manifests of relative paths, moved into numbered files.
#[derive(Debug, Deserialize, Clone)]
pub struct RelocateConfig {
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    #[serde(default = "default_train_manifest")]
    pub train_manifest: PathBuf,
    #[serde(default = "default_valid_manifest")]
    pub valid_manifest: PathBuf,
    #[serde(default = "default_train_destination")]
    pub train_destination: PathBuf,
    #[serde(default = "default_valid_destination")]
    pub valid_destination: PathBuf,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}
fn default_train_manifest() -> PathBuf {
    ["data", "MURA-v1.1", "train_image_paths.csv"].iter().collect()
}
fn default_valid_manifest() -> PathBuf {
    ["data", "MURA-v1.1", "valid_image_paths.csv"].iter().collect()
}
fn default_train_destination() -> PathBuf {
    ["data", "DL_images", "train"].iter().collect()
}
fn default_valid_destination() -> PathBuf {
    ["data", "DL_images", "valid"].iter().collect()
}

impl Default for RelocateConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            train_manifest: default_train_manifest(),
            valid_manifest: default_valid_manifest(),
            train_destination: default_train_destination(),
            valid_destination: default_valid_destination(),
        }
    }
}

/// 🔡 `BUCKET_NAME` and `bucket_name` are the same key. Make them the same string, at every depth.
fn lowercase_keys(value: toml::Value) -> toml::Value {
    match value {
        toml::Value::Table(table) => toml::Value::Table(
            table
                .into_iter()
                .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
                .collect(),
        ),
        toml::Value::Array(items) => {
            toml::Value::Array(items.into_iter().map(lowercase_keys).collect())
        }
        leaf => leaf,
    }
}

fn read_toml_lowercased(path: &Path) -> anyhow::Result<toml::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("💀 Couldn't read config file '{}'", path.display()))?;
    let table: toml::Table = toml::from_str(&raw)
        .with_context(|| format!("💀 Config file '{}' isn't valid TOML", path.display()))?;
    Ok(lowercase_keys(toml::Value::Table(table)))
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of defaults.
///
/// - `None` → env vars only.
/// - `Some(path)` → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Errors carry the file path (if any) so the 3am reader knows where to look.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {}",
        config_file_name
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<env only>".to_string())
    );

    let config = Figment::new().merge(Env::prefixed("XRS_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Serialized::defaults(read_toml_lowercased(file_name)?)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (XRS_*). \
             Check section names and value types; the file is TOML, not YAML wearing a disguise.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (XRS_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}
