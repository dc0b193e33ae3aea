//! 🚀 xrs — the front door, the bouncer, the maitre d' of the X-ray shuttle.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Thin CLI wrapper: parse args, set up logging, load config, hand off to `xrs::run`,
//! print the reports. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🩻 List, normalize, blur and relocate X-ray images.
#[derive(Debug, Parser)]
#[command(name = "xrs", version, about)]
struct Cli {
    /// 🔧 TOML config file. If it doesn't exist, XRS_* env vars alone are used.
    #[arg(short, long, default_value = "xrs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 📐 Normalize the raw train/valid splits into 400x512 PNGs.
    Preprocess,
    /// 🌫️ Blur the preprocessed splits into `_blured` copies.
    Augment,
    /// 🚚 Move manifest-listed files on local disk into numbered folders.
    Relocate,
}

impl From<Command> for xrs::Job {
    fn from(command: Command) -> Self {
        match command {
            Command::Preprocess => xrs::Job::Preprocess,
            Command::Augment => xrs::Job::Augment,
            Command::Relocate => xrs::Job::Relocate,
        }
    }
}

/// 🕵️ Sniff the cause chain for the usual "it's not you, it's the network/credentials" suspects.
fn smells_like_access_trouble(cause: &str) -> bool {
    [
        "dispatch failure",
        "error sending request",
        "connection refused",
        "Connection refused",
        "dns error",
        "credentials",
        "AccessDenied",
        "ExpiredToken",
        "NoSuchBucket",
    ]
    .iter()
    .any(|needle| cause.contains(needle))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 📡 RUST_LOG wins; otherwise info. println! debugging is a lifestyle we're moving past.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // 🔒 A missing config file is fine (env only). An unreadable path is not.
    let config_file = cli
        .config
        .try_exists()
        .with_context(|| {
            format!(
                "💀 Couldn't check whether the config file exists at '{}'. \
                 If it's a relative path, check the working directory, or use an absolute path.",
                cli.config.display()
            )
        })?
        .then_some(cli.config.as_path());

    let app_config = xrs::app_config::load_config(config_file)
        .context("💀 In xrs, main, we couldn't load the configuration. Take a look at the file and the XRS_* env vars.")?;

    match xrs::run(app_config, cli.command.into()).await {
        Ok(reports) => {
            println!("{}", xrs::progress::render_reports(&reports));
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            if let Some(pipeline_error) = err.downcast_ref::<xrs::error::PipelineError>() {
                error!("🔑 stopped at: {}", pipeline_error.subject());
            }
            // -- 🧅 peel the onion of sadness, one layer at a time
            let mut the_vibes_are_giving_access_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                if smells_like_access_trouble(&cause.to_string()) {
                    the_vibes_are_giving_access_issues = true;
                }
            }
            if the_vibes_are_giving_access_issues {
                error!(
                    "🔧 hint: looks like the object store isn't reachable or won't let us in. \
                     Check [aws_config] PROFILE_NAME and BUCKET_NAME, that the profile's \
                     credentials haven't expired (`aws sts get-caller-identity --profile ...`), \
                     and, for S3-compatible stores, [store] endpoint_url. ☕"
                );
            }
            std::process::exit(1);
        }
    }
}
