use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use artmirror::core::{Downloader, MirrorReport, Uploader};
use artmirror::{ArtifactoryClient, Credentials, MirrorConfig};

#[derive(Parser)]
#[command(
    name = "artmirror",
    version,
    about = "Mirror artifact repositories between two Artifactory servers"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "mirror.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mirror remote repositories down to the local disk
    Download {
        /// Repository names; defaults to source.repositories from the config
        repositories: Vec<String>,
    },
    /// Mirror local folders up to the target server
    Upload {
        /// Folder paths; defaults to target.folders from the config
        folders: Vec<String>,
    },
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = MirrorConfig::load(&cli.config)?;
    let credentials = Credentials::from_env()?;
    let timeout = config.request_timeout();

    let report = match cli.command {
        Command::Download { repositories } => {
            let repositories = if repositories.is_empty() {
                config.source.repositories.clone()
            } else {
                repositories
            };
            anyhow::ensure!(
                !repositories.is_empty(),
                "no repositories given on the command line or in the config"
            );

            let client = Arc::new(ArtifactoryClient::new(
                &config.source.base_url,
                credentials,
                timeout,
            )?);
            let downloader = Downloader::new(client, config.source.dest_root.clone());

            let mut combined = MirrorReport::default();
            for repo in &repositories {
                combined.merge(downloader.mirror_down(repo).await);
            }
            combined
        }
        Command::Upload { folders } => {
            let folders = if folders.is_empty() {
                config.target.folders.clone()
            } else {
                folders
            };
            anyhow::ensure!(
                !folders.is_empty(),
                "no folders given on the command line or in the config"
            );
            let folders: Vec<PathBuf> = folders.into_iter().map(PathBuf::from).collect();

            let client = Arc::new(ArtifactoryClient::new(
                &config.target.upload_url(),
                credentials,
                timeout,
            )?);
            let uploader = Uploader::new(client, config.max_concurrent_uploads);
            uploader.mirror_up_many(&folders).await?
        }
    };

    print!("{report}");
    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
