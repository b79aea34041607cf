//! Run configuration: servers, repository lists, credentials.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_uploads() -> usize {
    4
}

fn default_dest_root() -> PathBuf {
    PathBuf::from(".")
}

/// Top-level configuration, loaded from a JSON file.
///
/// Repository and folder lists live here rather than in the binary so a run
/// can be re-scoped without a rebuild.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    pub source: SourceConfig,
    pub target: TargetConfig,
    /// Deadline applied to every outbound request, downloads and uploads alike.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on concurrent upload workers (one worker per folder).
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,
}

/// The legacy server we mirror down from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Storage-API root, e.g. `http://legacy:8081/artifactory/api/storage`.
    pub base_url: String,
    /// Repository names to walk; may be overridden on the command line.
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Local directory the mirrored trees are written under.
    #[serde(default = "default_dest_root")]
    pub dest_root: PathBuf,
}

/// The new server we mirror up to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Server root, e.g. `https://artifactory.example.com/artifactory`.
    pub base_url: String,
    /// Repository the uploads land in.
    pub repository: String,
    /// Local folders to walk; may be overridden on the command line.
    #[serde(default)]
    pub folders: Vec<String>,
}

impl MirrorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TargetConfig {
    /// Upload root: server base joined with the target repository.
    pub fn upload_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.repository)
    }
}

/// Basic-auth credentials sent with every outbound request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Reads credentials from the environment. A missing variable is a
    /// configuration error; we never fall back to unauthenticated requests.
    pub fn from_env() -> anyhow::Result<Self> {
        let username = env::var("ARTIFACTORY_USER")
            .context("environment variable ARTIFACTORY_USER is not set")?;
        let password = env::var("ARTIFACTORY_PASSWORD")
            .context("environment variable ARTIFACTORY_PASSWORD is not set")?;
        Ok(Self { username, password })
    }
}
