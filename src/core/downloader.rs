//! Depth-first mirror of a remote repository tree onto local disk.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::checksum::{self, Algorithm};
use crate::core::report::MirrorReport;
use crate::error::MirrorError;
use crate::remote::ArtifactoryClient;

/// Walks a remote tree and converges the local copy toward it.
///
/// A file is in sync iff its local MD5 matches the server-reported one;
/// a missing local file is out of sync by definition. Per-entry failures
/// are recorded and the walk moves on to the next sibling.
pub struct Downloader {
    client: Arc<ArtifactoryClient>,
    dest_root: PathBuf,
}

impl Downloader {
    pub fn new(client: Arc<ArtifactoryClient>, dest_root: PathBuf) -> Self {
        Self { client, dest_root }
    }

    /// Mirrors the subtree rooted at `repo` (a repository name or any
    /// folder path inside one). Running twice over an unchanged remote
    /// performs zero transfers on the second run.
    pub async fn mirror_down(&self, repo: &str) -> MirrorReport {
        info!("mirroring '{}' to {}", repo, self.dest_root.display());
        self.walk(repo.to_string()).await
    }

    // Recursive async needs the boxed indirection.
    fn walk<'a>(
        &'a self,
        path: String,
    ) -> Pin<Box<dyn Future<Output = MirrorReport> + Send + 'a>> {
        Box::pin(async move {
            let mut report = MirrorReport::default();

            let listing = match self.client.list(&path).await {
                Ok(listing) => listing,
                Err(err) => {
                    warn!("listing '{}' failed: {}", path, err);
                    report.record_failure(&path, &err);
                    return report;
                }
            };

            for child in listing.children {
                let child_path = format!("{}{}", path, child.uri);
                if child.folder {
                    report.merge(self.walk(child_path).await);
                } else {
                    self.sync_file(&child_path, &mut report).await;
                }
            }
            report
        })
    }

    /// Brings one remote file into sync: download when absent, re-download
    /// when the local MD5 disagrees, skip when it matches.
    async fn sync_file(&self, path: &str, report: &mut MirrorReport) {
        let dest = self.dest_root.join(path.trim_start_matches('/'));

        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                let err = MirrorError::file_access(parent, e);
                warn!("cannot create '{}': {}", parent.display(), err);
                report.record_failure(path, &err);
                return;
            }
        }

        let info = match self.client.file_info(path).await {
            Ok(info) => info,
            Err(err) => {
                warn!("file info for '{}' failed: {}", path, err);
                report.record_failure(path, &err);
                return;
            }
        };

        let exists = tokio::fs::try_exists(&dest).await.unwrap_or(false);
        if exists {
            let local_md5 = match checksum::digest_async(&dest, Algorithm::Md5).await {
                Ok(digest) => digest,
                Err(err) => {
                    warn!("checksum of '{}' failed: {}", dest.display(), err);
                    report.record_failure(path, &err);
                    return;
                }
            };
            if local_md5 == info.checksums.md5 {
                debug!("'{}' up to date, skipping", path);
                report.record_skip();
                return;
            }
            info!("checksum mismatch for '{}', re-downloading", path);
        } else {
            info!("downloading '{}'", path);
        }

        match self.client.download_to(&info.download_uri, &dest).await {
            Ok(bytes) => report.record_transfer(bytes),
            Err(err) => {
                warn!("download of '{}' failed: {}", path, err);
                report.record_failure(path, &err);
            }
        }
    }
}
