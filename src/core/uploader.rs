//! Mirror of a local folder tree into a remote repository, deduplicated
//! by checksum-deploy probes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::checksum::ChecksumSet;
use crate::core::report::MirrorReport;
use crate::error::MirrorError;
use crate::remote::ArtifactoryClient;

/// Walks local folders and uploads files the target server does not
/// already hold. Addressing is path-based; only the existence check is
/// hash-based, so identical content at two paths is probed twice.
pub struct Uploader {
    client: Arc<ArtifactoryClient>,
    max_concurrent: usize,
}

impl Uploader {
    pub fn new(client: Arc<ArtifactoryClient>, max_concurrent: usize) -> Self {
        Self {
            client,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Mirrors one folder, sequentially. Directories are traversed but not
    /// themselves uploaded; per-file failures are recorded and the walk
    /// continues.
    pub async fn mirror_up(&self, root: &Path) -> MirrorReport {
        info!("uploading folder '{}'", root.display());
        let mut report = MirrorReport::default();

        let (files, walk_errors) = match collect_files(root).await {
            Ok(collected) => collected,
            Err(err) => {
                warn!("walking '{}' failed: {}", root.display(), err);
                report.record_failure(&root.display().to_string(), &err);
                return report;
            }
        };
        // An unreachable root or subdirectory must flip the exit status,
        // not vanish from the tally.
        for err in walk_errors {
            warn!("walking '{}': {}", root.display(), err);
            let failed_path = match &err {
                MirrorError::FileAccess { path, .. } => path.display().to_string(),
                _ => root.display().to_string(),
            };
            report.record_failure(&failed_path, &err);
        }

        // Remote paths keep the folder name: strip only the part of the
        // local path above the mirrored root.
        let prefix = root.parent().map(Path::to_path_buf).unwrap_or_default();
        for file in files {
            let remote_path = match remote_path_for(&file, &prefix) {
                Ok(path) => path,
                Err(err) => {
                    warn!("skipping '{}': {}", file.display(), err);
                    report.record_failure(&file.display().to_string(), &err);
                    continue;
                }
            };
            self.sync_file(&file, &remote_path, &mut report).await;
        }
        report
    }

    /// Mirrors several folders with one worker per folder, bounded by a
    /// semaphore. Workers share no state except the merged report, so the
    /// folders are required to be disjoint path prefixes.
    pub async fn mirror_up_many(&self, folders: &[PathBuf]) -> anyhow::Result<MirrorReport> {
        ensure_disjoint(folders)?;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::new();

        for folder in folders {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("upload semaphore closed")?;
            let worker = Uploader::new(self.client.clone(), 1);
            let folder = folder.clone();

            handles.push(tokio::spawn(async move {
                let report = worker.mirror_up(&folder).await;
                drop(permit);
                report
            }));
        }

        let mut combined = MirrorReport::default();
        for handle in handles {
            match handle.await {
                Ok(report) => combined.merge(report),
                Err(e) => {
                    warn!("upload worker panicked: {}", e);
                    combined.files_failed += 1;
                    combined.failures.push(format!("worker: {e}"));
                }
            }
        }
        Ok(combined)
    }

    async fn sync_file(&self, local: &Path, remote_path: &str, report: &mut MirrorReport) {
        let checksums = match ChecksumSet::compute_async(local).await {
            Ok(set) => set,
            Err(err) => {
                warn!("checksum of '{}' failed: {}", local.display(), err);
                report.record_failure(remote_path, &err);
                return;
            }
        };

        let should_upload = match self.client.probe(remote_path, &checksums).await {
            Ok(status) if status.is_success() => {
                debug!("'{}' already present, skipping", remote_path);
                false
            }
            Ok(status) if status == StatusCode::NOT_FOUND => true,
            Ok(status) => {
                // Unverified either way; prefer a redundant transfer over
                // silently leaving the file behind.
                warn!(
                    "probe for '{}' returned {}, uploading anyway",
                    remote_path, status
                );
                true
            }
            Err(err) => {
                warn!("probe for '{}' failed ({}), uploading anyway", remote_path, err);
                true
            }
        };

        if !should_upload {
            report.record_skip();
            return;
        }

        info!("uploading '{}'", remote_path);
        match self.client.upload(local, remote_path, &checksums).await {
            Ok(bytes) => report.record_transfer(bytes),
            Err(err) => {
                warn!("upload of '{}' failed: {}", remote_path, err);
                report.record_failure(remote_path, &err);
            }
        }
    }
}

/// Collects every regular file under `root` on the blocking pool.
///
/// Walk errors (unreadable directory, vanished entry, nonexistent root)
/// are returned alongside the files so the caller can record each one.
async fn collect_files(root: &Path) -> Result<(Vec<PathBuf>, Vec<MirrorError>), MirrorError> {
    let owned = root.to_path_buf();
    let report_path = owned.clone();
    match tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        let mut errors = Vec::new();
        for entry in WalkDir::new(&owned).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| owned.clone());
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    errors.push(MirrorError::file_access(path, source));
                }
            }
        }
        (files, errors)
    })
    .await
    {
        Ok(collected) => Ok(collected),
        Err(join) => Err(MirrorError::file_access(
            report_path,
            std::io::Error::other(join),
        )),
    }
}

/// Remote path for a local file: relative to `prefix`, `/`-separated.
/// Non-UTF-8 names are refused rather than uploaded under a mangled path.
fn remote_path_for(file: &Path, prefix: &Path) -> Result<String, MirrorError> {
    let relative = file.strip_prefix(prefix).unwrap_or(file);
    let mut segments = Vec::new();
    for component in relative.components() {
        match component.as_os_str().to_str() {
            Some(segment) => segments.push(segment.to_string()),
            None => {
                return Err(MirrorError::file_access(
                    file,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "file name is not valid UTF-8",
                    ),
                ))
            }
        }
    }
    Ok(segments.join("/"))
}

/// Concurrent workers must never touch overlapping paths; the skip/upload
/// check-then-act sequence is not atomic.
fn ensure_disjoint(folders: &[PathBuf]) -> anyhow::Result<()> {
    for (i, a) in folders.iter().enumerate() {
        for b in &folders[i + 1..] {
            if a.starts_with(b) || b.starts_with(a) {
                anyhow::bail!(
                    "upload folders must be disjoint: '{}' overlaps '{}'",
                    a.display(),
                    b.display()
                );
            }
        }
    }
    Ok(())
}
