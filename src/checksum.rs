//! File digests used as content-equality checks, not for security.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::MirrorError;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Checksum algorithms understood by the Artifactory API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
        }
    }
}

impl FromStr for Algorithm {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" => Ok(Algorithm::Sha1),
            "sha256" => Ok(Algorithm::Sha256),
            other => Err(MirrorError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Streams the file at `path` through the chosen hash function.
///
/// Reads in fixed-size chunks, so the working set is bounded regardless of
/// file size. Output is lowercase hex.
pub fn digest(path: &Path, algorithm: Algorithm) -> Result<String, MirrorError> {
    match algorithm {
        Algorithm::Md5 => hash_file::<Md5>(path),
        Algorithm::Sha1 => hash_file::<Sha1>(path),
        Algorithm::Sha256 => hash_file::<Sha256>(path),
    }
}

/// Like [`digest`], but by algorithm name. Any name outside md5/sha1/sha256
/// fails with [`MirrorError::UnknownAlgorithm`] before touching the file.
pub fn digest_by_name(path: &Path, algorithm: &str) -> Result<String, MirrorError> {
    digest(path, algorithm.parse()?)
}

/// Async wrapper that hashes on the blocking pool.
pub async fn digest_async(path: &Path, algorithm: Algorithm) -> Result<String, MirrorError> {
    let owned = path.to_path_buf();
    let report_path: PathBuf = owned.clone();
    match tokio::task::spawn_blocking(move || digest(&owned, algorithm)).await {
        Ok(result) => result,
        Err(join) => Err(MirrorError::file_access(
            report_path,
            std::io::Error::other(join),
        )),
    }
}

fn hash_file<D: Digest>(path: &Path) -> Result<String, MirrorError> {
    let mut file =
        File::open(path).map_err(|e| MirrorError::file_access(path, e))?;
    let mut hasher = D::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| MirrorError::file_access(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// All three digests Artifactory's checksum-deploy protocol wants.
#[derive(Debug, Clone)]
pub struct ChecksumSet {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

impl ChecksumSet {
    /// Computes all three digests in a single pass over the file.
    pub fn compute(path: &Path) -> Result<Self, MirrorError> {
        let mut file =
            File::open(path).map_err(|e| MirrorError::file_access(path, e))?;
        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| MirrorError::file_access(path, e))?;
            if n == 0 {
                break;
            }
            md5.update(&buf[..n]);
            sha1.update(&buf[..n]);
            sha256.update(&buf[..n]);
        }
        Ok(Self {
            md5: hex::encode(md5.finalize()),
            sha1: hex::encode(sha1.finalize()),
            sha256: hex::encode(sha256.finalize()),
        })
    }

    /// Async wrapper that computes on the blocking pool.
    pub async fn compute_async(path: &Path) -> Result<Self, MirrorError> {
        let owned = path.to_path_buf();
        let report_path: PathBuf = owned.clone();
        match tokio::task::spawn_blocking(move || Self::compute(&owned)).await {
            Ok(result) => result,
            Err(join) => Err(MirrorError::file_access(
                report_path,
                std::io::Error::other(join),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn known_vectors() {
        let f = temp_file(b"hello world");
        assert_eq!(
            digest(f.path(), Algorithm::Md5).unwrap(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        assert_eq!(
            digest(f.path(), Algorithm::Sha1).unwrap(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        assert_eq!(
            digest(f.path(), Algorithm::Sha256).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn deterministic_and_content_sensitive() {
        let a = temp_file(b"same bytes");
        let b = temp_file(b"same bytes");
        let c = temp_file(b"other bytes");

        let first = digest(a.path(), Algorithm::Md5).unwrap();
        let second = digest(a.path(), Algorithm::Md5).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, digest(b.path(), Algorithm::Md5).unwrap());
        assert_ne!(first, digest(c.path(), Algorithm::Md5).unwrap());
    }

    #[test]
    fn streams_files_larger_than_one_chunk() {
        // Three full read buffers plus a tail.
        let content = vec![0xabu8; READ_BUF_SIZE * 3 + 17];
        let f = temp_file(&content);
        let streamed = digest(f.path(), Algorithm::Sha256).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(&content);
        assert_eq!(streamed, hex::encode(hasher.finalize()));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let f = temp_file(b"irrelevant");
        let err = digest_by_name(f.path(), "crc32").unwrap_err();
        assert!(matches!(err, MirrorError::UnknownAlgorithm(name) if name == "crc32"));
    }

    #[test]
    fn missing_file_is_file_access_error() {
        let err = digest(Path::new("/nonexistent/artmirror-test"), Algorithm::Md5).unwrap_err();
        assert!(matches!(err, MirrorError::FileAccess { .. }));
    }

    #[test]
    fn checksum_set_matches_individual_digests() {
        let f = temp_file(b"hello world");
        let set = ChecksumSet::compute(f.path()).unwrap();
        assert_eq!(set.md5, digest(f.path(), Algorithm::Md5).unwrap());
        assert_eq!(set.sha1, digest(f.path(), Algorithm::Sha1).unwrap());
        assert_eq!(set.sha256, digest(f.path(), Algorithm::Sha256).unwrap());
    }
}
