//! Typed error kinds shared by the mirroring components.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while mirroring a single entry.
///
/// These are recorded in the run report and never abort the walk; only
/// startup problems (config, credentials, client construction) are fatal.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The directory-listing or file-metadata response could not be parsed.
    #[error("unparsable listing for '{path}': {source}")]
    RemoteList {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The server answered a download or upload with a non-success status.
    #[error("transfer of '{path}' failed with status {status}")]
    Transfer {
        path: String,
        status: reqwest::StatusCode,
    },

    /// A local file or directory could not be read, created, or written.
    #[error("local I/O error on '{path}': {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A checksum algorithm name outside of md5/sha1/sha256.
    #[error("unknown checksum algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// Transport-level failure before any status code was received.
    #[error("request for '{path}' failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl MirrorError {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }
}
