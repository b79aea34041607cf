//! Artifactory REST client: storage-API listings, downloads, and
//! checksum-deploy uploads, all through one shared connection pool.

use std::path::Path;

use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::checksum::ChecksumSet;
use crate::config::Credentials;
use crate::error::MirrorError;

/// One child entry in a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildEntry {
    /// Relative URI with a leading slash, e.g. `/sub` or `/a.txt`.
    pub uri: String,
    #[serde(default)]
    pub folder: bool,
}

/// Storage-API response for a folder path. The API also returns repo name
/// and modification timestamps; the walk does not use them.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub children: Vec<ChildEntry>,
}

/// Checksums the server reports for a stored file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteChecksums {
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub md5: String,
}

/// Storage-API response for a file path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoResponse {
    pub download_uri: String,
    #[serde(default)]
    pub checksums: RemoteChecksums,
}

/// HTTP client for one Artifactory server.
///
/// Constructed once per server and shared; every request carries basic auth
/// and the configured timeout.
pub struct ArtifactoryClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl ArtifactoryClient {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeout: std::time::Duration,
    ) -> Result<Self, MirrorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::Http {
                path: base_url.to_string(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Joins `path` onto the base URL, percent-encoding each segment.
    fn url_for(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}/{}", self.base_url, encoded.join("/"))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    async fn get_body(&self, path: &str) -> Result<String, MirrorError> {
        let url = self.url_for(path);
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| MirrorError::Http {
                path: path.to_string(),
                source: e,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MirrorError::Transfer {
                path: path.to_string(),
                status,
            });
        }
        resp.text().await.map_err(|e| MirrorError::Http {
            path: path.to_string(),
            source: e,
        })
    }

    /// Fetches the directory listing for a folder path.
    pub async fn list(&self, path: &str) -> Result<ListingResponse, MirrorError> {
        let body = self.get_body(path).await?;
        serde_json::from_str(&body).map_err(|e| MirrorError::RemoteList {
            path: path.to_string(),
            source: e,
        })
    }

    /// Fetches download URI and checksums for a file path.
    pub async fn file_info(&self, path: &str) -> Result<FileInfoResponse, MirrorError> {
        let body = self.get_body(path).await?;
        serde_json::from_str(&body).map_err(|e| MirrorError::RemoteList {
            path: path.to_string(),
            source: e,
        })
    }

    /// Streams `download_uri` (an absolute URL from a file-info response)
    /// into the file at `dest`. Returns the number of bytes written.
    pub async fn download_to(
        &self,
        download_uri: &str,
        dest: &Path,
    ) -> Result<u64, MirrorError> {
        let resp = self
            .authed(self.http.get(download_uri))
            .send()
            .await
            .map_err(|e| MirrorError::Http {
                path: download_uri.to_string(),
                source: e,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MirrorError::Transfer {
                path: download_uri.to_string(),
                status,
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| MirrorError::file_access(dest, e))?;
        let mut written = 0u64;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MirrorError::Http {
                path: download_uri.to_string(),
                source: e,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| MirrorError::file_access(dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| MirrorError::file_access(dest, e))?;
        debug!("downloaded {} ({} bytes)", dest.display(), written);
        Ok(written)
    }

    /// Checksum-existence probe: a bodyless PUT with `X-Checksum-Deploy: true`.
    ///
    /// A success status means the server already holds the content and has
    /// linked it at `path`; 404 means the bytes must be transferred.
    pub async fn probe(
        &self,
        path: &str,
        checksums: &ChecksumSet,
    ) -> Result<StatusCode, MirrorError> {
        let url = self.url_for(path);
        let resp = self
            .checksum_headers(self.authed(self.http.put(&url)), checksums)
            .header("X-Checksum-Deploy", "true")
            .send()
            .await
            .map_err(|e| MirrorError::Http {
                path: path.to_string(),
                source: e,
            })?;
        Ok(resp.status())
    }

    /// Real byte upload: PUT with the file contents streamed as the body
    /// and `X-Checksum-Deploy: false`. Returns the number of bytes sent.
    pub async fn upload(
        &self,
        local: &Path,
        path: &str,
        checksums: &ChecksumSet,
    ) -> Result<u64, MirrorError> {
        let size = tokio::fs::metadata(local)
            .await
            .map_err(|e| MirrorError::file_access(local, e))?
            .len();
        let file = tokio::fs::File::open(local)
            .await
            .map_err(|e| MirrorError::file_access(local, e))?;
        let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));

        let url = self.url_for(path);
        let resp = self
            .checksum_headers(self.authed(self.http.put(&url)), checksums)
            .header("X-Checksum-Deploy", "false")
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .map_err(|e| MirrorError::Http {
                path: path.to_string(),
                source: e,
            })?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            // Surface the server's explanation; the caller records the failure.
            let body = resp.text().await.unwrap_or_default();
            warn!("upload of '{}' rejected with {}: {}", path, status, body);
            return Err(MirrorError::Transfer {
                path: path.to_string(),
                status,
            });
        }
        Ok(size)
    }

    fn checksum_headers(
        &self,
        builder: reqwest::RequestBuilder,
        checksums: &ChecksumSet,
    ) -> reqwest::RequestBuilder {
        builder
            .header("X-Checksum-Md5", &checksums.md5)
            .header("X-Checksum-Sha1", &checksums.sha1)
            .header("X-Checksum-Sha256", &checksums.sha256)
    }
}
