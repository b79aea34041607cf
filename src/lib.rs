pub mod checksum;
pub mod config;
pub mod core;
pub mod error;
pub mod remote;

pub use config::{Credentials, MirrorConfig};
pub use core::{Downloader, MirrorReport, Uploader};
pub use error::MirrorError;
pub use remote::ArtifactoryClient;
