pub mod downloader;
pub mod report;
pub mod uploader;

pub use downloader::Downloader;
pub use report::MirrorReport;
pub use uploader::Uploader;
