//! Per-run outcome accounting.

use crate::error::MirrorError;

/// Tally of what a mirroring run did, merged across workers and surfaced
/// once at the end instead of scattered through the log.
#[derive(Debug, Default, Clone)]
pub struct MirrorReport {
    pub files_transferred: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub bytes_transferred: u64,
    /// One `path: reason` line per recorded failure.
    pub failures: Vec<String>,
}

impl MirrorReport {
    pub fn record_transfer(&mut self, bytes: u64) {
        self.files_transferred += 1;
        self.bytes_transferred += bytes;
    }

    pub fn record_skip(&mut self) {
        self.files_skipped += 1;
    }

    pub fn record_failure(&mut self, path: &str, err: &MirrorError) {
        self.files_failed += 1;
        self.failures.push(format!("{path}: {err}"));
    }

    pub fn merge(&mut self, other: MirrorReport) {
        self.files_transferred += other.files_transferred;
        self.files_skipped += other.files_skipped;
        self.files_failed += other.files_failed;
        self.bytes_transferred += other.bytes_transferred;
        self.failures.extend(other.failures);
    }

    /// True iff anything went wrong; drives the process exit status.
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }
}

impl std::fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} transferred ({} bytes), {} skipped, {} failed",
            self.files_transferred, self.bytes_transferred, self.files_skipped, self.files_failed
        )?;
        for failure in &self.failures {
            writeln!(f, "  failed: {failure}")?;
        }
        Ok(())
    }
}
