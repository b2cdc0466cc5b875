//! Upload statistics listener
//!
//! A [`ProgressListener`] that keeps throughput bookkeeping for the file
//! currently uploading, suitable for a UI poll loop. Purely observational:
//! dropping or ignoring it never affects upload correctness.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use objsync_core::domain::UploadId;
use objsync_core::ports::ProgressListener;

const BYTES_PER_MEBIBYTE: f64 = (1024 * 1024) as f64;

/// Snapshot of the in-flight upload's progress.
#[derive(Debug, Clone)]
pub struct FileUploadStat {
    total_size: u64,
    uploaded_size: u64,
    transferred: u64,
    started_at: Instant,
}

impl FileUploadStat {
    fn new(total_size: u64, already_uploaded: u64) -> Self {
        Self {
            total_size,
            uploaded_size: already_uploaded,
            transferred: 0,
            started_at: Instant::now(),
        }
    }

    /// Local file size when the upload started.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Bytes acknowledged remotely, including previous passes.
    #[must_use]
    pub fn uploaded_size(&self) -> u64 {
        self.uploaded_size
    }

    /// Fraction of the file acknowledged remotely, in `0.0..=1.0`.
    #[must_use]
    pub fn upload_ratio(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        self.uploaded_size as f64 / self.total_size as f64
    }

    /// Throughput of this pass in MiB/s.
    #[must_use]
    pub fn megabytes_per_second(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.transferred as f64 / BYTES_PER_MEBIBYTE / elapsed
    }

    fn record(&mut self, bytes: u64) {
        self.uploaded_size += bytes;
        self.transferred += bytes;
    }
}

/// Listener tracking the upload currently in flight.
#[derive(Debug, Default)]
pub struct UploadStatsListener {
    current: Mutex<Option<FileUploadStat>>,
}

impl UploadStatsListener {
    /// Create an idle listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True between `upload_started` and `upload_finished`.
    #[must_use]
    pub fn is_currently_uploading(&self) -> bool {
        self.current.lock().expect("stats lock poisoned").is_some()
    }

    /// Snapshot of the in-flight upload, if any.
    #[must_use]
    pub fn current_stats(&self) -> Option<FileUploadStat> {
        self.current.lock().expect("stats lock poisoned").clone()
    }
}

impl ProgressListener for UploadStatsListener {
    fn upload_started(&self, file: &Path, _upload_id: &UploadId, bytes_already_uploaded: u64) {
        let total_size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        *self.current.lock().expect("stats lock poisoned") =
            Some(FileUploadStat::new(total_size, bytes_already_uploaded));
    }

    fn upload_progress(&self, _upload_id: &UploadId, bytes_transferred: u64) {
        if let Some(stat) = self.current.lock().expect("stats lock poisoned").as_mut() {
            stat.record(bytes_transferred);
        }
    }

    fn upload_finished(&self, _file: &Path) {
        *self.current.lock().expect("stats lock poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use objsync_core::domain::UploadId;

    fn fixture_file(size: usize) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.bin");
        std::fs::write(&path, vec![0u8; size]).unwrap();
        (dir, path)
    }

    #[test]
    fn idle_listener_reports_not_uploading() {
        let listener = UploadStatsListener::new();
        assert!(!listener.is_currently_uploading());
        assert!(listener.current_stats().is_none());
    }

    #[test]
    fn started_upload_is_tracked_until_finished() {
        let (_dir, path) = fixture_file(1_000_000);
        let listener = UploadStatsListener::new();
        let upload_id = UploadId::new("mpu-1").unwrap();

        listener.upload_started(&path, &upload_id, 0);
        assert!(listener.is_currently_uploading());

        let stat = listener.current_stats().unwrap();
        assert_eq!(stat.total_size(), 1_000_000);
        assert_eq!(stat.uploaded_size(), 0);

        listener.upload_progress(&upload_id, 500_000);
        let stat = listener.current_stats().unwrap();
        assert_eq!(stat.uploaded_size(), 500_000);
        assert!((stat.upload_ratio() - 0.5).abs() < 0.001);

        listener.upload_finished(&path);
        assert!(!listener.is_currently_uploading());
    }

    #[test]
    fn resumed_upload_counts_confirmed_bytes_in_ratio() {
        let (_dir, path) = fixture_file(1_000_000);
        let listener = UploadStatsListener::new();
        let upload_id = UploadId::new("mpu-1").unwrap();

        listener.upload_started(&path, &upload_id, 250_000);
        let stat = listener.current_stats().unwrap();
        assert_eq!(stat.uploaded_size(), 250_000);
        assert!((stat.upload_ratio() - 0.25).abs() < 0.001);
    }

    #[test]
    fn throughput_is_zero_until_bytes_move() {
        let (_dir, path) = fixture_file(1_000_000);
        let listener = UploadStatsListener::new();
        let upload_id = UploadId::new("mpu-1").unwrap();

        listener.upload_started(&path, &upload_id, 0);
        let stat = listener.current_stats().unwrap();
        assert_eq!(stat.megabytes_per_second(), 0.0);

        std::thread::sleep(std::time::Duration::from_millis(50));
        listener.upload_progress(&upload_id, 500_000);
        let stat = listener.current_stats().unwrap();
        assert!(stat.megabytes_per_second() > 0.0);
    }
}
