use crate::job::status::JobStatus;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Receives job lifecycle events. Called from worker threads.
pub trait ProgressListener: Send + Sync {
    /// An input file was counted and its jobs are about to be dispatched.
    fn input_started(&self, _source: &Path, _spectra: usize) {}
    fn job_started(&self, _job: usize, _chunk: &Path) {}
    /// A spectrum-boundary marker was seen on the job's output.
    fn spectrum_done(&self, _job: usize) {}
    fn job_finished(&self, _job: usize, _status: &JobStatus) {}
}

pub struct NoProgress;

impl ProgressListener for NoProgress {}

/// Logs through `tracing`, with a progress line every 5% of the current input.
#[derive(Default)]
pub struct LogProgress {
    total: AtomicU64,
    done: AtomicU64,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }
}

impl ProgressListener for LogProgress {
    fn input_started(&self, source: &Path, spectra: usize) {
        self.total.store(spectra as u64, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        debug!(source = %source.display(), spectra, "input started");
    }

    fn job_started(&self, job: usize, chunk: &Path) {
        debug!(job, chunk = %chunk.display(), "job started");
    }

    fn spectrum_done(&self, _job: usize) {
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        let step = (total / 20).max(1);
        if n % step == 0 || n == total {
            info!("processed {n}/{total} spectra");
        }
    }

    fn job_finished(&self, job: usize, status: &JobStatus) {
        match status {
            JobStatus::Finished => debug!(job, "job finished"),
            JobStatus::Canceled => info!(job, "job canceled"),
            other => warn!(job, status = %other, "job did not finish"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_progress_counts_ticks_per_input() {
        let p = LogProgress::new();
        p.input_started(Path::new("a.mgf"), 3);
        for _ in 0..3 {
            p.spectrum_done(1);
        }
        assert_eq!(p.done(), 3);
        p.input_started(Path::new("b.mgf"), 40);
        p.spectrum_done(2);
        assert_eq!(p.done(), 1);
    }
}
