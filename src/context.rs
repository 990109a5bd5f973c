//! Per-job context and progress counters.

use std::time::Instant;

use log::info;

/// Identity and start time of one parse job.
///
/// Passed to the pipeline constructor; every counter derived from it lives and dies with
/// the job.
#[derive(Debug, Clone)]
pub struct JobContext {
    name: String,
    started: Instant,
    progress_interval: u64,
}

impl JobContext {
    pub fn new<S: Into<String>>(name: S) -> JobContext {
        JobContext {
            name: name.into(),
            started: Instant::now(),
            progress_interval: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub(crate) fn with_progress_interval(mut self, interval: u64) -> JobContext {
        self.progress_interval = interval;
        self
    }

    /// Creates a counter for one side of the job (e.g. `"parsed"` or `"written"`).
    pub fn progress(&self, side: &'static str) -> Progress {
        Progress {
            job: self.name.clone(),
            side,
            started: self.started,
            interval: self.progress_interval,
            count: 0,
        }
    }
}

/// Record counter that logs every `interval` records.
#[derive(Debug)]
pub struct Progress {
    job: String,
    side: &'static str,
    started: Instant,
    interval: u64,
    count: u64,
}

impl Progress {
    pub fn add(&mut self, n: u64) {
        let before = self.count;
        self.count += n;
        if self.interval > 0 && before / self.interval != self.count / self.interval {
            self.log();
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Logs the current count with the rate since the job started.
    pub fn log(&self) {
        let elapsed_secs = self.started.elapsed().as_secs_f64();
        let rate = if elapsed_secs > 0.0 {
            self.count as f64 / elapsed_secs
        } else {
            0.0
        };
        info!(
            "{}: {} {} records in {:.2} seconds (~{:.2} records/sec)",
            self.job, self.side, self.count, elapsed_secs, rate
        );
    }
}
