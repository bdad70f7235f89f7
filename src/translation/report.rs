/*!
 * Run-wide counters.
 *
 * A `RunReport` is created at the start of a pipeline run and shared by
 * every worker of that run. Recording is additive; reading a summary never
 * changes it.
 */

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};

use super::job::TranslationResult;

/// Snapshot of the counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Run-scoped identifier
    pub run_id: String,
    /// Jobs that reached a terminal state
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Remote calls made, retries included
    pub remote_calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub pairs_completed: u64,
    pub pairs_cancelled: u64,
    /// Artifacts the sink could not write
    pub write_failures: u64,
}

impl RunSummary {
    /// Human-readable multi-line summary
    pub fn describe(&self) -> String {
        format!(
            "Run {} summary:\n\
             Chunks attempted: {}\n\
             Chunks succeeded: {}\n\
             Chunks failed: {}\n\
             Remote calls: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Pairs completed: {}\n\
             Pairs cancelled: {}\n\
             Write failures: {}",
            self.run_id,
            self.attempted,
            self.succeeded,
            self.failed,
            self.remote_calls,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.pairs_completed,
            self.pairs_cancelled,
            self.write_failures
        )
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.write_failures > 0 || self.pairs_cancelled > 0
    }
}

/// Serializable report written at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReportFile {
    #[serde(flatten)]
    pub summary: RunSummary,
    /// RFC 3339 local start time
    pub started_at: String,
    pub elapsed_secs: f64,
}

/// Thread-safe counters for one pipeline run
#[derive(Debug)]
pub struct RunReport {
    counters: Mutex<RunSummary>,
    started: Instant,
    started_at: DateTime<Local>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            counters: Mutex::new(RunSummary {
                run_id: run_id.into(),
                ..RunSummary::default()
            }),
            started: Instant::now(),
            started_at: Local::now(),
        }
    }

    /// Count the outcome of one job
    pub fn record(&self, result: &TranslationResult) {
        let usage = result.usage();
        let mut counters = self.counters.lock();
        counters.attempted += 1;
        if result.is_success() {
            counters.succeeded += 1;
        } else {
            counters.failed += 1;
        }
        counters.remote_calls += result.attempts() as u64;
        counters.prompt_tokens += usage.prompt_tokens;
        counters.completion_tokens += usage.completion_tokens;
        counters.total_tokens += usage.total();
    }

    pub fn record_pair_completed(&self) {
        self.counters.lock().pairs_completed += 1;
    }

    pub fn record_pair_cancelled(&self) {
        self.counters.lock().pairs_cancelled += 1;
    }

    pub fn record_write_failure(&self) {
        self.counters.lock().write_failures += 1;
    }

    pub fn summary(&self) -> RunSummary {
        self.counters.lock().clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Summary plus timing, ready to be serialized
    pub fn to_file(&self) -> RunReportFile {
        RunReportFile {
            summary: self.summary(),
            started_at: self.started_at.to_rfc3339(),
            elapsed_secs: self.elapsed().as_secs_f64(),
        }
    }
}
