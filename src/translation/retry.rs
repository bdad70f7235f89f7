/*!
 * Bounded exponential backoff around one translation call.
 *
 * The executor turns every outcome into a `TranslationResult`; nothing it
 * does can fail past its boundary. Backoff sleeps are async suspension
 * points that also wake up on cancellation.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::RetryConfig;

use super::concurrency::Cancellation;
use super::core::Translator;
use super::job::{FailureReason, TranslationJob, TranslationRequest, TranslationResult};

/// Attempt budget and gap growth for one job
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Gap before the first retry
    pub initial_gap: Duration,
    /// Multiplier applied to the gap after every retry
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_gap: config.initial_gap(),
            backoff_factor: config.backoff_factor,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_gap: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            initial_gap,
            backoff_factor,
        }
    }

    /// The gaps slept between consecutive attempts
    pub fn gaps(&self) -> Backoff {
        Backoff::new(self.initial_gap, self.backoff_factor)
    }
}

/// Endless gap sequence: `initial, initial * f, initial * f^2, ...`
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    factor: f64,
}

impl Backoff {
    pub fn new(initial_gap: Duration, factor: f64) -> Self {
        Self {
            next: initial_gap,
            factor,
        }
    }

    pub fn next_gap(&mut self) -> Duration {
        let gap = self.next;
        // Saturates instead of overflowing for absurd attempt counts
        self.next = Duration::try_from_secs_f64(gap.as_secs_f64() * self.factor).unwrap_or(Duration::MAX);
        gap
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_gap())
    }
}

/// Runs jobs against a translator with bounded retry
#[derive(Clone)]
pub struct RetryExecutor {
    translator: Arc<dyn Translator>,
    policy: RetryPolicy,
    cancellation: Cancellation,
}

impl RetryExecutor {
    pub fn new(translator: Arc<dyn Translator>, policy: RetryPolicy) -> Self {
        Self {
            translator,
            policy,
            cancellation: Cancellation::new(),
        }
    }

    /// Stop retrying once `cancellation` fires
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Translate one job, retrying retryable failures with backoff
    pub async fn execute(&self, job: TranslationJob, request: &TranslationRequest) -> TranslationResult {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut gaps = self.policy.gaps();
        let mut attempts = 0;

        loop {
            if self.cancellation.is_cancelled() {
                return TranslationResult::failure(job, FailureReason::Cancelled { attempts });
            }

            attempts += 1;
            let error = match self.translator.translate(request).await {
                Ok(translation) => {
                    debug!(
                        "Chunk {} of {:?} -> {} translated on attempt {}",
                        job.segment.index, job.document.source_path, job.target_language, attempts
                    );
                    return TranslationResult::success(job, translation, attempts);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                return TranslationResult::failure(job, FailureReason::Rejected { attempts, error });
            }

            if attempts >= max_attempts {
                return TranslationResult::failure(job, FailureReason::Exhausted { attempts, last_error: error });
            }

            let gap = gaps.next_gap();
            warn!(
                "Chunk {} of {:?} -> {} failed (attempt {}/{}): {}; retrying in {:.1}s",
                job.segment.index,
                job.document.source_path,
                job.target_language,
                attempts,
                max_attempts,
                error,
                gap.as_secs_f64()
            );

            tokio::select! {
                _ = tokio::time::sleep(gap) => {}
                _ = self.cancellation.cancelled() => {
                    return TranslationResult::failure(job, FailureReason::Cancelled { attempts });
                }
            }
        }
    }
}
