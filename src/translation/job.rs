/*!
 * Translation jobs and their results.
 */

use std::sync::Arc;

use crate::errors::ProviderError;

use super::chunker::{Document, Segment};

/// Everything the remote service needs for one segment
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Rendered system instruction
    pub system_prompt: String,
    /// Human-readable input language name
    pub input_language: String,
    /// Human-readable target language name
    pub output_language: String,
    /// Format descriptor of the document
    pub format: String,
    /// Segment text to translate
    pub text: String,
}

/// Token counts reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A successful remote translation
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub usage: TokenUsage,
}

impl Translation {
    pub fn new(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// One segment of one document awaiting translation into one language
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub document: Arc<Document>,
    pub target_language: String,
    pub segment: Segment,
}

impl TranslationJob {
    pub fn new(document: Arc<Document>, target_language: impl Into<String>, segment: Segment) -> Self {
        Self {
            document,
            target_language: target_language.into(),
            segment,
        }
    }
}

/// Why a job ended without a translation
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Every allowed attempt failed with a retryable error
    Exhausted { attempts: u32, last_error: ProviderError },
    /// The provider returned an error that retrying cannot fix
    Rejected { attempts: u32, error: ProviderError },
    /// The run was cancelled before the job could finish
    Cancelled { attempts: u32 },
}

impl FailureReason {
    /// Remote calls made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted { attempts, last_error } => {
                write!(f, "gave up after {} attempts: {}", attempts, last_error)
            }
            Self::Rejected { attempts, error } => {
                write!(f, "rejected on attempt {}: {}", attempts, error)
            }
            Self::Cancelled { attempts } => write!(f, "cancelled after {} attempts", attempts),
        }
    }
}

/// Terminal state of a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Translated { translation: Translation, attempts: u32 },
    Failed(FailureReason),
}

/// The outcome of exactly one job
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub job: TranslationJob,
    pub outcome: JobOutcome,
}

impl TranslationResult {
    pub fn success(job: TranslationJob, translation: Translation, attempts: u32) -> Self {
        Self {
            job,
            outcome: JobOutcome::Translated { translation, attempts },
        }
    }

    pub fn failure(job: TranslationJob, reason: FailureReason) -> Self {
        Self {
            job,
            outcome: JobOutcome::Failed(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Translated { .. })
    }

    pub fn translated_text(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Translated { translation, .. } => Some(&translation.text),
            JobOutcome::Failed(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match &self.outcome {
            JobOutcome::Translated { .. } => None,
            JobOutcome::Failed(reason) => Some(reason),
        }
    }

    /// Remote calls this job made
    pub fn attempts(&self) -> u32 {
        match &self.outcome {
            JobOutcome::Translated { attempts, .. } => *attempts,
            JobOutcome::Failed(reason) => reason.attempts(),
        }
    }

    pub fn usage(&self) -> TokenUsage {
        match &self.outcome {
            JobOutcome::Translated { translation, .. } => translation.usage,
            JobOutcome::Failed(_) => TokenUsage::default(),
        }
    }
}
