/*!
 * Batch document translation.
 *
 * This module contains the translation engine. It is split into several
 * submodules:
 *
 * - `chunker`: Document model, splitting and joining on a boundary marker
 * - `job`: Translation jobs, requests and their results
 * - `core`: The `Translator` seam and the provider-backed service
 * - `retry`: Bounded exponential backoff around one translation
 * - `pipeline`: Fan-out over documents and languages, reassembly, persistence
 * - `report`: Run-wide counters
 * - `concurrency`: Request throttling and cancellation
 * - `prompts`: System prompt rendering
 */

// Re-export main types for easier usage
pub use self::chunker::{Document, Segment};
pub use self::concurrency::{Cancellation, RequestThrottle};
pub use self::core::{TranslationService, Translator};
pub use self::job::{FailureReason, JobOutcome, TokenUsage, Translation, TranslationJob, TranslationRequest, TranslationResult};
pub use self::pipeline::{ArtifactKey, ArtifactSink, BatchPipeline, OutputArtifact, PipelineOptions, PipelineOutput, ProgressEvent};
pub use self::report::{RunReport, RunSummary};
pub use self::retry::{Backoff, RetryExecutor, RetryPolicy};

// Submodules
pub mod chunker;
pub mod concurrency;
pub mod core;
pub mod job;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod retry;
