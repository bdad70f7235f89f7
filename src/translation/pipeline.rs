/*!
 * Batch translation pipeline.
 *
 * Every (document, language) pair goes through chunking, translation of
 * each segment in order, reassembly and persistence. Pairs are independent:
 * a pair with failed chunks still produces an artifact, and pairs may run
 * concurrently without affecting each other's segment order.
 */

use anyhow::Result;
use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::{Config, FailedChunkPolicy};
use crate::language_utils;

use super::chunker::{self, Document};
use super::concurrency::Cancellation;
use super::core::Translator;
use super::job::{TokenUsage, Translation, TranslationJob, TranslationResult};
use super::prompts;
use super::report::{RunReport, RunSummary};
use super::retry::{RetryExecutor, RetryPolicy};

/// Deterministic identity of an artifact
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey {
    /// Source path of the document
    pub document: PathBuf,
    /// Filesystem-safe language key ("fr", "pt", "elvish")
    pub language: String,
}

impl ArtifactKey {
    pub fn new(document: impl AsRef<Path>, language: &str) -> Self {
        Self {
            document: document.as_ref().to_path_buf(),
            language: language_utils::language_key(language),
        }
    }
}

/// Reassembled translation of one document into one language
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub key: ArtifactKey,
    /// Language as configured
    pub target_language: String,
    pub text: String,
    pub segment_count: usize,
    /// Positions of segments that did not translate
    pub failed_segments: Vec<usize>,
}

impl OutputArtifact {
    pub fn is_complete(&self) -> bool {
        self.failed_segments.is_empty()
    }
}

/// Where artifacts (and optionally chunk outcomes) end up
pub trait ArtifactSink: Send + Sync {
    /// Persist an artifact, returning where it was written
    fn write_artifact(&self, artifact: &OutputArtifact) -> Result<PathBuf>;

    /// Persist a single chunk outcome for inspection
    fn write_chunk(&self, key: &ArtifactKey, run_id: &str, result: &TranslationResult) -> Result<()>;
}

/// Reported after every finished chunk
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub key: ArtifactKey,
    pub segment_index: usize,
    pub segment_count: usize,
    pub succeeded: bool,
}

type ProgressObserver = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Knobs of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub run_id: String,
    pub boundary: String,
    pub system_prompt: String,
    pub retry: RetryPolicy,
    pub failed_chunk_policy: FailedChunkPolicy,
    pub placeholder_template: String,
    pub persist_chunks: bool,
    pub concurrent_pairs: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &Config, run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            boundary: config.boundary.clone(),
            system_prompt: config.translation.common.system_prompt.clone(),
            retry: RetryPolicy::from(&config.retry),
            failed_chunk_policy: config.failed_chunk_policy,
            placeholder_template: config.placeholder_template.clone(),
            persist_chunks: config.persist_chunks,
            concurrent_pairs: config.concurrent_pairs,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub artifacts: BTreeMap<ArtifactKey, OutputArtifact>,
    /// Paths of the artifacts the sink accepted
    pub written: BTreeMap<ArtifactKey, PathBuf>,
    pub summary: RunSummary,
}

enum PairOutcome {
    Finished {
        artifact: OutputArtifact,
        written: Option<PathBuf>,
    },
    Cancelled,
}

/// Drives documents through chunking, retrying translation and reassembly
pub struct BatchPipeline {
    executor: RetryExecutor,
    sink: Arc<dyn ArtifactSink>,
    options: PipelineOptions,
    report: Arc<RunReport>,
    cancellation: Cancellation,
    progress: Option<ProgressObserver>,
}

impl BatchPipeline {
    pub fn new(translator: Arc<dyn Translator>, sink: Arc<dyn ArtifactSink>, options: PipelineOptions) -> Self {
        let cancellation = Cancellation::new();
        Self {
            executor: RetryExecutor::new(translator, options.retry.clone())
                .with_cancellation(cancellation.clone()),
            sink,
            report: Arc::new(RunReport::new(options.run_id.clone())),
            options,
            cancellation,
            progress: None,
        }
    }

    /// Share a cancellation flag with the caller
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.executor = self.executor.with_cancellation(cancellation.clone());
        self.cancellation = cancellation;
        self
    }

    /// Observe every finished chunk
    pub fn with_progress(mut self, observer: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(observer));
        self
    }

    pub fn report(&self) -> Arc<RunReport> {
        Arc::clone(&self.report)
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Translate every document into every language.
    ///
    /// Pairs are enumerated language-major and at most `concurrent_pairs`
    /// of them run at once.
    pub async fn run(&self, documents: &[Document], target_languages: &[String]) -> PipelineOutput {
        let documents: Vec<Arc<Document>> = documents.iter().cloned().map(Arc::new).collect();
        let pairs: Vec<(Arc<Document>, String)> = target_languages
            .iter()
            .flat_map(|language| documents.iter().map(move |doc| (Arc::clone(doc), language.clone())))
            .collect();
        let total_pairs = pairs.len();

        info!(
            "Run {}: {} document(s) x {} language(s), {} pair(s) at a time",
            self.options.run_id,
            documents.len(),
            target_languages.len(),
            self.options.concurrent_pairs.max(1)
        );

        let outcomes = stream::iter(pairs.into_iter().enumerate())
            .map(|(pair_index, (document, language))| {
                self.translate_pair(pair_index, total_pairs, document, language)
            })
            .buffer_unordered(self.options.concurrent_pairs.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut artifacts = BTreeMap::new();
        let mut written = BTreeMap::new();
        for outcome in outcomes {
            if let PairOutcome::Finished { artifact, written: path } = outcome {
                if let Some(path) = path {
                    written.insert(artifact.key.clone(), path);
                }
                artifacts.insert(artifact.key.clone(), artifact);
            }
        }

        PipelineOutput {
            artifacts,
            written,
            summary: self.report.summary(),
        }
    }

    async fn translate_pair(
        &self,
        pair_index: usize,
        total_pairs: usize,
        document: Arc<Document>,
        language: String,
    ) -> PairOutcome {
        let key = ArtifactKey::new(document.path(), &language);

        if self.cancellation.is_cancelled() {
            info!("Skipping {:?} -> {}: run cancelled", document.source_path, language);
            self.report.record_pair_cancelled();
            return PairOutcome::Cancelled;
        }

        let segments = document.segments(&self.options.boundary);
        let segment_count = segments.len();
        let start_time = Instant::now();
        info!(
            "[{}/{}] Translating {:?} into {} ({} chunk(s))",
            pair_index + 1,
            total_pairs,
            document.source_path,
            language,
            segment_count
        );

        let mut results = Vec::with_capacity(segment_count);
        for segment in segments {
            if self.cancellation.is_cancelled() {
                return self.abandon_pair(&document, &language);
            }

            let job = TranslationJob::new(Arc::clone(&document), language.as_str(), segment);
            let result = if job.segment.is_blank() {
                // Nothing to translate, keep the whitespace as is
                let passthrough = Translation::new(job.segment.text.clone(), TokenUsage::default());
                TranslationResult::success(job, passthrough, 0)
            } else {
                let request = prompts::build_request(
                    &self.options.system_prompt,
                    &document,
                    &language,
                    &job.segment.text,
                );
                self.executor.execute(job, &request).await
            };

            if let Some(reason) = result.failure_reason() {
                if reason.is_cancelled() {
                    return self.abandon_pair(&document, &language);
                }
                error!(
                    "Chunk {} of {:?} -> {} failed: {}",
                    result.job.segment.index, document.source_path, language, reason
                );
            }

            self.report.record(&result);

            if self.options.persist_chunks {
                if let Err(e) = self.persist_chunk(&key, &result).await {
                    warn!("Failed to persist chunk {} of {:?}: {:#}", result.job.segment.index, document.source_path, e);
                }
            }

            if let Some(observer) = &self.progress {
                observer(&ProgressEvent {
                    key: key.clone(),
                    segment_index: result.job.segment.index,
                    segment_count,
                    succeeded: result.is_success(),
                });
            }

            results.push(result);
        }

        let artifact = self.reassemble(key, &language, &results);
        let written = match self.write_artifact(&artifact).await {
            Ok(path) => {
                info!(
                    "[{}/{}] Wrote {:?} ({}/{} chunks translated) in {:.1}s",
                    pair_index + 1,
                    total_pairs,
                    path,
                    artifact.segment_count - artifact.failed_segments.len(),
                    artifact.segment_count,
                    start_time.elapsed().as_secs_f64()
                );
                Some(path)
            }
            Err(e) => {
                error!("Failed to write translation of {:?} into {}: {:#}", document.source_path, language, e);
                self.report.record_write_failure();
                None
            }
        };

        self.report.record_pair_completed();
        PairOutcome::Finished { artifact, written }
    }

    // Sinks do blocking file I/O
    async fn write_artifact(&self, artifact: &OutputArtifact) -> Result<PathBuf> {
        let sink = Arc::clone(&self.sink);
        let artifact = artifact.clone();
        tokio::task::spawn_blocking(move || sink.write_artifact(&artifact)).await?
    }

    async fn persist_chunk(&self, key: &ArtifactKey, result: &TranslationResult) -> Result<()> {
        let sink = Arc::clone(&self.sink);
        let key = key.clone();
        let run_id = self.options.run_id.clone();
        let result = result.clone();
        tokio::task::spawn_blocking(move || sink.write_chunk(&key, &run_id, &result)).await?
    }

    fn abandon_pair(&self, document: &Document, language: &str) -> PairOutcome {
        warn!(
            "Abandoning {:?} -> {}: run cancelled, existing output left untouched",
            document.source_path, language
        );
        self.report.record_pair_cancelled();
        PairOutcome::Cancelled
    }

    /// Join results in segment order, applying the failed chunk policy
    fn reassemble(&self, key: ArtifactKey, language: &str, results: &[TranslationResult]) -> OutputArtifact {
        let mut parts: Vec<String> = Vec::with_capacity(results.len());
        let mut failed_segments = Vec::new();

        for result in results {
            let index = result.job.segment.index;
            match result.translated_text() {
                Some(text) => parts.push(text.to_string()),
                None => {
                    failed_segments.push(index);
                    match self.options.failed_chunk_policy {
                        FailedChunkPolicy::Placeholder => parts.push(
                            self.options.placeholder_template.replace("{index}", &index.to_string()),
                        ),
                        FailedChunkPolicy::KeepSource => parts.push(result.job.segment.text.clone()),
                        FailedChunkPolicy::Omit => {}
                    }
                }
            }
        }

        OutputArtifact {
            key,
            target_language: language.to_string(),
            text: chunker::join(&parts, &self.options.boundary),
            segment_count: results.len(),
            failed_segments,
        }
    }
}
