/*!
 * Integration tests for the batch pipeline.
 *
 * Every test runs against the mock translator; paused-clock tests let the
 * default 3s backoff elapse instantly.
 */

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bulkxlate::app_config::FailedChunkPolicy;
use bulkxlate::errors::ProviderError;
use bulkxlate::providers::mock::MockProvider;
use bulkxlate::translation::{
    ArtifactKey, ArtifactSink, BatchPipeline, Cancellation, OutputArtifact, TranslationResult,
};

use crate::common::{self, MemorySink};

fn languages(names: &[&str]) -> Vec<String> {
    names.iter().map(|l| l.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_run_withFailingMiddleChunk_shouldStillProduceArtifact() {
    common::init_logging();
    let provider = MockProvider::fail_on("B", ProviderError::Timeout(30));
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());
    let doc = common::document("story.md", "A\n\nB\n\nC");

    let output = pipeline.run(&[doc], &languages(&["french"])).await;

    let artifact = &output.artifacts[&ArtifactKey::new("story.md", "french")];
    assert_eq!(artifact.text, "[French] A\n\n[untranslated chunk 1]\n\n[French] C");
    assert_eq!(artifact.failed_segments, vec![1]);
    assert_eq!(output.summary.attempted, 3);
    assert_eq!(output.summary.succeeded, 2);
    assert_eq!(output.summary.failed, 1);
    // A and C once, B ten times
    assert_eq!(provider.call_count(), 12);
    assert_eq!(output.summary.remote_calls, 12);
    assert_eq!(sink.written().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_withTransientFailures_shouldRecoverWithinBudget() {
    let provider = MockProvider::fail_first(3, ProviderError::from_status(503, "busy"));
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());

    let output = pipeline.run(&[common::document("a.md", "A\n\nB")], &languages(&["fr"])).await;

    let artifact = &output.artifacts[&ArtifactKey::new("a.md", "fr")];
    assert_eq!(artifact.text, "[French] A\n\n[French] B");
    assert!(artifact.is_complete());
    assert_eq!(output.summary.failed, 0);
    assert_eq!(output.summary.remote_calls, 5);
}

#[tokio::test]
async fn test_run_withEmptyDocument_shouldWriteEmptyArtifactWithoutCalls() {
    let provider = MockProvider::working();
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());

    let output = pipeline.run(&[common::document("empty.md", "")], &languages(&["de"])).await;

    let artifact = &output.artifacts[&ArtifactKey::new("empty.md", "de")];
    assert_eq!(artifact.text, "");
    assert_eq!(artifact.segment_count, 1);
    assert_eq!(provider.call_count(), 0);
    assert_eq!(output.summary.attempted, 1);
    assert_eq!(output.summary.succeeded, 1);
    assert_eq!(output.summary.total_tokens, 0);
    assert_eq!(sink.written().len(), 1);
}

#[tokio::test]
async fn test_run_withBlankSegments_shouldPassThemThrough() {
    let provider = MockProvider::working();
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());

    let output = pipeline
        .run(&[common::document("a.md", "\n\nTitle\n\n   \n\nBody")], &languages(&["fr"]))
        .await;

    let artifact = &output.artifacts[&ArtifactKey::new("a.md", "fr")];
    assert_eq!(artifact.text, "\n\n[French] Title\n\n   \n\n[French] Body");
    assert_eq!(provider.texts(), vec!["Title", "Body"]);
}

#[tokio::test]
async fn test_run_withTwoLanguages_shouldKeepArtifactsSeparate() {
    let provider = MockProvider::working();
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());

    let output = pipeline
        .run(&[common::document("a.md", "One\n\nTwo\n\nThree")], &languages(&["french", "german"]))
        .await;

    assert_eq!(output.artifacts.len(), 2);
    assert_eq!(
        output.artifacts[&ArtifactKey::new("a.md", "french")].text,
        "[French] One\n\n[French] Two\n\n[French] Three"
    );
    assert_eq!(
        output.artifacts[&ArtifactKey::new("a.md", "german")].text,
        "[German] One\n\n[German] Two\n\n[German] Three"
    );
    assert_eq!(output.summary.pairs_completed, 2);
}

#[tokio::test]
async fn test_run_shouldEnumeratePairsLanguageMajor() {
    let provider = MockProvider::working();
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());
    let docs = [common::document("a.md", "a"), common::document("b.md", "b")];

    pipeline.run(&docs, &languages(&["fr", "de"])).await;

    let order: Vec<(String, String)> = provider
        .requests()
        .into_iter()
        .map(|r| (r.output_language, r.text))
        .collect();
    assert_eq!(
        order,
        vec![
            ("French".to_string(), "a".to_string()),
            ("French".to_string(), "b".to_string()),
            ("German".to_string(), "a".to_string()),
            ("German".to_string(), "b".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_withParallelPairsAndUnevenLatency_shouldKeepSegmentOrder() {
    // Early segments are slow, so later pairs finish first
    let provider = MockProvider::working().with_delay(|request| {
        if request.text.starts_with("first") {
            Duration::from_millis(500)
        } else {
            Duration::from_millis(10)
        }
    });
    let sink = MemorySink::new();
    let mut options = common::pipeline_options();
    options.concurrent_pairs = 4;
    let pipeline = common::mock_pipeline(&provider, &sink, options);
    let docs = [
        common::document("a.md", "first a\n\nsecond a\n\nthird a"),
        common::document("b.md", "only b"),
    ];

    let output = pipeline.run(&docs, &languages(&["fr", "es"])).await;

    assert_eq!(output.artifacts.len(), 4);
    for (language, name) in [("fr", "French"), ("es", "Spanish")] {
        assert_eq!(
            output.artifacts[&ArtifactKey::new("a.md", language)].text,
            format!("[{name}] first a\n\n[{name}] second a\n\n[{name}] third a")
        );
        assert_eq!(
            output.artifacts[&ArtifactKey::new("b.md", language)].text,
            format!("[{name}] only b")
        );
    }
    // Short pairs were written before the slow ones
    let written: Vec<String> = sink.written().iter().map(|a| a.key.document.display().to_string()).collect();
    assert_eq!(&written[..2], &["b.md".to_string(), "b.md".to_string()]);
}

#[tokio::test]
async fn test_run_withKeepSourcePolicy_shouldInsertSourceChunk() {
    let provider = MockProvider::fail_on("B", ProviderError::AuthenticationError("bad key".into()));
    let sink = MemorySink::new();
    let mut options = common::pipeline_options();
    options.failed_chunk_policy = FailedChunkPolicy::KeepSource;
    let pipeline = common::mock_pipeline(&provider, &sink, options);

    let output = pipeline.run(&[common::document("a.md", "A\n\nB")], &languages(&["fr"])).await;

    assert_eq!(output.artifacts[&ArtifactKey::new("a.md", "fr")].text, "[French] A\n\nB");
    // Rejected without retrying
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_run_withOmitPolicy_shouldDropFailedChunk() {
    let provider = MockProvider::fail_on("B", ProviderError::from_status(400, "too long"));
    let sink = MemorySink::new();
    let mut options = common::pipeline_options();
    options.failed_chunk_policy = FailedChunkPolicy::Omit;
    let pipeline = common::mock_pipeline(&provider, &sink, options);

    let output = pipeline.run(&[common::document("a.md", "A\n\nB\n\nC")], &languages(&["fr"])).await;

    let artifact = &output.artifacts[&ArtifactKey::new("a.md", "fr")];
    assert_eq!(artifact.text, "[French] A\n\n[French] C");
    assert_eq!(artifact.failed_segments, vec![1]);
}

#[tokio::test]
async fn test_run_withEveryChunkFailing_shouldStillWriteArtifact() {
    let provider = MockProvider::failing(ProviderError::AuthenticationError("revoked".into()));
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());

    let output = pipeline.run(&[common::document("a.md", "A\n\nB")], &languages(&["fr"])).await;

    assert_eq!(
        output.artifacts[&ArtifactKey::new("a.md", "fr")].text,
        "[untranslated chunk 0]\n\n[untranslated chunk 1]"
    );
    assert_eq!(output.summary.succeeded, 0);
    assert_eq!(output.summary.failed, 2);
    assert_eq!(sink.written().len(), 1);
}

#[tokio::test]
async fn test_run_withSinkFailure_shouldCountAndContinue() {
    let provider = MockProvider::working();
    let sink = MemorySink::failing_for("fr");
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());

    let output = pipeline.run(&[common::document("a.md", "A")], &languages(&["fr", "de"])).await;

    assert_eq!(output.summary.write_failures, 1);
    assert_eq!(output.summary.pairs_completed, 2);
    assert_eq!(output.artifacts.len(), 2);
    assert_eq!(output.written.len(), 1);
    assert!(output.written.contains_key(&ArtifactKey::new("a.md", "de")));
}

#[tokio::test]
async fn test_run_withPersistChunks_shouldHandEveryChunkToSink() {
    let provider = MockProvider::fail_on("B", ProviderError::AuthenticationError("no".into()));
    let sink = MemorySink::new();
    let mut options = common::pipeline_options();
    options.persist_chunks = true;
    let pipeline = common::mock_pipeline(&provider, &sink, options);

    pipeline.run(&[common::document("a.md", "A\n\nB")], &languages(&["fr"])).await;

    let chunks = sink.chunks.lock().clone();
    let seen: Vec<(String, usize, bool)> = chunks.into_iter().map(|(_, run, index, ok)| (run, index, ok)).collect();
    assert_eq!(
        seen,
        vec![("test-run".to_string(), 0, true), ("test-run".to_string(), 1, false)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_withCancellationDuringBackoff_shouldWriteNoArtifact() {
    common::init_logging();
    let provider = MockProvider::failing(ProviderError::Timeout(30));
    let sink = MemorySink::new();
    let cancellation = Cancellation::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options())
        .with_cancellation(cancellation.clone());
    let docs = [common::document("a.md", "A\n\nB"), common::document("b.md", "C")];

    let targets = languages(&["fr"]);

    let canceller = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancellation.cancel();
    };
    let (output, _) = tokio::join!(pipeline.run(&docs, &targets), canceller);

    assert_eq!(provider.call_count(), 1);
    assert!(output.artifacts.is_empty());
    assert!(sink.written().is_empty());
    assert_eq!(output.summary.pairs_cancelled, 2);
    assert_eq!(output.summary.pairs_completed, 0);
}

#[tokio::test]
async fn test_run_withCancellationBetweenPairs_shouldKeepFinishedPairs() {
    let provider = MockProvider::working();
    let sink = MemorySink::new();
    let cancellation = Cancellation::new();
    let trigger = cancellation.clone();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options())
        .with_cancellation(cancellation)
        .with_progress(move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Stop once the first pair has finished its last chunk
            if event.segment_index + 1 == event.segment_count {
                trigger.cancel();
            }
        });

    let output = pipeline
        .run(&[common::document("a.md", "A\n\nB")], &languages(&["fr", "de", "it"]))
        .await;

    assert_eq!(output.artifacts.len(), 1);
    assert!(output.artifacts.contains_key(&ArtifactKey::new("a.md", "fr")));
    assert_eq!(output.summary.pairs_completed, 1);
    assert_eq!(output.summary.pairs_cancelled, 2);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_run_shouldRenderSystemPromptPerLanguage() {
    let provider = MockProvider::working();
    let sink = MemorySink::new();
    let pipeline = common::mock_pipeline(&provider, &sink, common::pipeline_options());

    pipeline.run(&[common::document("a.md", "Hi")], &languages(&["ja"])).await;

    let request = &provider.requests()[0];
    assert_eq!(request.system_prompt, "Translate markdown from English to Japanese.");
    assert_eq!(request.input_language, "English");
    assert_eq!(request.format, "markdown");
}

#[tokio::test]
async fn test_summary_afterRun_shouldBeIdempotent() {
    let provider = MockProvider::intermittent(2);
    let sink = MemorySink::new();
    let mut options = common::pipeline_options();
    options.retry = common::quick_retry(1);
    let pipeline = common::mock_pipeline(&provider, &sink, options);

    let output = pipeline.run(&[common::document("a.md", "A\n\nB\n\nC\n\nD")], &languages(&["fr"])).await;
    let report = pipeline.report();

    assert_eq!(report.summary(), output.summary);
    assert_eq!(report.summary(), report.summary());
    assert_eq!(output.summary.succeeded, 2);
    assert_eq!(output.summary.failed, 2);
    tokio_test::assert_ok!(serde_json::to_string(&report.to_file()));
}

/// Holds the French write until the German one has landed
#[derive(Default)]
struct HandoffSink {
    german_written: AtomicBool,
}

impl ArtifactSink for HandoffSink {
    fn write_artifact(&self, artifact: &OutputArtifact) -> Result<PathBuf> {
        if artifact.key.language == "fr" {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !self.german_written.load(Ordering::SeqCst) {
                if Instant::now() > deadline {
                    return Err(anyhow!("German pair never got to write"));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        } else {
            self.german_written.store(true, Ordering::SeqCst);
        }
        Ok(PathBuf::from(&artifact.key.language))
    }

    fn write_chunk(&self, _key: &ArtifactKey, _run_id: &str, _result: &TranslationResult) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_run_withSlowSinkWrite_shouldNotStallOtherPairs() {
    let provider = MockProvider::working();
    let mut options = common::pipeline_options();
    options.concurrent_pairs = 2;
    let pipeline = BatchPipeline::new(Arc::new(provider), Arc::new(HandoffSink::default()), options);

    let output = pipeline
        .run(&[common::document("a.md", "A\n\nB")], &languages(&["fr", "de"]))
        .await;

    assert_eq!(output.written.len(), 2);
    assert_eq!(output.summary.write_failures, 0);
}
