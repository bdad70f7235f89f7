/*!
 * Tests for run report counters
 */

use std::sync::Arc;

use bulkxlate::errors::ProviderError;
use bulkxlate::translation::{
    FailureReason, RunReport, Segment, TokenUsage, Translation, TranslationJob, TranslationResult,
};

use crate::common;

fn job(index: usize) -> TranslationJob {
    let doc = Arc::new(common::document("guide.md", ""));
    TranslationJob::new(doc, "french", Segment::new(index, "text"))
}

fn success(index: usize, prompt: u64, completion: u64) -> TranslationResult {
    TranslationResult::success(job(index), Translation::new("texte", TokenUsage::new(prompt, completion)), 1)
}

#[test]
fn test_summary_withoutRecords_shouldBeZero() {
    let summary = RunReport::new("empty").summary();

    assert_eq!(summary.run_id, "empty");
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.total_tokens, 0);
    assert!(!summary.has_failures());
}

#[test]
fn test_summary_calledTwice_shouldNotChangeCounters() {
    let report = RunReport::new("run");
    report.record(&success(0, 3, 4));

    let first = report.summary();
    let second = report.summary();

    assert_eq!(first, second);
    assert_eq!(first.attempted, 1);
    assert_eq!(first.total_tokens, 7);
}

#[test]
fn test_record_withFailure_shouldCountFailedWithoutTokens() {
    let report = RunReport::new("run");
    report.record(&TranslationResult::failure(
        job(1),
        FailureReason::Rejected { attempts: 1, error: ProviderError::AuthenticationError("nope".into()) },
    ));

    let summary = report.summary();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.total_tokens, 0);
    assert_eq!(summary.remote_calls, 1);
    assert!(summary.has_failures());
}

#[test]
fn test_record_fromManyThreads_shouldNotLoseIncrements() {
    let report = RunReport::new("parallel");

    std::thread::scope(|scope| {
        for thread in 0..8 {
            let report = &report;
            scope.spawn(move || {
                for i in 0..250 {
                    report.record(&success(thread * 1000 + i, 1, 1));
                }
                report.record_pair_completed();
            });
        }
    });

    let summary = report.summary();
    assert_eq!(summary.attempted, 2000);
    assert_eq!(summary.succeeded, 2000);
    assert_eq!(summary.total_tokens, 4000);
    assert_eq!(summary.pairs_completed, 8);
}

#[test]
fn test_describe_shouldMentionCounters() {
    let report = RunReport::new("run-9");
    report.record(&success(0, 10, 5));
    report.record_write_failure();

    let text = report.summary().describe();
    assert!(text.contains("run-9"));
    assert!(text.contains("Chunks succeeded: 1"));
    assert!(text.contains("Total tokens: 15"));
    assert!(text.contains("Write failures: 1"));
}
