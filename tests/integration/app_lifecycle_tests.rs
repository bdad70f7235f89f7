/*!
 * Full app lifecycle tests: config, documents on disk, mock translator,
 * files written by the file sink.
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use bulkxlate::app_controller::Controller;
use bulkxlate::errors::{ConfigError, ProviderError};
use bulkxlate::estimate;
use bulkxlate::providers::mock::MockProvider;
use bulkxlate::translation::{ArtifactKey, Cancellation};

use crate::common;

#[tokio::test]
async fn test_run_withTwoDocumentsAndLanguages_shouldWriteFourFiles() -> Result<()> {
    common::init_logging();
    let dir = common::create_temp_dir()?;
    let guide = common::create_test_file(dir.path(), "guide.md", "# Guide\n\nStep one")?;
    let faq = common::create_test_file(dir.path(), "faq.txt", "Why?")?;
    let config = common::test_config(vec![guide, faq], &["fr", "de"]);
    let controller = Controller::with_config(config)?;
    let provider = MockProvider::working();

    let output = controller
        .run_with_translator(Arc::new(provider.clone()), Arc::new(controller.file_sink()), Cancellation::new())
        .await?;

    assert_eq!(fs::read_to_string(dir.path().join("guide.fr.md"))?, "[French] # Guide\n\n[French] Step one");
    assert_eq!(fs::read_to_string(dir.path().join("guide.de.md"))?, "[German] # Guide\n\n[German] Step one");
    assert_eq!(fs::read_to_string(dir.path().join("faq.fr.txt"))?, "[French] Why?");
    assert_eq!(fs::read_to_string(dir.path().join("faq.de.txt"))?, "[German] Why?");
    assert_eq!(output.written.len(), 4);
    assert_eq!(output.summary.succeeded, 6);
    assert_eq!(provider.call_count(), 6);
    Ok(())
}

#[tokio::test]
async fn test_run_withOutputPaths_shouldWriteThere() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "guide.md", "Hello")?;
    let mut config = common::test_config(vec![input.clone()], &["it"]);
    config.output_paths = vec![dir.path().join("out").join("manual.md")];
    let controller = Controller::with_config(config)?;

    let output = controller
        .run_with_translator(Arc::new(MockProvider::working()), Arc::new(controller.file_sink()), Cancellation::new())
        .await?;

    let expected = dir.path().join("out").join("manual.it.md");
    assert_eq!(output.written[&ArtifactKey::new(&input, "it")], expected);
    assert_eq!(fs::read_to_string(expected)?, "[Italian] Hello");
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingInput_shouldFailBeforeAnyCall() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let present = common::create_test_file(dir.path(), "a.md", "A")?;
    let config = common::test_config(vec![present, dir.path().join("missing.md")], &["fr"]);
    let controller = Controller::with_config(config)?;
    let provider = MockProvider::working();

    let result = controller
        .run_with_translator(Arc::new(provider.clone()), Arc::new(controller.file_sink()), Cancellation::new())
        .await;

    let error = tokio_test::assert_err!(result);
    assert!(matches!(error.downcast_ref::<ConfigError>(), Some(ConfigError::MissingInput(_))));
    assert_eq!(provider.call_count(), 0);
    assert!(!dir.path().join("a.fr.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withSameInputListedTwice_shouldFailBeforeAnyCall() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "input.txt", "Hello\n\nWorld")?;
    let mut config = common::test_config(vec![input.clone(), input], &["fr"]);
    config.output_paths = vec![dir.path().join("out1.txt"), dir.path().join("out2.txt")];
    let controller = Controller::with_config(config)?;
    let provider = MockProvider::working();

    let result = controller
        .run_with_translator(Arc::new(provider.clone()), Arc::new(controller.file_sink()), Cancellation::new())
        .await;

    let error = tokio_test::assert_err!(result);
    assert!(matches!(error.downcast_ref::<ConfigError>(), Some(ConfigError::DuplicateInput(_))));
    assert_eq!(provider.call_count(), 0);
    assert!(!dir.path().join("out1.fr.txt").exists());
    assert!(!dir.path().join("out2.fr.txt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withDistinctOutputs_shouldWriteEveryPair() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let a = common::create_test_file(dir.path(), "a.txt", "A")?;
    let b = common::create_test_file(dir.path(), "b.txt", "B")?;
    let mut config = common::test_config(vec![a, b], &["fr"]);
    config.output_paths = vec![dir.path().join("out1.txt"), dir.path().join("out2.txt")];
    let controller = Controller::with_config(config)?;

    let output = controller
        .run_with_translator(Arc::new(MockProvider::working()), Arc::new(controller.file_sink()), Cancellation::new())
        .await?;

    assert_eq!(output.artifacts.len(), 2);
    assert_eq!(output.summary.pairs_completed, 2);
    assert_eq!(fs::read_to_string(dir.path().join("out1.fr.txt"))?, "[French] A");
    assert_eq!(fs::read_to_string(dir.path().join("out2.fr.txt"))?, "[French] B");
    Ok(())
}

#[tokio::test]
async fn test_run_withEmptyBoundary_shouldFailBeforeAnyCall() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "a.md", "A")?;
    let mut config = common::test_config(vec![input], &["fr"]);
    config.boundary = String::new();
    let controller = Controller::with_config(config)?;
    let provider = MockProvider::working();

    let result = controller
        .run_with_translator(Arc::new(provider.clone()), Arc::new(controller.file_sink()), Cancellation::new())
        .await;

    assert!(result.is_err());
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[test]
fn test_load_documents_withNonUtf8Input_shouldReportUnreadable() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("binary.md");
    fs::write(&path, [0xff, 0xfe, 0xfd])?;
    let controller = Controller::with_config(common::test_config(vec![path.clone()], &["fr"]))?;

    match controller.load_documents() {
        Err(ConfigError::UnreadableInput { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected UnreadableInput, got {:?}", other.map(|d| d.len())),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withReportPath_shouldWriteJsonSummary() -> Result<()> {
    common::init_logging();
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "story.md", "A\n\nB\n\nC")?;
    let report_path = dir.path().join("reports").join("run.json");
    let mut config = common::test_config(vec![input], &["fr"]);
    config.report_path = Some(report_path.clone());
    let controller = Controller::with_config(config)?;
    let provider = MockProvider::fail_on("B", ProviderError::Timeout(30));

    let output = controller
        .run_with_translator(Arc::new(provider), Arc::new(controller.file_sink()), Cancellation::new())
        .await?;

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(json["attempted"], 3);
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["run_id"], output.summary.run_id.as_str());
    assert_eq!(
        fs::read_to_string(dir.path().join("story.fr.md"))?,
        "[French] A\n\n[untranslated chunk 1]\n\n[French] C"
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withPersistChunks_shouldWriteChunkFilesForRun() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "guide.md", "One\n\nTwo")?;
    let mut config = common::test_config(vec![input], &["fr"]);
    config.persist_chunks = true;
    let controller = Controller::with_config(config)?;

    let output = controller
        .run_with_translator(Arc::new(MockProvider::working()), Arc::new(controller.file_sink()), Cancellation::new())
        .await?;

    let chunk_dir = dir.path().join("guide.fr.md.chunks").join(&output.summary.run_id);
    assert_eq!(fs::read_to_string(chunk_dir.join("0.txt"))?, "[French] One");
    assert_eq!(fs::read_to_string(chunk_dir.join("1.txt"))?, "[French] Two");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withCancellation_shouldLeavePreviousArtifactUntouched() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "guide.md", "A\n\nB")?;
    let previous = common::create_test_file(dir.path(), "guide.fr.md", "previous translation")?;
    let controller = Controller::with_config(common::test_config(vec![input], &["fr"]))?;
    let provider = MockProvider::failing(ProviderError::ConnectionError("refused".into()));
    let cancellation = Cancellation::new();
    let sink = Arc::new(controller.file_sink());

    let canceller = async {
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        cancellation.cancel();
    };
    let (output, _) = tokio::join!(
        controller.run_with_translator(Arc::new(provider), sink, cancellation.clone()),
        canceller
    );

    let output = output?;
    assert_eq!(output.summary.pairs_cancelled, 1);
    assert_eq!(fs::read_to_string(previous)?, "previous translation");
    Ok(())
}

#[test]
fn test_estimate_withDocumentsFromDisk_shouldCountChunks() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let a = common::create_test_file(dir.path(), "a.md", "one two\n\nthree")?;
    let b = common::create_test_file(dir.path(), "b.md", "four")?;
    let controller = Controller::with_config(common::test_config(vec![a, b], &["fr", "de"]))?;

    let documents = controller.read_documents()?;
    let estimate = estimate::estimate_batch(&documents, &controller.config().boundary, 2);

    assert_eq!(estimate.total_chunks(), 6);
    assert_eq!(estimate.documents[0].words, 3);
    assert!(estimate.describe().contains("Total for 2 language(s): 6 chunk(s)"));
    Ok(())
}
