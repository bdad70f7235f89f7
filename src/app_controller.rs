use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::errors::ConfigError;
use crate::file_utils::{FileManager, FileSink};
use crate::translation::{
    ArtifactSink, BatchPipeline, Cancellation, Document, PipelineOptions, PipelineOutput, RunReport,
    TranslationService, Translator,
};

// @module: Application controller for batch document translation

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate the configuration and read every input document.
    ///
    /// Runs before any remote call; the first problem aborts the whole run.
    pub fn load_documents(&self) -> Result<Vec<Document>, ConfigError> {
        self.config.validate()?;
        self.read_documents()
    }

    /// Read every input document without validating the rest of the config
    pub fn read_documents(&self) -> Result<Vec<Document>, ConfigError> {
        if self.config.input_paths.is_empty() {
            return Err(ConfigError::NoInputs);
        }

        self.config
            .input_paths
            .iter()
            .map(|path| {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::UnreadableInput {
                    path: path.clone(),
                    source,
                })?;
                Ok(Document::new(
                    path.clone(),
                    text,
                    self.config.input_language.clone(),
                    self.config.format.clone(),
                ))
            })
            .collect()
    }

    /// Sink writing artifacts next to the configured output paths
    pub fn file_sink(&self) -> FileSink {
        self.config
            .input_paths
            .iter()
            .enumerate()
            .fold(FileSink::new(), |sink, (index, input)| match self.config.output_base_path(index) {
                Some(base_path) => sink.with_base_path(input, base_path),
                None => sink,
            })
    }

    /// Run the batch against the configured provider
    pub async fn run(&self, cancellation: Cancellation) -> Result<PipelineOutput> {
        let service = TranslationService::new(self.config.translation.clone());
        info!("Using {}", service.describe());

        let sink = Arc::new(self.file_sink());
        self.run_with_translator(Arc::new(service), sink, cancellation).await
    }

    /// Run the batch against any translator and sink
    pub async fn run_with_translator(
        &self,
        translator: Arc<dyn Translator>,
        sink: Arc<dyn ArtifactSink>,
        cancellation: Cancellation,
    ) -> Result<PipelineOutput> {
        let documents = self.load_documents()?;
        let languages = self.config.unique_output_languages();
        let run_id = uuid::Uuid::new_v4().to_string();

        let total_chunks: usize = documents
            .iter()
            .map(|doc| doc.segments(&self.config.boundary).len())
            .sum::<usize>()
            * languages.len();

        let progress_bar = ProgressBar::new(total_chunks as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));

        let bar = progress_bar.clone();
        let pipeline = BatchPipeline::new(translator, sink, PipelineOptions::from_config(&self.config, run_id))
            .with_cancellation(cancellation)
            .with_progress(move |event| {
                bar.inc(1);
                if !event.succeeded {
                    bar.set_message(format!("chunk {} -> {} failed", event.segment_index, event.key.language));
                }
            });

        let output = pipeline.run(&documents, &languages).await;
        progress_bar.finish_and_clear();

        let report = pipeline.report();
        info!("{}", output.summary.describe());
        info!("Finished in {}", Self::format_duration(report.elapsed()));

        if let Some(report_path) = &self.config.report_path {
            if let Err(e) = Self::write_report(&report, report_path) {
                warn!("Failed to write run report: {:#}", e);
            }
        }

        Ok(output)
    }

    fn write_report(report: &RunReport, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&report.to_file())
            .context("Failed to serialize run report")?;
        FileManager::write_to_file(path, &json)?;
        info!("Run report written to {:?}", path);
        Ok(())
    }

    /// Format a duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
