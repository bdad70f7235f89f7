use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::translation::job::{JobOutcome, TranslationResult};
use crate::translation::pipeline::{ArtifactKey, ArtifactSink, OutputArtifact};

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Artifact path `<dir>/<stem>.<language>.<ext>`
    // @params: base_path, language_key
    pub fn artifact_path<P: AsRef<Path>>(base_path: P, language_key: &str) -> PathBuf {
        let base_path = base_path.as_ref();
        let stem = base_path.file_stem().unwrap_or_default();

        let mut file_name = stem.to_string_lossy().to_string();
        file_name.push('.');
        file_name.push_str(language_key);
        if let Some(extension) = base_path.extension() {
            file_name.push('.');
            file_name.push_str(&extension.to_string_lossy());
        }

        base_path.with_file_name(file_name)
    }

    // @generates: Chunk directory `<artifact>.chunks/<run_id>`
    pub fn chunk_dir<P: AsRef<Path>>(artifact_path: P, run_id: &str) -> PathBuf {
        let artifact_path = artifact_path.as_ref();
        let mut dir_name = artifact_path.file_name().unwrap_or_default().to_os_string();
        dir_name.push(".chunks");
        artifact_path.with_file_name(dir_name).join(run_id)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file, replacing it atomically
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }

        // Write next to the target, then rename over it
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write to file: {:?}", tmp_path))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move {:?} into place at {:?}", tmp_path, path))?;

        Ok(())
    }
}

/// Writes artifacts next to their configured output base paths
#[derive(Debug, Clone, Default)]
pub struct FileSink {
    /// Document source path -> output base path
    base_paths: HashMap<PathBuf, PathBuf>,
}

impl FileSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the artifacts of `document` relative to `base_path` instead of the document itself
    pub fn with_base_path(mut self, document: impl Into<PathBuf>, base_path: impl Into<PathBuf>) -> Self {
        self.base_paths.insert(document.into(), base_path.into());
        self
    }

    /// Where the artifact for `key` is written
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        let base_path = self.base_paths.get(&key.document).unwrap_or(&key.document);
        FileManager::artifact_path(base_path, &key.language)
    }
}

impl ArtifactSink for FileSink {
    fn write_artifact(&self, artifact: &OutputArtifact) -> Result<PathBuf> {
        let path = self.path_for(&artifact.key);
        FileManager::write_to_file(&path, &artifact.text)?;
        Ok(path)
    }

    fn write_chunk(&self, key: &ArtifactKey, run_id: &str, result: &TranslationResult) -> Result<()> {
        let dir = FileManager::chunk_dir(self.path_for(key), run_id);
        let index = result.job.segment.index;

        match &result.outcome {
            JobOutcome::Translated { translation, .. } => {
                FileManager::write_to_file(dir.join(format!("{}.txt", index)), &translation.text)
            }
            JobOutcome::Failed(reason) => {
                let content = format!("{}\n\n{}", reason, result.job.segment.text);
                FileManager::write_to_file(dir.join(format!("{}.failed.txt", index)), &content)
            }
        }
    }
}
