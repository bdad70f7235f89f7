/*!
 * Pre-run size and token estimates.
 *
 * Read-only: nothing here talks to a provider.
 */

use serde::Serialize;
use std::path::PathBuf;

use crate::translation::Document;

/// Characters per token assumed by the heuristic
const CHARS_PER_TOKEN: f64 = 4.0;

/// Headroom applied on top of the raw token count
const SAFETY_MARGIN: f64 = 1.3;

/// Estimate for one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEstimate {
    pub path: PathBuf,
    pub chars: usize,
    pub words: usize,
    pub chunks: usize,
    /// Input tokens for one target language
    pub tokens_per_language: u64,
}

/// Estimate for a whole batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEstimate {
    pub documents: Vec<DocumentEstimate>,
    pub languages: usize,
}

impl BatchEstimate {
    pub fn total_chunks(&self) -> usize {
        self.documents.iter().map(|d| d.chunks).sum::<usize>() * self.languages
    }

    pub fn total_tokens(&self) -> u64 {
        self.documents.iter().map(|d| d.tokens_per_language).sum::<u64>() * self.languages as u64
    }

    /// Human-readable multi-line report
    pub fn describe(&self) -> String {
        let mut lines: Vec<String> = self
            .documents
            .iter()
            .map(|d| {
                format!(
                    "{:?}: {} chars, {} words, {} chunk(s), ~{} tokens per language",
                    d.path, d.chars, d.words, d.chunks, d.tokens_per_language
                )
            })
            .collect();
        lines.push(format!(
            "Total for {} language(s): {} chunk(s), ~{} tokens",
            self.languages,
            self.total_chunks(),
            self.total_tokens()
        ));
        lines.join("\n")
    }
}

/// Heuristic token count for `text`
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as f64;
    let raw = (chars / CHARS_PER_TOKEN).ceil();
    (raw * SAFETY_MARGIN).ceil() as u64
}

pub fn estimate_document(document: &Document, boundary: &str) -> DocumentEstimate {
    DocumentEstimate {
        path: document.source_path.clone(),
        chars: document.text.chars().count(),
        words: document.text.split_whitespace().count(),
        chunks: document.segments(boundary).len(),
        tokens_per_language: estimate_tokens(&document.text),
    }
}

pub fn estimate_batch(documents: &[Document], boundary: &str, languages: usize) -> BatchEstimate {
    BatchEstimate {
        documents: documents.iter().map(|d| estimate_document(d, boundary)).collect(),
        languages,
    }
}
