/*!
 * Document model and chunking.
 *
 * Documents are split on a boundary marker into ordered segments. Splitting
 * never trims, merges or reorders anything, so joining the segments with the
 * same marker gives back the original text byte for byte.
 */

use std::path::{Path, PathBuf};

/// An input document, read fully into memory
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Path the document was read from; identifies the document
    pub source_path: PathBuf,

    /// Full document text
    pub text: String,

    /// Declared language of the text
    pub input_language: String,

    /// Format descriptor passed to the model (e.g. "markdown")
    pub format: String,
}

impl Document {
    pub fn new(
        source_path: impl Into<PathBuf>,
        text: impl Into<String>,
        input_language: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            text: text.into(),
            input_language: input_language.into(),
            format: format.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.source_path
    }

    /// Split this document into segments
    pub fn segments(&self, boundary: &str) -> Vec<Segment> {
        split(&self.text, boundary)
    }
}

/// One chunk of a document and its zero-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub text: String,
}

impl Segment {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Whitespace-only segments carry nothing to translate
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Split `text` on `boundary`.
///
/// An empty text yields exactly one empty segment. An empty boundary is
/// rejected by configuration validation; if one slips through, the whole
/// text comes back as a single segment.
pub fn split(text: &str, boundary: &str) -> Vec<Segment> {
    if boundary.is_empty() {
        return vec![Segment::new(0, text)];
    }

    text.split(boundary)
        .enumerate()
        .map(|(index, part)| Segment::new(index, part))
        .collect()
}

/// Join segment texts with `boundary`, the inverse of [`split`]
pub fn join<S: AsRef<str>>(parts: &[S], boundary: &str) -> String {
    let mut joined = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            joined.push_str(boundary);
        }
        joined.push_str(part.as_ref());
    }
    joined
}
