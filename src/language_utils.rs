use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for configured input/output languages
///
/// Languages may be configured either as ISO 639-1 (2-letter) or
/// ISO 639-2 (3-letter) codes, or by their English name ("french").
/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Resolve a configured language (code or English name) to an ISO language
pub fn resolve_language(language: &str) -> Option<Language> {
    let normalized = language.trim().to_lowercase();

    match normalized.len() {
        0 => None,
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(part2b, _)| *part2b == normalized)
                .map(|(_, part2t)| *part2t)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(part2t).or_else(|| from_english_name(&normalized))
        }
        _ => from_english_name(&normalized),
    }
}

// isolang stores English names capitalized ("French")
fn from_english_name(normalized: &str) -> Option<Language> {
    let mut chars = normalized.chars();
    let first = chars.next()?;
    let capitalized: String = first.to_uppercase().chain(chars).collect();
    Language::from_name(&capitalized)
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(language: &str) -> Result<String> {
    resolve_language(language)
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language: {}", language))
}

/// Check if two configured languages represent the same language
pub fn language_codes_match(first: &str, second: &str) -> bool {
    match (resolve_language(first), resolve_language(second)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name used in prompts
pub fn get_language_name(language: &str) -> Result<String> {
    resolve_language(language)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language: {}", language))
}

/// Short, filesystem-safe key for a language, used in output file names.
///
/// Known languages map to their ISO 639-1 code (or 639-3 when no 2-letter
/// code exists); anything else becomes a lowercase slug of the given name.
pub fn language_key(language: &str) -> String {
    if let Some(lang) = resolve_language(language) {
        return lang
            .to_639_1()
            .map(str::to_string)
            .unwrap_or_else(|| lang.to_639_3().to_string());
    }

    let slug: String = language
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() { "unknown".to_string() } else { slug }
}

/// Display name for a configured language: the English name when known,
/// otherwise the configured string as is
pub fn display_name(language: &str) -> String {
    get_language_name(language).unwrap_or_else(|_| language.trim().to_string())
}
