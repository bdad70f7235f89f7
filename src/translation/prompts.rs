/*!
 * System prompt rendering.
 */

use crate::language_utils;

use super::chunker::Document;
use super::job::TranslationRequest;

/// Fill the `{input_language}`, `{output_language}` and `{format}`
/// placeholders of a system prompt template
pub fn render_system_prompt(template: &str, input_language: &str, output_language: &str, format: &str) -> String {
    template
        .replace("{input_language}", input_language)
        .replace("{output_language}", output_language)
        .replace("{format}", format)
}

/// Build the request for one segment of `document`
pub fn build_request(template: &str, document: &Document, target_language: &str, text: &str) -> TranslationRequest {
    let input_language = language_utils::display_name(&document.input_language);
    let output_language = language_utils::display_name(target_language);

    TranslationRequest {
        system_prompt: render_system_prompt(template, &input_language, &output_language, &document.format),
        input_language,
        output_language,
        format: document.format.clone(),
        text: text.to_string(),
    }
}
