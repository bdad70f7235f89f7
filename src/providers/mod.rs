/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration (also used for LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: scriptable in-process translator for tests
 *
 * Clients make exactly one HTTP request per call and never retry on their
 * own; retrying is the job of the retry executor.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::translation::job::{Translation, TranslationRequest};

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Build the provider-specific request for one segment
    fn build_request(&self, request: &TranslationRequest, model: &str, temperature: f32) -> Self::Request;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Extract the translated text and token usage from a response
    fn extract_translation(response: &Self::Response) -> Result<Translation, ProviderError>;
}

/// Read an error body for reporting, tolerating unreadable bodies
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string())
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
