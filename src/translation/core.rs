/*!
 * Core translation service implementation.
 *
 * This module contains the `Translator` seam used by the retry executor and
 * the `TranslationService`, which performs one remote call per segment
 * against the configured provider.
 */

use async_trait::async_trait;
use log::trace;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;

use super::concurrency::RequestThrottle;
use super::job::{Translation, TranslationRequest};

/// One remote translation of one segment
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `request.text`; exactly one remote invocation per call
    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, ProviderError>;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for Arc<T> {
    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, ProviderError> {
        (**self).translate(request).await
    }
}

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    /// Ollama LLM service
    Ollama {
        /// Client instance
        client: Ollama,
    },

    /// OpenAI API service, or LM Studio through its OpenAI-compatible server
    OpenAI {
        /// Client instance
        client: OpenAI,
    },

    /// Anthropic API service
    Anthropic {
        /// Client instance
        client: Anthropic,
    },
}

/// Translation service backed by the configured provider
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// Connection slots shared by all concurrent callers
    slots: Semaphore,

    /// Spacing of request starts under the provider's rate limit
    throttle: RequestThrottle,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Self {
        let endpoint = config.get_endpoint();
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::new(endpoint, timeout_secs),
            },
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new(config.get_api_key(), endpoint, timeout_secs),
            },
            ConfigTranslationProvider::LMStudio => {
                // LM Studio often doesn't require an API key; use a default if empty
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };
                TranslationProviderImpl::OpenAI {
                    client: OpenAI::new(api_key, endpoint, timeout_secs),
                }
            }
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(config.get_api_key(), endpoint, timeout_secs),
            },
        };

        Self {
            provider,
            slots: Semaphore::new(config.get_concurrent_requests()),
            throttle: RequestThrottle::from_rate_limit(config.get_rate_limit()),
            config,
        }
    }

    /// Human-readable provider and model, for logs and summaries
    pub fn describe(&self) -> String {
        format!("{} ({})", self.config.provider.display_name(), self.config.get_model())
    }

    async fn call<P: Provider>(&self, client: &P, request: &TranslationRequest) -> Result<Translation, ProviderError> {
        let provider_request = client.build_request(
            request,
            &self.config.get_model(),
            self.config.common.temperature,
        );
        let response = client.complete(provider_request).await?;
        P::extract_translation(&response)
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, ProviderError> {
        let _permit = self.slots.acquire().await
            .map_err(|e| ProviderError::RequestFailed(format!("Connection pool closed: {}", e)))?;
        self.throttle.acquire().await;

        let start_time = Instant::now();
        let result = match &self.provider {
            TranslationProviderImpl::Ollama { client } => self.call(client, request).await,
            TranslationProviderImpl::OpenAI { client } => self.call(client, request).await,
            TranslationProviderImpl::Anthropic { client } => self.call(client, request).await,
        };

        trace!(
            "{} call for {} chars finished in {:?}",
            self.config.provider.display_name(),
            request.text.len(),
            start_time.elapsed()
        );
        result
    }
}
