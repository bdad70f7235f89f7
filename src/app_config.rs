use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::file_utils::FileManager;
use crate::language_utils;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language the input documents are written in
    pub input_language: String,

    /// Languages to translate into, in fan-out order
    pub output_languages: Vec<String>,

    /// Documents to translate, in order
    #[serde(default)]
    pub input_paths: Vec<PathBuf>,

    /// Output base paths, parallel to `input_paths` (empty = next to the inputs)
    #[serde(default)]
    pub output_paths: Vec<PathBuf>,

    /// Format descriptor passed to the model (e.g. "markdown", "json", "plain text")
    #[serde(default = "default_format")]
    pub format: String,

    /// Marker the documents are split on
    #[serde(default = "default_boundary")]
    pub boundary: String,

    /// Write every chunk outcome next to the artifact for inspection
    #[serde(default)]
    pub persist_chunks: bool,

    /// Retry policy for a single chunk
    #[serde(default)]
    pub retry: RetryConfig,

    /// What a permanently failed chunk turns into in the artifact
    #[serde(default)]
    pub failed_chunk_policy: FailedChunkPolicy,

    /// Placeholder text for failed chunks, `{index}` is the zero-based chunk position
    #[serde(default = "default_placeholder_template")]
    pub placeholder_template: String,

    /// How many (document, language) pairs run at the same time
    #[serde(default = "default_concurrent_pairs")]
    pub concurrent_pairs: usize,

    /// Optional path to write the run summary as JSON
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Bounded exponential backoff for one chunk
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Gap before the first retry, in seconds
    #[serde(default = "default_initial_gap_secs")]
    pub initial_gap_secs: f64,

    /// Multiplier applied to the gap after every retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_gap_secs: default_initial_gap_secs(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetryConfig {
    pub fn initial_gap(&self) -> Duration {
        Duration::from_secs_f64(self.initial_gap_secs)
    }

    /// Check the policy yields a bounded, strictly increasing gap sequence
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.initial_gap_secs.is_finite() || self.initial_gap_secs <= 0.0 {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "initial_gap_secs must be positive, got {}",
                self.initial_gap_secs
            )));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "backoff_factor must be greater than 1, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}

/// How a chunk that failed every attempt shows up in the reassembled artifact
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailedChunkPolicy {
    /// Insert the rendered placeholder template
    #[default]
    Placeholder,
    /// Insert the untranslated source chunk
    KeepSource,
    /// Leave the chunk out entirely
    Omit,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Hosted providers refuse requests without a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_ollama_rate_limit(),
            },
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_openai_rate_limit(),
            },
            TranslationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_anthropic_timeout_secs(),
                rate_limit: default_anthropic_rate_limit(),
            },
            TranslationProvider::LMStudio => Self {
                provider_type: "lmstudio".to_string(),
                model: default_lmstudio_model(),
                api_key: String::new(),
                endpoint: default_lmstudio_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_lmstudio_rate_limit(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {input_language}, {output_language}, {format}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    /// Lower values make output more deterministic, higher values more creative
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

fn default_boundary() -> String {
    "\n\n".to_string()
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_gap_secs() -> f64 {
    3.0
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_placeholder_template() -> String {
    "[untranslated chunk {index}]".to_string()
}

fn default_concurrent_pairs() -> usize {
    1
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_anthropic_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional translator. Translate the following {format} text from {input_language} to {output_language}. \
     Preserve the structure, formatting and tone of the original. \
     Only respond with the translated text, without any explanations or notes."
        .to_string()
}

fn default_anthropic_rate_limit() -> Option<u32> {
    // Anthropic's standard rate limit is 50 requests per minute
    Some(45)
}

// Default rate limits for providers
fn default_ollama_rate_limit() -> Option<u32> {
    None // No rate limit by default for local provider
}

fn default_openai_rate_limit() -> Option<u32> {
    Some(60) // 60 requests per minute by default
}

// LM Studio is local; do not enforce rate limiting by default
fn default_lmstudio_rate_limit() -> Option<u32> {
    None
}

impl Config {
    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values.
    ///
    /// Input files are only checked for existence here; reading them happens
    /// when the documents are loaded, still before any remote call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_language.trim().is_empty() {
            return Err(ConfigError::InvalidLanguage("input language is empty".to_string()));
        }

        if self.output_languages.is_empty() {
            return Err(ConfigError::NoTargetLanguages);
        }

        if let Some(empty) = self.output_languages.iter().find(|l| l.trim().is_empty()) {
            return Err(ConfigError::InvalidLanguage(format!("output language {:?} is empty", empty)));
        }

        if self.boundary.is_empty() {
            return Err(ConfigError::EmptyBoundary);
        }

        if self.input_paths.is_empty() {
            return Err(ConfigError::NoInputs);
        }

        if !self.output_paths.is_empty() && self.output_paths.len() != self.input_paths.len() {
            return Err(ConfigError::OutputPathMismatch {
                inputs: self.input_paths.len(),
                outputs: self.output_paths.len(),
            });
        }

        if let Some(missing) = self.input_paths.iter().find(|p| !p.is_file()) {
            return Err(ConfigError::MissingInput(missing.clone()));
        }

        self.check_artifact_paths()?;

        self.retry.validate()?;

        if self.concurrent_pairs == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(ConfigError::MissingApiKey(
                self.translation.provider.display_name().to_string(),
            ));
        }

        let endpoint = self.translation.get_endpoint();
        match url::Url::parse(&endpoint) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(ConfigError::InvalidEndpoint {
                    reason: format!("unsupported scheme {:?}", parsed.scheme()),
                    endpoint,
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidEndpoint {
                    reason: e.to_string(),
                    endpoint,
                });
            }
        }

        Ok(())
    }

    /// Every (input, language) pair must own a distinct artifact path
    fn check_artifact_paths(&self) -> Result<(), ConfigError> {
        let languages = self.unique_output_languages();
        let mut owners: HashMap<PathBuf, String> = HashMap::new();

        for (index, input) in self.input_paths.iter().enumerate() {
            if self.input_paths[..index].contains(input) {
                return Err(ConfigError::DuplicateInput(input.clone()));
            }

            let Some(base_path) = self.output_base_path(index) else {
                continue;
            };
            for language in &languages {
                let path = FileManager::artifact_path(base_path, &language_utils::language_key(language));
                let owner = format!("{:?} into {}", input, language);
                if let Some(first) = owners.insert(path.clone(), owner.clone()) {
                    return Err(ConfigError::ArtifactCollision {
                        path,
                        first,
                        second: owner,
                    });
                }
            }
        }

        Ok(())
    }

    /// Output languages with duplicates removed, first occurrence wins
    pub fn unique_output_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::with_capacity(self.output_languages.len());
        for language in &self.output_languages {
            let language = language.trim();
            let duplicate = languages.iter().any(|seen| {
                seen.eq_ignore_ascii_case(language) || language_utils::language_codes_match(seen, language)
            });
            if !duplicate {
                languages.push(language.to_string());
            }
        }
        languages
    }

    /// Output base path for the input at `index`
    pub fn output_base_path(&self, index: usize) -> Option<&Path> {
        self.output_paths
            .get(index)
            .or_else(|| self.input_paths.get(index))
            .map(PathBuf::as_path)
    }
}

/// Resolve `\n`, `\t`, `\r` and `\\` escapes typed on a command line
pub fn unescape_boundary(raw: &str) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            input_language: "english".to_string(),
            output_languages: vec!["french".to_string()],
            input_paths: Vec::new(),
            output_paths: Vec::new(),
            format: default_format(),
            boundary: default_boundary(),
            persist_chunks: false,
            retry: RetryConfig::default(),
            failed_chunk_policy: FailedChunkPolicy::default(),
            placeholder_template: default_placeholder_template(),
            concurrent_pairs: default_concurrent_pairs(),
            report_path: None,
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider, created from defaults if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // Default fallback - Ollama doesn't use API keys
        String::new()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// Maximum requests in flight against the provider at once
    pub fn get_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests)
            .filter(|n| *n > 0)
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Per-request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        if let Some(provider_config) = self.get_active_provider_config() {
            if provider_config.timeout_secs > 0 {
                return provider_config.timeout_secs;
            }
        }

        match self.provider {
            TranslationProvider::Anthropic => default_anthropic_timeout_secs(),
            _ => default_timeout_secs(),
        }
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.rate_limit;
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::Ollama => default_ollama_rate_limit(),
            TranslationProvider::OpenAI => default_openai_rate_limit(),
            TranslationProvider::Anthropic => default_anthropic_rate_limit(),
            TranslationProvider::LMStudio => default_lmstudio_rate_limit(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        let mut config = Self {
            provider: TranslationProvider::default(),
            available_providers: Vec::new(),
            common: TranslationCommonConfig::default(),
        };

        // Add default providers
        config.available_providers.push(ProviderConfig::new(TranslationProvider::Ollama));
        config.available_providers.push(ProviderConfig::new(TranslationProvider::OpenAI));
        config.available_providers.push(ProviderConfig::new(TranslationProvider::Anthropic));
        config.available_providers.push(ProviderConfig::new(TranslationProvider::LMStudio));

        config
    }
}
