use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

/// Application configuration module
/// This module handles loading, validating and saving the pipeline settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Batch orchestration, timing and progress settings
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Anthropic Messages API
    #[default]
    Anthropic,
    // @provider: OpenAI Chat Completions API
    OpenAI,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAI => "OpenAI",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Anthropic => "anthropic".to_string(),
            Self::OpenAI => "openai".to_string(),
        }
    }

    // @returns: Environment variable consulted when no key is configured
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Operating tier: both run the same orchestration with different models
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationTier {
    /// Cheap model, no research phase
    Fast,
    /// Stronger model, research context folded into every batch prompt
    #[default]
    Premium,
}

impl std::fmt::Display for TranslationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model used by the fast tier
    #[serde(default = "String::new")]
    pub fast_model: String,

    // @field: Model used by the premium tier (and research)
    #[serde(default = "String::new")]
    pub premium_model: String,

    // @field: API key (empty = read from environment)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: HTTP client timeout seconds
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
            TranslationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                fast_model: default_anthropic_fast_model(),
                premium_model: default_anthropic_premium_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_anthropic_rate_limit(),
            },
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                fast_model: default_openai_fast_model(),
                premium_model: default_openai_premium_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_openai_rate_limit(),
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

    /// Operating tier
    #[serde(default)]
    pub tier: TranslationTier,

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
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token limit per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Orchestration, timing and progress settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Cues per request in the fast tier
    #[serde(default = "default_fast_batch_size")]
    pub fast_batch_size: usize,

    /// Cues per request in the premium tier
    #[serde(default = "default_premium_batch_size")]
    pub premium_batch_size: usize,

    /// Upper bound of the wave width in the fast tier
    #[serde(default = "default_fast_max_concurrency")]
    pub fast_max_concurrency: usize,

    /// Upper bound of the wave width in the premium tier
    #[serde(default = "default_premium_max_concurrency")]
    pub premium_max_concurrency: usize,

    /// Consecutive failed batches that trip the circuit breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,

    /// Minimum interval between translating-stage progress events
    #[serde(default = "default_progress_debounce_ms")]
    pub progress_debounce_ms: u64,

    /// Deadline for one batch request
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// File-level budget: fixed part
    #[serde(default = "default_file_timeout_base_secs")]
    pub file_timeout_base_secs: u64,

    /// File-level budget: added per cue
    #[serde(default = "default_file_timeout_per_cue_ms")]
    pub file_timeout_per_cue_ms: u64,

    /// File-level budget: hard ceiling
    #[serde(default = "default_file_timeout_ceiling_secs")]
    pub file_timeout_ceiling_secs: u64,

    /// Whether to re-time cues after translation
    #[serde(default = "default_true")]
    pub adjust_timing: bool,

    /// Whether to detect and retry lines left untranslated
    #[serde(default = "default_true")]
    pub validate_untranslated: bool,

    /// Delay between simulated stages of the fallback translator
    #[serde(default = "default_fallback_stage_delay_ms")]
    pub fallback_stage_delay_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fast_batch_size: default_fast_batch_size(),
            premium_batch_size: default_premium_batch_size(),
            fast_max_concurrency: default_fast_max_concurrency(),
            premium_max_concurrency: default_premium_max_concurrency(),
            failure_threshold: default_failure_threshold(),
            progress_debounce_ms: default_progress_debounce_ms(),
            batch_timeout_secs: default_batch_timeout_secs(),
            file_timeout_base_secs: default_file_timeout_base_secs(),
            file_timeout_per_cue_ms: default_file_timeout_per_cue_ms(),
            file_timeout_ceiling_secs: default_file_timeout_ceiling_secs(),
            adjust_timing: true,
            validate_untranslated: true,
            fallback_stage_delay_ms: default_fallback_stage_delay_ms(),
        }
    }
}

impl PipelineSettings {
    /// Validate ranges that would make orchestration meaningless
    pub fn validate(&self) -> Result<()> {
        if self.fast_batch_size == 0 || self.premium_batch_size == 0 {
            return Err(anyhow!("Batch sizes must be greater than zero"));
        }
        if self.fast_max_concurrency == 0 || self.premium_max_concurrency == 0 {
            return Err(anyhow!("Maximum concurrency must be greater than zero"));
        }
        if self.failure_threshold == 0 {
            return Err(anyhow!("Failure threshold must be greater than zero"));
        }
        if self.batch_timeout_secs == 0 {
            return Err(anyhow!("Batch timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_true() -> bool {
    true
}

fn default_fast_batch_size() -> usize {
    30
}

fn default_premium_batch_size() -> usize {
    25
}

fn default_fast_max_concurrency() -> usize {
    6
}

fn default_premium_max_concurrency() -> usize {
    5
}

fn default_failure_threshold() -> usize {
    5
}

fn default_progress_debounce_ms() -> u64 {
    500
}

fn default_batch_timeout_secs() -> u64 {
    90
}

fn default_file_timeout_base_secs() -> u64 {
    60
}

fn default_file_timeout_per_cue_ms() -> u64 {
    600
}

fn default_file_timeout_ceiling_secs() -> u64 {
    780 // stays under a 15 minute request ceiling with room for finalizing
}

fn default_fallback_stage_delay_ms() -> u64 {
    400
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_fast_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_anthropic_premium_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_openai_fast_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_openai_premium_model() -> String {
    "gpt-4.1".to_string()
}

fn default_anthropic_rate_limit() -> Option<u32> {
    // Slightly below the 50 requests per minute tier limit
    Some(45)
}

fn default_openai_rate_limit() -> Option<u32> {
    Some(60)
}

impl Config {
    /// Load the configuration file, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values.
    ///
    /// A missing API key is not an error: the pipeline degrades to the
    /// fallback translator in that case.
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::get_language_name(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::get_language_name(&self.target_language)
            .context("Invalid target language")?;

        self.pipeline.validate()?;
        validate_endpoint(&self.translation.get_endpoint())?;

        if !self.translation.has_api_key() {
            warn!(
                "No API key for {} (set it in the config or {}); translations will use the offline fallback",
                self.translation.provider.display_name(),
                self.translation.provider.api_key_env_var()
            );
        }

        Ok(())
    }
}

/// Endpoints must be absolute http(s) URLs with a host
fn validate_endpoint(endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint).with_context(|| format!("Invalid provider endpoint: {}", endpoint))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(anyhow!("Provider endpoint must be an http(s) URL: {}", endpoint));
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "cs".to_string(),
            translation: TranslationConfig::default(),
            pipeline: PipelineSettings::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Model for the given tier on the active provider
    pub fn get_model(&self, tier: TranslationTier) -> String {
        let configured = self.get_active_provider_config().map(|p| match tier {
            TranslationTier::Fast => p.fast_model.clone(),
            TranslationTier::Premium => p.premium_model.clone(),
        });
        if let Some(model) = configured.filter(|m| !m.is_empty()) {
            return model;
        }

        match (self.provider, tier) {
            (TranslationProvider::Anthropic, TranslationTier::Fast) => default_anthropic_fast_model(),
            (TranslationProvider::Anthropic, TranslationTier::Premium) => default_anthropic_premium_model(),
            (TranslationProvider::OpenAI, TranslationTier::Fast) => default_openai_fast_model(),
            (TranslationProvider::OpenAI, TranslationTier::Premium) => default_openai_premium_model(),
        }
    }

    /// Get the API key for the active provider, falling back to the environment
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.trim().is_empty() {
                return provider_config.api_key.trim().to_string();
            }
        }

        std::env::var(self.provider.api_key_env_var())
            .map(|k| k.trim().to_string())
            .unwrap_or_default()
    }

    /// Whether a provider can be called at all
    pub fn has_api_key(&self) -> bool {
        !self.get_api_key().is_empty()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
        }
    }

    /// Get the HTTP timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.rate_limit;
        }

        match self.provider {
            TranslationProvider::Anthropic => default_anthropic_rate_limit(),
            TranslationProvider::OpenAI => default_openai_rate_limit(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            tier: TranslationTier::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::OpenAI),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
