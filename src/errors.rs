/*!
 * Error types for the subcontext pipeline.
 *
 * Typed errors live at the library boundaries (providers, subtitle input,
 * translation jobs); application plumbing uses `anyhow` on top of them.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete within its deadline
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether a retry of the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur while reading subtitle input
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// Nothing to translate
    #[error("Subtitle input contains no entries")]
    EmptyInput,

    /// A block of the container could not be parsed
    #[error("Parse error in block {block}: {message}")]
    Parse {
        /// 1-based block position in the file
        block: usize,
        /// What went wrong
        message: String,
    },

    /// A cue ends before (or when) it starts
    #[error("Invalid time range for cue {index}: {start_ms} -> {end_ms}")]
    InvalidTiming {
        index: usize,
        start_ms: u64,
        end_ms: u64,
    },
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error with subtitle input
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// The job was cancelled by its owner
    #[error("Translation job {0} was cancelled")]
    Cancelled(String),
}
