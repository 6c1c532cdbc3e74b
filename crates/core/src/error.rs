//! Error types for the Briefsmith domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Briefsmith operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Drafting / retrieval backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Document extraction errors ---
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    // --- Document conversion errors ---
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    // --- Knowledge store registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend rejected a request parameter it does not know.
    ///
    /// Drives the retrieve fallback: attempt the richer call with
    /// `include`, and on this variant only, fall back to the reduced
    /// call.
    #[error("Unsupported parameter: {0}")]
    UnsupportedParameter(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("Document upload failed: {0}")]
    Upload(String),

    #[error("Extraction generation failed: {0}")]
    Generation(String),

    #[error("Extraction backend error: {message} (status: {status_code})")]
    Backend { status_code: u16, message: String },
}

#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error("Conversion service error: {0}")]
    Service(String),

    #[error("Conversion timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Conversion reported success but returned no download URL")]
    MissingUrl,
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("No knowledge store configured for category '{0}'; provision it via the admin commands")]
    NotConfigured(String),

    #[error("Store provisioning failed: {0}")]
    Provision(String),

    #[error("Failed to persist registry: {0}")]
    Persist(String),
}
