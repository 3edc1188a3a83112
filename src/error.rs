//! Error types for LeadFlow.

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required input file: {path}. {hint}")]
    MissingInputFile { path: String, hint: String },

    #[error("Failed to parse input file {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Mail transport errors (SMTP send + IMAP fetch).
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Mailbox authentication failed: {0}")]
    AuthFailed(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Calendar booking errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Booking failed: {0}")]
    BookingFailed(String),

    #[error("Calendar authentication failed: {0}")]
    AuthFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Pipeline stage errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Recruitment stage failed: {0}")]
    Recruitment(String),

    #[error("Outreach stage failed: {0}")]
    Outreach(String),

    #[error("Scheduling stage failed: {0}")]
    Scheduling(String),

    #[error("Analytics stage failed: {0}")]
    Analytics(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
