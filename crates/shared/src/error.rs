use thiserror::Error;

/// Everything that can go wrong between a topic being submitted and a post
/// being shown. None of these are fatal to the server; `Config` only stops
/// startup.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by {provider}: {message}")]
    RateLimited { provider: String, message: String },

    #[error("Quota exceeded for {provider}: {message}")]
    Quota { provider: String, message: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Short label shown above the detail in the UI banner.
    pub fn label(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Configuration problem",
            AppError::Network(_) => "Search failed",
            AppError::RateLimited { .. } => "Rate limit reached",
            AppError::Quota { .. } => "Quota exhausted",
            AppError::Model(_) => "Language model failed",
            AppError::InvalidInput(_) => "Cannot do that yet",
        }
    }

    pub fn user_message(&self) -> String {
        format!("{}: {}", self.label(), self)
    }

    /// Maps a reqwest failure on a search call.
    pub(crate) fn from_search_transport(source: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Network(format!("{} timed out", source))
        } else {
            AppError::Network(format!("{} request failed: {}", source, err))
        }
    }

    /// Maps a reqwest failure on a completion call. Transport problems on the
    /// model side are model errors, not network errors.
    pub(crate) fn from_model_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Model(format!("{} request timed out", provider))
        } else {
            AppError::Model(format!("Failed to send request to {}: {}", provider, err))
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
