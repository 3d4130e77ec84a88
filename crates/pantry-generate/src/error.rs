use thiserror::Error;

/// Everything that can go wrong between the wizard handing over its input and a
/// recipe coming back. `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key not configured. Set OPENROUTER_API_KEY or add an apiKey to settings.json.")]
    Configuration,

    #[error("Rate limit reached. Please wait a moment and try again.")]
    RateLimited,

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Network error. Please check your internet connection.")]
    Network(String),

    #[error("No response received from AI")]
    EmptyResponse { raw: String },

    #[error("Failed to parse recipe from AI response")]
    Parse(String),

    #[error("{0}")]
    Unknown(String),
}

impl GenerationError {
    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Configuration => "configuration",
            GenerationError::RateLimited => "rate_limit",
            GenerationError::Remote { .. } => "remote",
            GenerationError::Network(_) => "network",
            GenerationError::EmptyResponse { .. } => "empty_response",
            GenerationError::Parse(_) => "parse",
            GenerationError::Unknown(_) => "unknown",
        }
    }
}
