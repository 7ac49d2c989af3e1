use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeatmapError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
