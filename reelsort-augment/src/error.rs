use thiserror::Error;

#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Generator returned status {0}")]
    Status(u16),

    #[error("Generator returned an empty response")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, AugmentError>;
