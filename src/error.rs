use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    /// Server-reported failure; holds the `detail` text or a fixed fallback.
    #[error("{0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

impl From<reqwest::Error> for DashError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashError::Decode(err.to_string())
        } else {
            DashError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
