use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("auth error: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("publish error: {0}")]
    Publish(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Short kind tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "auth",
            AppError::Network(_) => "network",
            AppError::Parse(_) => "parse",
            AppError::Publish(_) => "publish",
            AppError::Other(_) => "other",
        }
    }
}
