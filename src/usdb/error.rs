use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsdbError {
    #[error("download requires login")]
    AuthRequired,
    #[error("song has been deleted from USDB")]
    NotFound,
    #[error("request to USDB failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected USDB page format: {0}")]
    Parse(String),
}

impl UsdbError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        UsdbError::Parse(message.into())
    }

    /// Errors worth one more attempt with a fresh connection
    pub fn is_connection(&self) -> bool {
        match self {
            UsdbError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
