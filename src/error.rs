use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Draft creation failed: {0}")]
    Draft(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Timeout waiting for server response")]
    Timeout,

    #[error("{0}")]
    Custom(String),
}

impl AppError {
    /// Ошибки отдельных изображений не прерывают публикацию,
    /// всё остальное считается фатальным.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::Upload(_) | AppError::UnsupportedFormat(_))
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Custom(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Custom(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_errors_are_recoverable() {
        assert!(!AppError::Upload("40005".into()).is_fatal());
        assert!(!AppError::UnsupportedFormat("ftp://x".into()).is_fatal());
    }

    #[test]
    fn test_pipeline_errors_are_fatal() {
        assert!(AppError::Auth("invalid appsecret".into()).is_fatal());
        assert!(AppError::Draft("no media_id".into()).is_fatal());
        assert!(AppError::Validation("empty title".into()).is_fatal());
        assert!(AppError::Timeout.is_fatal());
    }

    #[test]
    fn test_remote_message_is_preserved() {
        let err = AppError::Auth("invalid credential (errcode: 40001)".into());
        assert!(err.to_string().contains("errcode: 40001"));
    }
}
