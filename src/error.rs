use std::fmt;

#[derive(Debug)]
pub enum ChatError {
    ApiError {
        status: u16,
        message: String,
    },
    /// The service reported a failure through the `error` field of a stream record.
    ServiceError(String),
    ConfigError(String),
    SessionError(String),
    NetworkError(reqwest::Error),
    Timeout,
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            ChatError::ServiceError(msg) => write!(f, "Service error: {}", msg),
            ChatError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ChatError::SessionError(msg) => write!(f, "Session error: {}", msg),
            ChatError::NetworkError(e) => write!(f, "Network error: {}", e),
            ChatError::Timeout => write!(f, "Stream timeout"),
            ChatError::IoError(e) => write!(f, "IO error: {}", e),
            ChatError::JsonError(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::NetworkError(e) => Some(e),
            ChatError::IoError(e) => Some(e),
            ChatError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl ChatError {
    /// Whether this error ended a turn that the user may retry right away.
    pub fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            ChatError::ApiError { .. }
                | ChatError::ServiceError(_)
                | ChatError::NetworkError(_)
                | ChatError::IoError(_)
                | ChatError::Timeout
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::NetworkError(err)
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::IoError(err)
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::JsonError(err)
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::ConfigError(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
