use thiserror::Error;

/// Failures talking to the task backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {path} failed with status {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("response from {path} was malformed JSON: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Rejected(String),
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Short text suitable for a notification body.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Request { .. } => "Could not reach the server. Check your connection.".to_owned(),
            ApiError::Status { status, .. } => format!("The server answered with status {status}."),
            ApiError::Decode { .. } => "The server sent an unexpected response.".to_owned(),
            ApiError::Rejected(message) => message.clone(),
            ApiError::Configuration(message) => message.clone(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preferences file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode preferences: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for '{field}': {details}")]
    Invalid { field: String, details: String },
}
