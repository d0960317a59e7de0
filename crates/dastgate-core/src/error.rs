//! Error types for dastgate

use thiserror::Error;

/// Main error type for scanner orchestration.
#[derive(Debug, Error)]
pub enum DastError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scanner request '{endpoint}' failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Scanner returned HTTP {status} for '{endpoint}': {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Scanner API error for '{endpoint}': {code} ({message})")]
    Api {
        endpoint: String,
        code: String,
        message: String,
    },

    #[error("Malformed scanner response for '{endpoint}': {detail}")]
    Malformed { endpoint: String, detail: String },

    #[error("Authentication verification failed: '{marker}' found in report after visiting {url}")]
    AuthVerification { url: String, marker: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl DastError {
    /// True for failures talking to the scanner itself.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            DastError::Transport { .. }
                | DastError::Http { .. }
                | DastError::Api { .. }
                | DastError::Malformed { .. }
        )
    }
}

/// Result type alias for dastgate operations
pub type Result<T> = std::result::Result<T, DastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_lists_every_name() {
        let err = DastError::MissingEnv(vec!["TARGET_URL".into(), "PASSWORD".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: TARGET_URL, PASSWORD"
        );
        assert!(!err.is_remote());
    }

    #[test]
    fn test_malformed_is_remote() {
        let err = DastError::Malformed {
            endpoint: "pscan/view/recordsToScan".into(),
            detail: "not a number".into(),
        };
        assert!(err.is_remote());
    }
}
