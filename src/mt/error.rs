/// Error types for the machine translation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MtError {
    /// The translation service could not be reached. Fatal for the whole run.
    ServiceUnavailable(String),
    /// The service answered but the reply was unusable
    TranslationError(String),
    /// Provider misconfiguration (bad endpoint, client build failure)
    ConfigError(String),
    /// Language code rejected before sending
    InvalidLocale(String),
    /// General error with context
    Other(String),
}

impl MtError {
    /// True when the error means the service itself is down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MtError::ServiceUnavailable(_))
    }
}

impl std::fmt::Display for MtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MtError::ServiceUnavailable(msg) => {
                write!(f, "Translation service unavailable: {}", msg)
            }
            MtError::TranslationError(msg) => write!(f, "Translation error: {}", msg),
            MtError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            MtError::InvalidLocale(msg) => write!(f, "Invalid locale: {}", msg),
            MtError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for MtError {}

impl From<reqwest::Error> for MtError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MtError::TranslationError(format!("Failed to decode response: {}", err))
        } else {
            MtError::ServiceUnavailable(err.to_string())
        }
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_service_outage_is_fatal() {
        assert!(MtError::ServiceUnavailable("connection refused".to_string()).is_fatal());
        assert!(!MtError::TranslationError("empty".to_string()).is_fatal());
        assert!(!MtError::ConfigError("bad url".to_string()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = MtError::ServiceUnavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Translation service unavailable: connection refused"
        );
        assert_eq!(MtError::Other("plain".to_string()).to_string(), "plain");
    }
}
