use crate::domain::model::AdFormat;
use thiserror::Error;

/// Failure reported by an ad provider for a single load request.
///
/// Never fatal: the deficit persists and the next reconciliation retries it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No fill available for this placement")]
    NoFill,

    #[error("Ad network rejected the request ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Provider returned a {actual} ad for a {expected} request")]
    FormatMismatch { expected: AdFormat, actual: AdFormat },

    #[error("Load request was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentError {
    #[error("No presenter available to show the ad")]
    NoPresenterAvailable,

    #[error("Presentation failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum CacherError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Scheduler error: {message}")]
    SchedulerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CacherError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CacherError::IoError(_) => ErrorCategory::Io,
            CacherError::SchedulerError { .. } => ErrorCategory::Runtime,
            CacherError::TomlError(_)
            | CacherError::ConfigError { .. }
            | CacherError::ConfigValidationError { .. }
            | CacherError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CacherError::IoError(_) => ErrorSeverity::Medium,
            CacherError::SchedulerError { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CacherError::IoError(_) => {
                "Check that the configuration file exists and is readable".to_string()
            }
            CacherError::TomlError(_) => {
                "Fix the TOML syntax; placements are declared with [[placements]]".to_string()
            }
            CacherError::ConfigError { .. } | CacherError::ConfigValidationError { .. } => {
                "Review the [cacher] and [[placements]] sections".to_string()
            }
            CacherError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}'", field)
            }
            CacherError::SchedulerError { .. } => {
                "Run the cacher inside a Tokio runtime with a refresh interval of at most a day"
                    .to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("Could not read input: {}", self),
            ErrorCategory::Runtime => format!("Cacher could not start: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_and_category() {
        let err = CacherError::InvalidConfigValueError {
            field: "cacher.refresh_interval_seconds".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err
            .recovery_suggestion()
            .contains("cacher.refresh_interval_seconds"));

        let err = CacherError::SchedulerError {
            message: "no runtime".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Runtime);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError::FormatMismatch {
            expected: AdFormat::Interstitial,
            actual: AdFormat::AppOpen,
        };
        assert_eq!(
            err.to_string(),
            "Provider returned a app_open ad for a interstitial request"
        );
    }
}
