use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Hook input error: {message}")]
    HookInput { message: String },
}

/// Document store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt document {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization failed for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Path of the document the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            StorageError::Io { path, .. }
            | StorageError::Corrupt { path, .. }
            | StorageError::Serialize { path, .. } => path,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{not json").unwrap_err()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::HookInput {
            message: "missing prompt".to_string(),
        };
        assert_eq!(err.to_string(), "Hook input error: missing prompt");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Io {
            path: PathBuf::from("/tmp/intent.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "I/O failed for /tmp/intent.json: denied");

        let err = StorageError::Corrupt {
            path: PathBuf::from("engine.json"),
            source: json_error(),
        };
        assert!(err.to_string().starts_with("Corrupt document engine.json:"));
    }

    #[test]
    fn test_storage_error_path() {
        let err = StorageError::Serialize {
            path: PathBuf::from("markov.json"),
            source: json_error(),
        };
        assert_eq!(err.path(), std::path::Path::new("markov.json"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "memorySize".to_string(),
            message: "must be a number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for memorySize: must be a number"
        );
    }

    #[test]
    fn test_storage_error_conversion_to_app_error() {
        let storage_err = StorageError::Io {
            path: PathBuf::from("guide.json"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        };
        let app_err: AppError = storage_err.into();
        assert!(matches!(app_err, AppError::Storage(_)));
        assert!(app_err.to_string().contains("guide.json"));
    }
}
