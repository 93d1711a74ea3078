use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Corrupt table {}: {reason}", path.display())]
    CorruptTable { path: PathBuf, reason: String },

    #[error("Store is closed")]
    Closed,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing argument <{argument}> for command '{command}'")]
    MissingArgument { command: String, argument: String },

    #[error("Unsupported command: {command}")]
    UnsupportedCommand { command: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl KvError {
    pub fn not_found(key: &[u8]) -> Self {
        KvError::NotFound {
            key: String::from_utf8_lossy(key).into_owned(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        KvError::CorruptTable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            KvError::NotFound { .. }
            | KvError::MissingArgument { .. }
            | KvError::UnsupportedCommand { .. }
            | KvError::InvalidInput { .. } => ErrorSeverity::Low,
            KvError::IoError(_) | KvError::Closed => ErrorSeverity::Medium,
            KvError::NotADirectory { .. }
            | KvError::ConfigError { .. }
            | KvError::ConfigValidationError { .. }
            | KvError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            KvError::CorruptTable { .. } => ErrorSeverity::Critical,
        }
    }

    /// Exit code for the binary when this error aborts it.
    pub fn exit_code(&self) -> u8 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            KvError::NotFound { .. } => "absent".to_string(),
            KvError::NotADirectory { path } => {
                format!("Data path {} exists but is not a directory", path.display())
            }
            KvError::CorruptTable { path, .. } => {
                format!("Table file {} is damaged", path.display())
            }
            KvError::ConfigError { .. }
            | KvError::ConfigValidationError { .. }
            | KvError::InvalidConfigValueError { .. } => format!("Bad configuration: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            KvError::NotFound { .. } => "Check the key spelling or list keys with 'range'",
            KvError::IoError(_) => "Check disk space and permissions of the data directory",
            KvError::NotADirectory { .. } => "Point --data-dir at a directory or remove the file",
            KvError::CorruptTable { .. } => {
                "Move the damaged .sst file out of the data directory and restart"
            }
            KvError::Closed => "Reopen the store before issuing more commands",
            KvError::ConfigError { .. }
            | KvError::ConfigValidationError { .. }
            | KvError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags"
            }
            KvError::MissingArgument { .. } | KvError::UnsupportedCommand { .. } => {
                "Type 'help' to list supported commands"
            }
            KvError::InvalidInput { .. } => "Send commands as UTF-8 text, one per line",
        }
    }
}

pub type Result<T> = std::result::Result<T, KvError>;
