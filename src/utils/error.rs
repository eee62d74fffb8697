use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to fetch ATT&CK catalog from {url}: {reason}")]
    CatalogFetchError { url: String, reason: String },

    #[error("Failed to decode ATT&CK catalog from {url}: {message}")]
    CatalogParseError { url: String, message: String },

    #[error("Failed to fetch content from {url}: {reason}")]
    TargetFetchError { url: String, reason: String },

    #[error("Failed to read file {path}: {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Conflicting options: {message}")]
    ConflictingOptions { message: String },

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl EtlError {
    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::CatalogFetchError { url, reason } => {
                format!("Error fetching ATT&CK data: {} (URL attempted: {})", reason, url)
            }
            EtlError::CatalogParseError { message, .. } => {
                format!("Error decoding ATT&CK data: {}", message)
            }
            EtlError::TargetFetchError { url, reason } => {
                format!("Error: Could not fetch content from {} ({})", url, reason)
            }
            EtlError::FileReadError { path, source } => {
                format!("Error reading file {}: {}", path, source)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::CatalogFetchError { .. } | EtlError::CatalogParseError { .. } => {
                "Check network access and that --attack-version names a published ATT&CK release"
            }
            EtlError::TargetFetchError { .. } | EtlError::HttpError(_) => {
                "Check the URL, or save the page locally and use --file"
            }
            EtlError::FileReadError { .. } | EtlError::IoError(_) => {
                "Check that the path exists and is readable UTF-8 text"
            }
            EtlError::SerializationError(_) => "Report this as a bug",
            EtlError::ConflictingOptions { .. } => {
                "Use at most one of --force-html and --force-text"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Review the command-line arguments and the --config file"
            }
        }
    }

    /// 依錯誤類型決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self {
            EtlError::ConflictingOptions { .. }
            | EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => 2,
            EtlError::CatalogFetchError { .. }
            | EtlError::CatalogParseError { .. }
            | EtlError::TargetFetchError { .. }
            | EtlError::HttpError(_) => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
