//! Domain error types.

/// Top-level error type for shipscope.
#[derive(Debug, thiserror::Error)]
pub enum ShipscopeError {
    #[error("failed to load {path}: {reason}")]
    DataLoad { path: String, reason: String },

    #[error("missing column '{column}' in {path}")]
    MissingColumn { path: String, column: String },

    #[error("invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid filter criteria: {reason}")]
    InvalidCriteria { reason: String },

    #[error("access denied for user '{user}'")]
    AccessDenied { user: String },

    #[error("forecast unavailable: {0}")]
    ForecastUnavailable(#[from] crate::domain::forecast::ForecastError),

    #[error(transparent)]
    Session(#[from] crate::domain::session::SessionError),

    #[error("language model request failed: {reason}")]
    LanguageModel { reason: String },

    #[error("malformed language model response: {reason}")]
    MalformedResponse { reason: String },

    #[error("report rendering failed: {reason}")]
    Render { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShipscopeError {
    /// Errors that only affect one view; the caller keeps rendering the rest.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShipscopeError::ForecastUnavailable(_)
                | ShipscopeError::LanguageModel { .. }
                | ShipscopeError::MalformedResponse { .. }
        )
    }
}

impl From<&ShipscopeError> for std::process::ExitCode {
    fn from(err: &ShipscopeError) -> Self {
        let code: u8 = match err {
            ShipscopeError::Io(_) | ShipscopeError::Render { .. } => 1,
            ShipscopeError::ConfigParse { .. }
            | ShipscopeError::ConfigMissing { .. }
            | ShipscopeError::ConfigInvalid { .. } => 2,
            ShipscopeError::DataLoad { .. }
            | ShipscopeError::MissingColumn { .. }
            | ShipscopeError::InvalidRecord { .. } => 3,
            ShipscopeError::InvalidCriteria { .. } | ShipscopeError::Session(_) => 4,
            ShipscopeError::ForecastUnavailable(_)
            | ShipscopeError::LanguageModel { .. }
            | ShipscopeError::MalformedResponse { .. } => 5,
            ShipscopeError::AccessDenied { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
