pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load network from {source_name}: {message}")]
    Load {
        source_name: String,
        message: String,
    },

    #[error("network JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate identifier in network: {id}")]
    DuplicateId { id: String },

    #[error("branch {branch} references unknown voltage level {voltage_level}")]
    UnknownVoltageLevel {
        branch: String,
        voltage_level: String,
    },

    #[error("unknown container: {id}")]
    UnknownContainer { id: String },

    #[error("unknown switch: {id}")]
    UnknownSwitch { id: String },

    #[error("invalid render parameters: {message}")]
    InvalidParameters { message: String },
}

impl Error {
    /// Wraps any failure that happened while turning a case file into a [`crate::Network`].
    pub fn load(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Load {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }

    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::Load { .. })
    }
}
