pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] diagview_core::Error),

    #[error("failed to start render workers: {0}")]
    Executor(#[source] std::io::Error),

    #[error("viewer state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no network loaded")]
    NoNetwork,
}

impl Error {
    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::Core(err) if err.is_load_error())
    }
}
