pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The mount point does not exist. There is nothing to render into.
    #[error("Render container '{container}' does not exist")]
    MissingContainer { container: String },

    #[error(transparent)]
    Core(#[from] archview_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
