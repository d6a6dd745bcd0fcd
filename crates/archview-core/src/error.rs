pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Node '{id}' already exists")]
    DuplicateNode { id: String },

    #[error("Node '{id}' not found")]
    UnknownNode { id: String },

    #[error("Edge '{id}' not found")]
    UnknownEdge { id: String },
}
