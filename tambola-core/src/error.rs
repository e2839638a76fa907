use thiserror::Error;

pub type Result<T> = std::result::Result<T, TambolaError>;

#[derive(Error, Debug)]
pub enum TambolaError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Stored marks are unreadable: {0}")]
    StorageRead(String),

    #[error("Game store is not ready yet")]
    StoreUnavailable,

    #[error("Game not found: {code}")]
    GameNotFound { code: String },

    #[error("Document not found: {collection}/{id}")]
    DocumentNotFound { collection: String, id: String },

    #[error("Only the host can start the game")]
    NotHost,

    #[error("Invalid lobby state: {0}")]
    InvalidState(String),

    #[error("No ticket loaded")]
    TicketNotLoaded,

    #[error("Invalid mark position: ({x}, {y})")]
    InvalidPoint { x: f64, y: f64 },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TambolaError {
    pub fn storage_read(msg: impl Into<String>) -> Self {
        Self::StorageRead(msg.into())
    }

    pub fn game_not_found(code: impl Into<String>) -> Self {
        Self::GameNotFound { code: code.into() }
    }

    pub fn document_not_found(collection: &str, id: &str) -> Self {
        Self::DocumentNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dialog(msg: impl Into<String>) -> Self {
        Self::Dialog(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
