use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode stored value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No data available")]
    NoData,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Admin credentials are not configured")]
    NotConfigured,

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Storage(#[from] StorageError),
}
