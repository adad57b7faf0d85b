use chata_shared::{IdentityError, RoleError};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record failed its own validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The id cannot be used as a file name inside the store directory.
    #[error("invalid record key: {0:?}")]
    InvalidKey(String),

    /// Generic I/O error (missing file, permission denied, absent directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record is not a well-formed document.
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// A record could not be encoded, e.g. because of an invalid role.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Role error: {0}")]
    Role(#[from] RoleError),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("user id: {0} already exists")]
    UserExists(String),

    #[error("session for users {0} and {1} not found")]
    SessionNotFound(String, String),

    /// The id is already taken by a session between other users.
    #[error("session id: {0} already belongs to another pair of users")]
    SessionExists(String),

    /// A bulk load committed what it could; `last` is the final failure seen.
    #[error("{failures} record(s) failed to load, last error: {last}")]
    Load {
        failures: usize,
        last: Box<StoreError>,
    },

    /// A loader task panicked or was cancelled.
    #[error("Load task failed: {0}")]
    Task(String),
}

/// Reasons a record is rejected before it is persisted or indexed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("id cannot be empty")]
    EmptyId,

    #[error("name cannot be empty")]
    EmptyName,

    #[error("user public key cannot be empty")]
    MissingKey,

    #[error("cannot chat with yourself")]
    SelfSession,

    #[error("session id {found} does not match participants (expected {expected})")]
    SessionIdMismatch { expected: String, found: String },

    #[error("record id {id} does not match its file name {file}")]
    FileNameMismatch { file: String, id: String },
}

/// How a boundary layer should report an error to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Invalid => 400,
            ErrorKind::Internal => 500,
        }
    }
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) | StoreError::InvalidKey(_) | StoreError::Role(_) => {
                ErrorKind::Invalid
            }
            StoreError::UserNotFound(_) | StoreError::SessionNotFound(..) => ErrorKind::NotFound,
            StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            StoreError::UserExists(_) | StoreError::SessionExists(_) => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
