use chata_store::{ErrorKind, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("user {0} does not exist")]
    UnknownUser(String),

    #[error("chat not found")]
    ChatNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Boundary class for this error; the HTTP layer maps it to a status.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::BadRequest(_) | ServiceError::UnknownUser(_) => ErrorKind::Invalid,
            ServiceError::ChatNotFound => ErrorKind::NotFound,
            ServiceError::Store(e) => e.kind(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(ServiceError::UnknownUser("x".into()).status_code(), 400);
        assert_eq!(ServiceError::ChatNotFound.status_code(), 404);
        assert_eq!(
            ServiceError::from(StoreError::UserExists("x".into())).status_code(),
            409
        );
        assert_eq!(
            ServiceError::from(StoreError::Task("boom".into())).status_code(),
            500
        );
    }
}
