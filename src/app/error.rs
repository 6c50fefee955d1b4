use thiserror::Error;

/// Every variant is produced before any mutation takes place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("you need to sign in to do that")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("this account has been banned")]
    Banned,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("incorrect password")]
    WrongPassword,
    #[error("{0}")]
    Conflict(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
