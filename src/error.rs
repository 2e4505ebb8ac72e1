use thiserror::Error;

use crate::types::CaseStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Permission(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },

    #[error("document storage error: {0}")]
    Storage(#[from] crate::documents::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Error::Permission(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
