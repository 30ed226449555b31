use thiserror::Error;
use crate::blob::BlobError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ProofedError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },
    #[error("failed to upload media: {0}")]
    Upload(BlobError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ProofedError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }
}

pub type ProofedResult<T> = Result<T, ProofedError>;
