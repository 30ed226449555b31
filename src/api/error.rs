use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::error;
use crate::error::ProofedError;
use crate::storage::StorageError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("error in the request body")]
    UnprocessableEntity {
        errors: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>,
    },

    #[error("request body is too large")]
    PayloadTooLarge,

    #[error("failed to store media: {0}")]
    BadGateway(String),

    #[error("an error occurred with the storage: {0}")]
    Storage(#[from] StorageError),

    #[error("an internal server error occurred: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unprocessable_entity<K, V>(errors: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        let mut error_map = HashMap::new();

        for (key, val) in errors {
            error_map
                .entry(key.into())
                .or_insert_with(Vec::new)
                .push(val.into());
        }

        Self::UnprocessableEntity { errors: error_map }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProofedError> for ApiError {
    fn from(value: ProofedError) -> Self {
        match value {
            ProofedError::Validation { field, message } => Self::unprocessable_entity([(field, message)]),
            e @ ProofedError::NotFound { .. } => Self::NotFound(e.to_string()),
            ProofedError::Upload(e) => Self::BadGateway(e.to_string()),
            ProofedError::Storage(e) => Self::Storage(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::UnprocessableEntity { errors } => {
                #[derive(serde::Serialize)]
                struct Errors {
                    errors: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>,
                }

                return (StatusCode::UNPROCESSABLE_ENTITY, Json(Errors { errors })).into_response();
            }

            Self::BadGateway(ref e) => {
                error!("Upload error: {}", e);
            }

            Self::Storage(ref e) => {
                error!("Storage error: {:?}", e);
            }

            Self::Anyhow(ref e) => {
                error!("Generic error: {:?}", e);
            }

            _ => (),
        }

        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobError;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ProofedError::validation("title", "must not be empty"), StatusCode::UNPROCESSABLE_ENTITY),
            (ProofedError::not_found("project", "p1"), StatusCode::NOT_FOUND),
            (ProofedError::Upload(BlobError::upload_failed("quota")), StatusCode::BAD_GATEWAY),
            (ProofedError::Storage(StorageError::corrupted("bad row")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }
}
