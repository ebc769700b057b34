//! Mapping of handler errors to HTTP responses.
//!
//! # Design Decisions
//! - Business errors become ordinary 4xx responses; the middleware sees
//!   only the status code
//! - Bodies are short plain text, matching the other endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cart::CartError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Missing or malformed query parameter.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Cart(CartError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Cart(CartError::InvalidArgument(_) | CartError::OutOfRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::from(CartError::NotFound {
            user_id: "ghost".into(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let out_of_range = ApiError::from(CartError::OutOfRange { index: 5, size: 1 });
        assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);

        let invalid = ApiError::from(CartError::InvalidArgument("item".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        assert_eq!(
            ApiError::BadRequest("Missing user_id parameter".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
