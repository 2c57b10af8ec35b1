//! HTTP error mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use bankline_core::Error;

/// Stable error code attached to failed responses for the request log
#[derive(Debug, Clone)]
pub struct ErrorCode(pub &'static str);

#[derive(Debug)]
pub enum ApiError {
    Ledger(Error),
    BadRequest(String),
    Unauthorized,
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err {
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::InvalidInput(_) | Error::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
                Error::Conflict(_) => StatusCode::CONFLICT,
                Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
                Error::Store(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Ledger(err) => err.code(),
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {:?}", self);
            "Internal server error".to_string()
        } else {
            match self {
                ApiError::Ledger(err) => err.to_string(),
                ApiError::BadRequest(msg) => msg,
                ApiError::Unauthorized => "Missing or invalid admin key".to_string(),
                ApiError::Internal(msg) => msg,
            }
        };

        let mut response = (status, Json(json!({ "error": message, "code": code }))).into_response();
        response.extensions_mut().insert(ErrorCode(code));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::not_found("account"), StatusCode::NOT_FOUND),
            (Error::invalid_input("amount"), StatusCode::BAD_REQUEST),
            (
                Error::InsufficientFunds {
                    requested: Decimal::ONE,
                    available: Decimal::ZERO,
                },
                StatusCode::BAD_REQUEST,
            ),
            (Error::Conflict("email".to_string()), StatusCode::CONFLICT),
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::store("disk"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_error_code_extension() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(
            response.extensions().get::<ErrorCode>().map(|c| c.0),
            Some("unauthorized")
        );
    }
}
