//! API error type.
//!
//! Authentication failures are answered with 401; every other failure,
//! including bad client input, is a 500. Both carry a `{ "message" }` body.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use geometrics_assessment::AssessError;
use geometrics_database::DbError;
use geometrics_layers::LayerError;
use geometrics_server_models::ApiMessage;
use geometrics_spatial::viewport::ViewportError;
use thiserror::Error;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or bad credentials.
    #[error("{message}")]
    Unauthorized {
        /// Description of what went wrong.
        message: String,
    },

    /// Unusable request input.
    #[error("{message}")]
    BadRequest {
        /// Description of what went wrong.
        message: String,
    },

    /// The requested record does not exist.
    #[error("{message}")]
    NotFound {
        /// Description of what is missing.
        message: String,
    },

    /// Bad map viewport.
    #[error(transparent)]
    Viewport(#[from] ViewportError),

    /// Bad assessment area.
    #[error(transparent)]
    Assess(#[from] AssessError),

    /// Reference layer lookup failed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Database error.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Anything else.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong.
        message: String,
    },
}

impl ApiError {
    /// Shorthand for [`ApiError::Unauthorized`].
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Shorthand for [`ApiError::BadRequest`].
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Shorthand for [`ApiError::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for [`ApiError::Internal`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::debug!("Request rejected: {self}");
        }

        HttpResponse::build(status).json(ApiMessage {
            message: self.to_string(),
        })
    }
}
