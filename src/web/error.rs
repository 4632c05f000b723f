// Error types for the render API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

use crate::decoding::DecodeError;
use crate::renderer::RenderError;

/// Everything that can stop a request from producing an image.
///
/// As an HTTP response the error is a bare status code with an empty body; the
/// `POST /d2` handler reports it in-band instead.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("empty diagram")]
    EmptyInput,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Render(RenderError),

    #[error(transparent)]
    Timeout(RenderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::EmptyInput | Self::Decode(_) | Self::BadRequest(_) | Self::Render(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::EmptyDiagram => Self::EmptyInput,
            RenderError::TimedOut(_) => Self::Timeout(error),
            other => Self::Render(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed ({}): {}", status.as_u16(), self);
        status.into_response()
    }
}
