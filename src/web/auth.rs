// Shared-secret gate applied in front of every route

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use headers::HeaderMapExt;
use tracing::debug;

use super::{error::ApiError, headers::Authentication};

/// Reject the request unless its `Authentication` header equals the configured secret.
///
/// Runs before routing decisions such as the method check, so an unauthenticated client
/// learns nothing beyond the 401.
pub async fn require_shared_secret(
    State(secret): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match request.headers().typed_get::<Authentication>() {
        Some(auth) if auth.matches(&secret) => Ok(next.run(request).await),
        Some(_) => {
            debug!("Authentication header does not match");
            Err(ApiError::Unauthorized)
        }
        None => {
            debug!("Authentication header missing");
            Err(ApiError::Unauthorized)
        }
    }
}
