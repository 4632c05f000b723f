use axum::{
    body::Bytes,
    extract::{
        Query,
        rejection::{BytesRejection, QueryRejection},
    },
    http::{HeaderMap, header},
};
use tracing::debug;

use super::{
    error::ApiError,
    models::{DiagramJsonRequest, DiagramQuery},
};
use crate::decoding::Encoding;

/// Pull the `diagram` query parameter and decode it.
///
/// Missing, empty, and empty-after-decoding parameters are all rejected, so the renderer is
/// never started for them.
pub fn extract_query_diagram(
    query: Result<Query<DiagramQuery>, QueryRejection>,
    encoding: Encoding,
) -> Result<String, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::BadRequest(format!("Invalid query string: {}", e)))?;

    let raw = query
        .diagram()
        .filter(|diagram| !diagram.is_empty())
        .ok_or(ApiError::EmptyInput)?;
    debug!("Diagram parameter length: {}", raw.len());

    let text = encoding.decode(raw)?;
    debug!("Decoded diagram length: {} ({:?})", text.len(), encoding);

    if text.is_empty() {
        return Err(ApiError::EmptyInput);
    }
    Ok(text)
}

/// Pull the diagram out of a POST body, either JSON-wrapped or verbatim.
///
/// A raw body is passed on untouched, whether or not it is valid UTF-8.
pub fn extract_body_diagram(
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Vec<u8>, ApiError> {
    let body =
        body.map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

    if is_json_content_type(headers) {
        debug!("Received JSON diagram body ({} bytes)", body.len());
        let request: DiagramJsonRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
        Ok(request.diagram.into_bytes())
    } else {
        debug!("Received raw diagram body ({} bytes)", body.len());
        Ok(body.to_vec())
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|mime| mime.essence_str() == mime::APPLICATION_JSON.essence_str())
}
