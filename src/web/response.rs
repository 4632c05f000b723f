use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::prelude::{BASE64_STANDARD, Engine as _};
use tracing::warn;

use super::{
    error::ApiError,
    models::{RenderEnvelope, ResponseMode},
};

/// Turn a render outcome into the response the route promises.
///
/// Raw mode signals errors through the status code; envelope mode always answers 200 and
/// carries the error message in the body.
pub fn encode_render_result(mode: ResponseMode, result: Result<Vec<u8>, ApiError>) -> Response {
    match (mode, result) {
        (ResponseMode::Raw, Ok(bytes)) => {
            let content_type = HeaderValue::from_static(sniff_content_type(&bytes));
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        (ResponseMode::Raw, Err(err)) => err.into_response(),
        (ResponseMode::Envelope, Ok(bytes)) => envelope(RenderEnvelope {
            png: Some(BASE64_STANDARD.encode(&bytes)),
            error: None,
        }),
        (ResponseMode::Envelope, Err(err)) => {
            warn!("Render failed, reporting in-band: {}", err);
            envelope(RenderEnvelope {
                png: None,
                error: Some(err.to_string()),
            })
        }
    }
}

fn envelope(body: RenderEnvelope) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

// Renderers write whatever the output extension asks for; only a handful of formats are
// worth naming.
fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type();
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let head = head.trim_start();
    if head.starts_with("<svg") || head.starts_with("<?xml") {
        return "image/svg+xml";
    }

    "application/octet-stream"
}
