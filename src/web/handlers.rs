// API handlers for the render server

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::{
    AppState, SharedState,
    error::ApiError,
    extract_request_data::{extract_body_diagram, extract_query_diagram},
    models::{DiagramQuery, DiagramRequest, ResponseMode},
    response::encode_render_result,
};
use crate::decoding::Encoding;

// --- POST /d2 ---
// Diagram from the raw body or a JSON `diagram` field; always answers with an envelope
pub async fn render_posted_diagram(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let text = match extract_body_diagram(&headers, body) {
        Ok(text) => text,
        Err(err) => return err.into_response(),
    };

    render(
        &state,
        DiagramRequest {
            text,
            mode: ResponseMode::Envelope,
        },
    )
    .await
}

// --- GET /d2/png?diagram=... ---
pub async fn render_png(
    State(state): State<SharedState>,
    query: Result<Query<DiagramQuery>, QueryRejection>,
) -> Response {
    render_query(&state, query, Encoding::Identity).await
}

// --- GET /d2/png/base64?diagram=... ---
pub async fn render_png_base64(
    State(state): State<SharedState>,
    query: Result<Query<DiagramQuery>, QueryRejection>,
) -> Response {
    render_query(&state, query, Encoding::Base64Url).await
}

// --- GET /d2/png/hex?diagram=... ---
pub async fn render_png_hex(
    State(state): State<SharedState>,
    query: Result<Query<DiagramQuery>, QueryRejection>,
) -> Response {
    render_query(&state, query, Encoding::Hex).await
}

// Fallback for any method a route does not serve
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn render_query(
    state: &AppState,
    query: Result<Query<DiagramQuery>, QueryRejection>,
    encoding: Encoding,
) -> Response {
    match extract_query_diagram(query, encoding) {
        Ok(text) => {
            render(
                state,
                DiagramRequest {
                    text: text.into_bytes(),
                    mode: ResponseMode::Raw,
                },
            )
            .await
        }
        Err(err) => err.into_response(),
    }
}

async fn render(state: &AppState, request: DiagramRequest) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("render", %request_id, mode = ?request.mode);

    async move {
        info!("Rendering diagram ({} bytes)", request.text.len());

        let result = state
            .renderer
            .render(&request.text)
            .await
            .map_err(ApiError::from);
        if let Ok(bytes) = &result {
            info!("Rendered {} bytes", bytes.len());
        }

        encode_render_result(request.mode, result)
    }
    .instrument(span)
    .await
}
