use super::{AppState, auth, handlers};
use crate::config::ServerConfig;
use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get, routing::post};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::Level;

pub fn create_app(config: &ServerConfig) -> Router {
    let state = Arc::new(AppState {
        renderer: config.renderer.clone(),
    });

    let mut app = Router::new()
        // Body protocol, JSON envelope response
        .route(
            "/d2",
            post(handlers::render_posted_diagram).fallback(handlers::method_not_allowed),
        )
        // Query protocol, raw image response; `get` also answers HEAD unless told otherwise
        .route(
            "/d2/png",
            get(handlers::render_png)
                .head(handlers::method_not_allowed)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/d2/png/base64",
            get(handlers::render_png_base64)
                .head(handlers::method_not_allowed)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/d2/png/hex",
            get(handlers::render_png_hex)
                .head(handlers::method_not_allowed)
                .fallback(handlers::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(config.max_body_bytes));

    // Wraps every route including its method fallback, so auth is checked first
    if let Some(secret) = &config.shared_secret {
        app = app.layer(middleware::from_fn_with_state(
            Arc::<str>::from(secret.as_str()),
            auth::require_shared_secret,
        ));
    }

    app.layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(state)
}
