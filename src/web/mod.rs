// HTTP front door: routes, auth gate, request extraction and response encoding

mod app;
mod auth;
mod error;
mod extract_request_data;
mod handlers;
mod headers;
mod listeners;
mod models;
mod response;

pub use app::create_app;
pub use listeners::create_listener;

use crate::renderer::Renderer;
use std::sync::Arc;

/// Default limit for `POST /d2` bodies
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Read-only state shared by every request.
#[derive(Debug)]
pub struct AppState {
    pub renderer: Renderer,
}

pub type SharedState = Arc<AppState>;
