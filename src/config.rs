// Startup configuration: command line flags with environment fallbacks, frozen into a
// `ServerConfig` before the router is built.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

use crate::renderer::Renderer;
use crate::web::DEFAULT_MAX_BODY_BYTES;

/// Command line arguments for d2-render-server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Hostname/IP to bind the server to.
    /// "*" listens on all interfaces (IPv6 dual-stack when available).
    #[arg(long, env = "D2_SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "D2_SERVER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Shared secret every request must send in the `Authentication` header.
    /// Leave empty to accept unauthenticated requests.
    #[arg(long, env = "D2_SERVER_KEY", default_value = "", hide_env_values = true)]
    pub key: String,

    /// Renderer executable, looked up on PATH unless given as a path.
    #[arg(long, env = "D2_SERVER_RENDERER", default_value = "d2")]
    pub renderer: PathBuf,

    /// Extra renderer argument placed before the input marker, e.g. `--renderer-arg=--layout=elk`.
    /// May be repeated; values are also split on spaces.
    #[arg(
        long = "renderer-arg",
        env = "D2_SERVER_RENDERER_ARGS",
        value_name = "ARG",
        allow_hyphen_values = true,
        value_delimiter = ' '
    )]
    pub renderer_args: Vec<String>,

    /// Seconds a single render may take (stdin write and process exit).
    /// Renders are unbounded when omitted.
    #[arg(
        long,
        env = "D2_SERVER_RENDER_TIMEOUT",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub render_timeout: Option<u64>,

    /// Maximum accepted size of a `POST /d2` body in bytes.
    #[arg(long, env = "D2_SERVER_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Log verbosity (trace, debug, info, warn, error).
    #[arg(long, env = "D2_SERVER_LOG_LEVEL", default_value = "info")]
    pub log_level: Level,
}

/// Immutable server settings shared with the HTTP layer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shared_secret: Option<String>,
    pub max_body_bytes: usize,
    pub renderer: Renderer,
}

impl From<AppConfig> for ServerConfig {
    fn from(config: AppConfig) -> Self {
        let renderer_args = config
            .renderer_args
            .into_iter()
            .filter(|arg| !arg.is_empty())
            .collect();

        let renderer = Renderer::new(config.renderer)
            .with_args(renderer_args)
            .with_timeout(config.render_timeout.map(Duration::from_secs));

        Self {
            host: config.host,
            port: config.port,
            shared_secret: Some(config.key).filter(|key| !key.is_empty()),
            max_body_bytes: config.max_body_bytes,
            renderer,
        }
    }
}
