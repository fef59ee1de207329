//! `csvql-server`: the HTTP streaming endpoint and auth surface wrapped
//! around a `csvql-core::Engine`, structured the way `datafusion-postgres`
//! wraps its wire-protocol handlers around a `SessionContext` — a small
//! `ServerOptions` builder plus a `serve` entry point.

pub mod auth;
pub mod error;
pub mod http;

use std::net::SocketAddr;
use std::sync::Arc;

use getset::{Getters, Setters, WithSetters};

pub use auth::AuthManager;
pub use error::ApiError;
pub use http::AppState;

#[derive(Getters, Setters, WithSetters, Debug, Clone)]
#[getset(get = "pub", set = "pub", set_with = "pub")]
pub struct ServerOptions {
    host: String,
    port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Binds and serves forever (spec §5 "the server handles requests
/// concurrently; each request is serviced by one logical task"), matching
/// the teacher's `serve`/`serve_with_handlers` accept-loop shape, delegated
/// here to `axum::serve` since the transport is HTTP rather than the raw
/// Postgres wire protocol.
pub async fn serve(
    options: ServerOptions,
    engine: csvql_core::Engine,
    auth: AuthManager,
) -> std::io::Result<()> {
    let state = Arc::new(AppState { engine, auth });
    let app = http::router(state);
    let addr: SocketAddr = format!("{}:{}", options.host(), options.port())
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{e}")))?;

    log::info!("csvql-server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_options_match_documented_defaults() {
        let opts = ServerOptions::default();
        assert_eq!(opts.host(), "127.0.0.1");
        assert_eq!(*opts.port(), 8080);
    }

    #[test]
    fn with_setters_build_a_custom_options_value() {
        let opts = ServerOptions::default().with_host("0.0.0.0".to_string()).with_port(9999);
        assert_eq!(opts.host(), "0.0.0.0");
        assert_eq!(*opts.port(), 9999);
    }
}
