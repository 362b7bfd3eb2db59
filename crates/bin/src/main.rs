//! evo-view host - serves the embedded viewer and relays the simulation feed.

use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::RustEmbed;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod relay;

// Embedded static assets from client/web
#[derive(RustEmbed)]
#[folder = "../client/web"]
struct Assets;

#[derive(Clone)]
pub struct AppState {
    socket_url: Arc<str>,
    map_url: Arc<str>,
    http: reqwest::Client,
    map_cache: Arc<OnceCell<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("evo-view host v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load()?;
    let state = AppState {
        socket_url: config.upstream.socket_url().into(),
        map_url: config.upstream.map_url().into(),
        http: reqwest::Client::new(),
        map_cache: Arc::new(OnceCell::new()),
    };
    info!("Loaded configuration");
    info!("  Upstream socket: {}", state.socket_url);
    info!("  Upstream map: {}", state.map_url);

    let app = Router::new()
        .route("/ws", get(relay::websocket_handler))
        .route("/api/map", get(relay::map_handler))
        .route("/", get(serve_index))
        .route("/index.html", get(serve_index))
        .fallback(static_handler)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Viewer available on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Serve the main index.html page
async fn serve_index() -> Response {
    serve_static_file("index.html")
}

/// Handle static file requests
async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    if path.is_empty() {
        return serve_static_file("index.html");
    }
    serve_static_file(path)
}

/// Serve a static file from embedded assets
fn serve_static_file(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => {
            warn!("Static file not found: {}", path);
            (StatusCode::NOT_FOUND, "404 Not Found").into_response()
        }
    }
}
