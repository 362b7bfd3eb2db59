//! Same-origin relay to the simulation server: the snapshot socket and the
//! terrain map.

use axum::{
    extract::{ws::{self, WebSocket, WebSocketUpgrade}, ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use protocol::MapData;
use std::net::SocketAddr;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::AppState;

/// Handle viewer WebSocket connections
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Viewer connection from {}", addr);

    ws.on_upgrade(move |socket| handle_viewer(socket, addr, state))
}

async fn handle_viewer(socket: WebSocket, addr: SocketAddr, state: AppState) {
    // Dropping the socket on failure closes it; the viewer retries on its own.
    match relay(socket, &state.socket_url).await {
        Ok(frames) => info!("Viewer {} disconnected after {} frames", addr, frames),
        Err(e) => warn!("Relay for {} ended: {}", addr, e),
    }
}

/// Pass binary frames both ways until either side closes.
/// Returns the number of upstream frames delivered to the viewer.
async fn relay(socket: WebSocket, upstream_url: &str) -> anyhow::Result<u64> {
    let (upstream, _) = connect_async(upstream_url).await?;
    debug!("Upstream {} connected", upstream_url);

    let (mut up_write, mut up_read) = upstream.split();
    let (mut write, mut read) = socket.split();
    let mut frames = 0u64;

    loop {
        tokio::select! {
            msg = up_read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        write.send(ws::Message::Binary(data)).await?;
                        frames += 1;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Upstream closed");
                        break;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(ws::Message::Binary(data))) => {
                        up_write.send(Message::Binary(data)).await?;
                    }
                    Some(Ok(ws::Message::Close(_))) | None => break,
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
        }
    }

    let _ = up_write.send(Message::Close(None)).await;
    let _ = write.send(ws::Message::Close(None)).await;
    Ok(frames)
}

/// Serve the upstream terrain map. Fetched once, then cached.
pub async fn map_handler(State(state): State<AppState>) -> Response {
    let fetched = state
        .map_cache
        .get_or_try_init(|| fetch_map(&state.http, &state.map_url))
        .await;

    match fetched {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body.clone()).into_response(),
        Err(e) => {
            warn!("Map fetch from {} failed: {}", state.map_url, e);
            (StatusCode::BAD_GATEWAY, "upstream map unavailable").into_response()
        }
    }
}

async fn fetch_map(http: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    let body = http.get(url).send().await?.error_for_status()?.text().await?;
    check_map(&body)?;
    Ok(body)
}

/// Reject maps the viewer could not draw before they reach it.
fn check_map(body: &str) -> anyhow::Result<MapData> {
    let map: MapData = serde_json::from_str(body)?;
    map.validate()?;
    info!("Map {}x{} cells at scale {}", map.width, map.height, map.scale);
    Ok(map)
}
