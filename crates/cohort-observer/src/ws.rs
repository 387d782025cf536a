//! `WebSocket` stream of tick summaries.
//!
//! `GET /ws/ticks` first sends the latest tick of the running condition,
//! if there is one, then one [`TickBroadcast`] per committed tick. Clients
//! that fall behind skip ahead to the newest summary.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, TickBroadcast};

/// Upgrade to a `WebSocket` and begin streaming tick summaries.
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_ticks(socket, state))
}

/// The most recent tick of the running condition, for late joiners.
async fn latest(state: &AppState) -> Option<TickBroadcast> {
    let snapshot = state.snapshot.read().await;
    snapshot.time_series.last().map(|point| TickBroadcast {
        condition: snapshot.condition_name.clone(),
        tick: point.tick,
        avg_sentiment: point.avg_sentiment,
        polarization: point.polarization,
        cooperation_pct: point.cooperation_pct,
        group_count: point.group_count,
    })
}

/// Send one summary. Returns `false` once the client is gone.
async fn push(socket: &mut WebSocket, tick: &TickBroadcast) -> bool {
    match serde_json::to_string(tick) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(tick = tick.tick, "Failed to serialize tick broadcast: {e}");
            true
        }
    }
}

async fn stream_ticks(mut socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before reading the snapshot so no tick falls in between.
    let mut rx = state.subscribe();
    debug!("WebSocket client connected");

    if let Some(tick) = latest(&state).await
        && !push(&mut socket, &tick).await
    {
        return;
    }

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(tick) => {
                    if !push(&mut socket, &tick).await {
                        debug!("WebSocket client disconnected (send failed)");
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket client lagged, skipping ahead");
                }
                Err(RecvError::Closed) => return,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    debug!("WebSocket client disconnected");
                    return;
                }
                // Clients have nothing to say.
                Some(Ok(_)) => {}
            },
        }
    }
}
