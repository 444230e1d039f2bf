//! Realtime viewer-count channel.
//!
//! # Responsibilities
//! - Upgrade `/ws?deviceId=` connections
//! - Derive the viewer identity (device token, else client IP)
//! - Register/deregister the connection in the presence registry
//! - Fan out `online_users` count events to the client in emission order
//! - Detect dead peers via ping/pong with a pong timeout
//!
//! # Design Decisions
//! - Actor per connection: a writer task owns the sink, everything else
//!   sends through an mpsc channel
//! - Deregistration happens at exactly one point, after the reader loop
//!   exits; graceful close, abrupt drop, and pong timeout all funnel there

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::http::listener::ClientAddr;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Query parameters for the realtime connection.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Stable per-device token. Optional; the peer IP is the fallback
    /// identity, an accepted approximation under NAT.
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
}

/// Wire format of a count update pushed to every observer.
#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineUsersEvent {
    pub event: String,
    pub count: usize,
}

fn online_users_frame(count: usize) -> Option<Message> {
    let event = OnlineUsersEvent {
        event: "online_users".to_string(),
        count,
    };
    match serde_json::to_string(&event) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode count event");
            None
        }
    }
}

/// GET /ws?deviceId=...
/// Upgrades the connection and spawns the per-connection actor.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ConnectInfo(addr): ConnectInfo<ClientAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = params
        .device_id
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| addr.0.ip().to_string());

    ws.on_upgrade(move |socket| run_connection(socket, state, identity))
}

/// Actor for one realtime connection.
async fn run_connection(socket: WebSocket, state: AppState, identity: String) {
    let handle = Uuid::new_v4();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Subscribe before registering, so this observer also sees the count
    // event its own registration produces.
    let count_rx = state.presence.subscribe();
    state.presence.register(&identity, handle);
    metrics::inc_realtime_connections();

    tracing::info!(identity = %identity, handle = %handle, "Realtime connection opened");

    // Writer task: owns the sink, drains the mpsc channel.
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Forwarding task: count broadcasts → outgoing frames, FIFO.
    let forward_handle = tokio::spawn(forward_counts(count_rx, tx.clone()));

    // Ping task: periodic pings, close on pong timeout.
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_tx = tx.clone();
    let ping_interval = Duration::from_secs(state.presence_config.ping_interval_secs);
    let pong_timeout = Duration::from_secs(state.presence_config.pong_timeout_secs);
    let mut ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(ping_interval);
        // Skip the first immediate tick.
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(Vec::new().into())).is_err() {
                // Writer task has died, connection is gone.
                break;
            }

            match timeout(pong_timeout, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!("Pong timeout, closing realtime connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: the connection lives as long as this loop runs.
    let reader = async {
        loop {
            match ws_receiver.next().await {
                Some(Ok(msg)) => match msg {
                    Message::Pong(_) => {
                        let _ = pong_tx.send(());
                    }
                    Message::Ping(data) => {
                        let _ = tx.send(Message::Pong(data));
                    }
                    Message::Close(frame) => {
                        tracing::debug!(
                            identity = %identity,
                            reason = ?frame,
                            "Client closed realtime connection"
                        );
                        break;
                    }
                    // Counts flow outward only; inbound payloads are ignored.
                    Message::Text(_) | Message::Binary(_) => {}
                },
                Some(Err(e)) => {
                    tracing::debug!(identity = %identity, error = %e, "Realtime receive error");
                    break;
                }
                None => break,
            }
        }
    };

    // A finished ping task means the peer is gone (pong timeout or a dead
    // writer); tear the connection down rather than wait on a silent socket.
    tokio::select! {
        _ = reader => {}
        _ = &mut ping_handle => {
            tracing::debug!(identity = %identity, "Realtime connection timed out");
        }
    }

    forward_handle.abort();
    ping_handle.abort();
    let _ = forward_handle.await;
    let _ = ping_handle.await;

    // A pong-timeout close frame may still be queued. Dropping the last
    // sender lets the writer drain and flush it before the socket goes away.
    drop(tx);
    let _ = timeout(Duration::from_secs(1), writer_handle).await;

    // Single deregistration point for every termination path.
    state.presence.deregister(&identity, &handle);
    metrics::dec_realtime_connections();

    tracing::info!(identity = %identity, handle = %handle, "Realtime connection closed");
}

/// Forward count broadcasts to this connection's writer.
async fn forward_counts(
    mut count_rx: broadcast::Receiver<usize>,
    tx: mpsc::UnboundedSender<Message>,
) {
    loop {
        match count_rx.recv().await {
            Ok(count) => {
                let Some(frame) = online_users_frame(count) else {
                    continue;
                };
                if tx.send(frame).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // The observer converges on the latest count.
                tracing::debug!(skipped, "Realtime observer lagged, resyncing");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Writer task: receives messages from the mpsc channel and forwards them
/// to the WebSocket sink.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // Send failed, connection is broken.
            break;
        }
    }
}
