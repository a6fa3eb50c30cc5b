//! WebSocket endpoint and per-connection loop

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::channel::ChannelName;
use crate::error::Error;
use crate::hub::Outbound;

use super::server::SharedState;

/// Inbound read timeout before a heartbeat ping is sent
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on flushing queued frames after the connection loop exits
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Handle WebSocket upgrade requests on `/ws/{channel}`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(channel): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, channel, query.token))
}

async fn close_with(mut socket: WebSocket, code: u16, reason: String) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

/// Handle one WebSocket connection end to end
async fn handle_socket(
    socket: WebSocket,
    state: SharedState,
    channel: String,
    token: Option<String>,
) {
    // Reject new connections once shutdown has begun
    if state.shutdown.is_shutting_down() {
        close_with(socket, close_code::AWAY, "Server is shutting down".into()).await;
        return;
    }

    let channel = match ChannelName::parse(&channel) {
        Ok(channel) => channel,
        Err(e) => {
            close_with(socket, close_code::POLICY, e.to_string()).await;
            return;
        }
    };

    let mut user_id = None;
    let mut wallet_address = None;

    if state.config.auth.require_auth {
        // Verifier presence is guaranteed by Config::validate
        let Some(verifier) = &state.verifier else {
            close_with(socket, close_code::POLICY, "Authentication unavailable".into()).await;
            return;
        };

        let Some(token) = token else {
            close_with(socket, close_code::POLICY, "Missing token".into()).await;
            return;
        };

        let claims = match verifier.verify(&token) {
            Ok(claims) => claims,
            Err(e) => {
                let reason = match &e {
                    Error::TokenExpired => "Token expired",
                    Error::MissingClaim(_) => "Invalid token claims",
                    _ => "Invalid token",
                };
                debug!(channel = %channel, error = %e, "token rejected");
                close_with(socket, close_code::POLICY, reason.into()).await;
                return;
            }
        };

        if !verifier.authorize(&claims.user_id, channel.as_str()) {
            close_with(
                socket,
                close_code::POLICY,
                Error::Unauthorized(channel.to_string()).to_string(),
            )
            .await;
            return;
        }

        let connection_cap = state.config.rate_limit.websocket_connections;
        if state.config.rate_limit.enabled
            && connection_cap > 0
            && state.manager.connections_for_user(&claims.user_id).await >= connection_cap
        {
            close_with(socket, close_code::POLICY, "Too many connections".into()).await;
            return;
        }

        user_id = Some(claims.user_id);
        wallet_address = Some(claims.wallet_address);
    }

    let (tx, rx) = mpsc::channel::<Outbound>(state.config.outbound_buffer);

    let (id, client) = match state
        .manager
        .add_client(&channel, user_id.clone(), wallet_address, tx.clone())
        .await
    {
        Ok(added) => added,
        Err(e) => {
            close_with(socket, close_code::POLICY, e.to_string()).await;
            return;
        }
    };

    state.stats.record_connection();
    info!(
        channel = %channel,
        connection = id,
        client = %client.id,
        user = user_id.as_deref().unwrap_or("anonymous"),
        authenticated = client.is_authenticated(),
        "client connected"
    );

    let (ws_tx, mut ws_rx) = socket.split();
    let forward = tokio::spawn(forward_outbound(ws_tx, rx));

    let mut shutdown_rx = state.shutdown.subscribe();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = tx
                    .send(Outbound::Json(
                        r#"{"type":"shutdown","message":"Server is shutting down"}"#.to_string(),
                    ))
                    .await;
                let _ = tx
                    .send(Outbound::Close {
                        code: close_code::AWAY,
                        reason: "Server shutdown".to_string(),
                    })
                    .await;
                break;
            }
            result = tokio::time::timeout(READ_TIMEOUT, ws_rx.next()) => {
                match result {
                    // Idle: probe with a heartbeat ping
                    Err(_) => {
                        if tx.send(Outbound::ping()).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Ok(Message::Text(text)))) => {
                        state.stats.record_received();
                        if text == "ping" {
                            if tx.send(Outbound::Text("pong".to_string())).await.is_err() {
                                break;
                            }
                        }
                        // Other inbound content is counted and ignored
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => break,
                    // Binary and protocol-level ping/pong frames are ignored
                    Ok(Some(Ok(_))) => {}
                }
            }
        }
    }

    drop(tx);
    state.manager.remove_client(id, channel.as_str()).await;
    state.manager.cleanup_channel_if_ephemeral(&channel).await;

    // Let queued frames (including a close) flush, bounded
    let _ = tokio::time::timeout(FLUSH_TIMEOUT, forward).await;

    info!(channel = %channel, connection = id, "client disconnected");
}

/// Drain the outbound queue into the socket
///
/// Ends when the queue closes, the socket errors, or a close frame is sent.
async fn forward_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
) {
    while let Some(frame) = rx.recv().await {
        match frame {
            Outbound::Json(text) | Outbound::Text(text) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                let _ = sink
                    .send(Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })))
                    .await;
                break;
            }
        }
    }
}
