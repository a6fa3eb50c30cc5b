//! HTTP route handlers

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{debug, info};

use crate::channel::ChannelName;
use crate::error::Error;
use crate::message::Message;
use crate::shutdown::ShutdownInfo;

use super::server::SharedState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub channel: String,
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub status: String,
    pub channel: String,
    pub clients_reached: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(error: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}

// Publish endpoints

/// `POST /publish` — channel in the body
pub async fn publish(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<PublishRequest>,
) -> Response {
    publish_to_channel(state, addr, headers, req.channel, req.data).await
}

/// `POST /publish/{channel}` — legacy adapter, body is the payload itself
pub async fn publish_legacy(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    Json(data): Json<Value>,
) -> Response {
    publish_to_channel(state, addr, headers, channel, data).await
}

/// Shared publish path; the two endpoints must not diverge
async fn publish_to_channel(
    state: SharedState,
    addr: SocketAddr,
    headers: HeaderMap,
    channel: String,
    data: Value,
) -> Response {
    if state.shutdown.is_shutting_down() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new(Error::ShuttingDown.to_string())),
        )
            .into_response();
    }

    if state.config.rate_limit.enabled {
        let identity = headers
            .get("x-service-name")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| addr.ip().to_string());
        let message_type = data.get("type").and_then(Value::as_str);

        let decision = state.publish_limiter.check(&identity, message_type);
        if !decision.allowed {
            debug!(identity = %identity, "publish rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [(
                    header::RETRY_AFTER,
                    decision.retry_after_seconds.to_string(),
                )],
                Json(ErrorBody::new(
                    Error::RateLimited {
                        retry_after: decision.retry_after_seconds,
                    }
                    .to_string(),
                )),
            )
                .into_response();
        }
    }

    let channel = match ChannelName::parse(&channel) {
        Ok(channel) => channel,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(format!("Invalid channel name: {}", e))),
            )
                .into_response();
        }
    };

    let errors = state.validator.validate(&data);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::with_details("Invalid message data", errors)),
        )
            .into_response();
    }

    let message = match Message::new(data) {
        Ok(message) => message,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response();
        }
    };

    // Create the channel bookkeeping if absent so a late subscriber to a
    // just-used channel finds it
    state.manager.touch_channel(&channel).await;

    let text = message.data().to_string();
    let outcome = state.manager.broadcast(channel.as_str(), &text).await;
    state.stats.record_sent(outcome.reached as u64);

    if !outcome.evicted.is_empty() {
        info!(
            channel = %channel,
            evicted = outcome.evicted.len(),
            "pruned dead subscribers during broadcast"
        );
    }

    (
        StatusCode::OK,
        Json(PublishResponse {
            status: "published".to_string(),
            channel: channel.to_string(),
            clients_reached: outcome.reached,
            timestamp: message
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    )
        .into_response()
}

// Stats

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub total_connections: usize,
    pub active_channels: usize,
    pub channels: HashMap<String, usize>,
    pub total_connections_accepted: u64,
    pub total_messages_sent: u64,
    pub total_messages_received: u64,
    pub limits: LimitsInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_info: Option<ShutdownInfo>,
}

#[derive(Debug, Serialize)]
pub struct LimitsInfo {
    pub max_clients_per_channel: usize,
    pub max_total_connections: usize,
}

/// `GET /stats`
pub async fn stats(State(state): State<SharedState>) -> impl IntoResponse {
    let channels = state.manager.get_all_channels().await;

    let shutdown_info = if state.shutdown.is_shutting_down() {
        Some(state.shutdown.info())
    } else {
        None
    };

    Json(StatsResponse {
        uptime_seconds: state.uptime_seconds(),
        total_connections: state.manager.get_total_connections().await,
        active_channels: channels.len(),
        channels,
        total_connections_accepted: state.stats.connections_accepted(),
        total_messages_sent: state.stats.messages_sent(),
        total_messages_received: state.stats.messages_received(),
        limits: LimitsInfo {
            max_clients_per_channel: state.config.max_clients_per_channel,
            max_total_connections: state.config.max_total_connections,
        },
        shutdown_info,
    })
}

// Health probes

#[derive(Debug, Serialize)]
pub struct ReadinessCheck {
    pub name: String,
    pub healthy: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: Vec<ReadinessCheck>,
}

/// `GET /health/live` — 200 while the process runs
pub async fn health_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "alive"}))
}

/// `GET /health/ready` — 200 when operational and below capacity
pub async fn health_ready(State(state): State<SharedState>) -> Response {
    let mut checks = Vec::new();

    checks.push(ReadinessCheck {
        name: "shutdown".to_string(),
        healthy: !state.shutdown.is_shutting_down(),
        message: if state.shutdown.is_shutting_down() {
            "Server is shutting down".to_string()
        } else {
            "Running".to_string()
        },
    });

    let total = state.manager.get_total_connections().await;
    let max = state.config.max_total_connections;
    let capacity_healthy = max == 0 || (total as f64) < (max as f64) * 0.9;
    checks.push(ReadinessCheck {
        name: "connection_capacity".to_string(),
        healthy: capacity_healthy,
        message: if max == 0 {
            format!("Unlimited capacity ({} active)", total)
        } else {
            format!("{}/{} connections", total, max)
        },
    });

    let ready = checks.iter().all(|c| c.healthy);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks,
        }),
    )
        .into_response()
}
