//! HTTP API server and graceful-shutdown driver

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::error::Result;
use crate::hub::{ConnectionManager, Outbound, Stats};
use crate::limiter::RateLimiter;
use crate::message::MessageValidator;
use crate::shutdown::{listen_for_signals, ShutdownManager};

use super::{heartbeat, routes, websocket};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub manager: Arc<ConnectionManager>,
    pub verifier: Option<TokenVerifier>,
    pub publish_limiter: RateLimiter,
    pub validator: MessageValidator,
    pub shutdown: Arc<ShutdownManager>,
    pub stats: Stats,
    pub started_at: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config) -> Result<SharedState> {
        let manager = Arc::new(ConnectionManager::new(
            config.max_clients_per_channel,
            config.max_total_connections,
        ));

        let verifier = match (&config.auth.jwt_secret, config.auth.require_auth) {
            (Some(secret), _) => Some(TokenVerifier::new(
                secret,
                &config.auth.jwt_algorithm,
                config.channels.clone(),
            )?),
            (None, false) => None,
            (None, true) => {
                return Err(crate::error::Error::Config(
                    "auth.jwt_secret is required when auth.require_auth is enabled".into(),
                ))
            }
        };

        let publish_limiter = RateLimiter::new(
            config.rate_limit.publish_requests,
            config.rate_limit.window_seconds,
            config.rate_limit.per_type.clone(),
        );

        let validator = MessageValidator::new(
            config.limits.max_message_size,
            config.limits.max_string_length,
            config.limits.max_array_size,
        );

        let shutdown = Arc::new(ShutdownManager::new(
            config.shutdown.timeout,
            config.shutdown.grace_period,
        ));

        Ok(Arc::new(AppState {
            config,
            manager,
            verifier,
            publish_limiter,
            validator,
            shutdown,
            stats: Stats::default(),
            started_at: Instant::now(),
        }))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Run the hub until a shutdown signal arrives
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    let state = AppState::new(config)?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Courier listening on {}", addr);
    if state.config.auth.require_auth {
        info!("Authentication: enabled");
    } else {
        info!("Authentication: disabled");
    }

    listen_for_signals(state.shutdown.clone());
    heartbeat::spawn(state.clone());

    let sequence = tokio::spawn(run_shutdown_sequence(state.clone()));

    let app = create_router(state.clone());
    let shutdown = state.shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.triggered().await })
    .await?;

    // The sequence task ends shortly after the trigger; join it so the
    // registry is cleared before we report completion
    let _ = sequence.await;
    state.shutdown.mark_complete();

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/publish", post(routes::publish))
        .route("/publish/:channel", post(routes::publish_legacy))
        .route("/ws/:channel", get(websocket::ws_handler))
        .route("/stats", get(routes::stats))
        .route("/health/live", get(routes::health_live))
        .route("/health/ready", get(routes::health_ready))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Drive the client-facing shutdown sequence once triggered
///
/// Notify all subscribers, wait the grace period for voluntary disconnects,
/// then force-close the remainder. The whole sequence is bounded by the
/// configured shutdown timeout.
async fn run_shutdown_sequence(state: SharedState) {
    state.shutdown.triggered().await;

    let deadline = Duration::from_secs(state.shutdown.shutdown_timeout());
    let result = tokio::time::timeout(deadline, async {
        let total = state.manager.get_total_connections().await;
        if total > 0 {
            info!("Notifying {} clients of shutdown", total);
            for (_, client) in state.manager.all_clients().await {
                client.try_send(Outbound::shutdown_notice());
            }
        }

        let grace = state.shutdown.grace_period();
        info!("Waiting {}s for clients to disconnect", grace);
        tokio::time::sleep(Duration::from_secs(grace)).await;

        let closed = state.manager.close_all(1001, "Server shutdown").await;
        if closed > 0 {
            info!("Closed {} connections", closed);
        }
    })
    .await;

    if result.is_err() {
        warn!("Shutdown sequence exceeded timeout, terminating anyway");
        state.manager.close_all(1001, "Server shutdown").await;
    }
}
