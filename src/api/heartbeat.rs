//! Global heartbeat ticker
//!
//! Redundant with the per-connection read-timeout ping on purpose: the
//! per-connection ping catches silent idle sockets quickly, the ticker
//! sweeps the whole connection table even when read loops are mid-wait.

use std::time::Duration;
use tracing::{debug, info};

use crate::hub::Outbound;

use super::server::SharedState;

/// Start the heartbeat background task
pub fn spawn(state: SharedState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(state.config.heartbeat_interval);
        info!(
            "Heartbeat started (interval: {}s)",
            state.config.heartbeat_interval
        );

        loop {
            tokio::select! {
                _ = state.shutdown.triggered() => {
                    info!("Heartbeat stopped (shutdown)");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let clients = state.manager.all_clients().await;
            if clients.is_empty() {
                continue;
            }

            debug!("Heartbeat -> {} clients", clients.len());

            let mut dead = Vec::new();
            for (id, client) in &clients {
                if !client.try_send(Outbound::ping()) {
                    dead.push((*id, client.channel.clone()));
                }
            }

            for (id, channel) in dead {
                state.manager.remove_client(id, channel.as_str()).await;
            }
        }
    });
}
