//! Graceful shutdown coordination
//!
//! Tracks the `Running -> ShuttingDown -> Shutdown` transition, gates new
//! connections, and wakes waiters via a watch channel. Readers use the
//! lock-free flag; transitions go through the mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownState {
    Running,
    ShuttingDown,
    Shutdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShutdownInfo {
    pub state: ShutdownState,
    pub is_shutting_down: bool,
    pub shutdown_started_at: Option<DateTime<Utc>>,
    pub shutdown_timeout: u64,
    pub grace_period: u64,
}

struct Transitions {
    state: ShutdownState,
    started_at: Option<DateTime<Utc>>,
}

/// Coordinates the shutdown sequence across the server, the WebSocket
/// handlers, and the heartbeat task
pub struct ShutdownManager {
    shutdown_timeout: u64,
    grace_period: u64,
    flag: AtomicBool,
    transitions: Mutex<Transitions>,
    notify_tx: watch::Sender<bool>,
}

impl ShutdownManager {
    pub fn new(shutdown_timeout: u64, grace_period: u64) -> Self {
        let (notify_tx, _) = watch::channel(false);
        Self {
            shutdown_timeout,
            grace_period,
            flag: AtomicBool::new(false),
            transitions: Mutex::new(Transitions {
                state: ShutdownState::Running,
                started_at: None,
            }),
            notify_tx,
        }
    }

    /// Lock-free read of the shutdown flag
    pub fn is_shutting_down(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.is_shutting_down()
    }

    pub fn shutdown_timeout(&self) -> u64 {
        self.shutdown_timeout
    }

    pub fn grace_period(&self) -> u64 {
        self.grace_period
    }

    /// A receiver that flips to true when shutdown begins
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.notify_tx.subscribe()
    }

    /// Resolves once shutdown has been initiated
    pub async fn triggered(&self) {
        let mut rx = self.subscribe();
        if *rx.borrow() {
            return;
        }
        // Sender lives as long as self; an error here means we are exiting
        let _ = rx.changed().await;
    }

    /// Transition `Running -> ShuttingDown`; repeated calls are no-ops
    pub fn initiate(&self, reason: &str) -> bool {
        let mut transitions = self.transitions.lock().unwrap();
        if transitions.state != ShutdownState::Running {
            return false;
        }

        transitions.state = ShutdownState::ShuttingDown;
        transitions.started_at = Some(Utc::now());
        self.flag.store(true, Ordering::Relaxed);
        let _ = self.notify_tx.send(true);

        warn!(reason = reason, "graceful shutdown initiated");
        true
    }

    /// Transition to `Shutdown` after cleanup is finished
    pub fn mark_complete(&self) {
        let mut transitions = self.transitions.lock().unwrap();
        transitions.state = ShutdownState::Shutdown;
        info!("shutdown complete");
    }

    pub fn info(&self) -> ShutdownInfo {
        let transitions = self.transitions.lock().unwrap();
        ShutdownInfo {
            state: transitions.state,
            is_shutting_down: self.is_shutting_down(),
            shutdown_started_at: transitions.started_at,
            shutdown_timeout: self.shutdown_timeout,
            grace_period: self.grace_period,
        }
    }
}

/// Listen for SIGTERM/SIGINT and initiate shutdown on the first signal
///
/// The task exits after triggering, so a second signal takes the default
/// disposition and terminates the process.
pub fn listen_for_signals(shutdown: std::sync::Arc<ShutdownManager>) {
    tokio::spawn(async move {
        let signal_name;

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("failed to install SIGTERM handler: {}", e);
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => signal_name = "SIGINT",
                _ = sigterm.recv() => signal_name = "SIGTERM",
            }
        }

        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            signal_name = "SIGINT";
        }

        shutdown.initiate(signal_name);
    });
}
