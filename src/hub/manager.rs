//! Connection manager
//!
//! Thread-safe registry mapping channel names to subscriber handles and
//! handles to client records. Both maps live under one lock so every
//! operation observes them consistent: a handle present in a channel's list
//! always has a record, and vice versa.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::channel::ChannelName;
use crate::error::{Error, Result};

use super::client::{Client, ConnectionId, Outbound};

#[derive(Default)]
struct Registry {
    /// Channel name → subscriber handles, in insertion order
    channels: HashMap<String, Vec<ConnectionId>>,
    /// Handle → client record
    clients: HashMap<ConnectionId, Client>,
}

/// Result of one broadcast fan-out
#[derive(Debug)]
pub struct BroadcastOutcome {
    /// Subscribers whose queue accepted the frame
    pub reached: usize,
    /// Subscribers evicted because their queue was full or closed
    pub evicted: Vec<ConnectionId>,
}

/// Owns all subscriber records; no other component mutates them
pub struct ConnectionManager {
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    max_clients_per_channel: usize,
    max_total_connections: usize,
}

impl ConnectionManager {
    /// Create a manager; capacity limits of 0 mean unlimited
    pub fn new(max_clients_per_channel: usize, max_total_connections: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
            max_clients_per_channel,
            max_total_connections,
        }
    }

    /// Register a subscriber on a channel, creating the channel entry if needed
    pub async fn add_client(
        &self,
        channel: &ChannelName,
        user_id: Option<String>,
        wallet_address: Option<String>,
        sender: mpsc::Sender<Outbound>,
    ) -> Result<(ConnectionId, Client)> {
        let mut registry = self.registry.write().await;

        if self.max_total_connections > 0
            && registry.clients.len() >= self.max_total_connections
        {
            return Err(Error::ChannelAtCapacity(channel.to_string()));
        }

        let subscribers = registry.channels.entry(channel.to_string()).or_default();
        if self.max_clients_per_channel > 0 && subscribers.len() >= self.max_clients_per_channel {
            return Err(Error::ChannelAtCapacity(channel.to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        subscribers.push(id);

        let client = Client::new(channel.clone(), user_id, wallet_address, sender);
        registry.clients.insert(id, client.clone());

        debug!(channel = %channel, connection = id, "client added");
        Ok((id, client))
    }

    /// Remove a subscriber; missing entries are a no-op
    pub async fn remove_client(&self, id: ConnectionId, channel: &str) {
        let mut registry = self.registry.write().await;

        if let Some(subscribers) = registry.channels.get_mut(channel) {
            subscribers.retain(|handle| *handle != id);
        }

        if registry.clients.remove(&id).is_some() {
            debug!(channel = channel, connection = id, "client removed");
        }
    }

    /// Snapshot of a channel's subscriber handles in insertion order
    pub async fn get_channel_subscribers(&self, channel: &str) -> Vec<ConnectionId> {
        let registry = self.registry.read().await;
        registry.channels.get(channel).cloned().unwrap_or_default()
    }

    /// Snapshot of a channel's client records in insertion order
    pub async fn channel_clients(&self, channel: &str) -> Vec<(ConnectionId, Client)> {
        let registry = self.registry.read().await;
        let Some(subscribers) = registry.channels.get(channel) else {
            return Vec::new();
        };
        subscribers
            .iter()
            .filter_map(|id| registry.clients.get(id).map(|c| (*id, c.clone())))
            .collect()
    }

    /// Snapshot of every client record across all channels
    pub async fn all_clients(&self) -> Vec<(ConnectionId, Client)> {
        let registry = self.registry.read().await;
        registry
            .channels
            .values()
            .flatten()
            .filter_map(|id| registry.clients.get(id).map(|c| (*id, c.clone())))
            .collect()
    }

    pub async fn get_client(&self, id: ConnectionId) -> Option<Client> {
        let registry = self.registry.read().await;
        registry.clients.get(&id).cloned()
    }

    pub async fn get_total_connections(&self) -> usize {
        let registry = self.registry.read().await;
        registry.clients.len()
    }

    pub async fn get_channel_count(&self, channel: &str) -> usize {
        let registry = self.registry.read().await;
        registry.channels.get(channel).map_or(0, Vec::len)
    }

    pub async fn channel_exists(&self, channel: &str) -> bool {
        let registry = self.registry.read().await;
        registry.channels.contains_key(channel)
    }

    /// All channels with their subscriber counts
    pub async fn get_all_channels(&self) -> HashMap<String, usize> {
        let registry = self.registry.read().await;
        registry
            .channels
            .iter()
            .map(|(name, subscribers)| (name.clone(), subscribers.len()))
            .collect()
    }

    /// Ensure a channel's bookkeeping exists so late subscribers find it
    pub async fn touch_channel(&self, channel: &ChannelName) {
        let mut registry = self.registry.write().await;
        registry.channels.entry(channel.to_string()).or_default();
    }

    /// Active connection count for one user across all channels
    pub async fn connections_for_user(&self, user_id: &str) -> usize {
        let registry = self.registry.read().await;
        registry
            .clients
            .values()
            .filter(|c| c.user_id.as_deref() == Some(user_id))
            .count()
    }

    /// Remove channels with no subscribers, returning their names
    pub async fn cleanup_empty_channels(&self) -> Vec<String> {
        let mut registry = self.registry.write().await;
        let empty: Vec<String> = registry
            .channels
            .iter()
            .filter(|(_, subscribers)| subscribers.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        for name in &empty {
            registry.channels.remove(name);
        }
        empty
    }

    /// Drop an ephemeral channel's entry once its last subscriber left
    pub async fn cleanup_channel_if_ephemeral(&self, channel: &ChannelName) -> bool {
        if !channel.is_ephemeral() {
            return false;
        }

        let mut registry = self.registry.write().await;
        match registry.channels.get(channel.as_str()) {
            Some(subscribers) if subscribers.is_empty() => {
                registry.channels.remove(channel.as_str());
                debug!(channel = %channel, "ephemeral channel removed");
                true
            }
            _ => false,
        }
    }

    /// Fan one pre-encoded frame out to a channel's current subscribers
    ///
    /// Snapshot-then-mutate: subscribers are enumerated from a point-in-time
    /// copy, failed queues are evicted afterwards through `remove_client`.
    pub async fn broadcast(&self, channel: &str, text: &str) -> BroadcastOutcome {
        let snapshot = self.channel_clients(channel).await;

        let mut reached = 0;
        let mut evicted = Vec::new();

        for (id, client) in &snapshot {
            if client.try_send(Outbound::Json(text.to_string())) {
                reached += 1;
            } else {
                evicted.push(*id);
            }
        }

        for id in &evicted {
            self.remove_client(*id, channel).await;
        }

        BroadcastOutcome { reached, evicted }
    }

    /// Enqueue a close frame on every connection, then clear the registry
    pub async fn close_all(&self, code: u16, reason: &str) -> usize {
        let mut registry = self.registry.write().await;
        let mut closed = 0;

        for client in registry.clients.values() {
            if client.try_send(Outbound::Close {
                code,
                reason: reason.to_string(),
            }) {
                closed += 1;
            }
        }

        registry.channels.clear();
        registry.clients.clear();
        closed
    }
}
