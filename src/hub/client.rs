//! Per-connection client record and outbound frames

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::channel::ChannelName;

/// Opaque, non-recycled handle for one WebSocket connection
pub type ConnectionId = u64;

/// Frames queued for delivery to one subscriber
///
/// Each connection drains its own queue in order, which is what gives
/// per-subscriber FIFO across successive publishes.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Pre-encoded JSON text (published events and control objects)
    Json(String),
    /// Literal text frame (the `"pong"` reply)
    Text(String),
    /// Close the socket
    Close { code: u16, reason: String },
}

impl Outbound {
    /// The `{"type":"ping"}` heartbeat frame
    pub fn ping() -> Self {
        Outbound::Json(r#"{"type":"ping"}"#.to_string())
    }

    /// The shutdown notification frame
    pub fn shutdown_notice() -> Self {
        Outbound::Json(
            r#"{"type":"shutdown","message":"Server is shutting down","code":1001}"#.to_string(),
        )
    }
}

/// Registered subscriber metadata plus its outbound queue
#[derive(Debug, Clone)]
pub struct Client {
    pub id: Uuid,
    pub channel: ChannelName,
    pub user_id: Option<String>,
    pub wallet_address: Option<String>,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Outbound>,
}

impl Client {
    pub fn new(
        channel: ChannelName,
        user_id: Option<String>,
        wallet_address: Option<String>,
        sender: mpsc::Sender<Outbound>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            user_id,
            wallet_address,
            connected_at: Utc::now(),
            sender,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Enqueue a frame without waiting
    ///
    /// Returns false when the queue is full or the connection is gone, which
    /// marks this subscriber dead.
    pub fn try_send(&self, frame: Outbound) -> bool {
        self.sender.try_send(frame).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(buffer: usize) -> (Client, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(buffer);
        let channel = ChannelName::parse("global").unwrap();
        (Client::new(channel, Some("alice".into()), None, tx), rx)
    }

    #[tokio::test]
    async fn test_try_send_delivers_in_order() {
        let (client, mut rx) = client(4);
        assert!(client.try_send(Outbound::Json("{\"n\":1}".into())));
        assert!(client.try_send(Outbound::Json("{\"n\":2}".into())));

        match rx.recv().await.unwrap() {
            Outbound::Json(text) => assert_eq!(text, "{\"n\":1}"),
            other => panic!("unexpected frame: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            Outbound::Json(text) => assert_eq!(text, "{\"n\":2}"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_try_send_fails_when_full_or_closed() {
        let (client, rx) = client(1);
        assert!(client.try_send(Outbound::ping()));
        assert!(!client.try_send(Outbound::ping()));

        drop(rx);
        assert!(!client.try_send(Outbound::ping()));
    }

    #[tokio::test]
    async fn test_authenticated_flag() {
        let (tx, _rx) = mpsc::channel(1);
        let anon = Client::new(ChannelName::parse("global").unwrap(), None, None, tx);
        assert!(!anon.is_authenticated());

        let (client, _rx) = client(1);
        assert!(client.is_authenticated());
    }
}
