//! Connection manager invariants under sequential and concurrent use

use courier::channel::ChannelName;
use courier::hub::{ConnectionManager, Outbound};
use std::sync::Arc;
use tokio::sync::mpsc;

fn name(s: &str) -> ChannelName {
    ChannelName::parse(s).unwrap()
}

fn sender() -> (mpsc::Sender<Outbound>, mpsc::Receiver<Outbound>) {
    mpsc::channel(32)
}

#[tokio::test]
async fn test_registry_invariant_after_add() {
    let manager = ConnectionManager::new(0, 0);
    let (tx, _rx) = sender();
    let (id, _) = manager
        .add_client(&name("global"), Some("alice".into()), None, tx)
        .await
        .unwrap();

    assert!(manager.get_channel_subscribers("global").await.contains(&id));
    let client = manager.get_client(id).await.unwrap();
    assert_eq!(client.channel.as_str(), "global");
}

#[tokio::test]
async fn test_registry_invariant_after_remove() {
    let manager = ConnectionManager::new(0, 0);
    let (tx, _rx) = sender();
    let (id, _) = manager.add_client(&name("global"), None, None, tx).await.unwrap();

    manager.remove_client(id, "global").await;
    assert!(!manager.get_channel_subscribers("global").await.contains(&id));
    assert!(manager.get_client(id).await.is_none());

    // Idempotent
    manager.remove_client(id, "global").await;
    assert_eq!(manager.get_total_connections().await, 0);
}

#[tokio::test]
async fn test_total_matches_channel_sums_under_concurrency() {
    let manager = Arc::new(ConnectionManager::new(0, 0));
    let channels = ["global", "trade", "candles", "user.alice"];
    let mut handles = Vec::new();

    for (i, channel) in channels.iter().enumerate() {
        let manager = manager.clone();
        let channel = name(channel);
        handles.push(tokio::spawn(async move {
            let mut kept = Vec::new();
            for n in 0..50 {
                let (tx, rx) = sender();
                let (id, _) = manager.add_client(&channel, None, None, tx).await.unwrap();
                // Remove every other client, keep the rest connected
                if n % 2 == 0 {
                    manager.remove_client(id, channel.as_str()).await;
                } else {
                    kept.push(rx);
                }
            }
            (i, kept)
        }));
    }

    let mut receivers = Vec::new();
    for handle in handles {
        let (_, kept) = handle.await.unwrap();
        receivers.extend(kept);
    }

    let all = manager.get_all_channels().await;
    let sum: usize = all.values().sum();
    assert_eq!(manager.get_total_connections().await, sum);
    assert_eq!(sum, 4 * 25);
}

#[tokio::test]
async fn test_broadcast_skips_concurrent_arrivals_gracefully() {
    // A subscriber arriving mid-broadcast may or may not see the message;
    // the registry must stay consistent either way.
    let manager = Arc::new(ConnectionManager::new(0, 0));

    // Stay below the 32-frame outbound buffer so no subscriber is evicted
    let broadcaster = {
        let manager = manager.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                manager.broadcast("global", r#"{"type":"tick"}"#).await;
            }
        })
    };

    let joiner = {
        let manager = manager.clone();
        tokio::spawn(async move {
            let mut receivers = Vec::new();
            for _ in 0..100 {
                let (tx, rx) = sender();
                let (id, _) = manager.add_client(&name("global"), None, None, tx).await.unwrap();
                receivers.push((id, rx));
                tokio::task::yield_now().await;
            }
            receivers
        })
    };

    broadcaster.await.unwrap();
    let receivers = joiner.await.unwrap();

    let subscribers = manager.get_channel_subscribers("global").await;
    assert_eq!(subscribers.len(), receivers.len());
    assert_eq!(manager.get_total_connections().await, receivers.len());
}

#[tokio::test]
async fn test_publish_to_empty_channel_has_no_side_effects() {
    let manager = ConnectionManager::new(0, 0);
    let outcome = manager.broadcast("nobody-home", "{}").await;
    assert_eq!(outcome.reached, 0);
    assert!(outcome.evicted.is_empty());
    assert_eq!(manager.get_total_connections().await, 0);
}

#[tokio::test]
async fn test_dead_subscriber_evicted_on_broadcast() {
    let manager = ConnectionManager::new(0, 0);

    let (tx, rx) = sender();
    manager.add_client(&name("global"), None, None, tx).await.unwrap();
    drop(rx);

    let outcome = manager.broadcast("global", r#"{"x":1}"#).await;
    assert_eq!(outcome.reached, 0);
    assert_eq!(outcome.evicted.len(), 1);
    assert!(manager.get_channel_subscribers("global").await.is_empty());
}

#[tokio::test]
async fn test_full_queue_counts_as_dead() {
    let manager = ConnectionManager::new(0, 0);

    let (tx, _rx) = mpsc::channel::<Outbound>(1);
    manager.add_client(&name("global"), None, None, tx).await.unwrap();

    // First frame fills the queue, second overflows and evicts
    assert_eq!(manager.broadcast("global", "{}").await.reached, 1);
    let outcome = manager.broadcast("global", "{}").await;
    assert_eq!(outcome.reached, 0);
    assert_eq!(outcome.evicted.len(), 1);
}

#[tokio::test]
async fn test_per_subscriber_fifo() {
    let manager = ConnectionManager::new(0, 0);
    let (tx, mut rx) = sender();
    manager.add_client(&name("global"), None, None, tx).await.unwrap();

    for n in 0..10 {
        manager
            .broadcast("global", &format!(r#"{{"seq":{}}}"#, n))
            .await;
    }

    for n in 0..10 {
        match rx.recv().await.unwrap() {
            Outbound::Json(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["seq"], n);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_ephemeral_channel_lifecycle() {
    let manager = ConnectionManager::new(0, 0);
    let ephemeral = name("backtest.run-1");

    let (tx, _rx) = sender();
    let (id, _) = manager.add_client(&ephemeral, None, None, tx).await.unwrap();
    assert!(manager.channel_exists("backtest.run-1").await);

    manager.remove_client(id, "backtest.run-1").await;
    assert!(manager.cleanup_channel_if_ephemeral(&ephemeral).await);
    assert!(!manager.channel_exists("backtest.run-1").await);
}
