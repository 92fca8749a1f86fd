//! In-Process Publish/Subscribe Broker
//!
//! The broker keeps, per channel, the sending halves of every subscriber's
//! bounded queue. Publishing never blocks: a subscriber whose queue is full
//! simply misses the message.
//!
//! ## Message Flow
//!
//! ```text
//!  publish("news", "hi")
//!        │
//!        ▼
//! ┌──────────────────────────────┐
//! │ Broker                       │
//! │  "news" -> [sub#1, sub#4]    │──try_send──> Subscription #1 queue
//! │  "jobs" -> [sub#4]           │──try_send──> Subscription #4 queue
//! └──────────────────────────────┘
//! ```

use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Kind of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Confirmation that a channel subscription is active
    Subscription,
    /// A published payload
    Message,
}

/// A message delivered to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub channel: String,
    /// Empty for subscription confirmations
    pub payload: String,
}

impl Message {
    fn subscribed(channel: &str) -> Self {
        Self {
            kind: MessageKind::Subscription,
            channel: channel.to_string(),
            payload: String::new(),
        }
    }

    fn published(channel: &str, payload: &str) -> Self {
        Self {
            kind: MessageKind::Message,
            channel: channel.to_string(),
            payload: payload.to_string(),
        }
    }
}

/// A registered subscriber queue.
#[derive(Debug)]
struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Message>,
}

/// Routes published messages to subscriber queues.
#[derive(Debug)]
pub struct Broker {
    channels: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    /// Queue capacity of each new subscription
    buffer: usize,
}

impl Broker {
    /// Creates a broker whose subscriptions buffer up to `buffer` messages.
    pub fn new(buffer: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Delivers `payload` to every subscriber of `channel`.
    ///
    /// # Returns
    ///
    /// The number of subscribers registered on the channel, including any
    /// whose full queue caused the message to be dropped.
    pub fn publish(&self, channel: &str, payload: &str) -> Result<i64> {
        let channels = self.channels.read();
        let Some(subscribers) = channels.get(channel) else {
            return Ok(0);
        };

        for subscriber in subscribers {
            match subscriber.tx.try_send(Message::published(channel, payload)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    trace!(
                        channel = %channel,
                        subscriber = subscriber.id,
                        "Subscriber queue full, message dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(
                        channel = %channel,
                        subscriber = subscriber.id,
                        "Subscriber gone, message dropped"
                    );
                }
            }
        }

        Ok(subscribers.len() as i64)
    }

    /// Subscribes to `channels`, queueing one confirmation per channel.
    ///
    /// Repeated channel names are subscribed once.
    pub fn subscribe(self: &Arc<Self>, channels: &[&str]) -> Subscription {
        let mut unique: Vec<String> = Vec::with_capacity(channels.len());
        for channel in channels {
            if !unique.iter().any(|c| c == channel) {
                unique.push(channel.to_string());
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer.max(unique.len()));

        {
            let mut registry = self.channels.write();
            for channel in &unique {
                // Capacity covers every confirmation, so this cannot fail
                let _ = tx.try_send(Message::subscribed(channel));
                registry.entry(channel.clone()).or_default().push(Subscriber {
                    id,
                    tx: tx.clone(),
                });
            }
        }

        debug!(subscriber = id, channels = ?unique, "Subscribed");

        Subscription {
            id,
            channels: unique,
            rx,
            broker: Arc::downgrade(self),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of subscribers currently registered on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .get(channel)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Removes subscriber `id` from `channels`.
    fn unsubscribe(&self, id: u64, channels: &[String]) {
        let mut registry = self.channels.write();
        for channel in channels {
            if let Some(subscribers) = registry.get_mut(channel) {
                subscribers.retain(|s| s.id != id);
                if subscribers.is_empty() {
                    registry.remove(channel);
                }
            }
        }
        debug!(subscriber = id, "Unsubscribed");
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SUBSCRIBER_BUFFER)
    }
}

/// A live subscription to one or more channels.
///
/// Dropping an open subscription unsubscribes it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    channels: Vec<String>,
    rx: mpsc::Receiver<Message>,
    broker: Weak<Broker>,
    closed: AtomicBool,
}

impl Subscription {
    /// Channels this subscription listens on.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Waits for the next message.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] when `cancel` fires first
    /// - [`Error::SubscriptionClosed`] when the subscription (or its broker)
    ///   is gone
    pub async fn receive(&mut self, cancel: &CancellationToken) -> Result<Message> {
        if self.is_closed() {
            return Err(Error::SubscriptionClosed);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            message = self.rx.recv() => message.ok_or(Error::SubscriptionClosed),
        }
    }

    /// Returns a queued message without waiting.
    pub fn try_receive(&mut self) -> Option<Message> {
        if self.is_closed() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Unsubscribes from every channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubscriptionClosed`] if already closed.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::SubscriptionClosed);
        }
        if let Some(broker) = self.broker.upgrade() {
            broker.unsubscribe(self.id, &self.channels);
        }
        Ok(())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready};

    fn broker() -> Arc<Broker> {
        Arc::new(Broker::new(4))
    }

    #[tokio::test]
    async fn test_subscribe_confirmations() {
        let broker = broker();
        let mut sub = broker.subscribe(&["a", "b", "a"]);
        let token = CancellationToken::new();

        assert_eq!(sub.channels(), ["a".to_string(), "b".to_string()]);

        let first = sub.receive(&token).await.unwrap();
        assert_eq!(first.kind, MessageKind::Subscription);
        assert_eq!(first.channel, "a");
        assert_eq!(first.payload, "");

        let second = sub.receive(&token).await.unwrap();
        assert_eq!(second.channel, "b");
        assert_eq!(sub.try_receive(), None);
    }

    #[tokio::test]
    async fn test_publish_delivers_to_all_subscribers() {
        let broker = broker();
        let mut one = broker.subscribe(&["news"]);
        let mut two = broker.subscribe(&["news", "sport"]);
        let token = CancellationToken::new();

        // Drain confirmations
        one.receive(&token).await.unwrap();
        two.receive(&token).await.unwrap();
        two.receive(&token).await.unwrap();

        assert_eq!(broker.publish("news", "hello").unwrap(), 2);
        assert_eq!(broker.publish("sport", "goal").unwrap(), 1);
        assert_eq!(broker.publish("weather", "rain").unwrap(), 0);

        assert_eq!(
            one.receive(&token).await.unwrap(),
            Message {
                kind: MessageKind::Message,
                channel: "news".into(),
                payload: "hello".into(),
            }
        );
        assert_eq!(two.receive(&token).await.unwrap().payload, "hello");
        assert_eq!(two.receive(&token).await.unwrap().payload, "goal");
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let broker = Arc::new(Broker::new(1));
        let mut sub = broker.subscribe(&["c"]);

        // Queue holds the confirmation; both publishes are dropped
        assert_eq!(broker.publish("c", "one").unwrap(), 1);
        assert_eq!(broker.publish("c", "two").unwrap(), 1);

        assert_eq!(sub.try_receive().unwrap().kind, MessageKind::Subscription);
        assert_eq!(sub.try_receive(), None);

        broker.publish("c", "three").unwrap();
        assert_eq!(sub.try_receive().unwrap().payload, "three");
    }

    #[tokio::test]
    async fn test_receive_cancelled() {
        let broker = broker();
        let mut sub = broker.subscribe(&["c"]);
        sub.try_receive().unwrap();

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        assert_eq!(sub.receive(&token).await, Err(Error::Cancelled));
    }

    #[test]
    fn test_receive_waits_for_publish() {
        let broker = broker();
        let mut sub = broker.subscribe(&["c"]);
        sub.try_receive().unwrap();
        let token = CancellationToken::new();

        let mut receive = tokio_test::task::spawn(sub.receive(&token));
        assert_pending!(receive.poll());

        broker.publish("c", "ping").unwrap();
        assert!(receive.is_woken());
        let message = assert_ready!(receive.poll()).unwrap();
        assert_eq!(message.payload, "ping");
    }

    #[test]
    fn test_close_twice_fails() {
        let broker = broker();
        let sub = broker.subscribe(&["a", "b"]);
        assert_eq!(broker.subscriber_count("a"), 1);

        assert_eq!(sub.close(), Ok(()));
        assert_eq!(broker.subscriber_count("a"), 0);
        assert_eq!(broker.subscriber_count("b"), 0);
        assert_eq!(broker.publish("a", "x").unwrap(), 0);

        assert_eq!(sub.close(), Err(Error::SubscriptionClosed));
    }

    #[tokio::test]
    async fn test_receive_after_close() {
        let broker = broker();
        let mut sub = broker.subscribe(&["a"]);
        sub.close().unwrap();

        let token = CancellationToken::new();
        assert_eq!(sub.receive(&token).await, Err(Error::SubscriptionClosed));
        assert_eq!(sub.try_receive(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let broker = broker();
        {
            let _sub = broker.subscribe(&["a"]);
            assert_eq!(broker.subscriber_count("a"), 1);
        }
        assert_eq!(broker.subscriber_count("a"), 0);
    }

    #[tokio::test]
    async fn test_broker_dropped_closes_stream() {
        let broker = broker();
        let mut sub = broker.subscribe(&["a"]);
        sub.try_receive().unwrap();
        drop(broker);

        let token = CancellationToken::new();
        assert_eq!(sub.receive(&token).await, Err(Error::SubscriptionClosed));
    }
}
