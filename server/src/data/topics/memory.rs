//! In-memory topic backend
//!
//! Local-only pub/sub over tokio broadcast channels. Suitable for development
//! and single-process deployments; a process crash loses all in-flight
//! messages. For multi-machine deployments, use the Redis backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::backend::{BroadcastSubscription, TopicBackend};
use super::error::TopicError;

use crate::core::constants::TOPIC_CHANNEL_CAPACITY;

/// In-memory topic backend
pub struct MemoryTopicBackend {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
}

impl Default for MemoryTopicBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTopicBackend {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get or create a broadcast channel for a topic
    fn get_or_create_channel(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        {
            let channels = self.channels.read();
            if let Some(sender) = channels.get(topic) {
                return sender.clone();
            }
        }

        let mut channels = self.channels.write();
        // Double-check after acquiring write lock
        if let Some(sender) = channels.get(topic) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(TOPIC_CHANNEL_CAPACITY);
        channels.insert(topic.to_string(), sender.clone());
        sender
    }
}

#[async_trait]
impl TopicBackend for MemoryTopicBackend {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TopicError> {
        let sender = self.get_or_create_channel(topic);
        // Send errors mean no active subscribers, which is fine
        let _ = sender.send(payload.to_vec());
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BroadcastSubscription, TopicError> {
        let sender = self.get_or_create_channel(topic);
        let mut receiver = sender.subscribe();

        let stream = stream! {
            loop {
                match receiver.recv().await {
                    Ok(payload) => yield Ok(payload),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        yield Err(TopicError::Lagged(n));
                    }
                }
            }
        };

        Ok(BroadcastSubscription {
            receiver: Box::pin(stream),
        })
    }

    async fn health_check(&self) -> Result<(), TopicError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let backend = MemoryTopicBackend::new();
        let mut sub = backend.subscribe("events").await.unwrap();

        backend.publish("events", b"hello").await.unwrap();

        let msg = sub.receiver.next().await.unwrap().unwrap();
        assert_eq!(msg, b"hello");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let backend = MemoryTopicBackend::new();
        // No subscribers: message is dropped, not an error
        assert!(backend.publish("events", b"nobody").await.is_ok());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let backend = MemoryTopicBackend::new();
        let mut sub_a = backend.subscribe("a").await.unwrap();
        let mut sub_b = backend.subscribe("b").await.unwrap();

        backend.publish("a", b"only-a").await.unwrap();

        let msg = sub_a.receiver.next().await.unwrap().unwrap();
        assert_eq!(msg, b"only-a");

        backend.publish("b", b"only-b").await.unwrap();
        let msg = sub_b.receiver.next().await.unwrap().unwrap();
        assert_eq!(msg, b"only-b");
    }
}
