//! Topic backend trait definition
//!
//! Defines the interface for pub/sub implementations (memory and Redis).
//! Delivery is fire-and-forget: all active subscribers receive each message,
//! and messages published with no subscribers are dropped.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::error::TopicError;

/// Subscription to a broadcast topic
pub struct BroadcastSubscription {
    /// Stream of received messages
    pub receiver: Pin<Box<dyn Stream<Item = Result<Vec<u8>, TopicError>> + Send>>,
}

/// Topic backend trait
///
/// Both the in-memory and Redis backends implement this trait.
#[async_trait]
pub trait TopicBackend: Send + Sync {
    /// Publish a message to a topic (fire-and-forget)
    ///
    /// All active subscribers receive the message. If no subscribers exist,
    /// the message is silently dropped.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TopicError>;

    /// Subscribe to a topic
    ///
    /// Returns a stream of messages. Lagging subscribers may miss messages
    /// (bounded buffer overflow).
    async fn subscribe(&self, topic: &str) -> Result<BroadcastSubscription, TopicError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), TopicError>;

    /// Signal background forwarding tasks to stop; a no-op for backends
    /// that run none
    fn shutdown(&self) {}

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
