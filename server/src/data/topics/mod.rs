//! Topic system
//!
//! Provides pub/sub messaging with pluggable backends:
//! - In-memory (default) - local-only, for development and single-process
//! - Redis (when REDIS_URL is set) - distributed, for multi-machine deployments
//!
//! Delivery is fire-and-forget: all active subscribers receive each message,
//! no persistence. Used for ephemeral notifications like reported emergencies.

mod backend;
mod error;
mod memory;
mod redis;

use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{BroadcastSubscription, TopicBackend};
pub use error::TopicError;
use memory::MemoryTopicBackend;

use crate::core::config::RedisConfig;

/// Central topic service
pub struct TopicService {
    backend: Arc<dyn TopicBackend>,
}

impl std::fmt::Debug for TopicService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl TopicService {
    /// Create a new topic service from configuration
    ///
    /// With a Redis config present the distributed backend is used; otherwise
    /// the process-local in-memory backend.
    pub async fn new(config: Option<&RedisConfig>) -> Result<Self, TopicError> {
        let backend: Arc<dyn TopicBackend> = match config {
            Some(redis_config) => Arc::new(redis::RedisTopicBackend::new(&redis_config.url).await?),
            None => Arc::new(MemoryTopicBackend::new()),
        };

        Ok(Self { backend })
    }

    /// Create an in-memory topic service, used in tests
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryTopicBackend::new()),
        }
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Get a typed handle to a broadcast topic
    pub fn broadcast_topic<T>(&self, name: &str) -> BroadcastTopic<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        BroadcastTopic {
            name: name.to_string(),
            backend: Arc::clone(&self.backend),
            _phantom: PhantomData,
        }
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), TopicError> {
        self.backend.health_check().await
    }

    /// Stop backend forwarding tasks during graceful shutdown
    pub fn shutdown(&self) {
        self.backend.shutdown();
    }
}

/// Typed handle to a broadcast topic
///
/// Payloads are MessagePack-encoded on the wire.
pub struct BroadcastTopic<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    name: String,
    backend: Arc<dyn TopicBackend>,
    _phantom: PhantomData<T>,
}

impl<T> BroadcastTopic<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Publish a message (fire-and-forget)
    pub async fn publish(&self, msg: &T) -> Result<(), TopicError> {
        let payload =
            rmp_serde::to_vec(msg).map_err(|e| TopicError::Serialization(e.to_string()))?;
        self.backend.publish(&self.name, &payload).await
    }

    /// Subscribe to this topic
    pub async fn subscribe(&self) -> Result<BroadcastTopicSubscriber<T>, TopicError> {
        let subscription = self.backend.subscribe(&self.name).await?;
        Ok(BroadcastTopicSubscriber {
            subscription,
            _phantom: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Subscriber to a broadcast topic
pub struct BroadcastTopicSubscriber<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    subscription: BroadcastSubscription,
    _phantom: PhantomData<T>,
}

impl<T> BroadcastTopicSubscriber<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Receive the next message
    pub async fn recv(&mut self) -> Result<T, TopicError> {
        if let Some(result) = self.subscription.receiver.next().await {
            let payload = result?;
            let decoded: T = rmp_serde::from_slice(&payload)
                .map_err(|e| TopicError::Serialization(e.to_string()))?;
            Ok(decoded)
        } else {
            Err(TopicError::ChannelClosed)
        }
    }
}
