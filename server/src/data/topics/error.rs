//! Topic error types

use std::fmt;

/// Error type for topic operations
#[derive(Debug)]
pub enum TopicError {
    /// Channel or connection closed
    ChannelClosed,
    /// Receiver lagged behind
    Lagged(u64),
    /// Connection error (Redis)
    Connection(String),
    /// Serialization/deserialization error
    Serialization(String),
}

impl std::error::Error for TopicError {}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicError::ChannelClosed => write!(f, "channel closed"),
            TopicError::Lagged(n) => write!(f, "receiver lagged by {} messages", n),
            TopicError::Connection(msg) => write!(f, "connection error: {}", msg),
            TopicError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl From<tokio::sync::broadcast::error::RecvError> for TopicError {
    fn from(err: tokio::sync::broadcast::error::RecvError) -> Self {
        match err {
            tokio::sync::broadcast::error::RecvError::Closed => TopicError::ChannelClosed,
            tokio::sync::broadcast::error::RecvError::Lagged(n) => TopicError::Lagged(n),
        }
    }
}

impl From<deadpool_redis::PoolError> for TopicError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        TopicError::Connection(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for TopicError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        TopicError::Connection(err.to_string())
    }
}
