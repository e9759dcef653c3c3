//! Event delivery subsystem.
//!
//! # Data Flow
//! ```text
//! publisher
//!     → EventBus::publish(topic, event)   (JSON-encoded RawMessage)
//!     → one queue per subscription on the topic
//!     → dispatcher task per queue
//!     → handler task per message (bounded by concurrency)
//!         Ok            → ack
//!         Err, retryable → redelivery.rs backoff → back onto the queue
//!         Err, otherwise → dropped
//! ```
//!
//! # Design Decisions
//! - Messages on one queue are handled in parallel; no per-key ordering
//! - Undecodable bodies are dropped without reaching the handler

pub mod bus;
pub mod ingest;
pub mod redelivery;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use bus::EventBus;
pub use redelivery::RedeliveryPolicy;

/// Topic timeout reports are published on.
pub const TIMEOUT_URL_TOPIC: &str = "timeout-url";

/// A claim that a request to `url` did not complete in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutReport {
    pub url: String,
}

impl TimeoutReport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A message as it travels through a queue.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: Uuid,
    pub topic: String,
    pub body: Vec<u8>,
    /// 0 on first delivery, incremented on each redelivery.
    pub attempt: u32,
}

impl RawMessage {
    /// Encode `event` as a fresh message on `topic`.
    pub fn encode<T: Serialize + ?Sized>(topic: &str, event: &T) -> EventResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            body: serde_json::to_vec(event)?,
            attempt: 0,
        })
    }

    /// Decode the body.
    pub fn decode<T: DeserializeOwned>(&self) -> EventResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Errors raised by the event subsystem itself.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event body: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("queue '{queue}' is already subscribed to '{topic}'")]
    DuplicateQueue { topic: String, queue: String },

    #[error("event bus is shut down")]
    Closed,
}

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;

/// What the source does with a message whose handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Try again later, within the redelivery policy.
    Redeliver,
    /// Never hand this message out again.
    Reject,
}

/// Handles decoded events of one type.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    type Event: DeserializeOwned + Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(&self, event: Self::Event) -> Result<(), Self::Error>;

    /// Decide whether a failed message is redelivered.
    fn disposition(&self, _error: &Self::Error) -> Disposition {
        Disposition::Redeliver
    }
}

/// Subscription and publication of events.
pub trait EventSource {
    /// Register `handler` for `topic` under the queue name `queue`.
    fn subscribe<H: EventHandler>(&self, topic: &str, queue: &str, handler: Arc<H>) -> EventResult<()>;

    /// Publish `event` to every queue subscribed to `topic`.
    fn publish<T: Serialize + ?Sized>(&self, topic: &str, event: &T) -> EventResult<()>;
}
