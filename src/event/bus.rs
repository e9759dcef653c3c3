//! In-process event bus.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};

use crate::event::{
    Disposition, EventError, EventHandler, EventResult, EventSource, RawMessage, RedeliveryPolicy,
};
use crate::observability::metrics;

struct Queue {
    name: String,
    tx: mpsc::UnboundedSender<RawMessage>,
}

/// Fan-out bus: every queue bound to a topic receives each published message.
#[derive(Clone)]
pub struct EventBus {
    topics: Arc<DashMap<String, Vec<Queue>>>,
    policy: RedeliveryPolicy,
    concurrency: usize,
    shutdown: broadcast::Sender<()>,
}

impl EventBus {
    /// Create a bus whose dispatchers stop when `shutdown` fires.
    pub fn new(policy: RedeliveryPolicy, concurrency: usize, shutdown: broadcast::Sender<()>) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            policy,
            concurrency: concurrency.max(1),
            shutdown,
        }
    }

    /// Number of queues bound to `topic`.
    pub fn queue_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |queues| queues.len())
    }
}

impl EventSource for EventBus {
    fn subscribe<H: EventHandler>(&self, topic: &str, queue: &str, handler: Arc<H>) -> EventResult<()> {
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut queues = self.topics.entry(topic.to_string()).or_default();
            if queues.iter().any(|q| q.name == queue) {
                return Err(EventError::DuplicateQueue {
                    topic: topic.to_string(),
                    queue: queue.to_string(),
                });
            }
            queues.push(Queue {
                name: queue.to_string(),
                tx: tx.clone(),
            });
        }

        let dispatcher = Dispatcher {
            topic: topic.to_string(),
            queue: queue.to_string(),
            handler,
            redeliver_tx: tx,
            policy: self.policy,
            permits: Arc::new(Semaphore::new(self.concurrency)),
        };
        let shutdown = self.shutdown.subscribe();
        tokio::spawn(dispatcher.run(rx, shutdown));

        tracing::info!(topic = %topic, queue = %queue, "Subscribed");
        Ok(())
    }

    fn publish<T: Serialize + ?Sized>(&self, topic: &str, event: &T) -> EventResult<()> {
        let msg = RawMessage::encode(topic, event)?;

        let Some(queues) = self.topics.get(topic) else {
            tracing::trace!(topic = %topic, id = %msg.id, "No queue bound, message discarded");
            return Ok(());
        };

        for queue in queues.iter() {
            queue.tx.send(msg.clone()).map_err(|_| EventError::Closed)?;
        }
        Ok(())
    }
}

struct Dispatcher<H> {
    topic: String,
    queue: String,
    handler: Arc<H>,
    redeliver_tx: mpsc::UnboundedSender<RawMessage>,
    policy: RedeliveryPolicy,
    permits: Arc<Semaphore>,
}

impl<H: EventHandler> Dispatcher<H> {
    async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<RawMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let this = Arc::new(self);
        // Shutdown is observed both while every permit is busy and while idle
        loop {
            let permit = tokio::select! {
                permit = this.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.recv() => break,
            };
            let msg = tokio::select! {
                received = rx.recv() => match received {
                    Some(msg) => msg,
                    None => break,
                },
                _ = shutdown.recv() => break,
            };

            let this = this.clone();
            tokio::spawn(async move { this.deliver(msg, permit).await });
        }
        tracing::info!(queue = %this.queue, "Dispatcher stopped");
    }

    async fn deliver(&self, msg: RawMessage, permit: OwnedSemaphorePermit) {
        let event: H::Event = match msg.decode() {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(queue = %self.queue, id = %msg.id, error = %e, "Dropping undecodable message");
                metrics::record_delivery(&self.topic, "undecodable");
                return;
            }
        };

        let error = match self.handler.handle(event).await {
            Ok(()) => {
                metrics::record_delivery(&self.topic, "ack");
                return;
            }
            Err(e) => e,
        };
        drop(permit);

        match self.handler.disposition(&error) {
            Disposition::Reject => {
                tracing::debug!(queue = %self.queue, id = %msg.id, error = %error, "Message rejected");
                metrics::record_delivery(&self.topic, "rejected");
            }
            Disposition::Redeliver if self.policy.allows(msg.attempt) => {
                let redelivery = msg.attempt + 1;
                let delay = self.policy.delay_for(redelivery);
                tracing::warn!(
                    queue = %self.queue,
                    id = %msg.id,
                    attempt = redelivery,
                    delay = ?delay,
                    error = %error,
                    "Handler failed, redelivering"
                );
                metrics::record_delivery(&self.topic, "redelivered");

                tokio::time::sleep(delay).await;
                let retry = RawMessage {
                    attempt: redelivery,
                    ..msg
                };
                if self.redeliver_tx.send(retry).is_err() {
                    tracing::debug!(queue = %self.queue, "Queue closed before redelivery");
                }
            }
            Disposition::Redeliver => {
                tracing::error!(
                    queue = %self.queue,
                    id = %msg.id,
                    attempts = msg.attempt + 1,
                    error = %error,
                    "Handler failed, redeliveries exhausted, dropping message"
                );
                metrics::record_delivery(&self.topic, "dropped");
            }
        }
    }
}
