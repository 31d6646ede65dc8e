//! Transport-neutral pub/sub and queue contracts (spec §6 "pub/sub and
//! queue transport traits"). Concrete wire drivers (Kafka, RabbitMQ,
//! Pulsar, Iggy) are explicitly out of scope (spec Non-goals); only the
//! trait boundary and an in-process [`crate::local::LocalBroker`] live
//! here.

use async_trait::async_trait;
use taskwire_core::error::TaskError;
use taskwire_core::task::Task;

/// Fire-and-forget broadcast to every live subscriber of a topic.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    async fn publish(&self, topic: &str, task: Task) -> Result<(), TaskError>;

    /// Receive the next message published to `topic` since this
    /// subscription was created. Returns `Ok(None)` if the transport
    /// was closed while waiting.
    async fn next(&self, subscription: &Subscription) -> Result<Option<Task>, TaskError>;

    /// Create a subscription handle for `topic`. Messages published
    /// before this call are not delivered to it (spec §6: "pub/sub has
    /// no replay").
    async fn subscribe(&self, topic: &str) -> Result<Subscription, TaskError>;
}

/// An open subscription to a topic on some [`PubSubTransport`].
pub struct Subscription {
    pub topic: String,
    pub(crate) receiver: tokio::sync::Mutex<tokio::sync::broadcast::Receiver<Task>>,
}

/// At-least-once point-to-point delivery: one enqueued task is
/// delivered to exactly one dequeuing consumer.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn enqueue(&self, queue: &str, task: Task) -> Result<(), TaskError>;

    /// Pop the next available task from `queue`, waiting if none is
    /// currently available.
    async fn dequeue(&self, queue: &str) -> Result<Task, TaskError>;

    /// Non-blocking variant of [`QueueTransport::dequeue`].
    async fn try_dequeue(&self, queue: &str) -> Result<Option<Task>, TaskError>;
}
