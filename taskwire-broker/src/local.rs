//! `LocalBroker`: an in-process pub/sub + queue broker, modeled on the
//! teacher's `EventBus` (`r2e-events/src/lib.rs`) — a concurrent map of
//! named channels, lazily created on first use.

use crate::traits::{PubSubTransport, QueueTransport, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use taskwire_core::error::TaskError;
use taskwire_core::task::Task;
use tokio::sync::{broadcast, mpsc, Mutex};

const BROADCAST_CAPACITY: usize = 256;
const QUEUE_CAPACITY: usize = 1024;

struct QueueChannel {
    sender: mpsc::Sender<Task>,
    receiver: Mutex<mpsc::Receiver<Task>>,
}

/// In-process broker: topics and queues are plain string-keyed
/// channels, created the first time they're published/enqueued to or
/// subscribed/dequeued from (spec §6 "no replay, no persistence" — the
/// concrete wire drivers that would add those are out of scope).
#[derive(Default)]
pub struct LocalBroker {
    topics: DashMap<String, broadcast::Sender<Task>>,
    queues: DashMap<String, Arc<QueueChannel>>,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic_sender(&self, topic: &str) -> broadcast::Sender<Task> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl PubSubTransport for LocalBroker {
    async fn publish(&self, topic: &str, task: Task) -> Result<(), TaskError> {
        let sender = self.topic_sender(topic);
        // No live subscribers is not an error: pub/sub delivery is
        // best-effort to whoever is listening right now (spec §6).
        let _ = sender.send(task);
        Ok(())
    }

    async fn next(&self, subscription: &Subscription) -> Result<Option<Task>, TaskError> {
        let mut receiver = subscription.receiver.lock().await;
        loop {
            match receiver.recv().await {
                Ok(task) => return Ok(Some(task)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, topic = %subscription.topic, "pub/sub subscriber lagged, dropping messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, TaskError> {
        let sender = self.topic_sender(topic);
        Ok(Subscription { topic: topic.to_string(), receiver: Mutex::new(sender.subscribe()) })
    }
}

#[async_trait]
impl QueueTransport for LocalBroker {
    async fn enqueue(&self, queue: &str, task: Task) -> Result<(), TaskError> {
        // Clone the Arc and drop the DashMap shard guard before awaiting,
        // so a slow consumer on one queue can't block unrelated queues
        // sharing the same shard.
        let channel = self
            .queues
            .entry(queue.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
                Arc::new(QueueChannel { sender, receiver: Mutex::new(receiver) })
            })
            .clone();
        channel
            .sender
            .send(task)
            .await
            .map_err(|_| TaskError::ExternalError(format!("queue '{queue}' is closed")))
    }

    async fn dequeue(&self, queue: &str) -> Result<Task, TaskError> {
        let channel = self
            .queues
            .entry(queue.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
                Arc::new(QueueChannel { sender, receiver: Mutex::new(receiver) })
            })
            .clone();
        let mut receiver = channel.receiver.lock().await;
        receiver.recv().await.ok_or_else(|| TaskError::ExternalError(format!("queue '{queue}' is closed")))
    }

    async fn try_dequeue(&self, queue: &str) -> Result<Option<Task>, TaskError> {
        let Some(channel) = self.queues.get(queue).map(|c| c.clone()) else { return Ok(None) };
        let mut receiver = channel.receiver.lock().await;
        match receiver.try_recv() {
            Ok(task) => Ok(Some(task)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(TaskError::ExternalError(format!("queue '{queue}' is closed")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskwire_core::task::TaskMetadata;
    use taskwire_core::task_id::{Method, TaskId};

    fn sample_task(path: &str) -> Task {
        Task::new(TaskId::simple(Method::Post, path), TaskMetadata::with_generated_trace_id())
    }

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let broker = LocalBroker::new();
        let sub = broker.subscribe("orders").await.unwrap();
        broker.publish("orders", sample_task("/orders/1")).await.unwrap();
        let received = broker.next(&sub).await.unwrap().expect("message expected");
        assert_eq!(received.task_id.path_source(), "/orders/1");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let broker = LocalBroker::new();
        assert!(broker.publish("nobody-listening", sample_task("/x")).await.is_ok());
    }

    #[tokio::test]
    async fn queue_delivers_enqueued_task_to_dequeuer() {
        let broker = LocalBroker::new();
        broker.enqueue("jobs", sample_task("/jobs/1")).await.unwrap();
        let task = broker.dequeue("jobs").await.unwrap();
        assert_eq!(task.task_id.path_source(), "/jobs/1");
    }

    #[tokio::test]
    async fn try_dequeue_returns_none_on_empty_queue() {
        let broker = LocalBroker::new();
        assert!(broker.try_dequeue("empty").await.unwrap().is_none());
    }
}
