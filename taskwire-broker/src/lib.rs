//! Pub/sub and queue transport traits for Taskwire, grounded in the
//! teacher's `r2e-events::EventBus`. Only an in-process
//! [`local::LocalBroker`] is provided; concrete wire drivers (Kafka,
//! RabbitMQ, Pulsar, Iggy) are out of scope (spec Non-goals).

pub mod local;
pub mod traits;

pub use local::LocalBroker;
pub use traits::{PubSubTransport, QueueTransport, Subscription};
