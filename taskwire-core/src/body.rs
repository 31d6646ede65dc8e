//! `Body`: the sum type of result payload shapes (spec §3 "Body").

use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;

/// A single chunk produced by a [`Body::Streaming`] generator.
pub type StreamItem = Result<Body, crate::error::TaskError>;

/// The stream of chunks a streaming body yields. Boxed because handlers
/// build it from arbitrary async generators (spec §3 "Streaming(generator, cleanup)").
pub type BodyStream = Pin<Box<dyn Stream<Item = StreamItem> + Send>>;

/// A cleanup callback invoked when a streaming body's consumer
/// disconnects before the generator terminates normally (spec §4.5
/// "Cancellation", §5 "Backpressure").
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// The sum type of result payload shapes (spec §3).
pub enum Body {
    /// No payload.
    Empty,
    /// A JSON-representable value — a primitive, list, map, or a
    /// handler's serializable return value (spec §4.3 step 4).
    Json(serde_json::Value),
    /// A sequence of non-streaming bodies, yielded asynchronously, plus
    /// a cleanup hook run on unexpected disconnect.
    Streaming(BodyStream, Option<Cleanup>),
}

impl Body {
    /// Construct a streaming body from a stream of non-streaming chunks.
    pub fn streaming(stream: BodyStream, cleanup: Option<Cleanup>) -> Self {
        Body::Streaming(stream, cleanup)
    }

    /// Serialize this body to bytes using the given character encoding.
    ///
    /// Streaming bodies cannot be serialized in one shot (the transport
    /// must drive the stream chunk-by-chunk); calling this on a
    /// `Streaming` variant returns an empty byte string.
    pub fn to_bytes(&self, encoding: &str) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Json(value) => {
                let s = serde_json::to_string(value).unwrap_or_default();
                encode_str(&s, encoding)
            }
            Body::Streaming(..) => Bytes::new(),
        }
    }

    /// Serialize this body to a dict/map form suitable for embedding into
    /// another JSON document (e.g. a pub/sub envelope).
    pub fn to_jsonable(&self) -> serde_json::Value {
        match self {
            Body::Empty => serde_json::Value::Null,
            Body::Json(value) => value.clone(),
            Body::Streaming(..) => serde_json::Value::Null,
        }
    }

    /// Serialize this body to a JSON string.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.to_jsonable()).unwrap_or_default()
    }

    /// Run the cleanup hook, if present. Transports call this when a
    /// streaming consumer disconnects mid-stream, or when any other
    /// unrecoverable wire error occurs while sending (spec §6 "Transport
    /// adapter contract").
    pub fn cleanup(&mut self) {
        if let Body::Streaming(_, cleanup) = self {
            if let Some(f) = cleanup.take() {
                f();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Json(v) => write!(f, "Body::Json({v})"),
            Body::Streaming(..) => write!(f, "Body::Streaming(..)"),
        }
    }
}

fn encode_str(s: &str, encoding: &str) -> Bytes {
    // Only UTF-8 family encodings are meaningful for a JSON payload; any
    // other requested encoding falls back to UTF-8 rather than failing,
    // since JSON itself is defined over Unicode text.
    match encoding.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" | "" => Bytes::from(s.as_bytes().to_vec()),
        _ => Bytes::from(s.as_bytes().to_vec()),
    }
}
