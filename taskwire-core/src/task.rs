//! `Task`: the immutable envelope a transport builds from a wire message
//! (spec §3 "Task").

use crate::error::TaskError;
use crate::task_id::TaskId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// `(scheme, credentials)` as parsed from an `Authorization` header or
/// equivalent transport field (spec §3, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub scheme: String,
    pub credentials: String,
}

impl Authorization {
    /// Parse an `Authorization` header value of the form `Scheme credentials`.
    pub fn parse(header_value: &str) -> Option<Authorization> {
        let mut parts = header_value.splitn(2, ' ');
        let scheme = parts.next()?.trim();
        let credentials = parts.next()?.trim();
        if scheme.is_empty() || credentials.is_empty() {
            return None;
        }
        Some(Authorization { scheme: scheme.to_string(), credentials: credentials.to_string() })
    }
}

/// Metadata carried alongside a `Task`: authorization, trace id, client
/// id, cookies, and an extensible state bag (spec §3, §6 HTTP adapter
/// header bullets).
#[derive(Debug, Clone, Default)]
pub struct TaskMetadata {
    pub authorization: Option<Authorization>,
    pub trace_id: String,
    pub client_id: Option<String>,
    pub cookies: HashMap<String, String>,
    /// Transport-specific extras (e.g. negotiated response MIME types).
    pub state: HashMap<String, serde_json::Value>,
}

impl TaskMetadata {
    /// Build metadata with a freshly generated trace id (spec §6:
    /// "if absent, the framework generates a fresh one").
    pub fn with_generated_trace_id() -> Self {
        Self { trace_id: uuid::Uuid::new_v4().to_string(), ..Default::default() }
    }
}

/// A lazily-resolved parameter value (spec §4.3 "Lazy parameters").
///
/// `get()` is invoked at most once per `Task`: the first caller runs
/// `resolver`, later callers observe the memoized result (spec §3, §5,
/// §8 "A lazy parameter's underlying get() is invoked at most once").
pub struct LazyValue {
    cell: OnceCell<Result<serde_json::Value, TaskError>>,
    resolver: tokio::sync::Mutex<
        Option<Pin<Box<dyn Future<Output = Result<serde_json::Value, TaskError>> + Send>>>,
    >,
}

impl LazyValue {
    pub fn new<F>(resolver: F) -> Self
    where
        F: Future<Output = Result<serde_json::Value, TaskError>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            resolver: tokio::sync::Mutex::new(Some(Box::pin(resolver))),
        }
    }

    /// Resolve (once) and return the value, or the memoized error.
    pub async fn get(&self) -> Result<serde_json::Value, TaskError> {
        self.cell
            .get_or_init(|| async {
                let mut guard = self.resolver.lock().await;
                match guard.take() {
                    Some(fut) => fut.await,
                    None => Err(TaskError::Internal("lazy value polled after drop".into())),
                }
            })
            .await
            .clone()
    }
}

/// A task parameter value: already resolved, or lazily resolved on first
/// access (spec §3, §4.3).
#[derive(Clone)]
pub enum ParamValue {
    Resolved(serde_json::Value),
    Lazy(Arc<LazyValue>),
}

impl ParamValue {
    pub async fn resolve(&self) -> Result<serde_json::Value, TaskError> {
        match self {
            ParamValue::Resolved(v) => Ok(v.clone()),
            ParamValue::Lazy(lazy) => lazy.get().await,
        }
    }
}

/// Immutable envelope containing the task id, metadata, and parameters
/// (spec §3 "Task"). Lifetime = one transport ingestion; not shared
/// across tasks.
#[derive(Clone)]
pub struct Task {
    pub task_id: TaskId,
    pub metadata: TaskMetadata,
    /// Path parameters resolved by the registry lookup (spec §4.3: path
    /// parameters are consulted before the general parameters map).
    pub path_params: HashMap<String, serde_json::Value>,
    /// Body / query / form parameters, some of which may be lazy.
    params: HashMap<String, ParamValue>,
}

impl Task {
    pub fn new(task_id: TaskId, metadata: TaskMetadata) -> Self {
        Self { task_id, metadata, path_params: HashMap::new(), params: HashMap::new() }
    }

    pub fn with_path_params(mut self, path_params: HashMap<String, serde_json::Value>) -> Self {
        self.path_params = path_params;
        self
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: ParamValue) {
        self.params.insert(name.into(), value);
    }

    /// Resolve a named parameter: path-parameters first, then the
    /// general (possibly lazy) parameters map (spec §4.3).
    pub async fn resolve_param(&self, name: &str) -> Result<Option<serde_json::Value>, TaskError> {
        if let Some(v) = self.path_params.get(name) {
            return Ok(Some(v.clone()));
        }
        match self.params.get(name) {
            Some(p) => Ok(Some(p.resolve().await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_parses_scheme_and_credential() {
        let auth = Authorization::parse("Bearer abc.def.ghi").unwrap();
        assert_eq!(auth.scheme, "Bearer");
        assert_eq!(auth.credentials, "abc.def.ghi");
    }

    #[test]
    fn authorization_rejects_malformed_header() {
        assert!(Authorization::parse("Bearer").is_none());
        assert!(Authorization::parse("").is_none());
    }

    #[tokio::test]
    async fn lazy_value_resolves_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let lazy = Arc::new(LazyValue::new(async move {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({"a": 1}))
        }));

        let a = lazy.get().await.unwrap();
        let b = lazy.get().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn path_params_take_priority_over_lazy_params() {
        let task_id = TaskId::simple(crate::task_id::Method::Get, "/items/{id}");
        let mut task = Task::new(task_id, TaskMetadata::with_generated_trace_id())
            .with_path_params([("id".to_string(), serde_json::json!(7))].into());
        task.set_param("id", ParamValue::Resolved(serde_json::json!(999)));

        let resolved = task.resolve_param("id").await.unwrap().unwrap();
        assert_eq!(resolved, serde_json::json!(7));
    }
}
