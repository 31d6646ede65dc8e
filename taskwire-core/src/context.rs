//! `TaskContext`: the per-task working state threaded through middleware
//! and into the handler (spec §4.5, §4.6).

use crate::session::{Session, SessionPool};
use crate::task::Task;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type SessionFieldsFn = Box<dyn FnOnce(&str) -> Pin<Box<dyn Future<Output = Session> + Send>> + Send>;

/// Per-task state visible to middleware and handlers.
///
/// Starts as the "base" context built from the inbound [`Task`]; a
/// session-aware middleware (e.g. an authorization layer) may call
/// [`TaskContext::prepare_session`] once it has decoded a credential.
/// Construction of the session itself stays lazy: nothing actually
/// calls into the pool until something later in the chain awaits
/// [`TaskContext::session`] (spec §4.6 "Extended context ... the first
/// access resolves the session"). There is exactly one `TaskContext`
/// per task, never shared across tasks or threads (spec §5).
pub struct TaskContext {
    pub task: Task,
    session_pool: Option<Arc<SessionPool>>,
    session_key: Option<String>,
    session_fields: tokio::sync::Mutex<Option<SessionFieldsFn>>,
    session: tokio::sync::OnceCell<Arc<Session>>,
    pub cancellation: CancellationToken,
}

impl TaskContext {
    /// `session_pool` is the application's pool, if sessions are
    /// enabled; nothing is resolved from it until a middleware calls
    /// [`TaskContext::prepare_session`] and something later accesses
    /// [`TaskContext::session`].
    pub fn new(task: Task, session_pool: Option<Arc<SessionPool>>) -> Self {
        Self {
            task,
            session_pool,
            session_key: None,
            session_fields: tokio::sync::Mutex::new(None),
            session: tokio::sync::OnceCell::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Register how to resolve this task's session, keyed by `key`
    /// (spec §4.7 "From-task construction": typically the decoded
    /// authorization credential's subject claim). `fields_getter` is
    /// not called here — only when [`TaskContext::session`] is first
    /// awaited, and then via the application's [`SessionPool::upsert`]
    /// so reuse/eviction/expiry all go through the usual pool logic.
    pub fn prepare_session<F, Fut>(&mut self, key: impl Into<String>, fields_getter: F)
    where
        F: FnOnce(&str) -> Fut + Send + 'static,
        Fut: Future<Output = Session> + Send + 'static,
    {
        self.session_key = Some(key.into());
        *self.session_fields.get_mut() = Some(Box::new(move |id: &str| Box::pin(fields_getter(id))));
    }

    /// Directly attach an already-resolved session, bypassing lazy
    /// resolution (e.g. tests, or a transport that manages its own
    /// session lifecycle). A no-op if a session has already been
    /// resolved or attached.
    pub fn attach_session(&self, session: Arc<Session>) {
        let _ = self.session.set(session);
    }

    /// The session, resolving it on first access via the pool/key a
    /// middleware prepared (spec §4.6). Returns `None` if nothing ever
    /// prepared or attached a session for this task.
    pub async fn session(&self) -> Option<&Arc<Session>> {
        if let Some(session) = self.session.get() {
            return Some(session);
        }
        let pool = self.session_pool.as_ref()?;
        let key = self.session_key.clone()?;
        let session = self
            .session
            .get_or_init(|| async {
                let fields_getter = self.session_fields.lock().await.take();
                match fields_getter {
                    Some(f) => pool.upsert(&key, |id| f(id)).await,
                    None => Arc::new(Session::new(&key)),
                }
            })
            .await;
        Some(session)
    }

    /// The session, or a [`crate::error::TaskError::Unauthorized`] if no
    /// middleware prepared or attached one (spec §4.6: handlers that
    /// require a session fail closed when it is absent).
    pub async fn require_session(&self) -> Result<&Arc<Session>, crate::error::TaskError> {
        self.session()
            .await
            .ok_or_else(|| crate::error::TaskError::Unauthorized("no session attached".into()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

tokio::task_local! {
    /// The trace id of the task currently executing on this
    /// (cooperative, not OS) task — scoped with a `task_local!` rather
    /// than a thread-local, since a single OS thread may interleave many
    /// tasks (spec §5 "scheduler-safe, not per-thread"). Log subscribers
    /// and diagnostics read this without needing a `&TaskContext` threaded
    /// all the way down.
    static CURRENT_TRACE_ID: Arc<str>;
}

/// Run `fut` with `trace_id` bound as the current task's trace id for
/// the duration of the future.
pub async fn with_trace_id<F: std::future::Future>(trace_id: Arc<str>, fut: F) -> F::Output {
    CURRENT_TRACE_ID.scope(trace_id, fut).await
}

/// The trace id of the task currently executing, if called from inside
/// [`with_trace_id`]'s scope.
pub fn current_trace_id() -> Option<Arc<str>> {
    CURRENT_TRACE_ID.try_with(|id| id.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskMetadata;
    use crate::task_id::{Method, TaskId};
    use std::time::Duration;

    fn sample_task() -> Task {
        Task::new(TaskId::simple(Method::Get, "/ping"), TaskMetadata::with_generated_trace_id())
    }

    #[tokio::test]
    async fn fresh_context_has_no_session() {
        let ctx = TaskContext::new(sample_task(), None);
        assert!(ctx.session().await.is_none());
        assert!(ctx.require_session().await.is_err());
    }

    #[tokio::test]
    async fn attaching_session_makes_it_observable() {
        let ctx = TaskContext::new(sample_task(), None);
        let session = Arc::new(Session::new("user-1"));
        ctx.attach_session(session.clone());
        assert!(ctx.require_session().await.is_ok());
        assert_eq!(ctx.session().await.unwrap().id(), "user-1");
    }

    #[tokio::test]
    async fn prepared_session_resolves_lazily_on_first_access() {
        let pool = Arc::new(SessionPool::new(10, Duration::from_secs(60)));
        let mut ctx = TaskContext::new(sample_task(), Some(pool.clone()));
        assert!(pool.get("user-42").is_none());

        ctx.prepare_session("user-42", |id| {
            let session = Session::new(id);
            session.set(7u32);
            std::future::ready(session)
        });
        assert!(pool.get("user-42").is_none(), "fields_getter must not run before first access");

        let session = ctx.session().await.unwrap();
        assert_eq!(session.id(), "user-42");
        assert_eq!(*session.get::<u32>().unwrap(), 7);
        assert!(pool.get("user-42").is_some());
    }

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let ctx = TaskContext::new(sample_task(), None);
        assert!(!ctx.is_cancelled());
        ctx.cancellation.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn current_trace_id_is_visible_only_inside_scope() {
        assert!(current_trace_id().is_none());
        let id: Arc<str> = Arc::from("trace-123");
        let observed = with_trace_id(id.clone(), async { current_trace_id() }).await;
        assert_eq!(observed.as_deref(), Some("trace-123"));
        assert!(current_trace_id().is_none());
    }
}
