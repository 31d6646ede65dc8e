//! `Application` / `AppBuilder`: wires registries, middleware, and
//! session pool into the single `handle_task` entry point a transport
//! calls (spec §2 "data flow", §4.2 wiring). Grounded in the shape of
//! the teacher's `AppBuilder` (`r2e-core/src/builder.rs`), simplified
//! to a single untyped state bag rather than a phantom-typed bean
//! dependency graph (spec §9: no global singletons, explicit wiring).

use crate::config::TaskwireConfig;
use crate::context::{with_trace_id, TaskContext};
use crate::error::TaskError;
use crate::manager::{mount_all, Manager};
use crate::middleware::{dispatch, Middleware};
use crate::registry::TaskRegistry;
use crate::result::TaskResult;
use crate::session::SessionPool;
use crate::task::Task;
use crate::task_id::TaskId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, instrument, Instrument};

/// A fully wired application: a merged task registry, an ordered
/// middleware chain, and an optional session pool (spec §3
/// "Application").
pub struct Application {
    registry: TaskRegistry,
    middleware: Vec<Arc<dyn Middleware>>,
    session_pool: Option<Arc<SessionPool>>,
    config: TaskwireConfig,
}

impl Application {
    /// Look up, dispatch, and run `task` through the full middleware
    /// chain, converting any propagated [`TaskError`] into its wire
    /// [`TaskResult`] (spec §7 "every error becomes a result, never a
    /// panic").
    pub async fn handle_task(&self, task: Task) -> TaskResult {
        let trace_id: Arc<str> = Arc::from(task.metadata.trace_id.as_str());
        with_trace_id(trace_id, self.handle_task_inner(task)).await
    }

    #[instrument(skip_all, fields(trace_id = %task.metadata.trace_id, task = field::Empty))]
    async fn handle_task_inner(&self, mut task: Task) -> TaskResult {
        let lookup = match self.registry.lookup(&task.task_id) {
            Some(lookup) => lookup,
            None => return TaskError::NotFound(task.task_id.path_source()).into(),
        };
        tracing::Span::current().record("task", field::display(lookup.entry.task_id.path_source()));
        task.path_params.extend(lookup.path_params);

        // Session resolution itself is lazy (spec §4.6): a security
        // middleware earlier in `self.middleware` decodes the credential
        // and calls `ctx.prepare_session(key, fields_getter)`; nothing
        // touches the pool until a handler first awaits `ctx.session()`.
        let mut ctx = TaskContext::new(task, self.session_pool.clone());

        let entry: Arc<dyn Middleware> = Arc::new(lookup.entry.clone());
        let mut chain = self.middleware.clone();
        chain.push(entry);

        let outcome = dispatch(&chain, &mut ctx).instrument(tracing::info_span!("dispatch")).await;

        match outcome {
            Ok(result) => result,
            Err(err) => {
                if matches!(err, TaskError::Internal(_)) {
                    tracing::error!(error = %err, "task handling failed");
                } else {
                    tracing::warn!(error = %err, "task rejected");
                }
                err.into()
            }
        }
    }

    pub fn config(&self) -> &TaskwireConfig {
        &self.config
    }

    pub fn session_pool(&self) -> Option<&Arc<SessionPool>> {
        self.session_pool.as_ref()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }
}

/// Builds an [`Application`] from managers, middleware, and
/// configuration (spec §3 "Application composition layer").
#[derive(Default)]
pub struct AppBuilder {
    managers: Vec<Arc<dyn Manager>>,
    middleware: Vec<Arc<dyn Middleware>>,
    config: Option<TaskwireConfig>,
    session_capacity: usize,
    session_max_idle: Duration,
    with_sessions: bool,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            managers: Vec::new(),
            middleware: Vec::new(),
            config: None,
            session_capacity: 10_000,
            session_max_idle: Duration::from_secs(30 * 60),
            with_sessions: false,
        }
    }

    pub fn with_manager(mut self, manager: Arc<dyn Manager>) -> Self {
        self.managers.push(manager);
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn with_config(mut self, config: TaskwireConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Enable the session pool, with the given upper bound and
    /// idle-eviction window (spec §4.7).
    pub fn with_sessions(mut self, capacity: usize, max_idle: Duration) -> Self {
        self.with_sessions = true;
        self.session_capacity = capacity;
        self.session_max_idle = max_idle;
        self
    }

    pub fn build(self) -> Application {
        let mut registry = TaskRegistry::new();
        mount_all(&mut registry, &self.managers);

        Application {
            registry,
            middleware: self.middleware,
            session_pool: self
                .with_sessions
                .then(|| Arc::new(SessionPool::new(self.session_capacity, self.session_max_idle))),
            config: self.config.unwrap_or_else(TaskwireConfig::empty),
        }
    }
}

/// Convenience constructor matching the fully-static registration path
/// used by integration tests and demos: one manager, no middleware, no
/// sessions, default config.
pub fn single_manager_app(manager: Arc<dyn Manager>) -> Application {
    AppBuilder::new().with_manager(manager).build()
}

/// Prefix helper for a manager mounted at the application root.
pub fn root_prefix() -> TaskId {
    TaskId::simple(crate::task_id::Method::Any, "/")
}
