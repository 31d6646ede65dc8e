//! `TaskRegistry`: static exact-match table plus an ordered list of
//! dynamic entries consulted on miss (spec §4.2).

use crate::body::Body;
use crate::context::TaskContext;
use crate::error::TaskError;
use crate::handler::Handler;
use crate::middleware::{Middleware, Next};
use crate::result::TaskResult;
use crate::task_id::{MatchParams, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A `TaskId` bound to an ordered list of handlers, usually one (spec
/// §3 "TaskEntry"). The entry is itself a [`Middleware`]: running it
/// fans out concurrently over every bound handler before the chain
/// continues (spec §4.4).
#[derive(Clone)]
pub struct TaskEntry {
    pub task_id: TaskId,
    pub handlers: Vec<Arc<dyn Handler>>,
}

impl TaskEntry {
    pub fn new(task_id: TaskId, handler: Arc<dyn Handler>) -> Self {
        Self { task_id, handlers: vec![handler] }
    }
}

/// Run every bound handler concurrently, join them, and fold the
/// results into a single `TaskResult` before handing off to the rest of
/// the chain (spec §4.4 "TaskEntry execution").
///
/// `|R| == 1` passes the lone result through unchanged; `|R| > 1` keeps
/// the first result's status/headers/cookies and replaces its body with
/// a `Json` array of every handler's body, in handler-registration
/// order.
#[async_trait]
impl Middleware for TaskEntry {
    async fn handle<'a>(&'a self, ctx: &mut TaskContext, next: Next<'a>) -> Result<TaskResult, TaskError> {
        let shared: &TaskContext = ctx;
        let outcomes = futures_util::future::join_all(self.handlers.iter().map(|h| h.handle(shared))).await;

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            results.push(outcome?);
        }

        let aggregated = if results.len() <= 1 {
            results.into_iter().next().unwrap_or_else(TaskResult::no_content)
        } else {
            let status = results[0].status;
            let headers = results[0].headers.clone();
            let cookies = results[0].cookies.clone();
            let bodies = results.iter().map(|r| r.body.to_jsonable()).collect();
            TaskResult { status, body: Body::Json(serde_json::Value::Array(bodies)), headers, cookies }
        };

        next.run(ctx).await?;
        Ok(aggregated)
    }
}

/// The outcome of a successful registry lookup: the matched entry plus
/// any path parameters the pattern extracted.
pub struct Lookup<'a> {
    pub entry: &'a TaskEntry,
    pub path_params: MatchParams,
}

/// Binds `TaskId`s to `Handler`s. Static (fully literal) entries live in
/// an exact-match table; entries with dynamic segments or a wildcard
/// method are consulted in insertion order on a static-table miss
/// (spec §4.2).
#[derive(Default)]
pub struct TaskRegistry {
    static_table: HashMap<String, TaskEntry>,
    dynamic_entries: Vec<TaskEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a handler, then either merge it into an existing
    /// matching entry or create a new one (spec §4.2 "add_handler").
    /// Registering a second handler under the same pattern binds both
    /// to the one `TaskId` for fan-out (spec §4.4), rather than
    /// replacing the first.
    pub fn add_handler(&mut self, task_id: TaskId, handler: Arc<dyn Handler>) {
        self.add_entry(TaskEntry::new(task_id, handler));
    }

    /// Append `entry`'s handlers onto a matching existing entry, or
    /// insert it as a new one (spec §4.2 "add_entry"). Two entries
    /// match when they're the same static key, or — for dynamic
    /// patterns — the same exact pattern (method + literal `{name}`
    /// path); a different pattern that merely shares a shape (e.g.
    /// `{id}` vs `{slug}`) still gets its own entry, tried in insertion
    /// order (spec §4.2 "first-match-wins").
    pub fn add_entry(&mut self, entry: TaskEntry) {
        if entry.task_id.is_static() {
            match self.static_table.get_mut(&entry.task_id.static_key()) {
                Some(existing) => existing.handlers.extend(entry.handlers),
                None => {
                    self.static_table.insert(entry.task_id.static_key(), entry);
                }
            }
            return;
        }
        let pattern_key = (entry.task_id.method(), entry.task_id.path_source());
        if let Some(existing) = self
            .dynamic_entries
            .iter_mut()
            .find(|e| (e.task_id.method(), e.task_id.path_source()) == pattern_key)
        {
            existing.handlers.extend(entry.handlers);
        } else {
            self.dynamic_entries.push(entry);
        }
    }

    /// Merge another registry's entries into this one, forking each of
    /// its `TaskId`s behind `prefix` (spec §4.1 "Forking", §4.2 "Manager
    /// mounting").
    pub fn merge(&mut self, other: &TaskRegistry, prefix: &TaskId) {
        for entry in other.static_table.values().chain(other.dynamic_entries.iter()) {
            let forked_id = entry.task_id.fork(prefix);
            self.add_entry(TaskEntry { task_id: forked_id, handlers: entry.handlers.clone() });
        }
    }

    /// Look up a candidate `TaskId` against this registry: try the
    /// static table first, then walk `dynamic_entries` in insertion
    /// order, returning the first match (spec §4.2 "first-match-wins").
    pub fn lookup(&self, candidate: &TaskId) -> Option<Lookup<'_>> {
        if let Some(entry) = self.static_table.get(&candidate.static_key()) {
            return Some(Lookup { entry, path_params: MatchParams::new() });
        }
        for entry in &self.dynamic_entries {
            if let Some(path_params) = entry.task_id.matches(candidate) {
                return Some(Lookup { entry, path_params });
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.static_table.len() + self.dynamic_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TaskContext;
    use crate::result::TaskResult;
    use crate::task_id::Method;
    use async_trait::async_trait;

    struct Stub;

    #[async_trait]
    impl Handler for Stub {
        async fn handle(&self, _ctx: &TaskContext) -> Result<TaskResult, crate::error::TaskError> {
            Ok(TaskResult::no_content())
        }
    }

    #[test]
    fn static_entry_is_found_by_exact_match() {
        let mut registry = TaskRegistry::new();
        registry.add_handler(TaskId::simple(Method::Get, "/health"), Arc::new(Stub));
        let found = registry.lookup(&TaskId::simple(Method::Get, "/health"));
        assert!(found.is_some());
    }

    #[test]
    fn dynamic_entry_is_found_on_static_miss() {
        let mut registry = TaskRegistry::new();
        registry.add_handler(TaskId::simple(Method::Get, "/users/{id}"), Arc::new(Stub));
        let found = registry.lookup(&TaskId::simple(Method::Get, "/users/42"));
        let lookup = found.expect("dynamic entry should match");
        assert_eq!(lookup.path_params["id"], serde_json::json!("42"));
    }

    #[test]
    fn reregistering_same_pattern_appends_to_handler_list() {
        let mut registry = TaskRegistry::new();
        registry.add_handler(TaskId::simple(Method::Get, "/users/{id}"), Arc::new(Stub));
        registry.add_handler(TaskId::simple(Method::Get, "/users/{id}"), Arc::new(Stub));
        assert_eq!(registry.len(), 1);
        let lookup = registry.lookup(&TaskId::simple(Method::Get, "/users/42")).unwrap();
        assert_eq!(lookup.entry.handlers.len(), 2);
    }

    #[test]
    fn static_entry_also_appends_on_reregistration() {
        let mut registry = TaskRegistry::new();
        registry.add_handler(TaskId::simple(Method::Get, "/health"), Arc::new(Stub));
        registry.add_handler(TaskId::simple(Method::Get, "/health"), Arc::new(Stub));
        let lookup = registry.lookup(&TaskId::simple(Method::Get, "/health")).unwrap();
        assert_eq!(lookup.entry.handlers.len(), 2);
    }

    #[test]
    fn distinct_patterns_sharing_a_shape_both_persist() {
        let mut registry = TaskRegistry::new();
        registry.add_handler(TaskId::simple(Method::Get, "/items/{id}"), Arc::new(Stub));
        registry.add_handler(TaskId::simple(Method::Get, "/items/{slug}"), Arc::new(Stub));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn merge_forks_entries_behind_prefix() {
        let mut inner = TaskRegistry::new();
        inner.add_handler(TaskId::simple(Method::Get, "/ping"), Arc::new(Stub));

        let mut outer = TaskRegistry::new();
        let prefix = TaskId::simple(Method::Any, "/api");
        outer.merge(&inner, &prefix);

        assert!(outer.lookup(&TaskId::simple(Method::Get, "/api/ping")).is_some());
        assert!(outer.lookup(&TaskId::simple(Method::Get, "/ping")).is_none());
    }

    #[test]
    fn first_match_wins_among_dynamic_entries() {
        let mut registry = TaskRegistry::new();
        registry.add_handler(TaskId::simple(Method::Get, "/items/{id}"), Arc::new(Stub));
        registry.add_handler(TaskId::simple(Method::Get, "/items/{slug}"), Arc::new(Stub));
        let lookup = registry.lookup(&TaskId::simple(Method::Get, "/items/42")).unwrap();
        assert!(lookup.path_params.contains_key("id"));
    }

    fn sample_ctx() -> TaskContext {
        TaskContext::new(
            crate::task::Task::new(
                TaskId::simple(Method::Get, "/fanout"),
                crate::task::TaskMetadata::with_generated_trace_id(),
            ),
            None,
        )
    }

    struct Answer(serde_json::Value);

    #[async_trait]
    impl Handler for Answer {
        async fn handle(&self, _ctx: &TaskContext) -> Result<TaskResult, crate::error::TaskError> {
            Ok(TaskResult::ok(Body::Json(self.0.clone())))
        }
    }

    #[tokio::test]
    async fn single_handler_result_passes_through_unwrapped() {
        let entry = TaskEntry::new(TaskId::simple(Method::Get, "/fanout"), Arc::new(Answer(serde_json::json!(1))));
        let mut ctx = sample_ctx();
        let result = entry.handle(&mut ctx, Next::new(&[])).await.unwrap();
        assert_eq!(result.body.to_jsonable(), serde_json::json!(1));
    }

    #[tokio::test]
    async fn multiple_handlers_fan_out_and_join_into_a_list() {
        let mut entry = TaskEntry::new(TaskId::simple(Method::Get, "/fanout"), Arc::new(Answer(serde_json::json!(1))));
        entry.handlers.push(Arc::new(Answer(serde_json::json!(2))));
        let mut ctx = sample_ctx();
        let result = entry.handle(&mut ctx, Next::new(&[])).await.unwrap();
        assert_eq!(result.body.to_jsonable(), serde_json::json!([1, 2]));
    }
}
