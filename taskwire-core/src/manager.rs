//! `Manager`: a declarative group of handlers mounted under a shared
//! prefix (spec §3 "Manager", §4.2 "Manager mounting").
//!
//! Grounded in the teacher's simpler `Controller<T>` trait
//! (`quarlus-core/src/controller.rs`) rather than its macro-driven
//! `#[derive(Controller)]`/`#[routes]`/`#[get]` DSL (`r2e-core`):
//! table-driven registration over code generation (spec §9 Design
//! Notes).

use crate::registry::TaskRegistry;
use crate::task_id::TaskId;

/// A named group of task bindings, merged into an application's root
/// registry under a prefix at build time (spec §4.2).
pub trait Manager: Send + Sync {
    /// A stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// The prefix this manager's tasks are mounted under (spec §4.1
    /// "Forking"). `Method::Any` with an empty path mounts at the root.
    fn prefix(&self) -> TaskId;

    /// Build this manager's own registry of handlers, unprefixed.
    fn routes(&self) -> TaskRegistry;
}

/// Merge every manager's routes into `root`, forked behind each
/// manager's declared prefix (spec §4.2).
pub fn mount_all(root: &mut TaskRegistry, managers: &[std::sync::Arc<dyn Manager>]) {
    for manager in managers {
        let routes = manager.routes();
        root.merge(&routes, &manager.prefix());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TaskContext;
    use crate::error::TaskError;
    use crate::handler::Handler;
    use crate::result::TaskResult;
    use crate::task_id::Method;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Ping;

    #[async_trait]
    impl Handler for Ping {
        async fn handle(&self, _ctx: &TaskContext) -> Result<TaskResult, TaskError> {
            Ok(TaskResult::no_content())
        }
    }

    struct HealthManager;

    impl Manager for HealthManager {
        fn name(&self) -> &'static str {
            "health"
        }

        fn prefix(&self) -> TaskId {
            TaskId::simple(Method::Any, "/health")
        }

        fn routes(&self) -> TaskRegistry {
            let mut registry = TaskRegistry::new();
            registry.add_handler(TaskId::simple(Method::Get, "/ping"), Arc::new(Ping));
            registry
        }
    }

    #[test]
    fn manager_routes_mount_under_prefix() {
        let mut root = TaskRegistry::new();
        let managers: Vec<Arc<dyn Manager>> = vec![Arc::new(HealthManager)];
        mount_all(&mut root, &managers);
        assert!(root.lookup(&TaskId::simple(Method::Get, "/health/ping")).is_some());
        assert!(root.lookup(&TaskId::simple(Method::Get, "/ping")).is_none());
    }
}
