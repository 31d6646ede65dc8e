//! `Handler`: the async unit of work bound to a `TaskId` in the
//! registry (spec §4.3).

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::result::TaskResult;
use async_trait::async_trait;

/// Where a declared handler parameter's value comes from, resolved in
/// order against the task at dispatch time (spec §4.3 "parameter
/// resolution").
#[derive(Debug, Clone)]
pub enum ParamSource {
    /// A path segment captured by the registry match.
    Path(String),
    /// A parameter carried in the task's general (possibly lazy) map.
    Param(String),
    /// The session attached to this context; fails closed if absent.
    Session,
    /// The raw task metadata (trace id, authorization, cookies, ...).
    Metadata,
}

/// One entry of a handler's declared parameter plan (spec §4.3).
#[derive(Debug, Clone)]
pub struct ParamBinding {
    pub name: String,
    pub source: ParamSource,
    pub required: bool,
}

/// The ordered list of parameters a handler expects, built once at
/// registration time and consulted on every dispatch (spec §4.3
/// "Handler with parameter-injection plan").
#[derive(Debug, Clone, Default)]
pub struct ParamPlan {
    pub bindings: Vec<ParamBinding>,
}

impl ParamPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, binding: ParamBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Resolve every bound parameter against `ctx`, in declaration
    /// order, failing on the first missing required value (spec §4.3
    /// "A required parameter with no resolvable source is an error
    /// raised before the handler body runs").
    pub async fn resolve(
        &self,
        ctx: &TaskContext,
    ) -> Result<std::collections::HashMap<String, serde_json::Value>, TaskError> {
        let mut out = std::collections::HashMap::new();
        for binding in &self.bindings {
            let value = match &binding.source {
                ParamSource::Path(name) => ctx.task.path_params.get(name).cloned(),
                ParamSource::Param(name) => ctx.task.resolve_param(name).await?,
                ParamSource::Session => {
                    ctx.session().await.map(|s| serde_json::Value::String(s.id().to_string()))
                }
                ParamSource::Metadata => Some(serde_json::json!({
                    "trace_id": ctx.task.metadata.trace_id,
                    "client_id": ctx.task.metadata.client_id,
                })),
            };
            match value {
                Some(v) => {
                    out.insert(binding.name.clone(), v);
                }
                None if binding.required => {
                    return Err(TaskError::ParamRequired(binding.name.clone()));
                }
                None => {}
            }
        }
        Ok(out)
    }
}

/// The unit of work bound to a `TaskId` (spec §3 "Handler"). Stateless
/// across tasks: any per-call state lives on `TaskContext`, not on the
/// handler itself.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Takes `&TaskContext`, not `&mut`: a `TaskEntry` may bind several
    /// handlers to the same `TaskId` and runs them concurrently (spec
    /// §4.4), so no single handler can assume exclusive access.
    async fn handle(&self, ctx: &TaskContext) -> Result<TaskResult, TaskError>;

    /// The parameter plan this handler was registered with, if any
    /// (spec §4.3). Handlers that resolve their own parameters inline
    /// can leave this empty.
    fn param_plan(&self) -> ParamPlan {
        ParamPlan::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskMetadata};
    use crate::task_id::{Method, TaskId};
    use std::collections::HashMap;

    fn ctx_with_path_param(name: &str, value: serde_json::Value) -> TaskContext {
        let task_id = TaskId::simple(Method::Get, "/items/{id}");
        let task = Task::new(task_id, TaskMetadata::with_generated_trace_id())
            .with_path_params(HashMap::from([(name.to_string(), value)]));
        TaskContext::new(task, None)
    }

    #[tokio::test]
    async fn required_path_param_resolves() {
        let ctx = ctx_with_path_param("id", serde_json::json!(7));
        let plan = ParamPlan::new().with(ParamBinding {
            name: "id".into(),
            source: ParamSource::Path("id".into()),
            required: true,
        });
        let resolved = plan.resolve(&ctx).await.unwrap();
        assert_eq!(resolved["id"], serde_json::json!(7));
    }

    #[tokio::test]
    async fn missing_required_param_errors() {
        let ctx = ctx_with_path_param("id", serde_json::json!(7));
        let plan = ParamPlan::new().with(ParamBinding {
            name: "missing".into(),
            source: ParamSource::Path("missing".into()),
            required: true,
        });
        assert!(plan.resolve(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn missing_optional_param_is_skipped_not_errored() {
        let ctx = ctx_with_path_param("id", serde_json::json!(7));
        let plan = ParamPlan::new().with(ParamBinding {
            name: "missing".into(),
            source: ParamSource::Path("missing".into()),
            required: false,
        });
        let resolved = plan.resolve(&ctx).await.unwrap();
        assert!(!resolved.contains_key("missing"));
    }
}
