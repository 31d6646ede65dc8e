//! Build the `axum::Router` that fronts a Taskwire [`Application`]
//! (spec §6).

use crate::adapter::handle;
use axum::routing::any;
use axum::Router;
use std::sync::Arc;
use taskwire_core::Application;
use tower_http::trace::TraceLayer;

/// Every path falls through to the single task-dispatching handler: the
/// `Application`'s own `TaskRegistry` is the real router (spec §6 "HTTP
/// is one transport over a transport-neutral core").
pub fn build_router(app: Arc<Application>) -> Router {
    Router::new()
        .route("/{*path}", any(handle))
        .route("/", any(handle))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as HttpBody;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc as StdArc;
    use taskwire_core::prelude::*;
    use tower::ServiceExt;

    struct Ping;

    #[async_trait::async_trait]
    impl Handler for Ping {
        async fn handle(&self, _ctx: &TaskContext) -> Result<TaskResult, TaskError> {
            Ok(TaskResult::ok(Body::Json(serde_json::json!({"pong": true}))))
        }
    }

    struct PingManager;

    impl Manager for PingManager {
        fn name(&self) -> &'static str {
            "ping"
        }

        fn prefix(&self) -> TaskId {
            TaskId::simple(Method::Any, "/")
        }

        fn routes(&self) -> TaskRegistry {
            let mut registry = TaskRegistry::new();
            registry.add_handler(TaskId::simple(Method::Get, "/ping"), StdArc::new(Ping));
            registry
        }
    }

    #[tokio::test]
    async fn router_dispatches_registered_path() {
        let app = StdArc::new(AppBuilder::new().with_manager(StdArc::new(PingManager)).build());
        let router = build_router(app);
        let response = router
            .oneshot(Request::builder().uri("/ping").body(HttpBody::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn router_returns_404_for_unknown_path() {
        let app = StdArc::new(AppBuilder::new().with_manager(StdArc::new(PingManager)).build());
        let router = build_router(app);
        let response = router
            .oneshot(Request::builder().uri("/nope").body(HttpBody::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
