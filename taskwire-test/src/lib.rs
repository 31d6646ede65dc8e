//! In-process test harness, grounded in `r2e-test/src/app.rs`'s
//! `TestApp`/`TestResponse` pair — here dispatching a `Task` straight
//! into an `Application` rather than driving it through `axum`'s
//! `tower::ServiceExt::oneshot`, since Taskwire's core is
//! transport-neutral (spec §8: properties are tested against the core,
//! not a particular wire format).

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use taskwire_core::app::Application;
use taskwire_core::body::Body;
use taskwire_core::result::{TaskResult, TaskStatus};
use taskwire_core::task::{Authorization, ParamValue, Task, TaskMetadata};
use taskwire_core::task_id::{Method, TaskId};

/// Wraps an [`Application`] with request-builder convenience methods
/// mirroring the teacher's `TestApp` (`r2e-test/src/app.rs`).
pub struct TestApp {
    app: Application,
}

impl TestApp {
    pub fn new(app: Application) -> Self {
        Self { app }
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        authorization: Option<Authorization>,
    ) -> TestResponse {
        let mut metadata = TaskMetadata::with_generated_trace_id();
        metadata.authorization = authorization;
        let mut task = Task::new(TaskId::simple(method, path), metadata);
        if let Some(serde_json::Value::Object(map)) = body {
            for (k, v) in map {
                task.set_param(k, ParamValue::Resolved(v));
            }
        }
        TestResponse::from(self.app.handle_task(task).await)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.dispatch(Method::Get, path, None, None).await
    }

    pub async fn get_authenticated(&self, path: &str, bearer_token: &str) -> TestResponse {
        self.dispatch(Method::Get, path, None, Some(bearer(bearer_token))).await
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> TestResponse {
        self.dispatch(Method::Post, path, Some(body), None).await
    }

    pub async fn post_json_authenticated(&self, path: &str, body: serde_json::Value, bearer_token: &str) -> TestResponse {
        self.dispatch(Method::Post, path, Some(body), Some(bearer(bearer_token))).await
    }

    pub async fn put_json_authenticated(&self, path: &str, body: serde_json::Value, bearer_token: &str) -> TestResponse {
        self.dispatch(Method::Put, path, Some(body), Some(bearer(bearer_token))).await
    }

    pub async fn delete_authenticated(&self, path: &str, bearer_token: &str) -> TestResponse {
        self.dispatch(Method::Delete, path, None, Some(bearer(bearer_token))).await
    }
}

fn bearer(token: &str) -> Authorization {
    Authorization { scheme: "Bearer".to_string(), credentials: token.to_string() }
}

/// A dispatched task's outcome, with status-code assertions mirroring
/// `r2e-test`'s `TestResponse`.
pub struct TestResponse {
    pub status: TaskStatus,
    pub body: Body,
    pub headers: HashMap<String, String>,
}

impl From<TaskResult> for TestResponse {
    fn from(result: TaskResult) -> Self {
        Self { status: result.status, body: result.body, headers: result.headers }
    }
}

impl TestResponse {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.body.to_jsonable()).expect("response body is not the expected shape")
    }

    pub fn text(&self) -> String {
        self.body.to_json_string()
    }

    #[track_caller]
    pub fn assert_status(&self, expected: TaskStatus) -> &Self {
        assert_eq!(
            self.status.http_code(),
            expected.http_code(),
            "expected status {:?}, got {:?}",
            expected,
            self.status
        );
        self
    }

    #[track_caller]
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(TaskStatus::Ok)
    }

    #[track_caller]
    pub fn assert_created(&self) -> &Self {
        self.assert_status(TaskStatus::Created)
    }

    #[track_caller]
    pub fn assert_no_content(&self) -> &Self {
        self.assert_status(TaskStatus::NoContent)
    }

    #[track_caller]
    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(TaskStatus::BadRequest)
    }

    #[track_caller]
    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(TaskStatus::Unauthorized)
    }

    #[track_caller]
    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(TaskStatus::Forbidden)
    }

    #[track_caller]
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(TaskStatus::NotFound)
    }
}
