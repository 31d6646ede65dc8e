//! `TaskResult` and `TaskStatus`: the mutable outcome carrier a handler
//! (or middleware) produces for a `Task` (spec §3 "TaskResult", §7).

use crate::body::Body;
use crate::error::TaskError;
use std::collections::HashMap;

/// The closed set of outcome statuses a `TaskResult` may carry (spec §7
/// status taxonomy). Transports map each variant to their own wire
/// status (e.g. HTTP status codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Ok,
    Created,
    Accepted,
    NoContent,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    UnprocessableEntity,
    InternalServerError,
    NotImplemented,
    ServiceUnavailable,
}

impl TaskStatus {
    /// True for the success range (spec §7: everything outside the
    /// taxonomy's error statuses is a success).
    pub fn is_success(self) -> bool {
        matches!(self, TaskStatus::Ok | TaskStatus::Created | TaskStatus::Accepted | TaskStatus::NoContent)
    }

    /// The conventional HTTP status code for this outcome — used by
    /// `taskwire-http` and by any other transport that wants a numeric
    /// code (spec §6 "Transport adapter contract").
    pub fn http_code(self) -> u16 {
        match self {
            TaskStatus::Ok => 200,
            TaskStatus::Created => 201,
            TaskStatus::Accepted => 202,
            TaskStatus::NoContent => 204,
            TaskStatus::BadRequest => 400,
            TaskStatus::Unauthorized => 401,
            TaskStatus::Forbidden => 403,
            TaskStatus::NotFound => 404,
            TaskStatus::Conflict => 409,
            TaskStatus::UnprocessableEntity => 422,
            TaskStatus::InternalServerError => 500,
            TaskStatus::NotImplemented => 501,
            TaskStatus::ServiceUnavailable => 503,
        }
    }
}

/// Mutable carrier for a task's outcome: a status, a body, and metadata
/// a transport may want to echo back (headers, cookies) (spec §3
/// "TaskResult").
#[derive(Debug)]
pub struct TaskResult {
    pub status: TaskStatus,
    pub body: Body,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
}

impl TaskResult {
    pub fn new(status: TaskStatus, body: Body) -> Self {
        Self { status, body, headers: HashMap::new(), cookies: HashMap::new() }
    }

    pub fn ok(body: Body) -> Self {
        Self::new(TaskStatus::Ok, body)
    }

    pub fn json(status: TaskStatus, value: serde_json::Value) -> Self {
        Self::new(status, Body::Json(value))
    }

    pub fn no_content() -> Self {
        Self::new(TaskStatus::NoContent, Body::Empty)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }
}

impl From<TaskError> for TaskResult {
    /// Render an error into its wire representation (spec §7: "Every
    /// `TaskError` maps to exactly one `TaskStatus`").
    fn from(err: TaskError) -> Self {
        TaskResult::new(err.status(), Body::Json(err.payload()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_are_flagged_as_success() {
        assert!(TaskStatus::Ok.is_success());
        assert!(TaskStatus::Created.is_success());
        assert!(!TaskStatus::NotFound.is_success());
    }

    #[test]
    fn task_error_conversion_preserves_status_mapping() {
        let err = TaskError::NotFound("widget".into());
        let expected = err.status();
        let result: TaskResult = err.into();
        assert_eq!(result.status, expected);
    }

    #[test]
    fn error_into_task_result_carries_json_payload() {
        let err = TaskError::Conflict("already exists".into());
        let result: TaskResult = err.into();
        assert_eq!(result.status, TaskStatus::Conflict);
        match result.body {
            Body::Json(v) => assert_eq!(v["error"], "already exists"),
            _ => panic!("expected json body"),
        }
    }
}
