//! The closed exception taxonomy (spec §7) and its mapping to [`TaskStatus`].

use crate::result::TaskStatus;
use std::time::Duration;

/// A framework-level error raised by a handler, middleware, or the router
/// itself.
///
/// `TaskError` is a closed set on purpose (spec §7): applications raise
/// one of these variants (or let a foreign error get coerced into one by
/// the outer error-handling middleware) rather than inventing new status
/// taxonomies per handler.
#[derive(Debug)]
pub enum TaskError {
    /// Unexpected failure; the original error is logged at error level.
    Internal(String),
    /// Generic client error, used when no more specific variant applies.
    ClientError(String),
    /// A path/body/query parameter failed its converter, or the content
    /// type of the body was unsupported.
    ParamsInvalid(String),
    /// A required parameter had no resolvable source.
    ParamRequired(String),
    /// The requested operation is recognized but not implemented.
    NotImplemented(String),
    /// Registry miss or DAL miss.
    NotFound(String),
    /// Resource already exists / conflicting state transition.
    Duplicate(String),
    Conflict(String),
    InvalidStatusTransition(String),
    /// No usable authorization credential was presented.
    Unauthorized(String),
    /// A credential was presented but does not permit the operation.
    Forbidden(String),
    /// Transient failure; carries a delay hint for [`crate::retry::retry`].
    Retryable { message: String, delay: Duration },
    /// A `retry()`-wrapped call exhausted its attempt budget.
    MaxRetriesExceeded(String),
    /// An external collaborator (DAL, broker) failed.
    ExternalError(String),
}

impl TaskError {
    /// Map this error to its preferred [`TaskStatus`] (spec §7 table).
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskError::Internal(_) => TaskStatus::InternalServerError,
            TaskError::ClientError(_) => TaskStatus::BadRequest,
            TaskError::ParamsInvalid(_) => TaskStatus::UnprocessableEntity,
            TaskError::ParamRequired(_) => TaskStatus::UnprocessableEntity,
            TaskError::NotImplemented(_) => TaskStatus::NotImplemented,
            TaskError::NotFound(_) => TaskStatus::NotFound,
            TaskError::Duplicate(_) => TaskStatus::Conflict,
            TaskError::Conflict(_) => TaskStatus::Conflict,
            TaskError::InvalidStatusTransition(_) => TaskStatus::Conflict,
            TaskError::Unauthorized(_) => TaskStatus::Unauthorized,
            TaskError::Forbidden(_) => TaskStatus::Forbidden,
            TaskError::Retryable { .. } => TaskStatus::ServiceUnavailable,
            TaskError::MaxRetriesExceeded(_) => TaskStatus::ServiceUnavailable,
            TaskError::ExternalError(_) => TaskStatus::ServiceUnavailable,
        }
    }

    /// Build the `{ key: value }` message payload a transport serializes
    /// into the failure body (HTTP) or logs (pub/sub, queue).
    pub fn payload(&self) -> serde_json::Value {
        let message = self.to_string();
        match self {
            TaskError::Retryable { delay, .. } => serde_json::json!({
                "error": message,
                "retry_after_ms": delay.as_millis() as u64,
            }),
            _ => serde_json::json!({ "error": message }),
        }
    }

    /// The delay hint carried by a [`TaskError::Retryable`], if any.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            TaskError::Retryable { delay, .. } => Some(*delay),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::Internal(m) => write!(f, "internal error: {m}"),
            TaskError::ClientError(m) => write!(f, "client error: {m}"),
            TaskError::ParamsInvalid(m) => write!(f, "invalid parameters: {m}"),
            TaskError::ParamRequired(m) => write!(f, "missing required parameter: {m}"),
            TaskError::NotImplemented(m) => write!(f, "not implemented: {m}"),
            TaskError::NotFound(m) => write!(f, "not found: {m}"),
            TaskError::Duplicate(m) => write!(f, "duplicate: {m}"),
            TaskError::Conflict(m) => write!(f, "conflict: {m}"),
            TaskError::InvalidStatusTransition(m) => write!(f, "invalid status transition: {m}"),
            TaskError::Unauthorized(m) => write!(f, "unauthorized: {m}"),
            TaskError::Forbidden(m) => write!(f, "forbidden: {m}"),
            TaskError::Retryable { message, delay } => {
                write!(f, "retryable ({delay:?}): {message}")
            }
            TaskError::MaxRetriesExceeded(m) => write!(f, "max retries exceeded: {m}"),
            TaskError::ExternalError(m) => write!(f, "external error: {m}"),
        }
    }
}

impl std::error::Error for TaskError {}

/// Coerce a foreign error into the taxonomy (spec §7 propagation policy):
/// anything not already a [`TaskError`] becomes [`TaskError::Internal`].
impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::ParamsInvalid(err.to_string())
    }
}

/// Generate `From<E> for TaskError` impls that map a foreign error type to
/// a specific variant, mirroring the teacher's `map_error!` macro.
///
/// ```ignore
/// taskwire_core::map_error! {
///     sqlx::Error => ExternalError,
///     std::num::ParseIntError => ParamsInvalid,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::TaskError {
                fn from(err: $err_ty) -> Self {
                    $crate::TaskError::$variant(err.to_string())
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(TaskError::NotFound("x".into()).status(), TaskStatus::NotFound);
        assert_eq!(
            TaskError::ParamsInvalid("x".into()).status(),
            TaskStatus::UnprocessableEntity
        );
        assert_eq!(
            TaskError::ParamRequired("x".into()).status(),
            TaskStatus::UnprocessableEntity
        );
        assert_eq!(TaskError::Unauthorized("x".into()).status(), TaskStatus::Unauthorized);
        assert_eq!(TaskError::Forbidden("x".into()).status(), TaskStatus::Forbidden);
        assert_eq!(TaskError::Conflict("x".into()).status(), TaskStatus::Conflict);
        assert_eq!(TaskError::Duplicate("x".into()).status(), TaskStatus::Conflict);
        assert_eq!(
            TaskError::Retryable { message: "x".into(), delay: Duration::from_secs(1) }.status(),
            TaskStatus::ServiceUnavailable
        );
        assert_eq!(
            TaskError::MaxRetriesExceeded("x".into()).status(),
            TaskStatus::ServiceUnavailable
        );
        assert_eq!(TaskError::Internal("x".into()).status(), TaskStatus::InternalServerError);
    }

    #[test]
    fn retryable_payload_carries_delay_hint() {
        let err = TaskError::Retryable { message: "down".into(), delay: Duration::from_millis(250) };
        let payload = err.payload();
        assert_eq!(payload["retry_after_ms"], 250);
    }
}
