//! Translate an inbound `axum` request into a [`taskwire_core::task::Task`],
//! dispatch it through an [`taskwire_core::app::Application`], and
//! translate the resulting [`taskwire_core::result::TaskResult`] back
//! into an `axum` response (spec §6 "HTTP transport adapter").

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method as HttpMethod, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use taskwire_core::body::Body;
use taskwire_core::error::TaskError;
use taskwire_core::result::TaskResult;
use taskwire_core::task::{Authorization, LazyValue, ParamValue, Task, TaskMetadata};
use taskwire_core::task_id::{Method, TaskId};
use taskwire_core::Application;

const TRACE_HEADER: &str = "X-Trace-Id";
const CLIENT_HEADER: &str = "x-client-id";

fn map_method(method: &HttpMethod) -> Option<Method> {
    match method.as_str() {
        "GET" => Some(Method::Get),
        "POST" => Some(Method::Post),
        "PUT" => Some(Method::Put),
        "PATCH" => Some(Method::Patch),
        "DELETE" => Some(Method::Delete),
        "OPTIONS" => Some(Method::Options),
        _ => None,
    }
}

/// Parse the `Cookie` header into a name -> value map (spec §3
/// "TaskMetadata.cookies").
fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    let Some(raw) = headers.get(http::header::COOKIE).and_then(|v| v.to_str().ok()) else {
        return cookies;
    };
    for pair in raw.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            cookies.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    cookies
}

fn build_metadata(headers: &HeaderMap) -> TaskMetadata {
    let authorization = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(Authorization::parse);

    let trace_id = headers
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let client_id = headers.get(CLIENT_HEADER).and_then(|v| v.to_str().ok()).map(|s| s.to_string());

    TaskMetadata {
        authorization,
        trace_id,
        client_id,
        cookies: parse_cookies(headers),
        state: HashMap::new(),
    }
}

/// Parse a `?a=1&b=2` query string into a JSON-valued param map (spec
/// §6 "query parameters feed the general params map").
fn parse_query(uri: &Uri) -> HashMap<String, serde_json::Value> {
    let Some(query) = uri.query() else { return HashMap::new() };
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
        .collect()
}

/// Coerce a single `application/x-www-form-urlencoded` value into a
/// primitive JSON type: integer, then float, then boolean, falling back
/// to string (spec §6 "form bodies coerce primitive values").
fn coerce_primitive(raw: &str) -> serde_json::Value {
    if let Ok(i) = raw.parse::<i64>() {
        serde_json::Value::Number(i.into())
    } else if let Ok(f) = raw.parse::<f64>() {
        serde_json::Number::from_f64(f).map(serde_json::Value::Number).unwrap_or_else(|| serde_json::Value::String(raw.to_string()))
    } else if let Ok(b) = raw.parse::<bool>() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::String(raw.to_string())
    }
}

/// Parse a request body according to its declared MIME type into the
/// single JSON value that will be stored under the task's `"body"`
/// parameter (spec §6 "the body is never spread into the params map").
/// An unrecognized content type is a client error, not a silently
/// empty body.
fn parse_body(body: &[u8], content_type: Option<&str>) -> Result<serde_json::Value, TaskError> {
    let declared = content_type.unwrap_or("application/json");
    let mime = declared.split(';').next().unwrap_or(declared).trim();
    match mime {
        "application/json" => {
            serde_json::from_slice(body).map_err(|e| TaskError::ParamsInvalid(format!("malformed json body: {e}")))
        }
        "application/x-www-form-urlencoded" => {
            let map: serde_json::Map<String, serde_json::Value> =
                form_urlencoded::parse(body).map(|(k, v)| (k.into_owned(), coerce_primitive(&v))).collect();
            Ok(serde_json::Value::Object(map))
        }
        "text/plain" => {
            let text = std::str::from_utf8(body)
                .map_err(|e| TaskError::ParamsInvalid(format!("body is not valid utf-8: {e}")))?;
            Ok(serde_json::Value::String(text.to_string()))
        }
        "application/octet-stream" => {
            Ok(serde_json::Value::Array(body.iter().map(|b| serde_json::Value::from(*b)).collect()))
        }
        other => Err(TaskError::ParamsInvalid(format!("unsupported content type: {other}"))),
    }
}

/// Build the task's lazy `"body"` parameter, if a body was sent (spec
/// §6, §4.3 "lazy parameters"). Parsing — including the content-type
/// rejection above — doesn't run until something resolves the `"body"`
/// parameter, via the same `LazyValue`/`ParamValue::Lazy` machinery
/// query and path parameters share.
fn body_param(body: Bytes, content_type: Option<&str>) -> Option<ParamValue> {
    if body.is_empty() {
        return None;
    }
    let content_type = content_type.map(str::to_string);
    let lazy = LazyValue::new(async move { parse_body(&body, content_type.as_deref()) });
    Some(ParamValue::Lazy(Arc::new(lazy)))
}

fn result_to_response(result: TaskResult) -> Response {
    let status = StatusCode::from_u16(result.status.http_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = match &result.body {
        Body::Empty => (status, ()).into_response(),
        Body::Json(_) => (status, axum::Json(result.body.to_jsonable())).into_response(),
        Body::Streaming(..) => {
            // Streaming bodies are handled by `stream_response`, not this
            // conversion path; reaching here means a handler built a
            // streaming body on a route that didn't request streaming.
            (StatusCode::INTERNAL_SERVER_ERROR, "streaming body not supported on this route").into_response()
        }
    };

    let headers = response.headers_mut();
    for (name, value) in &result.headers {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    for (name, value) in &result.cookies {
        if let Ok(value) = http::HeaderValue::from_str(&format!("{name}={value}; Path=/; HttpOnly")) {
            headers.append(http::header::SET_COOKIE, value);
        }
    }
    response
}

/// The single `axum` handler every route falls through to: it rebuilds
/// a `TaskId` from the live method/path and lets the `Application`'s
/// registry do the real routing (spec §6: HTTP is one transport over a
/// transport-neutral core).
pub async fn handle(
    State(app): State<Arc<Application>>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(core_method) = map_method(&method) else {
        return (StatusCode::METHOD_NOT_ALLOWED, "unsupported method").into_response();
    };

    let content_type = headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let task_id = TaskId::simple(core_method, uri.path());
    let metadata = build_metadata(&headers);
    let mut task = Task::new(task_id, metadata);

    for (name, value) in parse_query(&uri) {
        task.set_param(name, ParamValue::Resolved(value));
    }
    if let Some(param) = body_param(body, content_type) {
        task.set_param("body", param);
    }

    let result = app.handle_task(task).await;
    result_to_response(result)
}
