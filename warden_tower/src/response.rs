//! JSON error responses for authentication and authorization failures
//!
//! Every response carries a body of the form `{"message": "..."}` with a
//! `Content-Type: application/json` header.

use bytes::Bytes;
use http::{header, HeaderValue, Response, StatusCode};
use serde::{Deserialize, Serialize};
use warden_oauth2::{Scope, ScopePolicy, ScopeTokenRef};

/// Message used when access is denied for lack of scope
pub const INSUFFICIENT_SCOPE: &str = "Insufficient scope.";

/// Message used when a request could not be authenticated
pub const UNAUTHORIZED: &str = "Unauthorized.";

const INTERNAL_ERROR_PREFIX: &str = "Failed to process request: ";
const UNKNOWN_ERROR: &str = r#"{"message":"Unknown error"}"#;

/// The body of an error response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A human-readable description of the failure
    pub message: String,
}

impl ErrorResponse {
    /// Constructs an error body with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build a response with the given status and a JSON error body
pub fn json_error<Body: From<Bytes>>(status: StatusCode, message: &str) -> Response<Body> {
    let body = serde_json::to_vec(&ErrorResponse::new(message))
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(UNKNOWN_ERROR.as_bytes()));

    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

/// Build a `401 Unauthorized` response with the appropriate `www-authenticate`
/// header
///
/// The description provided will be automatically escaped to make sure it
/// is header-friendly.
///
/// The prepared response will have the form:
///
/// ```http
/// HTTP/1.1 401 Unauthorized
/// content-type: application/json
/// www-authenticate: Bearer error="invalid_token" error_description="{description}"
///
/// {"message":"{message}"}
/// ```
///
/// `error_description` is omitted if `description` is empty.
pub fn unauthorized<Body: From<Bytes>>(message: &str, description: &str) -> Response<Body> {
    let mut resp = json_error(StatusCode::UNAUTHORIZED, message);
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, invalid_token(description));
    resp
}

/// Build a `403 Forbidden` response with the appropriate `www-authenticate`
/// header(s)
///
/// The body is always `{"message":"Insufficient scope."}`.
///
/// If a `policy` is given, a `www-authenticate` header is added for each
/// scope alternative allowed by the policy:
///
/// ```http
/// HTTP/1.1 403 Forbidden
/// www-authenticate: Bearer error="insufficient_scope" scope="read"
/// www-authenticate: Bearer error="insufficient_scope" scope="admin"
/// ```
///
/// Otherwise a single `Bearer error="insufficient_scope"` header is added.
pub fn forbidden<Body: From<Bytes>>(policy: Option<&ScopePolicy>) -> Response<Body> {
    let mut resp = json_error(StatusCode::FORBIDDEN, INSUFFICIENT_SCOPE);

    match policy {
        Some(policy) if policy != &ScopePolicy::deny_all() => {
            for scope in policy {
                resp.headers_mut()
                    .append(header::WWW_AUTHENTICATE, insufficient_scope(scope));
            }
        }
        _ => {
            resp.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Bearer error="insufficient_scope""#),
            );
        }
    }

    resp
}

/// Build a `500 Internal Server Error` response
///
/// The message is prefixed with `Failed to process request: `.
pub fn internal_error<Body: From<Bytes>>(message: &str) -> Response<Body> {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("{INTERNAL_ERROR_PREFIX}{message}"),
    )
}

/// Renders an error and its chain of sources as a single line
pub(crate) fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut description = error.to_string();
    let mut source = error.source();
    while let Some(next) = source {
        description.push_str(": ");
        description.push_str(&next.to_string());
        source = next.source();
    }
    description
}

fn invalid_token(description: &str) -> HeaderValue {
    const BARE: &str = r#"Bearer error="invalid_token""#;

    if description.is_empty() {
        HeaderValue::from_static(BARE)
    } else {
        HeaderValue::try_from(format!(
            r#"Bearer error="invalid_token" error_description="{}""#,
            description.escape_default()
        ))
        .unwrap_or_else(|_| HeaderValue::from_static(BARE))
    }
}

fn insufficient_scope(scope: &Scope) -> HeaderValue {
    let mut tokens: Vec<&str> = scope.iter().map(ScopeTokenRef::as_str).collect();
    tokens.sort_unstable();

    HeaderValue::try_from(format!(
        r#"Bearer error="insufficient_scope" scope="{}""#,
        tokens.join(" ").escape_default()
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(r#"Bearer error="insufficient_scope""#))
}
