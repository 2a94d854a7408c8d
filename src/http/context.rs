//! Request context shared by the telemetry middlewares.
//!
//! # Responsibilities
//! - Caller identity (`CallerRole`) carried in request/response extensions
//! - Request ID lookup with a fresh UUID fallback
//! - Route resolution: matched template first, raw path otherwise

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Role used when no caller identity was resolved.
pub const ANONYMOUS_ROLE: &str = "anonymous";

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_CALLER_ROLE: &str = "x-caller-role";

/// Resolved role of the authenticated caller.
///
/// An upstream auth layer inserts this into the request extensions; a
/// handler that resolves identity itself may insert it into the response
/// extensions instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerRole(pub String);

impl CallerRole {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The request ID set by an upstream layer, or a new v4 UUID.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Matched route template, falling back to the raw path.
pub fn route_of(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned())
}

/// `"<METHOD> <route>"`.
pub fn endpoint_key(method: &Method, route: &str) -> String {
    format!("{} {}", method, route)
}

pub fn role_of_request(req: &Request) -> Option<String> {
    req.extensions()
        .get::<CallerRole>()
        .map(|r| r.as_str().to_owned())
}

/// Role from the response extensions, then the entry-time role, then anonymous.
pub fn resolve_role(response: &Response, at_entry: Option<String>) -> String {
    response
        .extensions()
        .get::<CallerRole>()
        .map(|r| r.as_str().to_owned())
        .or(at_entry)
        .unwrap_or_else(|| ANONYMOUS_ROLE.to_owned())
}

/// Demo identity middleware: trusts the `X-Caller-Role` header.
pub async fn caller_role_from_header(mut req: Request, next: Next) -> Response {
    let role = req
        .headers()
        .get(X_CALLER_ROLE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    if let Some(role) = role {
        req.extensions_mut().insert(CallerRole(role));
    }
    next.run(req).await
}
