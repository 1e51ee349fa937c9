//! Request, principal, and response capture
//!
//! Everything here is deliberately infallible: a missing header, absent
//! principal, or malformed value degrades to a documented default so the
//! audit pipeline can never abort a request.

use audit_trail_core::{HttpRequestInfo, HttpResponseInfo, Provider, UserInfo};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, Response};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Sentinel returned when no client IP can be determined.
pub const IP_UNRESOLVED: &str = "failed to get ip";

/// Authenticated principal for the current request.
///
/// An auth layer running before the audit middleware inserts this into the
/// request extensions; its presence is what marks the request
/// authenticated in the audit record.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub username: String,
    pub email: String,
    /// Authentication-backend identifier (session state in the record)
    pub provider: String,
    /// Role names in the order memberships were retrieved
    pub roles: Vec<String>,
}

/// Extract request metadata for the audit record.
pub fn capture_request<B>(request: &Request<B>) -> HttpRequestInfo {
    HttpRequestInfo {
        method: request.method().as_str().to_string(),
        url: absolute_url(request),
        user_agent: request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("?")
            .to_string(),
    }
}

/// Rebuild the absolute URL the originating server saw.
///
/// Proxied deployments carry the scheme in `X-Forwarded-Proto`; the
/// authority comes from the `Host` header. Plain HTTP and `localhost` are
/// the fallbacks when neither is available.
fn absolute_url<B>(request: &Request<B>) -> String {
    let scheme = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().scheme_str())
        .unwrap_or("http");

    let authority = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or("localhost");

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{}://{}{}", scheme, authority, path_and_query)
}

/// Extract the principal details for the audit record.
///
/// The realm is supplied by the deployment, not derived from the request.
/// Without a principal every field takes its empty default and
/// `authenticated` is false.
pub fn capture_user<B>(request: &Request<B>, realm: &str) -> UserInfo {
    let ip = resolve_client_ip(Some(request));

    match request.extensions().get::<Principal>() {
        Some(principal) => UserInfo {
            authenticated: true,
            provider: Provider {
                name: principal.provider.clone(),
                realm: realm.to_string(),
            },
            email: principal.email.clone(),
            roles: principal.roles.clone(),
            ip,
            username: principal.username.clone(),
        },
        None => {
            let mut user = UserInfo::anonymous(ip);
            user.provider.realm = realm.to_string();
            user
        }
    }
}

/// Extract response metadata for the audit record.
///
/// The full header map goes in unfiltered; redaction, if wanted, belongs
/// to the sink. Repeated header names keep the last value.
pub fn capture_response<B>(response: &Response<B>) -> HttpResponseInfo {
    let status = response.status();

    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
        headers.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    HttpResponseInfo {
        status_code: Some(status.as_u16()),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        headers,
    }
}

/// Resolve the client IP for the audit record.
///
/// Priority: first `X-Forwarded-For` value, then the peer address from
/// [`ConnectInfo`]. When neither is available, or there is no request at
/// all, this warns on the local process log and returns the
/// [`IP_UNRESOLVED`] sentinel. It never fails.
pub fn resolve_client_ip<B>(request: Option<&Request<B>>) -> String {
    let Some(request) = request else {
        tracing::warn!("failed to get client ip for audit log");
        return IP_UNRESOLVED.to_string();
    };

    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        let first = forwarded.split(',').next().unwrap_or(forwarded).trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    tracing::warn!("failed to get client ip for audit log");
    IP_UNRESOLVED.to_string()
}
