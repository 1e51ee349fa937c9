//! Request lifecycle middleware
//!
//! The coordinator around one request/response exchange: decide exemption,
//! attach the audit context, let the handler run, capture the response,
//! emit the record once. It observes the exchange through a side channel
//! and never alters the response.

use crate::capture::{capture_request, capture_response, capture_user};
use audit_trail_core::{AuditConfig, AuditError, AuditHandle, AuditLogger, ExemptionMatcher};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Process-wide audit state shared by every request.
///
/// The exemption patterns are compiled once and read-only afterwards; the
/// logger's sink carries the concurrent-use contract. Per-request state
/// lives only in the [`AuditHandle`] created for that request.
#[derive(Clone)]
pub struct AuditState {
    logger: Arc<AuditLogger>,
    exempt: Arc<ExemptionMatcher>,
    realm: String,
}

impl AuditState {
    pub fn new(logger: AuditLogger, exempt: ExemptionMatcher) -> Self {
        Self {
            logger: Arc::new(logger),
            exempt: Arc::new(exempt),
            realm: String::new(),
        }
    }

    /// Build from configuration, failing fast on invalid patterns or
    /// unknown handler/formatter selectors.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        let (logger, exempt) = config.build()?;
        Ok(Self::new(logger, exempt))
    }

    /// Set the realm recorded for every principal.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    pub fn logger(&self) -> &AuditLogger {
        &self.logger
    }
}

/// Audit middleware for [`axum::middleware::from_fn_with_state`].
///
/// Exempt requests pass through untouched and are never logged. For every
/// other request a fresh [`AuditHandle`] is populated with request and
/// principal metadata and inserted into the request extensions, where
/// handlers can reach it via `Option<Extension<AuditHandle>>`. After the
/// handler returns, the response is captured and the record emitted —
/// exactly once, even when the middleware is mounted twice in a nested
/// router (the inner mount sees the existing handle and passes through).
///
/// Emission failures are downgraded to a local diagnostic; the client
/// response is returned unchanged no matter what the audit pipeline does.
///
/// # Examples
///
/// ```no_run
/// use audit_trail_axum::{audit_middleware, AuditState};
/// use audit_trail_core::AuditConfig;
/// use axum::{middleware, routing::get, Router};
///
/// # fn main() -> Result<(), audit_trail_core::AuditError> {
/// let state = AuditState::from_config(&AuditConfig::default())?;
/// let app: Router = Router::new()
///     .route("/users", get(|| async { "ok" }))
///     .layer(middleware::from_fn_with_state(state, audit_middleware));
/// # Ok(())
/// # }
/// ```
pub async fn audit_middleware(
    State(state): State<AuditState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<AuditHandle>().is_some() {
        return next.run(request).await;
    }

    if state.exempt.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let handle = AuditHandle::new();
    handle.set_http_request(capture_request(&request));
    handle.set_user(capture_user(&request, &state.realm));
    request.extensions_mut().insert(handle.clone());

    let response = next.run(request).await;

    handle.set_http_response(capture_response(&response));
    if let Some(record) = handle.take_record() {
        if let Err(error) = state.logger.send_log(&record).await {
            tracing::error!(error = %error, "failed to emit audit log record");
        }
    }

    response
}
