//! axum integration for audit-trail
//!
//! Emits one structured audit record per non-exempt request: request
//! metadata and principal identity are captured before the handler runs,
//! response metadata after, and the finished record is flushed to the
//! configured sink exactly once. Handlers can enrich the record through
//! the [`AuditHandle`](audit_trail_core::AuditHandle) request extension,
//! typically via
//! [`ResourceAuditor`](audit_trail_core::ResourceAuditor).
//!
//! # Quick Start
//!
//! ```no_run
//! use audit_trail_axum::{audit_middleware, AuditState};
//! use audit_trail_core::AuditConfig;
//! use axum::{middleware, routing::get, Router};
//!
//! # fn main() -> Result<(), audit_trail_core::AuditError> {
//! let config = AuditConfig {
//!     exempt_urls: vec![r"^health".to_string()],
//!     ..AuditConfig::default()
//! };
//! let state = AuditState::from_config(&config)?.with_realm("myapp");
//!
//! let app: Router = Router::new()
//!     .route("/health", get(|| async { "ok" }))
//!     .route("/users", get(|| async { "[]" }))
//!     .layer(middleware::from_fn_with_state(state, audit_middleware));
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod middleware;

pub use capture::*;
pub use middleware::*;
