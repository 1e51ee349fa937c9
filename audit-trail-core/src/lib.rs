//! Framework-agnostic HTTP audit logging
//!
//! This crate implements the shape and lifecycle of a per-request audit
//! record: a context that accumulates request, principal, response, and
//! resource-action fields across one request/response exchange, and a
//! logger that flushes the finished record to an injected sink exactly
//! once. Framework glue (capture and middleware) lives in the companion
//! integration crates.
//!
//! # Features
//!
//! - **Audit context** - per-request accumulator with a fixed-schema record
//! - **Exemptions** - regex path patterns compiled once at startup
//! - **Sinks & formatters** - stdout/file/memory transports, JSON formats
//! - **Configuration** - explicit config struct with registry-based
//!   selector resolution, failing fast on bad patterns or unknown names
//! - **Resource annotations** - CRUD helpers for endpoint handlers
//!
//! # Quick Start
//!
//! ```no_run
//! use audit_trail_core::{AuditError, AuditHandle, AuditLogger, StdoutSink};
//!
//! # async fn example() -> Result<(), AuditError> {
//! let logger = AuditLogger::builder()
//!     .sink(StdoutSink::new())
//!     .build();
//!
//! let handle = AuditHandle::new();
//! handle.info("Retrieve User");
//!
//! if let Some(record) = handle.take_record() {
//!     logger.send_log(&record).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod exempt;
pub mod format;
pub mod logger;
pub mod resource;
pub mod sink;

pub use config::*;
pub use context::*;
pub use error::*;
pub use exempt::*;
pub use format::*;
pub use logger::*;
pub use resource::*;
pub use sink::*;
