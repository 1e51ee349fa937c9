//! Error types for audit log construction and emission

use crate::sink::SinkError;
use thiserror::Error;

/// Configuration and construction errors.
///
/// These are the only errors allowed to propagate: they abort startup.
/// Runtime capture and emission failures are degraded at the call site
/// and never surface on the request path.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid exempt url pattern `{pattern}`: {source}")]
    InvalidExemptPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown log handler `{0}`")]
    UnknownHandler(String),

    #[error("unknown log formatter `{0}`")]
    UnknownFormatter(String),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
