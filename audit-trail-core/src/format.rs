//! Record formatters

use crate::context::AuditRecord;
use crate::sink::SinkError;

/// Turns a finished record into the line handed to the sink.
pub trait AuditFormatter: Send + Sync {
    fn format(&self, record: &AuditRecord) -> Result<String, SinkError>;
}

/// Compact single-line JSON, the default formatter.
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl AuditFormatter for JsonFormatter {
    fn format(&self, record: &AuditRecord) -> Result<String, SinkError> {
        Ok(serde_json::to_string(record)?)
    }
}

/// Indented JSON for development sinks.
#[derive(Debug, Default)]
pub struct PrettyJsonFormatter;

impl AuditFormatter for PrettyJsonFormatter {
    fn format(&self, record: &AuditRecord) -> Result<String, SinkError> {
        Ok(serde_json::to_string_pretty(record)?)
    }
}
