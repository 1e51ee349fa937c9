//! Audit logger

use crate::context::AuditRecord;
use crate::format::{AuditFormatter, JsonFormatter};
use crate::sink::{AuditSink, SinkError, StdoutSink};
use std::sync::Arc;

/// Default identifier used when no logger name is configured.
pub const DEFAULT_LOGGER_NAME: &str = "audit_log";

/// Formats and emits finished audit records.
///
/// One logger is shared by every request; the sink and formatter it holds
/// must tolerate concurrent calls. `send_log` reports failures to the
/// caller, which is expected to degrade them (the middleware logs a local
/// diagnostic and leaves the response untouched).
pub struct AuditLogger {
    name: String,
    formatter: Arc<dyn AuditFormatter>,
    sink: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AuditLogger {
    /// Create a new audit logger builder
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use audit_trail_core::{AuditLogger, StdoutSink};
    ///
    /// let logger = AuditLogger::builder()
    ///     .sink(StdoutSink::new())
    ///     .build();
    /// ```
    pub fn builder() -> AuditLoggerBuilder {
        AuditLoggerBuilder::new()
    }

    /// The configured logger identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format and write one record.
    pub async fn send_log(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let line = self.formatter.format(record)?;
        self.sink.write(&line).await
    }

    /// Flush the underlying sink.
    pub async fn flush(&self) -> Result<(), SinkError> {
        self.sink.flush().await
    }
}

/// Audit logger builder
pub struct AuditLoggerBuilder {
    name: String,
    formatter: Option<Arc<dyn AuditFormatter>>,
    sink: Option<Arc<dyn AuditSink>>,
}

impl AuditLoggerBuilder {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_LOGGER_NAME.to_string(),
            formatter: None,
            sink: None,
        }
    }

    /// Override the logger identifier.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the sink. Defaults to [`StdoutSink`].
    pub fn sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Set an already-shared sink.
    pub fn shared_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the formatter. Defaults to [`JsonFormatter`].
    pub fn formatter(mut self, formatter: impl AuditFormatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Set an already-shared formatter.
    pub fn shared_formatter(mut self, formatter: Arc<dyn AuditFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn build(self) -> AuditLogger {
        AuditLogger {
            name: self.name,
            formatter: self.formatter.unwrap_or_else(|| Arc::new(JsonFormatter)),
            sink: self.sink.unwrap_or_else(|| Arc::new(StdoutSink)),
        }
    }
}

impl Default for AuditLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuditHandle;
    use crate::sink::MemorySink;

    #[test]
    fn test_builder_defaults() {
        let logger = AuditLogger::builder().build();
        assert_eq!(logger.name(), DEFAULT_LOGGER_NAME);
    }

    #[test]
    fn test_builder_overrides_name() {
        let logger = AuditLogger::builder().name("app_audit").build();
        assert_eq!(logger.name(), "app_audit");
    }

    #[tokio::test]
    async fn test_send_log_writes_one_line() {
        let sink = MemorySink::new();
        let logger = AuditLogger::builder().sink(sink.clone()).build();

        let handle = AuditHandle::new();
        handle.info("Created User object");
        logger.send_log(&handle.snapshot()).await.unwrap();

        let records = sink.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Created User object");
    }
}
