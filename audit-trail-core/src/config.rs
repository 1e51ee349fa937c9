//! Audit configuration and selector registries

use crate::error::AuditError;
use crate::exempt::ExemptionMatcher;
use crate::format::{AuditFormatter, JsonFormatter, PrettyJsonFormatter};
use crate::logger::AuditLogger;
use crate::sink::{AuditSink, StdoutSink};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

type SinkFactory = Arc<dyn Fn() -> Arc<dyn AuditSink> + Send + Sync>;
type FormatterFactory = Arc<dyn Fn() -> Arc<dyn AuditFormatter> + Send + Sync>;

static BUILTIN_SINKS: Lazy<SinkRegistry> = Lazy::new(SinkRegistry::with_defaults);
static BUILTIN_FORMATTERS: Lazy<FormatterRegistry> = Lazy::new(FormatterRegistry::with_defaults);

/// Recognized configuration options.
///
/// Every field is optional; `None`/empty leaves the library default in
/// place (stdout transport, JSON formatter, `audit_log` logger name,
/// nothing exempt). Selector names resolve against a registry when the
/// config is built, so a typo fails at startup, not per request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Overrides the default logger identifier.
    pub logger_name: Option<String>,
    /// Sink selector, resolved against a [`SinkRegistry`].
    pub handler: Option<String>,
    /// Formatter selector, resolved against a [`FormatterRegistry`].
    pub formatter: Option<String>,
    /// Request paths matching any of these patterns are never audited.
    pub exempt_urls: Vec<String>,
}

impl AuditConfig {
    /// Build the logger and exemption matcher using the built-in
    /// registries (`"stdout"` sink; `"json"` and `"json-pretty"`
    /// formatters).
    pub fn build(&self) -> Result<(AuditLogger, ExemptionMatcher), AuditError> {
        self.build_with(&BUILTIN_SINKS, &BUILTIN_FORMATTERS)
    }

    /// Build against caller-extended registries.
    pub fn build_with(
        &self,
        sinks: &SinkRegistry,
        formatters: &FormatterRegistry,
    ) -> Result<(AuditLogger, ExemptionMatcher), AuditError> {
        let matcher = ExemptionMatcher::new(&self.exempt_urls)?;

        let mut builder = AuditLogger::builder();
        if let Some(name) = &self.logger_name {
            builder = builder.name(name);
        }
        if let Some(handler) = &self.handler {
            builder = builder.shared_sink(sinks.resolve(handler)?);
        }
        if let Some(formatter) = &self.formatter {
            builder = builder.shared_formatter(formatters.resolve(formatter)?);
        }

        Ok((builder.build(), matcher))
    }
}

/// Name-to-factory registry for sink selectors.
///
/// The re-architected form of "import a handler by dotted path": embedders
/// register a constructor under a name once at startup and reference it
/// from configuration.
#[derive(Clone, Default)]
pub struct SinkRegistry {
    factories: HashMap<String, SinkFactory>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the `"stdout"` sink.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("stdout", || Arc::new(StdoutSink));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn AuditSink> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn AuditSink>, AuditError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| AuditError::UnknownHandler(name.to_string()))
    }
}

/// Name-to-factory registry for formatter selectors.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    factories: HashMap<String, FormatterFactory>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `"json"` and `"json-pretty"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("json", || Arc::new(JsonFormatter));
        registry.register("json-pretty", || Arc::new(PrettyJsonFormatter));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn AuditFormatter> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn AuditFormatter>, AuditError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| AuditError::UnknownFormatter(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::DEFAULT_LOGGER_NAME;
    use crate::sink::MemorySink;

    #[test]
    fn test_default_config_builds() {
        let (logger, matcher) = AuditConfig::default().build().unwrap();
        assert_eq!(logger.name(), DEFAULT_LOGGER_NAME);
        assert!(!matcher.is_exempt("/anything"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: AuditConfig =
            serde_json::from_str(r#"{"logger_name": "app_audit", "exempt_urls": ["^health"]}"#)
                .unwrap();
        assert_eq!(config.logger_name.as_deref(), Some("app_audit"));
        assert!(config.handler.is_none());

        let (logger, matcher) = config.build().unwrap();
        assert_eq!(logger.name(), "app_audit");
        assert!(matcher.is_exempt("/health"));
    }

    #[test]
    fn test_unknown_handler_fails_at_startup() {
        let config = AuditConfig {
            handler: Some("syslog".to_string()),
            ..AuditConfig::default()
        };
        assert!(matches!(
            config.build().unwrap_err(),
            AuditError::UnknownHandler(name) if name == "syslog"
        ));
    }

    #[test]
    fn test_unknown_formatter_fails_at_startup() {
        let config = AuditConfig {
            formatter: Some("logfmt".to_string()),
            ..AuditConfig::default()
        };
        assert!(matches!(
            config.build().unwrap_err(),
            AuditError::UnknownFormatter(name) if name == "logfmt"
        ));
    }

    #[test]
    fn test_invalid_exempt_pattern_fails_at_startup() {
        let config = AuditConfig {
            exempt_urls: vec!["(".to_string()],
            ..AuditConfig::default()
        };
        assert!(matches!(
            config.build().unwrap_err(),
            AuditError::InvalidExemptPattern { .. }
        ));
    }

    #[test]
    fn test_registered_sink_resolves() {
        let mut sinks = SinkRegistry::with_defaults();
        sinks.register("memory", || Arc::new(MemorySink::new()));

        let config = AuditConfig {
            handler: Some("memory".to_string()),
            formatter: Some("json-pretty".to_string()),
            ..AuditConfig::default()
        };
        let result = config.build_with(&sinks, &FormatterRegistry::with_defaults());
        assert!(result.is_ok());
    }
}
