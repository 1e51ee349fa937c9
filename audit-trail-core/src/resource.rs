//! Per-endpoint CRUD annotation helper

use crate::context::{AuditHandle, LogType};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Annotates the request's audit context from a resource handler.
///
/// One `ResourceAuditor` is configured per endpoint with the object name
/// it serves and how its lookup key and search fields are derived. The
/// recorders only touch the handle; the middleware still flushes the
/// record once, at response time.
///
/// # Examples
///
/// ```
/// use audit_trail_core::{AuditHandle, ResourceAuditor};
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let users = ResourceAuditor::new("User").lookup_field("id");
/// let handle = AuditHandle::new();
/// let path_kwargs = HashMap::from([("id".to_string(), "17".to_string())]);
///
/// users.record_retrieve(&handle, &path_kwargs, json!({"id": 17}));
/// assert_eq!(handle.snapshot().message, "Retrieve User");
/// ```
#[derive(Debug, Clone)]
pub struct ResourceAuditor {
    object_name: String,
    lookup_field: String,
    lookup_url_kwarg: Option<String>,
    search_fields: Vec<String>,
    log_list_response: bool,
}

impl ResourceAuditor {
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            lookup_field: "pk".to_string(),
            lookup_url_kwarg: None,
            search_fields: Vec::new(),
            log_list_response: false,
        }
    }

    /// Field identifying a single target resource. Defaults to `"pk"`.
    pub fn lookup_field(mut self, field: impl Into<String>) -> Self {
        self.lookup_field = field.into();
        self
    }

    /// Path-parameter name holding the lookup value, when it differs from
    /// the lookup field.
    pub fn lookup_url_kwarg(mut self, kwarg: impl Into<String>) -> Self {
        self.lookup_url_kwarg = Some(kwarg.into());
        self
    }

    /// Fields the endpoint's search filter applies terms to.
    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Whether list recorders attach the full response payload.
    pub fn log_list_response(mut self, enabled: bool) -> Self {
        self.log_list_response = enabled;
        self
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Lookup-key mapping for the current request.
    ///
    /// Resolves the url kwarg (or the lookup field itself) against the
    /// path-parameter map; a missing parameter degrades to `""`.
    pub fn lookup_kwargs(&self, path_kwargs: &HashMap<String, String>) -> Map<String, Value> {
        let url_kwarg = self.lookup_url_kwarg.as_deref().unwrap_or(&self.lookup_field);
        let value = path_kwargs.get(url_kwarg).cloned().unwrap_or_default();

        let mut kwargs = Map::new();
        kwargs.insert(self.lookup_field.clone(), Value::String(value));
        kwargs
    }

    /// Search-criteria mapping for list requests.
    ///
    /// Keyed by the rendered searchable-field list even when it is empty,
    /// so consumers can tell "no search fields configured" (`"[]"`) apart
    /// from "no terms supplied" (empty term array).
    pub fn filter_kwargs(&self, search_terms: &[String]) -> Map<String, Value> {
        let terms = search_terms.iter().cloned().map(Value::String).collect();

        let mut kwargs = Map::new();
        kwargs.insert(field_list_key(&self.search_fields), Value::Array(terms));
        kwargs
    }

    /// Annotate a retrieve-one action.
    pub fn record_retrieve(
        &self,
        log: &AuditHandle,
        path_kwargs: &HashMap<String, String>,
        results: Value,
    ) {
        log.set_log_type(LogType::ResourceAction);
        log.set_filter(&self.object_name, self.lookup_kwargs(path_kwargs));
        log.set_results(results);
        log.info(format!("Retrieve {}", self.object_name));
    }

    /// Annotate a list action. The payload is only attached when
    /// `log_list_response` is enabled for this endpoint.
    pub fn record_list(&self, log: &AuditHandle, search_terms: &[String], results: Value) {
        log.set_log_type(LogType::ResourceAction);
        log.set_filter(&self.object_name, self.filter_kwargs(search_terms));
        if self.log_list_response {
            log.set_results(results);
        }
        log.info(format!("List {}", self.object_name));
    }

    /// Annotate a create action.
    pub fn record_create(&self, log: &AuditHandle, results: Value) {
        log.set_log_type(LogType::ResourceAction);
        log.set_results(results);
        log.info(format!("Created {} object", self.object_name));
    }

    /// Annotate a full or partial update.
    pub fn record_update(
        &self,
        log: &AuditHandle,
        path_kwargs: &HashMap<String, String>,
        results: Value,
        partial: bool,
    ) {
        log.set_log_type(LogType::ResourceAction);
        log.set_filter(&self.object_name, self.lookup_kwargs(path_kwargs));
        log.set_results(results);
        let message = if partial {
            format!("Partial update of {}", self.object_name)
        } else {
            format!("Update of {}", self.object_name)
        };
        log.info(message);
    }

    /// Annotate a destroy action. There is no result payload.
    pub fn record_destroy(&self, log: &AuditHandle, path_kwargs: &HashMap<String, String>) {
        log.set_log_type(LogType::ResourceAction);
        log.set_filter(&self.object_name, self.lookup_kwargs(path_kwargs));
        log.set_results(Value::Null);
        log.info(format!("Destroy {}", self.object_name));
    }
}

/// Split a raw search query parameter into terms.
///
/// Commas are treated as whitespace, matching the search-filter semantics
/// of the records this format is compatible with.
pub fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .replace(',', " ")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Render a field list as the stable map key used by `filter_kwargs`,
/// e.g. `[]` or `['email', 'name']`.
fn field_list_key(fields: &[String]) -> String {
    let quoted: Vec<String> = fields.iter().map(|field| format!("'{}'", field)).collect();
    format!("[{}]", quoted.join(", "))
}
