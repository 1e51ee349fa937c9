//! Per-request audit context and the emitted record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Category tag distinguishing plain request/response records from
/// records annotated by a resource handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    /// Plain request/response cycle record
    #[default]
    AuditLog,
    /// Record carrying CRUD-action annotations
    ResourceAction,
}

/// Request metadata, set once by request capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequestInfo {
    /// Verbatim HTTP method token
    pub method: String,
    /// Absolute URL including the query string
    pub url: String,
    /// User-Agent header value, `"?"` when absent
    pub user_agent: String,
}

/// Response metadata, set once by response capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseInfo {
    /// Numeric status, serialized as `""` when the response had none
    #[serde(with = "status_code_repr")]
    pub status_code: Option<u16>,
    /// Human-readable status phrase, `""` when unknown
    pub reason: String,
    /// Full header map, unfiltered; redaction is a sink concern
    pub headers: BTreeMap<String, String>,
}

/// Authentication backend identity for a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub realm: String,
}

/// Authenticated-principal details, set at most once before the handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub authenticated: bool,
    pub provider: Provider,
    pub email: String,
    pub roles: Vec<String>,
    pub ip: String,
    pub username: String,
}

impl UserInfo {
    /// User section for a request without an authenticated principal.
    ///
    /// Every field takes its empty default so the record keeps a fixed
    /// schema; only the client IP is carried over.
    pub fn anonymous(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Self::default()
        }
    }
}

/// What a resource handler queried: object type plus filter criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterInfo {
    pub object_name: String,
    pub kwargs: serde_json::Map<String, Value>,
}

/// Mutable accumulator for one request's audit fields.
///
/// Owned by a single request's lifecycle; shared access goes through
/// [`AuditHandle`]. Every setter is last-write-wins, so re-running a
/// capture step is harmless.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    http_request: Option<HttpRequestInfo>,
    http_response: Option<HttpResponseInfo>,
    user: Option<UserInfo>,
    filter: Option<FilterInfo>,
    results: Option<Value>,
    message: Option<String>,
    log_type: LogType,
    flushed: bool,
}

impl AuditContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_http_request(&mut self, info: HttpRequestInfo) {
        self.http_request = Some(info);
    }

    pub fn set_http_response(&mut self, info: HttpResponseInfo) {
        self.http_response = Some(info);
    }

    pub fn set_user(&mut self, user: UserInfo) {
        self.user = Some(user);
    }

    pub fn set_filter(&mut self, object_name: impl Into<String>, kwargs: serde_json::Map<String, Value>) {
        self.filter = Some(FilterInfo {
            object_name: object_name.into(),
            kwargs,
        });
    }

    pub fn set_results(&mut self, results: Value) {
        self.results = Some(results);
    }

    pub fn set_log_type(&mut self, log_type: LogType) {
        self.log_type = log_type;
    }

    /// Set the human-readable summary line (e.g. `"Retrieve User"`).
    pub fn info(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn http_request(&self) -> Option<&HttpRequestInfo> {
        self.http_request.as_ref()
    }

    pub fn http_response(&self) -> Option<&HttpResponseInfo> {
        self.http_response.as_ref()
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Build the emitted record from the current state.
    ///
    /// Unset sections serialize as `null` and the unset message as `""`,
    /// so fixed-schema consumers always see every key.
    pub fn to_record(&self) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            log_type: self.log_type,
            message: self.message.clone().unwrap_or_default(),
            http_request: self.http_request.clone(),
            http_response: self.http_response.clone(),
            user: self.user.clone(),
            filter: self.filter.clone(),
            results: self.results.clone(),
        }
    }
}

/// One finished audit record, handed to the sink as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub log_type: LogType,
    pub message: String,
    pub http_request: Option<HttpRequestInfo>,
    pub http_response: Option<HttpResponseInfo>,
    pub user: Option<UserInfo>,
    pub filter: Option<FilterInfo>,
    pub results: Option<Value>,
}

/// Cheap-clone handle to one request's [`AuditContext`].
///
/// This is the request-scoped attachment point: the middleware inserts a
/// clone into the request extensions, and downstream handlers mutate the
/// same context through their clone. Contexts are never shared across
/// requests, so the inner lock is uncontended in practice.
#[derive(Debug, Clone, Default)]
pub struct AuditHandle {
    inner: Arc<Mutex<AuditContext>>,
}

impl AuditHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuditContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_http_request(&self, info: HttpRequestInfo) {
        self.lock().set_http_request(info);
    }

    pub fn set_http_response(&self, info: HttpResponseInfo) {
        self.lock().set_http_response(info);
    }

    pub fn set_user(&self, user: UserInfo) {
        self.lock().set_user(user);
    }

    pub fn set_filter(&self, object_name: impl Into<String>, kwargs: serde_json::Map<String, Value>) {
        self.lock().set_filter(object_name, kwargs);
    }

    pub fn set_results(&self, results: Value) {
        self.lock().set_results(results);
    }

    pub fn set_log_type(&self, log_type: LogType) {
        self.lock().set_log_type(log_type);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.lock().info(message);
    }

    /// Snapshot the current state without affecting the flush guard.
    pub fn snapshot(&self) -> AuditRecord {
        self.lock().to_record()
    }

    /// Take the record for emission, exactly once.
    ///
    /// The first call returns the record and marks the context flushed;
    /// every later call returns `None`. This backs the once-per-request
    /// emission guarantee even if the response-ready hook fires twice.
    pub fn take_record(&self) -> Option<AuditRecord> {
        let mut ctx = self.lock();
        if ctx.flushed {
            return None;
        }
        ctx.flushed = true;
        Some(ctx.to_record())
    }
}

mod status_code_repr {
    use serde::de::{Error, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u16>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(code) => serializer.serialize_u16(*code),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u16),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(Some(code)),
            Repr::Text(text) if text.is_empty() => Ok(None),
            Repr::Text(text) => Err(D::Error::invalid_value(
                Unexpected::Str(&text),
                &"a status code or an empty string",
            )),
        }
    }
}
