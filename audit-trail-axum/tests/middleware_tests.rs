//! Router-level tests for the audit middleware

use audit_trail_axum::{audit_middleware, AuditState, Principal, IP_UNRESOLVED};
use audit_trail_core::{
    AuditHandle, AuditLogger, AuditSink, ExemptionMatcher, LogType, MemorySink, ResourceAuditor,
    SinkError,
};
use axum::body::Body;
use axum::extract::{Path, Query, Request};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use tower::ServiceExt;

fn audit_state(sink: MemorySink) -> AuditState {
    let logger = AuditLogger::builder().sink(sink).build();
    AuditState::new(logger, ExemptionMatcher::empty())
}

async fn get_user(
    Path(params): Path<HashMap<String, String>>,
    audit: Option<Extension<AuditHandle>>,
) -> Json<Value> {
    let payload = json!({"id": params.get("id").cloned().unwrap_or_default()});
    if let Some(Extension(log)) = audit {
        ResourceAuditor::new("User")
            .lookup_field("id")
            .record_retrieve(&log, &params, payload.clone());
    }
    Json(payload)
}

async fn list_users(
    Query(query): Query<HashMap<String, String>>,
    audit: Option<Extension<AuditHandle>>,
) -> Json<Value> {
    let payload = json!([{"email": "username@host.com"}]);
    if let Some(Extension(log)) = audit {
        let terms =
            audit_trail_core::search_terms(query.get("search").map(String::as_str));
        ResourceAuditor::new("User")
            .search_fields(["email"])
            .record_list(&log, &terms, payload.clone());
    }
    Json(payload)
}

fn request(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header("host", "localhost")
        .header("user-agent", "test_agent")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_emits_exactly_one_record_per_request() {
    let sink = MemorySink::new();
    let app = Router::new()
        .route("/users", get(list_users))
        .layer(from_fn_with_state(audit_state(sink.clone()), audit_middleware));

    let response = app.oneshot(request("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = sink.records().await.unwrap();
    assert_eq!(records.len(), 1);

    let http_request = records[0].http_request.as_ref().unwrap();
    assert_eq!(http_request.method, "GET");
    assert_eq!(http_request.url, "http://localhost/users");
    assert_eq!(http_request.user_agent, "test_agent");

    let http_response = records[0].http_response.as_ref().unwrap();
    assert_eq!(http_response.status_code, Some(200));
    assert_eq!(http_response.reason, "OK");
}

#[tokio::test]
async fn test_exempt_path_is_never_audited() {
    let sink = MemorySink::new();
    let logger = AuditLogger::builder().sink(sink.clone()).build();
    let state = AuditState::new(logger, ExemptionMatcher::new(["^health"]).unwrap());

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/users", get(list_users))
        .layer(from_fn_with_state(state, audit_middleware));

    let response = app.clone().oneshot(request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(sink.records().await.unwrap().is_empty());

    app.oneshot(request("/users")).await.unwrap();
    assert_eq!(sink.records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_nested_mounts_emit_once() {
    let sink = MemorySink::new();
    let state = audit_state(sink.clone());

    let app = Router::new()
        .route("/users", get(list_users))
        .layer(from_fn_with_state(state.clone(), audit_middleware))
        .layer(from_fn_with_state(state, audit_middleware));

    app.oneshot(request("/users")).await.unwrap();
    assert_eq!(sink.records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_retrieve_annotations_reach_the_record() {
    let sink = MemorySink::new();
    let app = Router::new()
        .route("/users/:id", get(get_user))
        .layer(from_fn_with_state(audit_state(sink.clone()), audit_middleware));

    app.oneshot(request("/users/17")).await.unwrap();

    let records = sink.records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].log_type, LogType::ResourceAction);
    assert_eq!(records[0].message, "Retrieve User");
    let filter = records[0].filter.as_ref().unwrap();
    assert_eq!(filter.object_name, "User");
    assert_eq!(filter.kwargs["id"], json!("17"));
    assert_eq!(records[0].results, Some(json!({"id": "17"})));
}

#[tokio::test]
async fn test_list_search_terms_in_filter_kwargs() {
    let sink = MemorySink::new();
    let app = Router::new()
        .route("/users", get(list_users))
        .layer(from_fn_with_state(audit_state(sink.clone()), audit_middleware));

    app.oneshot(request("/users?search=test")).await.unwrap();

    let records = sink.records().await.unwrap();
    assert_eq!(records[0].message, "List User");
    let filter = records[0].filter.as_ref().unwrap();
    assert_eq!(filter.kwargs["['email']"], json!(["test"]));
    assert_eq!(records[0].results, None, "list payload is off by default");
}

#[tokio::test]
async fn test_principal_and_realm_are_captured() {
    async fn inject_principal(mut request: Request, next: Next) -> Response {
        request.extensions_mut().insert(Principal {
            username: "username".to_string(),
            email: "username@host.com".to_string(),
            provider: String::new(),
            roles: vec!["testgroup".to_string()],
        });
        next.run(request).await
    }

    let sink = MemorySink::new();
    let state = audit_state(sink.clone()).with_realm("testrealm");

    let app = Router::new()
        .route("/users", get(list_users))
        .layer(from_fn_with_state(state, audit_middleware))
        .layer(from_fn(inject_principal));

    let mut req = request("/users");
    req.headers_mut()
        .insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
    app.oneshot(req).await.unwrap();

    let records = sink.records().await.unwrap();
    let user = records[0].user.as_ref().unwrap();
    assert!(user.authenticated);
    assert_eq!(user.username, "username");
    assert_eq!(user.email, "username@host.com");
    assert_eq!(user.roles, vec!["testgroup".to_string()]);
    assert_eq!(user.provider.name, "");
    assert_eq!(user.provider.realm, "testrealm");
    assert_eq!(user.ip, "1.2.3.4");
}

#[tokio::test]
async fn test_anonymous_user_defaults() {
    let sink = MemorySink::new();
    let app = Router::new()
        .route("/users", get(list_users))
        .layer(from_fn_with_state(audit_state(sink.clone()), audit_middleware));

    app.oneshot(request("/users")).await.unwrap();

    let records = sink.records().await.unwrap();
    let user = records[0].user.as_ref().unwrap();
    assert!(!user.authenticated);
    assert_eq!(user.roles, Vec::<String>::new());
    assert_eq!(user.email, "");
    assert_eq!(user.ip, IP_UNRESOLVED, "oneshot requests have no peer address");
}

#[tokio::test]
async fn test_method_not_allowed_response_is_captured() {
    let sink = MemorySink::new();
    let app = Router::new()
        .route("/users", get(list_users))
        .layer(from_fn_with_state(audit_state(sink.clone()), audit_middleware));

    let req = Request::builder()
        .method("POST")
        .uri("/users")
        .header("host", "localhost")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let records = sink.records().await.unwrap();
    let http_response = records[0].http_response.as_ref().unwrap();
    assert_eq!(http_response.status_code, Some(405));
    assert_eq!(http_response.reason, "Method Not Allowed");
    assert!(http_response.headers.contains_key("allow"));
}

#[tokio::test]
async fn test_sink_failure_never_breaks_the_response() {
    struct FailingSink;

    #[async_trait::async_trait]
    impl AuditSink for FailingSink {
        async fn write(&self, _line: &str) -> Result<(), SinkError> {
            Err(SinkError::Other("sink offline".to_string()))
        }
    }

    let logger = AuditLogger::builder().sink(FailingSink).build();
    let state = AuditState::new(logger, ExemptionMatcher::empty());

    let app = Router::new()
        .route("/users", get(list_users))
        .layer(from_fn_with_state(state, audit_middleware));

    let response = app.oneshot(request("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
