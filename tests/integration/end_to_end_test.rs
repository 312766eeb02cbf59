//! End-to-end integration tests for API suites
//!
//! These tests run calls through the reqwest transport against a wiremock
//! server and check what was sent, what was attached and what the post-call
//! script saw.

use super::runner_for;
use api_suite::executor::{CallError, CallStep};
use api_suite::hooks::ModelDescriptor;
use api_suite::models::{ApiCall, CallSpec, HttpMethod, MediaKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
    email: String,
}

#[tokio::test]
async fn test_post_with_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(
        CallSpec::post("{{base}}/users")
            .body(r#"{"name": "{{name}}"}"#)
            .post_call_script("@assert status == 201\n@capture userId = $.id"),
    );
    runner.environment().set("name", "ada");

    runner.run_call(&call).await.unwrap();

    let response = call.response().unwrap();
    assert_eq!(response.status_code(), 201);
    assert_eq!(response.media_kind(), MediaKind::Json);
    assert_eq!(call.request().unwrap().method, HttpMethod::POST);
    assert_eq!(runner.environment().get("userId").as_deref(), Some("7"));
}

#[tokio::test]
async fn test_unmatched_route_returns_404_not_error() {
    let server = MockServer::start().await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(CallSpec::get("{{base}}/nowhere"));

    runner.run_call(&call).await.unwrap();

    assert_eq!(call.response().unwrap().status_code(), 404);
    assert!(call.response().unwrap().is_client_error());
}

#[tokio::test]
async fn test_resolved_url_with_unknown_route_returns_404() {
    let server = MockServer::start().await;

    let runner = runner_for(&server.uri());
    runner.environment().set("id", "7");
    let call = ApiCall::new(CallSpec::get("{{base}}/users/{{id}}"));

    runner.run_call(&call).await.unwrap();

    let request = call.request().unwrap();
    assert_eq!(request.url, format!("{}/users/7", server.uri()));
    assert_eq!(call.response().unwrap().status_code(), 404);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].url.path(), "/users/7");
}

#[tokio::test]
async fn test_get_sends_no_body_or_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(CallSpec::get("{{base}}/items").body(r#"{"ignored": true}"#));

    runner.run_call(&call).await.unwrap();

    assert!(call.request().unwrap().body.is_none());
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].body.is_empty());
    assert!(!received[0].headers.contains_key("content-type"));
}

#[tokio::test]
async fn test_query_and_route_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42/posts"))
        .and(query_param("q", "rust lang"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    runner.environment().set("userId", "42");
    let call = ApiCall::new(
        CallSpec::get("{{base}}/users/{id}/posts")
            .route("id", "{{userId}}")
            .query("q", "rust lang")
            .query("page", "2"),
    );

    runner.run_call(&call).await.unwrap();
    assert_eq!(call.response().unwrap().status_code(), 200);
}

#[tokio::test]
async fn test_multi_value_headers_are_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "a=1")
                .append_header("Set-Cookie", "b=2"),
        )
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(CallSpec::get("{{base}}/session"));

    runner.run_call(&call).await.unwrap();

    let response = call.response().unwrap();
    let cookies = response.header_values("set-cookie");
    assert_eq!(cookies, vec!["a=1", "b=2"]);
}

#[tokio::test]
async fn test_model_bound_for_json_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "name": "Ada",
            "email": "ada@example.com"
        })))
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(
        CallSpec::get("{{base}}/users/1")
            .response_model(ModelDescriptor::named::<User>("User"))
            .post_call_script(
                "@assert model.email matches ^[^@]+@example\\.com$\n\
                 @capture userName = model.name",
            ),
    );

    runner.run_call(&call).await.unwrap();
    assert_eq!(runner.environment().get("userName").as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_model_not_bound_for_html_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<h1>hi</h1>", "text/html"))
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(
        CallSpec::get("{{base}}/page")
            .response_model(ModelDescriptor::of::<User>())
            .post_call_script("@capture title = model.name"),
    );

    let failure = runner.run_call(&call).await.unwrap_err();

    assert_eq!(failure.step, CallStep::PostCallScript);
    assert!(failure.to_string().contains("not bound"));
    assert_eq!(call.response().unwrap().media_kind(), MediaKind::Html);
}

#[tokio::test]
async fn test_model_mismatch_fails_before_script() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "two"})))
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(
        CallSpec::get("{{base}}/users/2")
            .response_model(ModelDescriptor::named::<User>("User"))
            .post_call_script("@set touched = yes"),
    );

    let failure = runner.run_call(&call).await.unwrap_err();

    assert_eq!(failure.step, CallStep::ModelDeserialization);
    assert!(matches!(
        failure.source,
        CallError::ModelDeserializationFailure { .. }
    ));
    assert!(!runner.environment().contains("touched"));
}

#[tokio::test]
async fn test_unsupported_method_never_dispatches() {
    let server = MockServer::start().await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::new(CallSpec::new(HttpMethod::TRACE, "{{base}}/trace"));

    let failure = runner.run_call(&call).await.unwrap_err();

    assert_eq!(failure.step, CallStep::SelectMethod);
    assert!(matches!(failure.source, CallError::UnsupportedMethod(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
