//! Request chaining integration tests
//!
//! Values captured by one call's post-call script feed the templates of the
//! calls that follow it.

use super::runner_for;
use api_suite::executor::{CallError, CallStep};
use api_suite::models::{ApiCall, CallSpec};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_token_flows_into_next_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"user": "ada", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1", "user": {"id": 42}}))
                .insert_header("X-Session-Id", "sess-9"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("x-session-id", "sess-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    runner.environment().set("password", "secret");

    let calls = vec![
        ApiCall::new(
            CallSpec::post("{{base}}/login")
                .body(r#"{"user": "ada", "password": "{{password}}"}"#)
                .post_call_script(
                    "# keep credentials for later calls\n\
                     @assert status == 200\n\
                     @capture token = $.access_token\n\
                     @capture userId = $.user.id\n\
                     @capture session = headers.X-Session-Id\n\
                     @set auth = Bearer {{token}}",
                ),
        )
        .named("login"),
        ApiCall::new(
            CallSpec::get("{{base}}/users/{{userId}}")
                .header("Authorization", "{{auth}}")
                .header("X-Session-Id", "{{session}}")
                .post_call_script("@assert $.id == {{userId}}"),
        )
        .named("profile"),
    ];

    let report = runner.run(&calls).await;

    assert!(report.is_success(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.outcomes[0].name.as_deref(), Some("login"));
    assert_eq!(report.outcomes[1].status, Some(200));
    assert_eq!(
        calls[1].request().unwrap().header("Authorization"),
        Some("Bearer tok-1")
    );
}

#[tokio::test]
async fn test_failed_call_does_not_stop_suite() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let calls = vec![
        ApiCall::with_id(
            "missing",
            CallSpec::get("{{base}}/missing").post_call_script("@assert status == 200"),
        ),
        ApiCall::with_id(
            "health",
            CallSpec::get("{{base}}/health").post_call_script("@capture ok = $.ok"),
        ),
    ];

    let report = runner.run(&calls).await;

    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.call_id, "missing");
    assert_eq!(failure.step, CallStep::PostCallScript);
    assert!(failure.to_string().contains("assertion failed"));
    assert_eq!(runner.environment().get("ok").as_deref(), Some("true"));
}

#[tokio::test]
async fn test_cyclic_variables_report_divergence() {
    let server = MockServer::start().await;

    let runner = runner_for(&server.uri());
    runner.environment().set("a", "{{b}}");
    runner.environment().set("b", "{{a}}");
    let call = ApiCall::with_id("cyclic", CallSpec::get("{{base}}/x").header("X-Loop", "{{a}}"));

    let failure = runner.run_call(&call).await.unwrap_err();

    assert_eq!(failure.call_id, "cyclic");
    assert_eq!(failure.step, CallStep::ApplyHeaders);
    assert!(matches!(
        failure.source,
        CallError::TemplateResolutionDivergence(_)
    ));
    assert!(!call.is_executed());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unset_removes_variable_for_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    runner.environment().set("tenant", "acme");

    let calls = vec![
        ApiCall::new(CallSpec::get("{{base}}/first").post_call_script("@unset tenant")),
        ApiCall::new(CallSpec::get("{{base}}/second").header("X-Tenant", "[{{tenant}}]")),
    ];

    let report = runner.run(&calls).await;

    assert!(report.is_success());
    assert_eq!(calls[1].request().unwrap().header("X-Tenant"), Some("[]"));
}

#[tokio::test]
async fn test_cancel_in_flight_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let runner = runner_for(&server.uri());
    let call = ApiCall::with_id("slow", CallSpec::get("{{base}}/slow"));

    let cancel = async {
        loop {
            if runner.tracker().is_active("slow").unwrap() {
                runner.cancel("slow").unwrap();
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    let (result, ()) = tokio::join!(runner.run_call(&call), cancel);
    let failure = result.unwrap_err();

    assert_eq!(failure.step, CallStep::Dispatch);
    assert!(matches!(failure.source, CallError::Cancelled));
    assert!(!call.is_executed());
    assert_eq!(runner.tracker().active_count().unwrap(), 0);
}
