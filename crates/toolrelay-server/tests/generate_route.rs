use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use toolrelay_core::connection::{MockToolProvider, ToolProvider};
use toolrelay_core::logging::{Logger, NoOpLogger};
use toolrelay_core::providers::{MockProvider, MockTurn};
use toolrelay_core::{AgentService, AgentSettings, ToolDescriptor, ToolRegistry};
use toolrelay_server::{router, AppState, STREAM_CONTENT_TYPE};

fn logger() -> Arc<dyn Logger> {
    Arc::new(NoOpLogger::new())
}

fn app(model: MockProvider, providers: Vec<Arc<dyn ToolProvider>>) -> (Router, Arc<ToolRegistry>) {
    let registry = Arc::new(ToolRegistry::new(providers, logger()));
    let settings = AgentSettings {
        instructions: Some("You are a test agent.".into()),
        pacing_ms: 0,
        ..AgentSettings::default()
    };
    let service = AgentService::from_settings(&settings, Arc::clone(&registry), Arc::new(model), logger())
        .expect("inline instructions");
    (router(AppState::new(Arc::new(service), logger())), registry)
}

fn post_generate(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_lines(response: axum::response::Response) -> Vec<Value> {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn generate_streams_tool_trace_as_json_lines() {
    let calendar = Arc::new(
        MockToolProvider::new("calendar")
            .with_tools(vec![ToolDescriptor::new("list_events", "List calendar events")])
            .with_result("list_events", Ok(json!("{\"events\": []}"))),
    );
    let model = MockProvider::scripted(
        vec![
            MockTurn::tool_call("list_events", json!({"day": "monday"})),
            MockTurn::reply("Nothing planned."),
        ],
        logger(),
    );
    let (app, _) = app(model, vec![calendar.clone()]);

    let body = json!({"prompt": "am I free on monday?", "userIdentity": "U07G1UMQ64C"});
    let response = app.oneshot(post_generate(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        STREAM_CONTENT_TYPE
    );

    let lines = body_lines(response).await;
    let kinds: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["tool_calls", "tool_result", "llm_chunk"]);

    assert_eq!(lines[0]["data"][0]["name"], "list_events");
    assert_eq!(lines[0]["data"][0]["function"]["arguments"], json!({"day": "monday"}));
    assert_eq!(lines[1]["data"], json!({"result": {"events": []}, "tool_name": "list_events"}));
    assert_eq!(lines[2]["data"], "Nothing planned.");

    assert_eq!(
        calendar.connected_users(),
        vec![Some("U07G1UMQ64C".to_string())]
    );
}

#[tokio::test]
async fn malformed_body_is_rejected_before_streaming() {
    let (app, _) = app(MockProvider::echo(logger()), Vec::new());

    let response = app.oneshot(post_generate("{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["error"], "invalid_json");
}

#[tokio::test]
async fn invalid_prompt_is_rejected_before_streaming() {
    let model = MockProvider::echo(logger());
    let (app, _) = app(model, Vec::new());

    let body = json!({"prompt": [{"type": "input_text", "text": "hi"}, {"type": "audio"}]});
    let response = app.oneshot(post_generate(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["error"], "invalid_prompt");
}

#[tokio::test]
async fn health_reports_provider_failures() {
    let healthy = Arc::new(MockToolProvider::new("calendar"));
    let broken = Arc::new(MockToolProvider::new("crm").failing_connects(10));
    let (app, registry) = app(MockProvider::echo(logger()), vec![healthy, broken]);

    registry.warm_up().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let health: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["status"], "degraded");

    let providers = health["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0]["name"], "calendar");
    assert_eq!(providers[0]["state"], "connected");
    assert!(providers[0].get("last_error").is_none());
    assert_eq!(providers[1]["name"], "crm");
    assert!(providers[1]["last_error"].is_string());
}
