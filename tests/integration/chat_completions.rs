//! Chat completions endpoint integration tests
//!
//! Tests for POST /v1/chat/completions:
//! - Buffered translation of the upstream line protocol
//! - Streaming SSE framing (role first, [DONE] last)
//! - Upstream payload defaults (sampling, system prompt)
//! - Invalid model rejection in both delivery modes
//! - Request validation

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{test_data, TestApp};
use crate::mocks::akash::AkashTestData;

/// Split an SSE body into its `data:` payloads
fn sse_frames(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|frame| !frame.is_empty())
        .map(|frame| {
            frame
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("frame without data prefix: {frame:?}"))
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_buffered_completion_returns_openai_document() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash
        .mock_chat_body(&AkashTestData::chat_body(
            "msg-7f3a",
            &["Hello", " world"],
            "stop",
        ))
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::chat_request("Meta-Llama-3-3-70B-Instruct"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["id"], "chatcmpl-msg-7f3a");
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "Meta-Llama-3-3-70B-Instruct");
    assert_eq!(body["choices"][0]["index"], 0);
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "Hello world");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    // No token accounting on this upstream; usage is pinned to zero.
    assert_eq!(body["usage"]["prompt_tokens"], 0);
    assert_eq!(body["usage"]["completion_tokens"], 0);
    assert_eq!(body["usage"]["total_tokens"], 0);
    assert!(body["created"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_buffered_completion_unescapes_content() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash
        .mock_chat_body(&AkashTestData::chat_body(
            "msg-esc",
            &["line one\nline two", " and a \"quote\""],
            "stop",
        ))
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::chat_request("some-model"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "line one\nline two and a \"quote\""
    );
}

#[tokio::test]
async fn test_forwarded_request_carries_defaults_and_system_prompt() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash
        .mock_chat_body(&AkashTestData::chat_body("msg-1", &["ok"], "stop"))
        .await;

    app.server
        .post("/v1/chat/completions")
        .json(&test_data::chat_request("some-model"))
        .await;

    let requests = app.akash.chat_requests().await;
    assert_eq!(requests.len(), 1);

    let forwarded: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(forwarded["model"], "some-model");
    assert_eq!(forwarded["temperature"], json!(0.6));
    // The upstream spells it camelCase; snake_case would be ignored there.
    assert_eq!(forwarded["topP"], json!(0.95));
    assert!(forwarded.get("top_p").is_none());
    assert_eq!(forwarded["context"], json!([]));
    assert_eq!(forwarded["id"].as_str().unwrap().len(), 16);
    assert_eq!(forwarded["messages"][0]["role"], "user");
    assert_eq!(forwarded["messages"][0]["content"], "Hello, how are you?");
    assert!(forwarded["system"]
        .as_str()
        .unwrap()
        .starts_with("You are a skilled conversationalist"));
}

#[tokio::test]
async fn test_explicit_sampling_overrides_defaults() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash
        .mock_chat_body(&AkashTestData::chat_body("msg-1", &["ok"], "stop"))
        .await;

    app.server
        .post("/v1/chat/completions")
        .json(&json!({
            "model": "some-model",
            "messages": [{"role": "user", "content": "Hi"}],
            "temperature": 0.9,
            "top_p": 0.5
        }))
        .await;

    let requests = app.akash.chat_requests().await;
    let forwarded: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(forwarded["temperature"], json!(0.9));
    assert_eq!(forwarded["topP"], json!(0.5));
}

#[tokio::test]
async fn test_streaming_emits_role_first_and_done_last() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash
        .mock_chat_body(&AkashTestData::chat_body(
            "msg-str",
            &["Hel", "lo", "!"],
            "stop",
        ))
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::streaming_chat_request("some-model"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(content_type, "text/event-stream");

    let body = response.text();
    let frames = sse_frames(&body);

    // role + 3 content + finish + [DONE]
    assert_eq!(frames.len(), 6);
    assert_eq!(frames.last().unwrap(), "[DONE]");

    let first: Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(first["id"], "chatcmpl-msg-str");
    assert_eq!(first["object"], "chat.completion.chunk");
    assert_eq!(first["choices"][0]["delta"]["role"], "assistant");
    assert!(first["choices"][0]["delta"].get("content").is_none());

    let contents: Vec<String> = frames[1..4]
        .iter()
        .map(|frame| {
            let chunk: Value = serde_json::from_str(frame).unwrap();
            chunk["choices"][0]["delta"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(contents, vec!["Hel", "lo", "!"]);

    let finish: Value = serde_json::from_str(&frames[4]).unwrap();
    assert_eq!(finish["choices"][0]["finish_reason"], "stop");
    assert_eq!(finish["choices"][0]["delta"], json!({}));
}

#[tokio::test]
async fn test_streaming_without_finish_line_still_terminates() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    // Message opens and produces content, but the upstream never sends a
    // finish line before the body ends.
    app.akash
        .mock_chat_body("f:{\"messageId\":\"msg-cut\"}\n0:\"partial\"\n")
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::streaming_chat_request("some-model"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let frames = sse_frames(&response.text());

    // role + content + synthetic finish + [DONE]
    assert_eq!(frames.len(), 4);
    assert_eq!(frames.last().unwrap(), "[DONE]");

    let finish: Value = serde_json::from_str(&frames[2]).unwrap();
    assert_eq!(finish["choices"][0]["delta"], json!({}));
    assert!(finish["choices"][0].get("finish_reason").is_none());
}

#[tokio::test]
async fn test_streaming_survives_error_markers_in_content() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    // The rejection markers appear inside generated text, after the
    // message opened. The classifier must not kill the stream for them.
    app.akash
        .mock_chat_body(&AkashTestData::chat_body(
            "msg-mk",
            &["The error was: ", "Invalid model name"],
            "stop",
        ))
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::streaming_chat_request("some-model"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let frames = sse_frames(&response.text());

    // role + 2 content + finish + [DONE]
    assert_eq!(frames.len(), 5);
    assert_eq!(frames.last().unwrap(), "[DONE]");
}

#[tokio::test]
async fn test_nonstandard_roles_are_forwarded_verbatim() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash
        .mock_chat_body(&AkashTestData::chat_body("msg-1", &["ok"], "stop"))
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&json!({
            "model": "some-model",
            "messages": [
                {"role": "developer", "content": "be terse"},
                {"role": "user", "content": "Hi"}
            ]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let requests = app.akash.chat_requests().await;
    let forwarded: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(forwarded["messages"][0]["role"], "developer");
    assert_eq!(forwarded["messages"][1]["role"], "user");
}

#[tokio::test]
async fn test_invalid_model_buffered_returns_fixed_error() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash.mock_chat_invalid_model().await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::chat_request("not-a-model"))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], 500);
    assert_eq!(body["data"]["msg"], "Error Model.");
}

#[tokio::test]
async fn test_invalid_model_streaming_fails_before_sse_starts() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash.mock_chat_invalid_model().await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::streaming_chat_request("not-a-model"))
        .await;

    // The rejection happens before any SSE bytes go out, so the client
    // gets a structured JSON error instead of a broken stream.
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/json"));

    let body: Value = response.json();
    assert_eq!(body["code"], 500);
    assert_eq!(body["data"]["msg"], "Error Model.");
}

#[tokio::test]
async fn test_body_without_message_start_is_bad_gateway() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash.mock_chat_body("0:\"orphan content\"\n").await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::streaming_chat_request("some-model"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], 502);
}

#[tokio::test]
async fn test_rejects_malformed_json() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .text("{not json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], 400);
    assert!(body["data"]["msg"]
        .as_str()
        .unwrap()
        .contains("Invalid request body"));
}

#[tokio::test]
async fn test_rejects_empty_messages() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&json!({"model": "some-model", "messages": []}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["data"]["msg"], "messages is required");
}

#[tokio::test]
async fn test_rejects_missing_model() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&json!({"messages": [{"role": "user", "content": "Hi"}]}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_top_p_accepts_camel_case_alias() {
    let app = TestApp::new().await;
    app.akash.mock_session_success().await;
    app.akash
        .mock_chat_body(&AkashTestData::chat_body("msg-1", &["ok"], "stop"))
        .await;

    app.server
        .post("/v1/chat/completions")
        .json(&json!({
            "model": "some-model",
            "messages": [{"role": "user", "content": "Hi"}],
            "topP": 0.42
        }))
        .await;

    let requests = app.akash.chat_requests().await;
    let forwarded: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(forwarded["topP"], json!(0.42));
}
