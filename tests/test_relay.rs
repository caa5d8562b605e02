//! End-to-end relay tests against a mocked upstream.
//!
//! Every test drives `Relay::handle` with a recording sink and checks that
//! exactly one reply was produced, whatever the upstream did.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relay_bot::config::LlmConfig;
use relay_bot::error::AppError;
use relay_bot::llm::OpenAiCompatibleProvider;
use relay_bot::relay::{
    ConversationId, InboundMessage, PARSE_FAILURE_NOTICE, Relay, RelayOutcome, ReplySink,
};

// ── helpers ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSink {
    typing: Mutex<Vec<ConversationId>>,
    replies: Mutex<Vec<(ConversationId, String)>>,
    fail_typing: bool,
    fail_reply: bool,
}

impl RecordingSink {
    fn failing_typing() -> Self {
        Self { fail_typing: true, ..Default::default() }
    }

    /// Records the attempt, then reports a delivery failure.
    fn failing_reply() -> Self {
        Self { fail_reply: true, ..Default::default() }
    }

    fn replies(&self) -> Vec<(ConversationId, String)> {
        self.replies.lock().unwrap().clone()
    }

    fn only_reply(&self) -> String {
        let replies = self.replies();
        assert_eq!(replies.len(), 1, "expected exactly one reply, got {replies:?}");
        replies[0].1.clone()
    }
}

impl ReplySink for RecordingSink {
    async fn send_typing(&self, conversation: ConversationId) -> Result<(), AppError> {
        self.typing.lock().unwrap().push(conversation);
        if self.fail_typing {
            return Err(AppError::Channel("typing unavailable".into()));
        }
        Ok(())
    }

    async fn send_reply(&self, message: &InboundMessage, text: String) -> Result<(), AppError> {
        self.replies.lock().unwrap().push((message.conversation, text));
        if self.fail_reply {
            return Err(AppError::Channel("chat unreachable".into()));
        }
        Ok(())
    }
}

fn llm_config(base_url: &str, timeout_seconds: u64) -> LlmConfig {
    LlmConfig {
        base_url: base_url.to_string(),
        api_key: "sk-test".into(),
        model: "test-model".into(),
        system_prompt: "You are a helpful assistant.".into(),
        timeout_seconds,
    }
}

fn relay_for(base_url: &str, timeout_seconds: u64) -> Relay {
    let provider = OpenAiCompatibleProvider::new(&llm_config(base_url, timeout_seconds)).unwrap();
    Relay::new(provider)
}

fn inbound(text: &str) -> InboundMessage {
    InboundMessage {
        conversation: ConversationId(42),
        message_id: Some(7),
        text: text.to_string(),
    }
}

// ── outcomes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn success_replies_with_content_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "hi"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::default();
    let outcome = relay.handle(&sink, &inbound("hello")).await;

    assert_eq!(outcome, RelayOutcome::Success);
    assert_eq!(sink.only_reply(), "hi");
    assert_eq!(sink.replies()[0].0, ConversationId(42));
    assert_eq!(*sink.typing.lock().unwrap(), vec![ConversationId(42)]);
}

#[tokio::test]
async fn request_carries_auth_and_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": "test-model",
            "messages": [
                {"role": "system", "content": "You are a helpful assistant."},
                {"role": "user", "content": "  untrimmed text  "}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "matched"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::default();
    relay.handle(&sink, &inbound("  untrimmed text  ")).await;

    assert_eq!(sink.only_reply(), "matched");
}

#[tokio::test]
async fn base_url_with_v1_is_not_duplicated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&format!("{}/v1/", server.uri()), 5);
    let sink = RecordingSink::default();
    let outcome = relay.handle(&sink, &inbound("ping")).await;

    assert_eq!(outcome, RelayOutcome::Success);
    assert_eq!(sink.only_reply(), "ok");
}

#[tokio::test]
async fn upstream_error_embeds_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server overloaded"))
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::default();
    let outcome = relay.handle(&sink, &inbound("hello")).await;

    assert_eq!(outcome, RelayOutcome::UpstreamError);
    let reply = sink.only_reply();
    assert!(reply.contains("500"), "reply: {reply}");
    assert!(reply.contains("server overloaded"), "reply: {reply}");
}

#[tokio::test]
async fn created_status_with_valid_body_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "choices": [{"message": {"content": "hi"}}]
        })))
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::default();
    let outcome = relay.handle(&sink, &inbound("hello")).await;

    assert_eq!(outcome, RelayOutcome::UpstreamError);
    let reply = sink.only_reply();
    assert!(reply.contains("201"), "reply: {reply}");
    assert_ne!(reply, "hi");
}

#[tokio::test]
async fn accepted_and_no_content_statuses_are_upstream_errors() {
    for (status, body) in [(202, r#"{"error":"queued"}"#), (204, "")] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;

        let relay = relay_for(&server.uri(), 5);
        let sink = RecordingSink::default();
        let outcome = relay.handle(&sink, &inbound("hello")).await;

        assert_eq!(outcome, RelayOutcome::UpstreamError, "status {status}");
        let reply = sink.only_reply();
        assert!(reply.contains(&status.to_string()), "reply: {reply}");
        assert!(reply.contains(body), "reply: {reply}");
    }
}

#[tokio::test]
async fn wrong_shape_gets_parse_notice_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": "shape"})))
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::default();
    let outcome = relay.handle(&sink, &inbound("hello")).await;

    assert_eq!(outcome, RelayOutcome::ParseFailure);
    let reply = sink.only_reply();
    assert_eq!(reply, PARSE_FAILURE_NOTICE);
    assert!(!reply.contains("unexpected"));
}

#[tokio::test]
async fn non_json_success_gets_parse_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::default();

    assert_eq!(relay.handle(&sink, &inbound("hello")).await, RelayOutcome::ParseFailure);
    assert!(!sink.only_reply().contains("gateway"));
}

#[tokio::test]
async fn slow_upstream_times_out_with_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 1);
    let sink = RecordingSink::default();
    let started = Instant::now();
    let outcome = relay.handle(&sink, &inbound("hello")).await;

    assert!(started.elapsed() < Duration::from_secs(5), "relay did not honour the timeout");
    assert_eq!(outcome, RelayOutcome::InternalError);
    assert!(!sink.only_reply().contains("late"));
}

#[tokio::test]
async fn unreachable_upstream_is_internal_error() {
    // Port 9 (discard) on localhost is reliably closed in CI.
    let relay = relay_for("http://127.0.0.1:9", 2);
    let sink = RecordingSink::default();

    assert_eq!(relay.handle(&sink, &inbound("hello")).await, RelayOutcome::InternalError);
    assert!(sink.only_reply().starts_with("💥 Internal error: "));
}

#[tokio::test]
async fn invalid_base_url_is_internal_error() {
    let relay = relay_for("not a url", 2);
    let sink = RecordingSink::default();

    assert_eq!(relay.handle(&sink, &inbound("hello")).await, RelayOutcome::InternalError);
    assert_eq!(sink.replies().len(), 1);
}

#[tokio::test]
async fn typing_failure_does_not_block_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "still here"}}]
        })))
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::failing_typing();

    assert_eq!(relay.handle(&sink, &inbound("hello")).await, RelayOutcome::Success);
    assert_eq!(sink.only_reply(), "still here");
}

#[tokio::test]
async fn failed_delivery_is_attempted_once_and_keeps_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::failing_reply();
    let outcome = relay.handle(&sink, &inbound("hello")).await;

    assert_eq!(outcome, RelayOutcome::UpstreamError);
    assert!(sink.only_reply().contains("boom"));
}

#[tokio::test]
async fn failed_delivery_of_success_still_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "undelivered"}}]
        })))
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::failing_reply();

    assert_eq!(relay.handle(&sink, &inbound("hello")).await, RelayOutcome::Success);
    assert_eq!(sink.replies().len(), 1);
    assert_eq!(sink.only_reply(), "undelivered");
}

#[tokio::test]
async fn each_message_is_an_independent_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "same"}}]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let relay = relay_for(&server.uri(), 5);
    let sink = RecordingSink::default();
    for _ in 0..3 {
        relay.handle(&sink, &inbound("repeat")).await;
    }

    assert_eq!(sink.replies().len(), 3);
}
