// Query engine tests against an in-process transport
// Author: kelexine (https://github.com/kelexine)

use async_trait::async_trait;
use marginalia::api::{ApiClient, HttpRequest, HttpResponse, Method, Transport};
use marginalia::cache::{fingerprint, history_fingerprint, ResponseCache};
use marginalia::config::ApiConfig;
use marginalia::error::{AssistError, Result};
use marginalia::models::{ChatMessage, Role};
use marginalia::session::Conversation;
use marginalia::settings::{MemoryBackend, SettingsStore, TaskPrompt, DEFAULT_SYSTEM_PROMPT};
use marginalia::QueryEngine;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// Records requests and answers them with a fixed responder.
struct MockTransport {
    responder: Responder,
    delay: Duration,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    fn new(responder: impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn slow(delay: Duration, answer: &'static str) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(move |_: &HttpRequest| Ok(completion(answer))),
            delay,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn answering(answer: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(completion(answer)))
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> HttpRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.responder)(&request)
    }
}

fn completion(answer: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: json!({
            "id": "gen-123",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": answer } }]
        })
        .to_string(),
    }
}

fn reply(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string(),
    }
}

fn engine(transport: Arc<MockTransport>, api_key: &str, model: &str) -> QueryEngine {
    let settings = Arc::new(SettingsStore::new(MemoryBackend::new(), "test"));
    settings.load().unwrap();
    settings.set_api_key(api_key).unwrap();
    settings.set_selected_model(model).unwrap();

    let transport: Arc<dyn Transport> = transport;
    let client = ApiClient::new(transport, &ApiConfig::default());
    QueryEngine::new(client, settings, Arc::new(ResponseCache::in_memory(100)))
}

fn ready_engine(transport: Arc<MockTransport>) -> QueryEngine {
    engine(transport, "sk-or-test", "openai/gpt-4o-mini")
}

fn explain() -> TaskPrompt {
    TaskPrompt::new("Explain", "Explain this")
}

fn body_of(request: &HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn test_single_query_builds_two_message_request() {
    let transport = MockTransport::answering("It means hello.");
    let engine = ready_engine(transport.clone());

    let answer = engine.query_single("Hello world", &explain()).await.unwrap();
    assert_eq!(answer, "It means hello.");

    let request = transport.request(0);
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "https://openrouter.ai/api/v1/chat/completions");
    assert_eq!(request.bearer.as_ref().unwrap().expose(), "sk-or-test");
    assert_eq!(
        body_of(&request),
        json!({
            "model": "openai/gpt-4o-mini",
            "messages": [
                { "role": "system", "content": DEFAULT_SYSTEM_PROMPT },
                { "role": "user", "content": "Explain this\n\nText: Hello world" }
            ]
        })
    );
}

#[tokio::test]
async fn test_repeated_query_hits_cache() {
    let transport = MockTransport::answering("answer");
    let engine = ready_engine(transport.clone());

    let first = engine.query_single("same text", &explain()).await.unwrap();
    let second = engine.query_single("same text", &explain()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.calls(), 1);
    assert_eq!(engine.cached_single("same text", &explain()), Some("answer".to_string()));
}

#[tokio::test]
async fn test_different_task_is_a_different_entry() {
    let transport = MockTransport::answering("answer");
    let engine = ready_engine(transport.clone());

    engine.query_single("text", &explain()).await.unwrap();
    engine
        .query_single("text", &TaskPrompt::new("Summarize", "Summarize this"))
        .await
        .unwrap();

    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_cache_hit_needs_no_credentials() {
    let transport = MockTransport::answering("unused");
    let engine = engine(transport.clone(), "", "");
    engine
        .cache()
        .put(&fingerprint("cached passage", "Explain this"), "from cache");

    let answer = engine.query_single("cached passage", &explain()).await.unwrap();
    assert_eq!(answer, "from cache");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_missing_api_key_makes_no_call() {
    let transport = MockTransport::answering("unused");
    let engine = engine(transport.clone(), "", "openai/gpt-4o-mini");

    let err = engine.query_single("text", &explain()).await.unwrap_err();
    assert!(matches!(err, AssistError::MissingApiKey));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_missing_model_makes_no_call() {
    let transport = MockTransport::answering("unused");
    let engine = engine(transport.clone(), "sk-or-test", "");

    let err = engine.query_single("text", &explain()).await.unwrap_err();
    assert!(matches!(err, AssistError::MissingModel));
    assert_eq!(transport.calls(), 0);

    let err = engine
        .query_with_history(&[ChatMessage::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, AssistError::MissingModel));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_unloaded_settings_are_reported() {
    let transport = MockTransport::answering("unused");
    let settings = Arc::new(SettingsStore::new(MemoryBackend::new(), "test"));
    let client = ApiClient::new(transport.clone(), &ApiConfig::default());
    let engine = QueryEngine::new(client, settings, Arc::new(ResponseCache::in_memory(10)));

    let err = engine.query_single("text", &explain()).await.unwrap_err();
    assert!(matches!(err, AssistError::SettingsNotInitialized));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_api_error_carries_server_message() {
    let transport =
        MockTransport::new(|_| Ok(reply(429, r#"{"error":{"message":"rate limited","code":429}}"#)));
    let engine = ready_engine(transport.clone());

    let err = engine.query_single("text", &explain()).await.unwrap_err();
    match err {
        AssistError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("expected Api error, got {:?}", other),
    }

    // Failures are not cached and not retried
    assert_eq!(transport.calls(), 1);
    let _ = engine.query_single("text", &explain()).await;
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_api_error_message_fallbacks() {
    let cases = [
        (r#"{"error":"Invalid API key"}"#, "Invalid API key"),
        (r#"{"message":"Service unavailable"}"#, "Service unavailable"),
        ("<html>Bad Gateway</html>", "Unknown error"),
        (r#"{"error":{"code":500}}"#, "Unknown error"),
    ];

    for (body, expected) in cases {
        let transport = MockTransport::new(move |_| Ok(reply(502, body)));
        let engine = ready_engine(transport);

        match engine.query_single("text", &explain()).await {
            Err(AssistError::Api { message, .. }) => assert_eq!(message, expected),
            other => panic!("expected Api error for {}, got {:?}", body, other),
        }
    }
}

#[tokio::test]
async fn test_non_200_success_status_is_an_api_error() {
    let transport = MockTransport::new(|_| Ok(reply(201, r#"{"choices":[]}"#)));
    let engine = ready_engine(transport);

    let err = engine.query_single("text", &explain()).await.unwrap_err();
    assert!(matches!(err, AssistError::Api { status: 201, .. }));
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
    let transport = MockTransport::new(|_| Ok(reply(200, "not json at all")));
    let engine = ready_engine(transport);

    let err = engine.query_single("text", &explain()).await.unwrap_err();
    assert!(matches!(err, AssistError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_missing_content_is_unexpected_shape() {
    for body in [r#"{"choices":[]}"#, r#"{"choices":[{"message":{}}]}"#, r#"{"id":"x"}"#] {
        let transport = MockTransport::new(move |_| Ok(reply(200, body)));
        let engine = ready_engine(transport);

        let err = engine.query_single("text", &explain()).await.unwrap_err();
        assert!(
            matches!(err, AssistError::UnexpectedResponseShape),
            "body {} gave {:?}",
            body,
            err
        );
    }
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let transport =
        MockTransport::new(|_| Err(AssistError::Network("connection refused".to_string())));
    let engine = ready_engine(transport);

    let err = engine.query_single("text", &explain()).await.unwrap_err();
    assert!(matches!(err, AssistError::Network(_)));
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn test_history_query_sends_full_transcript() {
    let transport = MockTransport::answering("because");
    let engine = ready_engine(transport.clone());

    let messages = vec![
        ChatMessage::system("sys"),
        ChatMessage::user("Explain this\n\nText: abc"),
        ChatMessage::assistant("It is the alphabet."),
        ChatMessage::user("Why?"),
    ];
    engine.query_with_history(&messages).await.unwrap();

    let body = body_of(&transport.request(0));
    assert_eq!(body["messages"], serde_json::to_value(&messages).unwrap());
    assert!(engine.cache().peek(&history_fingerprint("Why?")).is_some());
}

#[tokio::test]
async fn test_history_key_collides_on_last_message() {
    // Conversations ending in the same message share one cache slot even
    // though their earlier turns differ.
    let transport = MockTransport::answering("first conversation's answer");
    let engine = ready_engine(transport.clone());

    let first = vec![
        ChatMessage::system("sys"),
        ChatMessage::user("Explain this\n\nText: Moby Dick"),
        ChatMessage::assistant("A whale story."),
        ChatMessage::user("Tell me more"),
    ];
    let second = vec![
        ChatMessage::system("sys"),
        ChatMessage::user("Summarize\n\nText: Pride and Prejudice"),
        ChatMessage::assistant("A marriage story."),
        ChatMessage::user("Tell me more"),
    ];

    let a = engine.query_with_history(&first).await.unwrap();
    let b = engine.query_with_history(&second).await.unwrap();

    assert_eq!(a, b);
    assert_eq!(b, "first conversation's answer");
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_empty_history_is_rejected() {
    let transport = MockTransport::answering("unused");
    let engine = ready_engine(transport.clone());

    let err = engine.query_with_history(&[]).await.unwrap_err();
    assert!(matches!(err, AssistError::EmptyConversation));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_task_then_follow_up_builds_transcript() {
    let transport = MockTransport::new(|request| {
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        let turns = body["messages"].as_array().unwrap().len();
        Ok(completion(if turns == 2 { "first answer" } else { "second answer" }))
    });
    let engine = ready_engine(transport.clone());
    let mut conversation = Conversation::default();

    let first = engine
        .start_task(&mut conversation, "Hello world", &explain())
        .await
        .unwrap();
    let second = engine.follow_up(&mut conversation, "Why?").await.unwrap();

    assert_eq!(first, "first answer");
    assert_eq!(second, "second answer");
    assert_eq!(
        conversation.messages(),
        &[
            ChatMessage::system(DEFAULT_SYSTEM_PROMPT),
            ChatMessage::user("Explain this\n\nText: Hello world"),
            ChatMessage::assistant("first answer"),
            ChatMessage::user("Why?"),
            ChatMessage::assistant("second answer"),
        ]
    );

    let follow_up_body = body_of(&transport.request(1));
    assert_eq!(follow_up_body["messages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_failed_follow_up_keeps_question() {
    let transport = MockTransport::new(|_| Ok(reply(500, r#"{"error":{"message":"boom"}}"#)));
    let engine = ready_engine(transport);
    let mut conversation = Conversation::new("sys");
    conversation.reset("text", "Explain this");

    let err = engine.follow_up(&mut conversation, "Why?").await.unwrap_err();
    assert!(matches!(err, AssistError::Api { .. }));

    let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::User]);
}

#[tokio::test]
async fn test_run_task_resolves_named_task() {
    let transport = MockTransport::answering("summary");
    let engine = ready_engine(transport.clone());

    assert_eq!(engine.run_task("text", "Summarize").await.unwrap(), "summary");
    let body = body_of(&transport.request(0));
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .starts_with("Summarize the following text"));

    let err = engine.run_task("text", "Limerick").await.unwrap_err();
    assert!(matches!(err, AssistError::UnknownTask(name) if name == "Limerick"));
}

#[tokio::test]
async fn test_concurrent_duplicate_queries_make_one_call() {
    let transport = MockTransport::slow(Duration::from_millis(50), "only once");
    let engine = ready_engine(transport.clone());
    let task = explain();

    let (a, b) = tokio::join!(
        engine.query_single("shared passage", &task),
        engine.query_single("shared passage", &task)
    );

    assert_eq!(a.unwrap(), "only once");
    assert_eq!(b.unwrap(), "only once");
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_refresh_models_stores_catalog() {
    let transport = MockTransport::new(|request| {
        assert_eq!(request.method, Method::Get);
        Ok(reply(
            200,
            r#"{"data":[{"id":"meta-llama/llama-3-8b-instruct","name":"Llama 3 8B","description":"","context_length":8192,"pricing":{"prompt":"0.0000001","completion":"0.0000001"}}]}"#,
        ))
    });
    let engine = ready_engine(transport.clone());

    let models = engine.refresh_models().await.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(transport.request(0).url, "https://openrouter.ai/api/v1/models");
    assert_eq!(
        engine.settings().models().unwrap()[0].id,
        "meta-llama/llama-3-8b-instruct"
    );
}
