// HTTP-level tests for the reqwest transport against a local mock server
// Author: kelexine (https://github.com/kelexine)

use marginalia::api::ApiClient;
use marginalia::config::ApiConfig;
use marginalia::error::AssistError;
use marginalia::models::ChatMessage;
use marginalia::settings::ApiKey;
use mockito::Matcher;
use serde_json::json;

fn config_for(server: &mockito::ServerGuard) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}/api/v1", server.url()),
        timeout_seconds: 5,
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn test_completion_request_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/chat/completions")
        .match_header("authorization", "Bearer sk-or-v1-test")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "model": "openai/gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Explain this\n\nText: carpe diem" }
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Seize the day."}}]}"#)
        .create_async()
        .await;

    let client = ApiClient::from_config(&config_for(&server)).unwrap();
    let answer = client
        .complete(
            &ApiKey::new("sk-or-v1-test"),
            "openai/gpt-4o-mini",
            &[
                ChatMessage::system("Be brief."),
                ChatMessage::user("Explain this\n\nText: carpe diem"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(answer, "Seize the day.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_surfaces_as_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v1/chat/completions")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"message":"rate limited","code":429}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = ApiClient::from_config(&config_for(&server)).unwrap();
    let err = client
        .complete(&ApiKey::new("sk-or-v1-test"), "m", &[ChatMessage::user("hi")])
        .await
        .unwrap_err();

    match err {
        AssistError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_model_listing_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/models")
        .match_header("authorization", "Bearer sk-or-v1-test")
        .with_status(200)
        .with_body(
            r#"{"data":[
                {"id":"openai/gpt-4o-mini","name":"GPT-4o mini","description":"Small","context_length":128000,
                 "pricing":{"prompt":"0.00000015","completion":"0.0000006"}},
                {"id":"mistralai/mistral-7b-instruct","name":"Mistral 7B","description":"","context_length":32768,
                 "pricing":{"prompt":"0","completion":"0"}}
            ]}"#,
        )
        .create_async()
        .await;

    let client = ApiClient::from_config(&config_for(&server)).unwrap();
    let models = client
        .list_models(Some(&ApiKey::new("sk-or-v1-test")))
        .await
        .unwrap();

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].context_length, 128_000);
    assert_eq!(models[1].pricing.completion, "0");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_model_listing_without_key_sends_no_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/models")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;

    let client = ApiClient::from_config(&config_for(&server)).unwrap();
    let models = client.list_models(Some(&ApiKey::default())).await.unwrap();

    assert!(models.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let config = ApiConfig {
        // Port 9 (discard) is not listening on test hosts
        base_url: "http://127.0.0.1:9/api/v1".to_string(),
        timeout_seconds: 5,
        connect_timeout_seconds: 2,
        ..ApiConfig::default()
    };

    let client = ApiClient::from_config(&config).unwrap();
    let err = client
        .complete(&ApiKey::new("sk-or-v1-test"), "m", &[ChatMessage::user("hi")])
        .await
        .unwrap_err();

    assert!(matches!(err, AssistError::Network(_)), "got {:?}", err);
}
