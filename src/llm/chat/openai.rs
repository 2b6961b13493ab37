use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use std::time::Duration;

use super::{ validate_request, ChatClient };
use crate::error::ChatError;
use crate::llm::LlmConfig;
use crate::models::chat::{ CompletionRequest, CompletionResponse };

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const MAX_ERROR_BODY_CHARS: usize = 200;

pub struct OpenAIChatClient {
    http: HttpClient,
    base_url: String,
}

impl OpenAIChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ChatError::Network)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        Self::new(config.base_url(), config.request_timeout)
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH)
    }
}

fn bearer(api_key: &str) -> Result<HeaderValue, ChatError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
        ChatError::InvalidRequest(format!("Invalid API key format: {}", e))
    )?;
    value.set_sensitive(true);
    Ok(value)
}

/// Prefers the service's `error.message`; otherwise the raw body, cut to a
/// single readable line length.
fn summarize_error_body(body: &str) -> String {
    let text = serde_json
        ::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if text.chars().count() > MAX_ERROR_BODY_CHARS {
        let mut cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        text
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, ChatError> {
        validate_request(api_key, request)?;
        let url = self.endpoint();
        debug!(
            "POST {} (model={}, messages={})",
            url,
            request.model,
            request.messages.len()
        );

        let resp = self.http
            .post(&url)
            .header(AUTHORIZATION, bearer(api_key)?)
            .json(request)
            .send().await
            .map_err(ChatError::Network)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Completion service responded with {}", status);
            debug!("Error body: {}", body);
            return Err(ChatError::HttpStatus {
                status: status.as_u16(),
                body: summarize_error_body(&body),
            });
        }

        let body = resp.text().await.map_err(ChatError::Network)?;
        let response: CompletionResponse = serde_json::from_str(&body)?;
        debug!("Completion service returned {} choice(s)", response.choices.len());
        Ok(response)
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::{ Message, Role };
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> OpenAIChatClient {
        OpenAIChatClient::new(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("gpt-3.5-turbo", vec![Message::user("hello")])
    }

    #[tokio::test]
    async fn posts_json_with_bearer_credential() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("Authorization", "Bearer sk-test")
                .json_body(
                    json!({
                    "model": "gpt-3.5-turbo",
                    "messages": [{ "role": "user", "content": "hello" }]
                })
                );
            then.status(200).json_body(
                json!({
                    "choices": [{ "message": { "role": "assistant", "content": "hi!" } }]
                })
            );
        }).await;

        let response = client_for(&server).complete("sk-test", &request()).await.unwrap();

        mock.assert_async().await;
        let reply = response.first_message().unwrap();
        assert_eq!(reply.role(), Role::Assistant);
        assert_eq!(reply.content(), "hi!");
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_code() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("invalid api key");
        }).await;

        let err = client_for(&server).complete("sk-bad", &request()).await.unwrap_err();
        match err {
            ChatError::HttpStatus { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("expected HttpStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn long_error_pages_are_cut_short() {
        let server = MockServer::start_async().await;
        let page = format!("<html><body>{}</body></html>", "bad gateway ".repeat(400));
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(502).body(page);
        }).await;

        let err = client_for(&server).complete("sk-test", &request()).await.unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().len() < 300);
    }

    #[test]
    fn error_body_prefers_the_service_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(summarize_error_body(body), "Incorrect API key provided");
    }

    #[test]
    fn error_body_is_capped() {
        let summary = summarize_error_body(&"x".repeat(5000));
        assert_eq!(summary.chars().count(), MAX_ERROR_BODY_CHARS + 3);
        assert!(summary.ends_with("..."));
        assert_eq!(summarize_error_body("  short  "), "short");
    }

    #[tokio::test]
    async fn slow_service_times_out_as_network_failure() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).delay(Duration::from_secs(3));
        }).await;
        let client = OpenAIChatClient::new(&server.base_url(), Duration::from_millis(300)).unwrap();

        let err = client.complete("sk-test", &request()).await.unwrap_err();

        assert!(matches!(err, ChatError::Network(_)));
        assert_eq!(err.to_string(), "network error: request timed out");
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_failure() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body("{\"choices\": [");
        }).await;

        let err = client_for(&server).complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }

    #[tokio::test]
    async fn missing_choices_is_a_decode_failure() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "id": "x" }));
        }).await;

        let err = client_for(&server).complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_choices_parse_but_have_no_first_message() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        }).await;

        let response = client_for(&server).complete("sk-test", &request()).await.unwrap();
        assert!(matches!(response.first_message(), Err(ChatError::EmptyChoices)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let client = OpenAIChatClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Network(_)));
    }

    #[tokio::test]
    async fn invalid_requests_never_hit_the_server() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST);
            then.status(200);
        }).await;
        let client = client_for(&server);

        let empty = CompletionRequest::new("gpt-3.5-turbo", Vec::new());
        assert!(matches!(client.complete("sk-test", &empty).await, Err(ChatError::InvalidRequest(_))));
        assert!(matches!(client.complete("", &request()).await, Err(ChatError::InvalidRequest(_))));
        assert!(
            matches!(client.complete("bad\nkey", &request()).await, Err(ChatError::InvalidRequest(_)))
        );

        assert_eq!(mock.hits_async().await, 0);
    }
}
