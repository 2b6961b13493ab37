pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use super::LlmConfig;
use self::openai::OpenAIChatClient;
use crate::error::ChatError;
use crate::models::chat::{ CompletionRequest, CompletionResponse };

/// One request/response exchange with a remote completion service.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, ChatError>;

    fn get_base_url(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ChatError> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}

/// Rejects requests that must never reach the network.
pub fn validate_request(api_key: &str, request: &CompletionRequest) -> Result<(), ChatError> {
    if api_key.trim().is_empty() {
        return Err(ChatError::InvalidRequest("API key must not be empty".to_string()));
    }
    if request.messages.is_empty() {
        return Err(ChatError::InvalidRequest("request must carry at least one message".to_string()));
    }
    Ok(())
}
