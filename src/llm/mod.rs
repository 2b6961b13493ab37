pub mod chat;

use std::time::Duration;

use crate::models::chat::DEFAULT_CHAT_MODEL;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub completion_model: Option<String>,
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn completion_model(&self) -> &str {
        self.completion_model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            completion_model: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
