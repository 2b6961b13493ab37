use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// API Key for the completion service, sent as a bearer token
    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true, value_parser = parse_api_key)]
    pub chat_api_key: String,

    /// Base URL for the completion service (e.g., https://api.openai.com)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let the adapter handle it if None
    pub chat_base_url: Option<String>,

    /// Model name for chat completion (e.g., gpt-3.5-turbo, gpt-4o)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter default if None
    pub chat_model: Option<String>,

    /// Seconds to wait for the completion service before giving up on a turn.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

fn parse_api_key(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err("API key must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}
