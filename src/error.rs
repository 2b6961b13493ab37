use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("network error: {}", describe_network(.0))]
    Network(#[source] reqwest::Error),

    #[error("completion service returned HTTP {status}{}", format_body(.body))]
    HttpStatus {
        status: u16,
        body: String,
    },

    #[error("could not decode completion response: {0}")]
    Decode(String),

    #[error("completion response contained no choices")]
    EmptyChoices,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("a message is already being sent")]
    Busy,
}

impl ChatError {
    /// True for any response whose body did not have the expected shape.
    pub fn is_decode(&self) -> bool {
        matches!(self, ChatError::Decode(_) | ChatError::EmptyChoices)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn describe_network(err: &reqwest::Error) -> String {
    if err.is_timeout() { "request timed out".to_string() } else { err.to_string() }
}

fn format_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() { String::new() } else { format!(": {}", body) }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Decode(err.to_string())
    }
}
