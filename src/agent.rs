use crate::cli::Args;
use crate::error::ChatError;
use crate::history::ConversationStore;
use crate::llm::LlmConfig;
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::models::chat::{ CompletionRequest, Message };

use log::{ debug, error, info, warn };
use std::error::Error;
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// State changes published to presentation code.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// One message was added to the end of the conversation.
    MessageAppended(Message),
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Blank input; nothing was sent or stored.
    Ignored,
    Replied(Message),
}

#[derive(Default)]
struct SessionState {
    store: ConversationStore,
    is_loading: bool,
    last_error: Option<String>,
}

pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    api_key: String,
    model: String,
    session_id: String,
    state: Mutex<SessionState>,
    events: broadcast::Sender<ChatEvent>,
}

/// Clears the loading flag when a send finishes or its future is dropped.
struct LoadingGuard<'a> {
    agent: &'a ChatAgent,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.agent.lock_state();
        state.is_loading = false;
        self.agent.publish(ChatEvent::LoadingChanged(false));
    }
}

impl ChatAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        api_key: impl Into<String>,
        model: impl Into<String>
    ) -> Result<Self, ChatError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ChatError::InvalidRequest("API key must not be empty".to_string()));
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session_id = Uuid::new_v4().to_string();
        info!("Started chat session {}", session_id);

        Ok(Self {
            chat_client,
            api_key,
            model: model.into(),
            session_id,
            state: Mutex::new(SessionState::default()),
            events,
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig {
            base_url: args.chat_base_url.clone(),
            completion_model: args.chat_model.clone(),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={}, Timeout={:?}",
            chat_config.completion_model(),
            chat_client.get_base_url(),
            chat_config.request_timeout
        );
        Ok(Self::new(chat_client, args.chat_api_key.clone(), chat_config.completion_model())?)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_state().store.messages().to_vec()
    }

    /// Messages the next request would carry, before the new user turn is added.
    pub fn context_window(&self) -> Vec<Message> {
        self.lock_state().store.context_window().to_vec()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// Runs one user turn. Overlapping calls are rejected with `ChatError::Busy`
    /// while a previous turn is still waiting on the completion service.
    pub async fn send_message(&self, text: &str) -> Result<TurnOutcome, ChatError> {
        if text.trim().is_empty() {
            debug!("[{}] Ignoring blank message", self.session_id);
            return Ok(TurnOutcome::Ignored);
        }

        let context = {
            let mut state = self.lock_state();
            if state.is_loading {
                warn!("[{}] Rejected message while a reply is pending", self.session_id);
                return Err(ChatError::Busy);
            }
            let message = Message::user(text);
            state.store.append(message.clone());
            self.publish(ChatEvent::MessageAppended(message));
            state.is_loading = true;
            self.publish(ChatEvent::LoadingChanged(true));
            if state.last_error.take().is_some() {
                self.publish(ChatEvent::ErrorChanged(None));
            }
            state.store.context_window().to_vec()
        };
        let _loading = LoadingGuard { agent: self };

        info!(
            "[{}] Sending {} message(s) of context to the completion service",
            self.session_id,
            context.len()
        );
        let request = CompletionRequest::new(self.model.clone(), context);
        let result = self.chat_client
            .complete(&self.api_key, &request).await
            .and_then(|response| response.first_message().map(|m| m.content().to_string()));

        // The state lock must be released before `_loading` drops.
        let mut state = self.lock_state();
        let outcome = match result {
            Ok(content) => {
                let reply = Message::assistant(content);
                state.store.append(reply.clone());
                self.publish(ChatEvent::MessageAppended(reply.clone()));
                debug!("[{}] Conversation now holds {} message(s)", self.session_id, state.store.len());
                Ok(TurnOutcome::Replied(reply))
            }
            Err(e) => {
                error!("[{}] Completion failed: {}", self.session_id, e);
                let description = format!("Error: {}", e);
                state.last_error = Some(description.clone());
                self.publish(ChatEvent::ErrorChanged(Some(description)));
                Err(e)
            }
        };
        drop(state);
        outcome
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ChatEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
