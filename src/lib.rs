pub mod agent;
pub mod cli;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod repl;

use agent::ChatAgent;
use cli::Args;
use log::info;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Context Window: {} messages", history::CONTEXT_WINDOW);
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::from_args(&args)?);
    repl::run_repl(agent).await
}
