use async_trait::async_trait;
use thiserror::Error;

pub mod http_chat;
pub use http_chat::HttpCompletionEngine;

pub mod suggest;
pub use suggest::{default_next_intents, parse_next_intents, NextIntentSuggester};

#[derive(Debug, Error)]
#[error("completion error: {message}")]
pub struct CompletionError {
    pub message: String,
}

/// External text-completion collaborator.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Dummy implementation that always answers with empty text.
pub struct NullCompletionEngine;

#[async_trait]
impl CompletionEngine for NullCompletionEngine {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Ok(String::new())
    }
}
