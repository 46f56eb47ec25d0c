use std::sync::Arc;
use std::time::Duration;

use quantum_types::{PartialResponse, DEFAULT_NEXT_INTENTS, NEXT_INTENT_COUNT};
use tracing::warn;

use crate::CompletionEngine;

pub fn default_next_intents() -> Vec<String> {
    DEFAULT_NEXT_INTENTS.iter().map(|s| s.to_string()).collect()
}

/// Chooses the `nextIntents` of a response.
#[derive(Clone)]
pub enum NextIntentSuggester {
    /// Always the default pair.
    Static,
    /// Ask a completion engine, bounded by `timeout`.
    Completion {
        engine: Arc<dyn CompletionEngine>,
        timeout: Duration,
    },
}

impl NextIntentSuggester {
    pub fn completion(engine: Arc<dyn CompletionEngine>, timeout: Duration) -> Self {
        NextIntentSuggester::Completion { engine, timeout }
    }

    /// Always returns exactly [`NEXT_INTENT_COUNT`] intents.
    pub async fn suggest(&self, seed: &PartialResponse<'_>) -> Vec<String> {
        let (engine, timeout) = match self {
            NextIntentSuggester::Static => return default_next_intents(),
            NextIntentSuggester::Completion { engine, timeout } => (engine, *timeout),
        };

        let prompt = match build_prompt(seed) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not serialize completion seed; using default intents");
                return default_next_intents();
            }
        };

        match tokio::time::timeout(timeout, engine.complete(&prompt)).await {
            Ok(Ok(text)) => parse_next_intents(&text),
            Ok(Err(e)) => {
                warn!(error = %e, "completion engine failed; using default intents");
                default_next_intents()
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "completion engine timed out; using default intents"
                );
                default_next_intents()
            }
        }
    }
}

fn build_prompt(seed: &PartialResponse<'_>) -> Result<String, serde_json::Error> {
    let seed = serde_json::to_string(seed)?;
    Ok(format!(
        "Given the following API response:\n{seed}\n\
         Suggest exactly two next intents the client should request. \
         Answer with the two intent names separated by a comma and nothing else."
    ))
}

/// Turn free-form completion text into exactly two intents: split on commas
/// and newlines, trim, drop empties, cap, then pad from the defaults.
pub fn parse_next_intents(text: &str) -> Vec<String> {
    let mut intents: Vec<String> = text
        .split([',', '\n'])
        .map(|item| {
            item.trim()
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
                .trim_end_matches('.')
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .take(NEXT_INTENT_COUNT)
        .collect();

    for default in DEFAULT_NEXT_INTENTS {
        if intents.len() >= NEXT_INTENT_COUNT {
            break;
        }
        if !intents.iter().any(|i| i == default) {
            intents.push(default.to_string());
        }
    }
    intents
}
