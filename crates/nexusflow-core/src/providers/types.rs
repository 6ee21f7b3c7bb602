//! Provider-agnostic types for the chat backends

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::types::Message;

/// Sampling temperature used by every backend
pub const TEMPERATURE: f32 = 0.7;

/// Everything an adapter needs to make one provider call
#[derive(Debug, Clone)]
pub struct ProviderRequest<'a> {
    pub system_instruction: &'a str,
    /// User prompt with injected context blocks
    pub prompt: &'a str,
    /// History for the active agent, oldest first. Adapters apply their own turn limit.
    pub history: &'a [Message],
    /// Model to use; backends with a fixed model ignore it
    pub model: &'a str,
    /// Whether the web fetch tool is active
    pub web_search: bool,
}

/// Text and grounding sources extracted from a provider response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderReply {
    pub text: String,
    pub sources: Vec<String>,
}

/// Coarse classification of provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Fatal to the call: the backend cannot be used as configured
    Configuration,
    /// Network or provider failure; a new call may succeed
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Transport(String),

    #[error("API error {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Configuration(_) => ProviderErrorKind::Configuration,
            Self::Transport(_) | Self::Status { .. } | Self::Decode(_) => ProviderErrorKind::Transport,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// A chat backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini", "ollama")
    fn provider_name(&self) -> &str;

    /// Maximum number of history turns sent with a request
    fn history_limit(&self) -> usize;

    /// Send one non-streamed request
    async fn send(&self, request: &ProviderRequest<'_>) -> Result<ProviderReply, ProviderError>;

    /// User-visible text describing a failed call
    fn failure_text(&self, err: &ProviderError) -> String;
}

/// The most recent `limit` user/assistant turns, oldest first
pub fn recent_turns(history: &[Message], limit: usize) -> Vec<&Message> {
    let turns: Vec<&Message> = history.iter().filter(|m| m.is_chat_turn()).collect();
    let skip = turns.len().saturating_sub(limit);
    turns.into_iter().skip(skip).collect()
}

/// Shared HTTP client with a request timeout
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
            Client::new()
        })
}

/// Remove duplicates, keeping the first occurrence of each entry
pub(crate) fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentMode, Role};

    fn history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(AgentMode::Coder, format!("q{}", i))
                } else {
                    Message::assistant(AgentMode::Coder, format!("a{}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_recent_turns_keeps_tail() {
        let h = history(20);
        let recent = recent_turns(&h, 15);
        assert_eq!(recent.len(), 15);
        assert_eq!(recent[0].content, "a5");
        assert_eq!(recent[14].content, "a19");
    }

    #[test]
    fn test_recent_turns_short_history() {
        let h = history(3);
        assert_eq!(recent_turns(&h, 10).len(), 3);
    }

    #[test]
    fn test_recent_turns_drops_system_messages() {
        let mut h = history(2);
        h.push(Message::new(Role::System, AgentMode::Coder, "boot"));
        let recent = recent_turns(&h, 10);
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ProviderError::Configuration("no key".into()).kind(),
            ProviderErrorKind::Configuration
        );
        assert_eq!(
            ProviderError::Transport("refused".into()).kind(),
            ProviderErrorKind::Transport
        );
        let status = ProviderError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "oops".into(),
        };
        assert_eq!(status.kind(), ProviderErrorKind::Transport);
        assert_eq!(status.to_string(), "API error 500 Internal Server Error: oops");
    }

    #[test]
    fn test_dedup_preserving_order() {
        let out = dedup_preserving_order(vec![
            "https://a".to_string(),
            "https://b".to_string(),
            "https://a".to_string(),
        ]);
        assert_eq!(out, vec!["https://a".to_string(), "https://b".to_string()]);
    }
}
