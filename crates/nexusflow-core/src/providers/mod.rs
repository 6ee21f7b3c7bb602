//! Chat backends
//!
//! Gemini (cloud) and Ollama (local) implement the [`ChatProvider`] trait and
//! are selected per request by [`AgentRouter`] from [`RouterSettings`].

pub mod google;
pub mod ollama;
pub mod router;
pub mod types;

pub use google::GoogleProvider;
pub use ollama::{FALLBACK_MODELS, OllamaProvider};
pub use router::{AgentRouter, InvalidBaseUrl, ProviderKind, RouterSettings};
pub use types::{ChatProvider, ProviderError, ProviderErrorKind, ProviderReply, ProviderRequest};
