//! Agent router: picks a backend and model per request and normalizes the result

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::google::{GEMINI_MODEL, GoogleProvider};
use super::ollama::{DEFAULT_OLLAMA_URL, OllamaProvider};
use super::types::{ChatProvider, ProviderRequest};
use crate::context::compose_system_instruction;
use crate::handoff::extract_handoff;
use crate::injector::inject_context;
use crate::types::{AgentMode, Message, OrchestrationRequest, OrchestrationResult, SuggestionLevel};

/// Which backend serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    #[serde(alias = "cloud")]
    Gemini,
    #[serde(alias = "local")]
    Ollama,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Why the local base URL was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBaseUrl {
    #[error("invalid base URL '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL scheme '{scheme}' in '{url}' (expected http or https)")]
    Scheme { url: String, scheme: String },
}

/// Read-only configuration consulted on every call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    /// Model for coordination agents (CHAT, PLAN, MONITOR)
    #[serde(default = "default_general_model")]
    pub general_model: String,
    /// Model for technical agents; empty means use `general_model`
    #[serde(default)]
    pub coding_model: String,
    #[serde(default)]
    pub suggestion_level: SuggestionLevel,
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_general_model() -> String {
    "llama3".to_string()
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            ollama_url: default_ollama_url(),
            general_model: default_general_model(),
            coding_model: String::new(),
            suggestion_level: SuggestionLevel::default(),
        }
    }
}

impl RouterSettings {
    /// Check the local base URL is a usable http(s) URL
    pub fn validate(&self) -> Result<(), InvalidBaseUrl> {
        let parsed = url::Url::parse(&self.ollama_url).map_err(|source| InvalidBaseUrl::Parse {
            url: self.ollama_url.clone(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(InvalidBaseUrl::Scheme {
                url: self.ollama_url.clone(),
                scheme: parsed.scheme().to_string(),
            });
        }
        Ok(())
    }

    /// Local model for an agent: coding model for technical agents unless unset
    pub fn local_model_for(&self, agent: AgentMode) -> &str {
        if agent.is_technical() && !self.coding_model.trim().is_empty() {
            &self.coding_model
        } else {
            &self.general_model
        }
    }

    /// Model identifier a request for `agent` resolves to
    pub fn model_for(&self, agent: AgentMode) -> &str {
        match self.provider {
            ProviderKind::Gemini => GEMINI_MODEL,
            ProviderKind::Ollama => self.local_model_for(agent),
        }
    }
}

/// Routes orchestration requests to the configured backend
pub struct AgentRouter {
    settings: RouterSettings,
    cloud: Box<dyn ChatProvider>,
    local: Box<dyn ChatProvider>,
}

impl AgentRouter {
    /// Build a router with the real Gemini and Ollama backends
    pub fn from_settings(settings: RouterSettings, api_key: Option<String>) -> Self {
        let cloud = Box::new(GoogleProvider::new(api_key));
        let local = Box::new(OllamaProvider::new(settings.ollama_url.clone()));
        Self::new(settings, cloud, local)
    }

    pub fn new(
        settings: RouterSettings,
        cloud: Box<dyn ChatProvider>,
        local: Box<dyn ChatProvider>,
    ) -> Self {
        info!(
            "AgentRouter: provider={}, general={}, coding={}",
            settings.provider,
            settings.general_model,
            if settings.coding_model.is_empty() {
                "(general)"
            } else {
                settings.coding_model.as_str()
            }
        );
        Self {
            settings,
            cloud,
            local,
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    fn provider(&self) -> &dyn ChatProvider {
        match self.settings.provider {
            ProviderKind::Gemini => self.cloud.as_ref(),
            ProviderKind::Ollama => self.local.as_ref(),
        }
    }

    /// Send one request and return a uniform result. Never fails: provider
    /// errors become a labeled error reply.
    pub async fn route(&self, request: &OrchestrationRequest) -> OrchestrationResult {
        let provider = self.provider();
        let model = self.settings.model_for(request.agent);

        let system_instruction = compose_system_instruction(
            request.agent,
            &request.project_summary,
            &request.tasks,
            self.settings.suggestion_level,
        );
        let prompt = inject_context(&request.tools, &request.prompt);
        let history: Vec<Message> = request
            .history
            .iter()
            .filter(|m| m.agent == request.agent)
            .cloned()
            .collect();

        debug!(
            "Routing {} via {} (model={}, history={}, limit={})",
            request.agent,
            provider.provider_name(),
            model,
            history.len(),
            provider.history_limit()
        );

        let provider_request = ProviderRequest {
            system_instruction: &system_instruction,
            prompt: &prompt,
            history: &history,
            model,
            web_search: request.tools.fetch.active,
        };

        match provider.send(&provider_request).await {
            Ok(reply) => {
                let handoff = extract_handoff(&reply.text);
                OrchestrationResult {
                    text: handoff.text,
                    sources: if reply.sources.is_empty() {
                        None
                    } else {
                        Some(reply.sources)
                    },
                    suggested_agent: handoff.suggested_agent,
                    is_error: false,
                }
            }
            Err(e) => {
                warn!(
                    "Provider {} failed ({:?}): {}",
                    provider.provider_name(),
                    e.kind(),
                    e
                );
                OrchestrationResult::error(provider.failure_text(&e))
            }
        }
    }
}
