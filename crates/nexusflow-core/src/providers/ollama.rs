//! Ollama provider (local backend) using the native `/api/chat` endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{
    ChatProvider, ProviderError, ProviderReply, ProviderRequest, TEMPERATURE, http_client,
    recent_turns,
};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Turns of history sent to Ollama
pub const OLLAMA_HISTORY_LIMIT: usize = 10;

/// Offered when the model list cannot be fetched
pub const FALLBACK_MODELS: &[&str] = &[
    "llama3",
    "mistral",
    "codellama",
    "qwen2.5-coder",
    "gemma",
    "deepseek-coder",
    "phi3",
];

const REMEDIATION_TIP: &str = "Tip: Make sure Ollama is running and run 'launchctl setenv OLLAMA_ORIGINS \"*\"' \
(or export OLLAMA_ORIGINS=\"*\") to allow browser requests, then restart Ollama.";

const NO_BROWSING_NOTE: &str = "# WEB FETCH\n\n\
Local models cannot browse the web directly. Any URL named in the request is advisory only; \
answer from your own knowledge and say when live information would be needed.";

/// Ollama API client
#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OllamaProvider {
    /// Create a client for the given base URL; a trailing slash is ignored
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = if base_url.trim().is_empty() {
            DEFAULT_OLLAMA_URL.to_string()
        } else {
            base_url.trim().trim_end_matches('/').to_string()
        };
        Self {
            client: http_client(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List installed model names via `GET /api/tags`
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Status { status, body });
        }

        let tags: OllamaTagsResponse = response.json().await?;
        debug!("Ollama reports {} model(s)", tags.models.len());
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Which of `required` are not installed. Empty names are skipped.
    pub async fn missing_models(&self, required: &[&str]) -> Result<Vec<String>, ProviderError> {
        let available = self.list_models().await?;
        let missing = required
            .iter()
            .filter(|name| !name.is_empty())
            .filter(|name| !is_installed(&available, name))
            .map(|name| name.to_string())
            .collect();
        Ok(missing)
    }

    fn build_messages(request: &ProviderRequest<'_>, history_limit: usize) -> Vec<OllamaMessage> {
        let mut system = request.system_instruction.to_string();
        if request.web_search {
            system.push_str("\n\n");
            system.push_str(NO_BROWSING_NOTE);
        }

        let mut messages = vec![OllamaMessage {
            role: "system".to_string(),
            content: system,
        }];
        messages.extend(
            recent_turns(request.history, history_limit)
                .into_iter()
                .map(|m| OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                }),
        );
        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: request.prompt.to_string(),
        });
        messages
    }
}

/// Ollama lists `llama3` as `llama3:latest`; accept either spelling
fn is_installed(available: &[String], name: &str) -> bool {
    available
        .iter()
        .any(|m| m == name || m.strip_suffix(":latest") == Some(name))
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn history_limit(&self) -> usize {
        OLLAMA_HISTORY_LIMIT
    }

    async fn send(&self, request: &ProviderRequest<'_>) -> Result<ProviderReply, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: request.model.to_string(),
            messages: Self::build_messages(request, self.history_limit()),
            stream: false,
            options: OllamaOptions {
                temperature: TEMPERATURE,
            },
        };

        debug!(
            "Sending request to Ollama: model={}, messages={}",
            body.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Ollama returned {}: {}", status, body);
            return Err(ProviderError::Status { status, body });
        }

        let api_response: OllamaChatResponse = response.json().await?;
        debug!("Ollama response done={}", api_response.done);

        Ok(ProviderReply {
            text: api_response.message.content,
            sources: Vec::new(),
        })
    }

    fn failure_text(&self, err: &ProviderError) -> String {
        let detail = match err {
            ProviderError::Status { status, .. } => format!(
                "Ollama API Error: {}. Ensure Ollama is running and OLLAMA_ORIGINS=\"*\" is set.",
                status
            ),
            ProviderError::Transport(e) => format!(
                "Failed to connect to Ollama at {} ({}). The service may not be running or may be rejecting cross-origin requests.",
                self.base_url, e
            ),
            other => other.to_string(),
        };
        format!("[LOCAL KERNEL ERROR]: {}\n\n{}", detail, REMEDIATION_TIP)
    }
}

// ── Ollama wire types ──

#[derive(Debug, Clone, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaModelTag {
    name: String,
}
