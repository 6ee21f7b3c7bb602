//! Google Gemini provider (cloud backend)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    ChatProvider, ProviderError, ProviderReply, ProviderRequest, TEMPERATURE,
    dedup_preserving_order, http_client, recent_turns,
};
use crate::types::Role;

/// Model used for every cloud request
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Turns of history sent to Gemini
pub const GEMINI_HISTORY_LIMIT: usize = 15;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const EMPTY_REPLY: &str = "No response generated.";

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("model", &GEMINI_MODEL)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl GoogleProvider {
    /// A missing or empty key is reported per call as a configuration error
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API endpoint (used by tests and proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert the last `limit` history turns plus the effective prompt to Gemini contents
    fn to_gemini_contents(request: &ProviderRequest<'_>, limit: usize) -> Vec<GeminiContent> {
        let mut contents: Vec<GeminiContent> = recent_turns(request.history, limit)
            .into_iter()
            .map(|m| GeminiContent {
                role: match m.role {
                    Role::Assistant => "model".to_string(),
                    _ => "user".to_string(),
                },
                parts: vec![GeminiPart::text(&m.content)],
            })
            .collect();
        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart::text(request.prompt)],
        });
        contents
    }

    fn build_body(request: &ProviderRequest<'_>, history_limit: usize) -> GeminiRequest {
        GeminiRequest {
            contents: Self::to_gemini_contents(request, history_limit),
            system_instruction: GeminiContent {
                role: String::new(),
                parts: vec![GeminiPart::text(request.system_instruction)],
            },
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
            },
            tools: if request.web_search {
                vec![GeminiTool {
                    google_search: serde_json::json!({}),
                }]
            } else {
                Vec::new()
            },
        }
    }

    /// Convert a Gemini response to reply text and deduplicated source URIs
    fn from_gemini_response(resp: GeminiApiResponse) -> ProviderReply {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            return ProviderReply {
                text: EMPTY_REPLY.to_string(),
                sources: Vec::new(),
            };
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let sources = candidate
            .grounding_metadata
            .map(|g| {
                g.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web.and_then(|w| w.uri))
                    .filter(|uri| !uri.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        ProviderReply {
            text: if text.is_empty() {
                EMPTY_REPLY.to_string()
            } else {
                text
            },
            sources: dedup_preserving_order(sources),
        }
    }
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn history_limit(&self) -> usize {
        GEMINI_HISTORY_LIMIT
    }

    async fn send(&self, request: &ProviderRequest<'_>) -> Result<ProviderReply, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::Configuration("API Key not found. Set GOOGLE_AI_API_KEY.".to_string())
        })?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, GEMINI_MODEL
        );
        let body = Self::build_body(request, self.history_limit());

        debug!(
            "Gemini request: model={}, contents={}, search={}",
            GEMINI_MODEL,
            body.contents.len(),
            request.web_search
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Status { status, body });
        }

        let api_response: GeminiApiResponse = response.json().await?;

        debug!(
            "Gemini response: candidates={}",
            api_response.candidates.len()
        );

        Ok(Self::from_gemini_response(api_response))
    }

    fn failure_text(&self, err: &ProviderError) -> String {
        format!("[SYSTEM ERROR]: {}", err)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiTool {
    google_search: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiGroundingChunk {
    web: Option<GeminiWebSource>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiWebSource {
    uri: Option<String>,
}
