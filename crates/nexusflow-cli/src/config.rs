use anyhow::{Context, Result};
use nexusflow_core::providers::{ProviderKind, RouterSettings};
use nexusflow_core::{AgentMode, SuggestionLevel, ToolState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NexusConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub project: ProjectConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_general_model")]
    pub general_model: String,
    #[serde(default)]
    pub coding_model: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let settings = RouterSettings::default();
        Self {
            provider: settings.provider,
            ollama_url: settings.ollama_url,
            general_model: settings.general_model,
            coding_model: settings.coding_model,
        }
    }
}

fn default_ollama_url() -> String {
    RouterSettings::default().ollama_url
}

fn default_general_model() -> String {
    RouterSettings::default().general_model
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub suggestion_level: SuggestionLevel,
    #[serde(default = "default_agent")]
    pub default_agent: AgentMode,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            suggestion_level: SuggestionLevel::default(),
            default_agent: default_agent(),
        }
    }
}

fn default_agent() -> AgentMode {
    AgentMode::Chat
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub bridge_active: bool,
    #[serde(default = "default_bridge_port")]
    pub bridge_port: String,
    #[serde(default)]
    pub fetch_active: bool,
    #[serde(default)]
    pub fetch_target: String,
    #[serde(default)]
    pub retrieval_files: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            bridge_active: false,
            bridge_port: default_bridge_port(),
            fetch_active: false,
            fetch_target: String::new(),
            retrieval_files: Vec::new(),
        }
    }
}

fn default_bridge_port() -> String {
    "3000".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub summary: String,
}

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nexusflow")
}

impl NexusConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        // The file may hold an API key; refuse group/other-readable configs
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(&path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `nexusflow init` first.",
                path.display()
            )
        })?;

        Self::parse(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;

        if config.cloud.api_key.starts_with("AIza") {
            warn!(
                "API key is hardcoded in config file. For security, use environment variables: api_key = \"${{GOOGLE_AI_API_KEY}}\""
            );
        }

        config
            .router_settings()
            .validate()
            .with_context(|| format!("Invalid ollama_url '{}'", config.backend.ollama_url))?;

        Ok(config)
    }

    /// Settings handed to the router
    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            provider: self.backend.provider,
            ollama_url: self.backend.ollama_url.clone(),
            general_model: self.backend.general_model.clone(),
            coding_model: self.backend.coding_model.clone(),
            suggestion_level: self.agents.suggestion_level,
        }
    }

    /// Copy safe to print, with the API key masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.cloud.api_key = mask_secret(&self.cloud.api_key);
        copy
    }

    /// Cloud API key from the config, falling back to the environment
    pub fn api_key(&self) -> Option<String> {
        if !self.cloud.api_key.trim().is_empty() {
            return Some(self.cloud.api_key.trim().to_string());
        }
        ["GOOGLE_AI_API_KEY", "GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }

    /// Initial tool state, with configured retrieval files loaded.
    /// Relative paths resolve against `base_dir`.
    pub fn initial_tools(&self, base_dir: &Path) -> ToolState {
        let mut tools = ToolState::default();
        tools.bridge.active = self.tools.bridge_active;
        tools.bridge.port = self.tools.bridge_port.clone();
        tools.fetch.active = self.tools.fetch_active;
        tools.fetch.target_url = self.tools.fetch_target.clone();

        for file in &self.tools.retrieval_files {
            let path = expand_home(file);
            let path = if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            };
            if let Err(e) = tools.load_retrieval_file(&path) {
                warn!("Skipping retrieval file {}: {}", path.display(), e);
            }
        }
        tools
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &["GOOGLE_AI_API_KEY", "GEMINI_API_KEY", "API_KEY", "HOME", "USER"];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        let value_len = value.len();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value_len;
    }
    result
}

fn expand_home(s: &str) -> PathBuf {
    match (s.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEFAULT_TOML: &str = include_str!("../../../config/default.toml");

    #[test]
    fn test_default_config_parses() {
        let config = NexusConfig::parse(DEFAULT_TOML).unwrap();
        assert_eq!(config.backend.provider, ProviderKind::Gemini);
        assert_eq!(config.backend.ollama_url, "http://localhost:11434");
        assert_eq!(config.backend.general_model, "llama3");
        assert_eq!(config.agents.default_agent, AgentMode::Chat);
        assert_eq!(config.agents.suggestion_level, SuggestionLevel::Medium);
        assert_eq!(config.tools.bridge_port, "3000");
        assert!(config.tools.retrieval_files.is_empty());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = NexusConfig::parse("").unwrap();
        let settings = config.router_settings();
        assert_eq!(settings, RouterSettings::default());
    }

    #[test]
    fn test_local_backend_settings() {
        let config = NexusConfig::parse(
            r#"
[backend]
provider = "local"
ollama_url = "http://gpu-box:11434"
general_model = "mistral"
coding_model = "qwen2.5-coder"

[agents]
suggestion_level = "high"
default_agent = "PLAN"
"#,
        )
        .unwrap();

        let settings = config.router_settings();
        assert_eq!(settings.provider, ProviderKind::Ollama);
        assert_eq!(settings.model_for(AgentMode::Coder), "qwen2.5-coder");
        assert_eq!(settings.model_for(AgentMode::Plan), "mistral");
        assert_eq!(settings.suggestion_level, SuggestionLevel::High);
        assert_eq!(config.agents.default_agent, AgentMode::Plan);
    }

    #[test]
    fn test_invalid_ollama_url_rejected() {
        let err = NexusConfig::parse("[backend]\nollama_url = \"localhost\"\n").unwrap_err();
        assert!(err.to_string().contains("Invalid ollama_url"));
    }

    #[test]
    fn test_non_http_ollama_url_names_scheme() {
        let err = NexusConfig::parse("[backend]\nollama_url = \"ftp://gpu-box:11434\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("unsupported URL scheme 'ftp'"));
    }

    #[test]
    fn test_unknown_agent_rejected() {
        assert!(NexusConfig::parse("[agents]\ndefault_agent = \"coder\"\n").is_err());
    }

    #[test]
    fn test_expand_env_vars_allowlist() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(expand_env_vars("dir = \"${HOME}/x\""), format!("dir = \"{}/x\"", home));
        assert_eq!(expand_env_vars("${PATH}"), "${PATH}");
        assert_eq!(expand_env_vars("no vars ${unterminated"), "no vars ${unterminated");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("AIzaSyExample1234"), "AIz...1234");
    }

    #[test]
    fn test_cloud_debug_masks_key() {
        let cloud = CloudConfig {
            api_key: "AIzaSySecretValue9876".to_string(),
        };
        let debug = format!("{:?}", cloud);
        assert!(!debug.contains("SecretValue"));
        assert!(debug.contains("AIz...9876"));
    }

    #[test]
    fn test_redacted_masks_key() {
        let mut config = NexusConfig::default();
        config.cloud.api_key = "AIzaSySecretValue9876".to_string();
        let printed = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!printed.contains("SecretValue"));
        assert_eq!(config.cloud.api_key, "AIzaSySecretValue9876");
    }

    #[test]
    fn test_configured_api_key_wins() {
        let mut config = NexusConfig::default();
        config.cloud.api_key = "  key-from-file  ".to_string();
        assert_eq!(config.api_key().as_deref(), Some("key-from-file"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[project]\nsummary = \"Payments service\"\n").unwrap();

        let config = NexusConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.project.summary, "Payments service");
    }

    #[test]
    fn test_load_missing_file_mentions_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = NexusConfig::load(&Some(dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("nexusflow init"));
    }

    #[test]
    fn test_initial_tools_loads_retrieval_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "Use UUID keys").unwrap();

        let mut config = NexusConfig::default();
        config.tools.fetch_active = true;
        config.tools.fetch_target = "https://docs.example".to_string();
        config.tools.retrieval_files = vec!["notes.md".to_string(), "absent.md".to_string()];

        let tools = config.initial_tools(dir.path());
        assert!(tools.fetch.active);
        assert_eq!(tools.fetch.target_url, "https://docs.example");
        assert!(tools.retrieval.active);
        assert_eq!(tools.retrieval.snippets, vec!["FILE: notes.md\nCONTENT:\nUse UUID keys"]);
        assert_eq!(tools.bridge.port, "3000");
    }
}
