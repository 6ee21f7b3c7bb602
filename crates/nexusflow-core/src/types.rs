//! Shared types for nexusflow-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// One of the eight fixed agent personas.
///
/// Serialized with the upper-case wire names used by the handoff directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentMode {
    Chat,
    Plan,
    Architect,
    Coder,
    Test,
    Secure,
    Deploy,
    Monitor,
}

impl AgentMode {
    /// Every agent, in roster order
    pub const ALL: [AgentMode; 8] = [
        AgentMode::Chat,
        AgentMode::Plan,
        AgentMode::Architect,
        AgentMode::Coder,
        AgentMode::Test,
        AgentMode::Secure,
        AgentMode::Deploy,
        AgentMode::Monitor,
    ];

    /// Upper-case identifier used in `[[SWITCH_TO:...]]`
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Chat => "CHAT",
            Self::Plan => "PLAN",
            Self::Architect => "ARCHITECT",
            Self::Coder => "CODER",
            Self::Test => "TEST",
            Self::Secure => "SECURE",
            Self::Deploy => "DEPLOY",
            Self::Monitor => "MONITOR",
        }
    }

    /// Implementation-oriented agents, routed to the coding model on the local backend
    pub fn is_technical(&self) -> bool {
        matches!(
            self,
            Self::Coder | Self::Architect | Self::Test | Self::Secure | Self::Deploy
        )
    }
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Error returned when a string is not one of the wire names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent '{0}'")]
pub struct UnknownAgent(pub String);

impl FromStr for AgentMode {
    type Err = UnknownAgent;

    /// Exact match against the wire names; callers wanting case-insensitive
    /// input upper-case it first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentMode::ALL
            .into_iter()
            .find(|agent| agent.wire_name() == s)
            .ok_or_else(|| UnknownAgent(s.to_string()))
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One conversation turn, owned by the caller's conversation store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub agent: AgentMode,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl Message {
    pub fn new(role: Role, agent: AgentMode, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            agent,
            is_error: false,
            sources: None,
        }
    }

    pub fn user(agent: AgentMode, content: impl Into<String>) -> Self {
        Self::new(Role::User, agent, content)
    }

    pub fn assistant(agent: AgentMode, content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, agent, content)
    }

    /// Build the assistant turn recording an orchestration result
    pub fn from_result(agent: AgentMode, result: &OrchestrationResult) -> Self {
        let mut msg = Self::assistant(agent, result.text.clone());
        msg.is_error = result.is_error;
        msg.sources = result.sources.clone();
        msg
    }

    /// Whether this turn is sent to providers as conversation history
    pub fn is_chat_turn(&self) -> bool {
        matches!(self.role, Role::User | Role::Assistant)
    }
}

/// Task board status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Idle,
    InProgress,
    Review,
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Review => write!(f, "review"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Error returned when a string is not a task status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status '{0}' (expected idle, in-progress, review or done)")]
pub struct UnknownTaskStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "in-progress" | "in_progress" | "inprogress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            _ => Err(UnknownTaskStatus(s.to_string())),
        }
    }
}

/// An item on the project task board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    /// The agent best suited for this task
    pub agent: AgentMode,
}

impl TaskItem {
    pub fn new(title: impl Into<String>, agent: AgentMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            status: TaskStatus::Idle,
            agent,
        }
    }
}

/// Simulated local tool bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeTool {
    pub active: bool,
    pub port: String,
}

/// Flat retrieval store of caller-supplied text blocks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalTool {
    pub active: bool,
    pub snippets: Vec<String>,
}

/// Web fetch target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchTool {
    pub active: bool,
    pub target_url: String,
}

/// Caller-owned tool toggles, read by the context injector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolState {
    pub bridge: BridgeTool,
    pub retrieval: RetrievalTool,
    pub fetch: FetchTool,
}

impl ToolState {
    /// Load a text file as a retrieval snippet and turn retrieval on
    pub fn load_retrieval_file(&mut self, path: &Path) -> std::io::Result<()> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.retrieval
            .snippets
            .push(format!("FILE: {}\nCONTENT:\n{}", name, text));
        self.retrieval.active = true;
        Ok(())
    }

    pub fn clear_retrieval(&mut self) {
        self.retrieval.snippets.clear();
    }

    pub fn any_active(&self) -> bool {
        self.bridge.active || self.retrieval.active || self.fetch.active
    }
}

/// How eagerly agents suggest handing off to another specialist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Everything the router needs for one call. Built fresh by the caller each turn.
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    pub prompt: String,
    pub history: Vec<Message>,
    pub agent: AgentMode,
    pub tools: ToolState,
    pub project_summary: String,
    pub tasks: Vec<TaskItem>,
}

impl OrchestrationRequest {
    pub fn new(agent: AgentMode, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            agent,
            tools: ToolState::default(),
            project_summary: String::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_tools(mut self, tools: ToolState) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_project_summary(mut self, summary: impl Into<String>) -> Self {
        self.project_summary = summary.into();
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<TaskItem>) -> Self {
        self.tasks = tasks;
        self
    }
}

/// Uniform result of a routed call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestrationResult {
    /// Reply text with any recognized handoff directive removed
    pub text: String,
    /// Deduplicated grounding URLs, `None` when the provider returned none
    pub sources: Option<Vec<String>>,
    pub suggested_agent: Option<AgentMode>,
    /// Set when `text` is a labeled system-error string
    pub is_error: bool,
}

impl OrchestrationResult {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: None,
            suggested_agent: None,
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_agent_wire_names_round_trip_through_from_str() {
        for agent in AgentMode::ALL {
            assert_eq!(agent.wire_name().parse::<AgentMode>().unwrap(), agent);
        }
    }

    #[test]
    fn test_agent_from_str_is_exact() {
        assert!("coder".parse::<AgentMode>().is_err());
        assert!("BOGUS".parse::<AgentMode>().is_err());
        assert_eq!(
            "NOPE".parse::<AgentMode>().unwrap_err(),
            UnknownAgent("NOPE".to_string())
        );
    }

    #[test]
    fn test_technical_subset() {
        let technical: Vec<AgentMode> = AgentMode::ALL
            .into_iter()
            .filter(|a| a.is_technical())
            .collect();
        assert_eq!(
            technical,
            vec![
                AgentMode::Architect,
                AgentMode::Coder,
                AgentMode::Test,
                AgentMode::Secure,
                AgentMode::Deploy
            ]
        );
    }

    #[test]
    fn test_agent_serde_uses_wire_names() {
        let json = serde_json::to_string(&AgentMode::Secure).unwrap();
        assert_eq!(json, "\"SECURE\"");
        let back: AgentMode = serde_json::from_str("\"DEPLOY\"").unwrap();
        assert_eq!(back, AgentMode::Deploy);
    }

    #[test]
    fn test_task_status_serde_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(TaskStatus::InProgress.to_string(), "in-progress");
    }

    #[test]
    fn test_task_status_from_str() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(" DONE ".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert_eq!("review".parse::<TaskStatus>().unwrap(), TaskStatus::Review);
        assert!("started".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_message_from_error_result() {
        let result = OrchestrationResult::error("[SYSTEM ERROR]: boom");
        let msg = Message::from_result(AgentMode::Coder, &result);
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.is_error);
        assert_eq!(msg.content, "[SYSTEM ERROR]: boom");
        assert!(msg.is_chat_turn());
    }

    #[test]
    fn test_system_message_is_not_chat_turn() {
        let msg = Message::new(Role::System, AgentMode::Chat, "booted");
        assert!(!msg.is_chat_turn());
    }

    #[test]
    fn test_load_retrieval_file_activates_tool() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "the schema uses UUID keys").unwrap();

        let mut tools = ToolState::default();
        assert!(!tools.any_active());
        tools.load_retrieval_file(file.path()).unwrap();

        assert!(tools.retrieval.active);
        assert_eq!(tools.retrieval.snippets.len(), 1);
        assert!(tools.retrieval.snippets[0].starts_with("FILE: "));
        assert!(tools.retrieval.snippets[0].ends_with("CONTENT:\nthe schema uses UUID keys"));

        tools.clear_retrieval();
        assert!(tools.retrieval.snippets.is_empty());
        assert!(tools.retrieval.active);
    }

    #[test]
    fn test_default_suggestion_level_is_medium() {
        assert_eq!(SuggestionLevel::default(), SuggestionLevel::Medium);
    }
}
