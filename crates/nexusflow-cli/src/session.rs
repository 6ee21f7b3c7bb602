//! Terminal chat session state: per-agent histories, task board and tool toggles

use std::collections::HashMap;
use std::path::Path;

use nexusflow_core::providers::google::GEMINI_HISTORY_LIMIT;
use nexusflow_core::providers::ollama::OLLAMA_HISTORY_LIMIT;
use nexusflow_core::providers::types::recent_turns;
use nexusflow_core::{
    AgentMode, Message, OrchestrationRequest, OrchestrationResult, TaskItem, TaskStatus,
    ToolState, merge_tasks, parse_checklist, profile,
};
use tracing::debug;

/// A slash command typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Agent(AgentMode),
    Switch,
    Tools,
    Bridge,
    Fetch(Option<String>),
    RagLoad(String),
    RagClear,
    Tasks,
    /// Set the status of the task at a 1-based board position
    Task(usize, TaskStatus),
    Help,
    Quit,
}

/// Parse a line starting with `/`. Returns `None` for ordinary prompts.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match (name, arg) {
        ("agent", "") => Err("Usage: /agent <ID>".to_string()),
        ("agent", id) => parse_agent(id).map(Command::Agent),
        ("switch", _) => Ok(Command::Switch),
        ("tools", _) => Ok(Command::Tools),
        ("bridge", _) => Ok(Command::Bridge),
        ("fetch", "") => Ok(Command::Fetch(None)),
        ("fetch", url) => Ok(Command::Fetch(Some(url.to_string()))),
        ("rag", "") => Err("Usage: /rag <path> | /rag clear".to_string()),
        ("rag", "clear") => Ok(Command::RagClear),
        ("rag", path) => Ok(Command::RagLoad(path.to_string())),
        ("tasks", _) => Ok(Command::Tasks),
        ("task", arg) => parse_task_update(arg),
        ("help", _) => Ok(Command::Help),
        ("quit" | "exit", _) => Ok(Command::Quit),
        (other, _) => Err(format!("Unknown command '/{}'. Type /help.", other)),
    };
    Some(command)
}

const TASK_USAGE: &str = "Usage: /task <n> <idle|in-progress|review|done>";

fn parse_task_update(arg: &str) -> Result<Command, String> {
    let mut parts = arg.split_whitespace();
    let (Some(index), Some(status), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TASK_USAGE.to_string());
    };
    let index = index
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| TASK_USAGE.to_string())?;
    let status = status.parse::<TaskStatus>().map_err(|e| e.to_string())?;
    Ok(Command::Task(index, status))
}

/// Case-insensitive agent lookup for user input
pub fn parse_agent(input: &str) -> Result<AgentMode, String> {
    input
        .trim()
        .to_uppercase()
        .parse::<AgentMode>()
        .map_err(|e| {
            let known: Vec<&str> = AgentMode::ALL.iter().map(|a| a.wire_name()).collect();
            format!("{} (expected one of {})", e, known.join(", "))
        })
}

pub const HELP: &str = "\
Commands:
  /agent <ID>    switch to an agent (CHAT, PLAN, ARCHITECT, CODER, TEST, SECURE, DEPLOY, MONITOR)
  /switch        accept the last suggested handoff
  /tools         show tool state
  /bridge        toggle the local tool bridge
  /fetch [url]   set the fetch target, or toggle fetching
  /rag <path>    load a file into the retrieval store
  /rag clear     empty the retrieval store
  /tasks         show the task board
  /task <n> <status>
                 set task n to idle, in-progress, review or done
  /help          show this help
  /quit, /exit   leave";

/// History turns handed to the router; no backend sends more
fn request_history_turns() -> usize {
    GEMINI_HISTORY_LIMIT.max(OLLAMA_HISTORY_LIMIT)
}

pub struct ChatSession {
    agent: AgentMode,
    histories: HashMap<AgentMode, Vec<Message>>,
    tasks: Vec<TaskItem>,
    tools: ToolState,
    project_summary: String,
    suggestion: Option<AgentMode>,
}

impl ChatSession {
    pub fn new(agent: AgentMode, tools: ToolState, project_summary: impl Into<String>) -> Self {
        Self {
            agent,
            histories: HashMap::new(),
            tasks: Vec::new(),
            tools,
            project_summary: project_summary.into(),
            suggestion: None,
        }
    }

    pub fn agent(&self) -> AgentMode {
        self.agent
    }

    pub fn tasks(&self) -> &[TaskItem] {
        &self.tasks
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn history(&self, agent: AgentMode) -> &[Message] {
        self.histories.get(&agent).map(Vec::as_slice).unwrap_or_default()
    }

    /// Request for the active agent, built from the current session state
    pub fn request(&self, prompt: &str) -> OrchestrationRequest {
        OrchestrationRequest::new(self.agent, prompt)
            .with_history(
                recent_turns(self.history(self.agent), request_history_turns())
                    .into_iter()
                    .cloned()
                    .collect(),
            )
            .with_tools(self.tools.clone())
            .with_project_summary(self.project_summary.clone())
            .with_tasks(self.tasks.clone())
    }

    /// Append the turn to the active agent's history and update the task board
    pub fn record(&mut self, prompt: &str, result: &OrchestrationResult) {
        let agent = self.agent;
        let history = self.histories.entry(agent).or_default();
        history.push(Message::user(agent, prompt));
        history.push(Message::from_result(agent, result));

        if agent == AgentMode::Plan && !result.is_error {
            let parsed = parse_checklist(&result.text);
            let total = parsed.len();
            let added = merge_tasks(&mut self.tasks, parsed);
            debug!("PLAN reply listed {} task(s), {} new", total, added);
        }
        self.suggestion = result.suggested_agent.filter(|s| *s != agent);
    }

    pub fn suggestion(&self) -> Option<AgentMode> {
        self.suggestion
    }

    /// Apply a command and return the text to show. `None` means quit.
    pub fn apply(&mut self, command: Command) -> Option<String> {
        let text = match command {
            Command::Quit => return None,
            Command::Help => HELP.to_string(),
            Command::Agent(agent) => self.switch_to(agent),
            Command::Switch => match self.suggestion.take() {
                Some(agent) => self.switch_to(agent),
                None => "No handoff suggested.".to_string(),
            },
            Command::Tools => self.describe_tools(),
            Command::Bridge => {
                self.tools.bridge.active = !self.tools.bridge.active;
                format!(
                    "Bridge {} (port {})",
                    on_off(self.tools.bridge.active),
                    self.tools.bridge.port
                )
            }
            Command::Fetch(Some(url)) => {
                self.tools.fetch.active = true;
                self.tools.fetch.target_url = url;
                format!("Fetch ON, target {}", self.tools.fetch.target_url)
            }
            Command::Fetch(None) => {
                self.tools.fetch.active = !self.tools.fetch.active;
                format!("Fetch {}", on_off(self.tools.fetch.active))
            }
            Command::RagLoad(path) => match self.tools.load_retrieval_file(Path::new(&path)) {
                Ok(()) => format!(
                    "Loaded {} ({} snippet(s) in store)",
                    path,
                    self.tools.retrieval.snippets.len()
                ),
                Err(e) => format!("Could not read {}: {}", path, e),
            },
            Command::RagClear => {
                self.tools.clear_retrieval();
                "Retrieval store cleared.".to_string()
            }
            Command::Tasks => self.describe_tasks(),
            Command::Task(index, status) => match index.checked_sub(1).and_then(|i| self.tasks.get_mut(i)) {
                Some(task) => {
                    task.status = status;
                    format!("{}. [{}] {}", index, task.status, task.title)
                }
                None => format!("No task {} (board has {}).", index, self.tasks.len()),
            },
        };
        Some(text)
    }

    fn switch_to(&mut self, agent: AgentMode) -> String {
        self.agent = agent;
        self.suggestion = None;
        let p = profile(agent);
        format!("Now talking to {} ({})", p.display_name, p.description)
    }

    fn describe_tools(&self) -> String {
        let fetch_target = if self.tools.fetch.target_url.is_empty() {
            "any"
        } else {
            self.tools.fetch.target_url.as_str()
        };
        format!(
            "bridge: {} (port {})\nretrieval: {} ({} snippet(s))\nfetch: {} (target {})",
            on_off(self.tools.bridge.active),
            self.tools.bridge.port,
            on_off(self.tools.retrieval.active),
            self.tools.retrieval.snippets.len(),
            on_off(self.tools.fetch.active),
            fetch_target
        )
    }

    fn describe_tasks(&self) -> String {
        if self.tasks.is_empty() {
            return "Task board is empty. Ask PLAN for a roadmap.".to_string();
        }
        self.tasks
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. [{}] {} ({})", i + 1, t.status, t.title, t.agent))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn on_off(active: bool) -> &'static str {
    if active { "ON" } else { "OFF" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reply(text: &str, suggested: Option<AgentMode>) -> OrchestrationResult {
        OrchestrationResult {
            text: text.to_string(),
            sources: None,
            suggested_agent: suggested,
            is_error: false,
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(
            parse_command("/agent coder"),
            Some(Ok(Command::Agent(AgentMode::Coder)))
        );
        assert_eq!(parse_command("/fetch"), Some(Ok(Command::Fetch(None))));
        assert_eq!(
            parse_command("/fetch https://docs.rs"),
            Some(Ok(Command::Fetch(Some("https://docs.rs".to_string()))))
        );
        assert_eq!(parse_command("/rag clear"), Some(Ok(Command::RagClear)));
        assert_eq!(
            parse_command("/rag notes/api.md"),
            Some(Ok(Command::RagLoad("notes/api.md".to_string())))
        );
        assert_eq!(parse_command("  /quit  "), Some(Ok(Command::Quit)));
        assert!(matches!(parse_command("/agent bogus"), Some(Err(_))));
        assert!(matches!(parse_command("/dance"), Some(Err(_))));
    }

    #[test]
    fn test_histories_are_per_agent() {
        let mut session = ChatSession::new(AgentMode::Chat, ToolState::default(), "");
        session.record("hi", &reply("hello", None));
        session.apply(Command::Agent(AgentMode::Coder));
        session.record("write it", &reply("done", None));

        assert_eq!(session.history(AgentMode::Chat).len(), 2);
        assert_eq!(session.history(AgentMode::Coder).len(), 2);
        let request = session.request("next");
        assert_eq!(request.agent, AgentMode::Coder);
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[0].content, "write it");
    }

    #[test]
    fn test_switch_accepts_suggestion() {
        let mut session = ChatSession::new(AgentMode::Coder, ToolState::default(), "");
        session.record("finish", &reply("Done.", Some(AgentMode::Test)));
        assert_eq!(session.suggestion(), Some(AgentMode::Test));

        let text = session.apply(Command::Switch).unwrap();
        assert!(text.contains("NEXUS-TEST"));
        assert_eq!(session.agent(), AgentMode::Test);
        assert_eq!(session.suggestion(), None);
        assert_eq!(session.apply(Command::Switch).unwrap(), "No handoff suggested.");
    }

    #[test]
    fn test_self_suggestion_ignored() {
        let mut session = ChatSession::new(AgentMode::Coder, ToolState::default(), "");
        session.record("go", &reply("ok", Some(AgentMode::Coder)));
        assert_eq!(session.suggestion(), None);
    }

    #[test]
    fn test_plan_reply_fills_task_board() {
        let mut session = ChatSession::new(AgentMode::Plan, ToolState::default(), "");
        session.record("roadmap", &reply("- [ ] Build API\n- [x] Design schema", None));
        assert_eq!(session.tasks().len(), 2);
        assert_eq!(session.tasks()[1].status, TaskStatus::Done);
        assert_eq!(session.request("next").tasks.len(), 2);

        let board = session.apply(Command::Tasks).unwrap();
        assert!(board.contains("1. [idle] Build API (CODER)"));
        assert!(board.contains("2. [done] Design schema (ARCHITECT)"));
    }

    #[test]
    fn test_revised_plan_merges_into_board() {
        let mut session = ChatSession::new(AgentMode::Plan, ToolState::default(), "");
        session.record("roadmap", &reply("- [ ] Build API\n- [ ] Design schema", None));
        session.record("revise", &reply("- [x] Build API\n- [ ] design schema \n- [ ] Add auth", None));

        let board: Vec<String> = session
            .tasks()
            .iter()
            .map(|t| format!("{}:{}", t.title, t.status))
            .collect();
        assert_eq!(board, vec!["Build API:done", "Design schema:idle", "Add auth:idle"]);
        assert_eq!(session.request("next").tasks.len(), 3);
    }

    #[test]
    fn test_task_status_update_reaches_next_request() {
        let mut session = ChatSession::new(AgentMode::Plan, ToolState::default(), "");
        session.record("roadmap", &reply("- [ ] Build API\n- [ ] Write tests", None));

        let text = session.apply(Command::Task(2, TaskStatus::InProgress)).unwrap();
        assert_eq!(text, "2. [in-progress] Write tests");

        session.apply(Command::Agent(AgentMode::Test));
        let request = session.request("go");
        assert_eq!(request.tasks[0].status, TaskStatus::Idle);
        assert_eq!(request.tasks[1].status, TaskStatus::InProgress);

        let missing = session.apply(Command::Task(9, TaskStatus::Done)).unwrap();
        assert_eq!(missing, "No task 9 (board has 2).");
    }

    #[test]
    fn test_parse_task_command() {
        assert_eq!(
            parse_command("/task 2 in-progress"),
            Some(Ok(Command::Task(2, TaskStatus::InProgress)))
        );
        assert_eq!(
            parse_command("/task 1 DONE"),
            Some(Ok(Command::Task(1, TaskStatus::Done)))
        );
        assert!(matches!(parse_command("/task"), Some(Err(_))));
        assert!(matches!(parse_command("/task 0 done"), Some(Err(_))));
        assert!(matches!(parse_command("/task x done"), Some(Err(_))));
        assert!(matches!(parse_command("/task 1 started"), Some(Err(_))));
        assert!(matches!(parse_command("/task 1 done extra"), Some(Err(_))));
    }

    #[test]
    fn test_help_lists_every_command() {
        for name in [
            "/agent", "/switch", "/tools", "/bridge", "/fetch", "/rag", "/tasks", "/task ",
            "/help", "/quit", "/exit",
        ] {
            assert!(HELP.contains(name), "help is missing {}", name);
            let line = if name == "/task " { "/task 1 done" } else { name };
            assert!(
                !matches!(parse_command(line), Some(Err(ref e)) if e.starts_with("Unknown")),
                "{} is not a command",
                name
            );
        }
    }

    #[test]
    fn test_request_history_is_bounded() {
        let mut session = ChatSession::new(AgentMode::Coder, ToolState::default(), "");
        for i in 0..20 {
            session.record(&format!("q{}", i), &reply(&format!("a{}", i), None));
        }
        assert_eq!(session.history(AgentMode::Coder).len(), 40);

        let request = session.request("next");
        assert_eq!(request.history.len(), request_history_turns());
        assert_eq!(request.history.last().unwrap().content, "a19");
    }

    #[test]
    fn test_error_reply_does_not_fill_task_board() {
        let mut session = ChatSession::new(AgentMode::Plan, ToolState::default(), "");
        session.record("roadmap", &OrchestrationResult::error("[SYSTEM ERROR]: - [ ] nope"));
        assert!(session.tasks().is_empty());
        assert!(session.history(AgentMode::Plan)[1].is_error);
    }

    #[test]
    fn test_tool_commands() {
        let mut session = ChatSession::new(AgentMode::Chat, ToolState::default(), "");
        session.apply(Command::Bridge);
        assert!(session.tools().bridge.active);

        session.apply(Command::Fetch(Some("https://example.com".to_string())));
        assert!(session.tools().fetch.active);
        assert_eq!(session.tools().fetch.target_url, "https://example.com");
        session.apply(Command::Fetch(None));
        assert!(!session.tools().fetch.active);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "schema notes").unwrap();
        let path = file.path().display().to_string();
        let text = session.apply(Command::RagLoad(path)).unwrap();
        assert!(text.contains("1 snippet(s)"));
        assert!(session.request("q").tools.retrieval.active);

        session.apply(Command::RagClear);
        assert!(session.tools().retrieval.snippets.is_empty());

        let missing = session
            .apply(Command::RagLoad("/nonexistent/file.md".to_string()))
            .unwrap();
        assert!(missing.starts_with("Could not read"));
    }

    #[test]
    fn test_quit() {
        let mut session = ChatSession::new(AgentMode::Chat, ToolState::default(), "");
        assert!(session.apply(Command::Quit).is_none());
    }
}
