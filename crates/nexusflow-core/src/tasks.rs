//! Task board extraction from the PLAN agent's markdown checklists

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::{AgentMode, TaskItem, TaskStatus};

static CHECKLIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*]\s+\[([ xX])\]\s+(.+?)\s*$").expect("valid checklist regex")
});

/// Parse `- [ ] title` / `- [x] title` lines into task items.
///
/// Unchecked items start `idle`, checked ones `done`. Each task is assigned
/// to the agent best suited for it by keyword.
pub fn parse_checklist(text: &str) -> Vec<TaskItem> {
    let tasks: Vec<TaskItem> = text
        .lines()
        .filter_map(|line| CHECKLIST_ITEM.captures(line))
        .filter_map(|caps| {
            let mark = caps.get(1)?.as_str();
            let title = caps.get(2)?.as_str().to_string();
            let mut task = TaskItem::new(title.clone(), classify_task(&title));
            if mark != " " {
                task.status = TaskStatus::Done;
            }
            Some(task)
        })
        .collect();

    debug!("Parsed {} task(s) from checklist", tasks.len());
    tasks
}

/// Merge a parsed checklist into the board.
///
/// Titles match ignoring case and surrounding whitespace. A known title takes
/// the incoming status; a new title is appended. Returns how many were added.
pub fn merge_tasks(board: &mut Vec<TaskItem>, incoming: Vec<TaskItem>) -> usize {
    let mut added = 0;
    for task in incoming {
        let key = title_key(&task.title);
        match board.iter_mut().find(|t| title_key(&t.title) == key) {
            Some(existing) => existing.status = task.status,
            None => {
                board.push(task);
                added += 1;
            }
        }
    }
    added
}

fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Pick the specialist for a task title
pub fn classify_task(title: &str) -> AgentMode {
    let lower = title.to_lowercase();

    let test_signals = ["test", "qa", "coverage", "verify", "validation"];
    if test_signals.iter().any(|s| lower.contains(s)) {
        return AgentMode::Test;
    }

    let deploy_signals = ["deploy", "docker", "ci/cd", "pipeline", "workflow", "kubernetes", "terraform", "release"];
    if deploy_signals.iter().any(|s| lower.contains(s)) {
        return AgentMode::Deploy;
    }

    let security_signals = ["secur", "auth", "vulnerab", "encrypt", "owasp", "permission"];
    if security_signals.iter().any(|s| lower.contains(s)) {
        return AgentMode::Secure;
    }

    let design_signals = ["design", "architect", "schema", "structure", "diagram"];
    if design_signals.iter().any(|s| lower.contains(s)) {
        return AgentMode::Architect;
    }

    AgentMode::Coder
}
