//! System instruction composition

use tracing::debug;

use crate::agents::profile;
use crate::types::{AgentMode, SuggestionLevel, TaskItem};

const PREAMBLE: &str = "You are NEXUSFLOW, a local-first AI development agency running in a terminal interface. \
You are part of a multi-agent development team: you have your own specialized history, but you share a project goal with the other agents.";

/// Handoff policy block for the given aggressiveness
pub fn handoff_policy(level: SuggestionLevel) -> &'static str {
    match level {
        SuggestionLevel::Low => {
            "# HANDOFF PROTOCOL (CONSERVATIVE)\n\n\
Only suggest switching agents if the user's request is COMPLETELY outside your capabilities or if explicitly asked. \
Prefer to handle general queries yourself.\n\
Format: \"[[SWITCH_TO:AGENT_ID]]\" at the end of your response."
        }
        SuggestionLevel::Medium => {
            "# HANDOFF PROTOCOL (BALANCED)\n\n\
If the user's request is better served by another specialist, append the tag \"[[SWITCH_TO:AGENT_ID]]\" at the end of your response.\n\
Example: \"I've designed the architecture. Let's move to implementation. [[SWITCH_TO:CODER]]\""
        }
        SuggestionLevel::High => {
            "# HANDOFF PROTOCOL (AGGRESSIVE)\n\n\
Proactively suggest switching agents for ANY sub-task that matches another agent's specialty. \
Do not try to do work that another agent could do better.\n\
Format: \"[[SWITCH_TO:AGENT_ID]]\" at the end of your response."
        }
    }
}

/// Build the per-agent system instruction
pub fn compose_system_instruction(
    agent: AgentMode,
    project_summary: &str,
    tasks: &[TaskItem],
    level: SuggestionLevel,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");

    let summary = project_summary.trim();
    if !summary.is_empty() {
        prompt.push_str("# PROJECT CONTEXT\n\n");
        prompt.push_str(
            "The following is a summary of the most recent activity in the project. \
Use it to understand the immediate context, but do not repeat it unless asked:\n",
        );
        prompt.push_str(summary);
        prompt.push_str("\n\n");
    }

    if !tasks.is_empty() {
        prompt.push_str("# TASK BOARD\n\n");
        prompt.push_str(
            "The current plan has the following tasks. If you are an implementation agent, \
focus on the idle or in-progress tasks relevant to your expertise:\n",
        );
        for task in tasks {
            prompt.push_str(&format!(
                "- [{}] {}\n",
                task.status.to_string().to_uppercase(),
                task.title
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str("# TEAM\n\nAvailable agents:\n");
    for mode in AgentMode::ALL {
        prompt.push_str(&format!("- {}: {}\n", mode.wire_name(), profile(mode).roster_line));
    }
    prompt.push('\n');

    prompt.push_str(handoff_policy(level));
    prompt.push_str("\n\n");

    prompt.push_str("# ROLE\n\n");
    prompt.push_str(&profile(agent).role_instruction());
    prompt.push('\n');

    debug!(
        "Composed system instruction for {} ({} chars, {} tasks)",
        agent,
        prompt.len(),
        tasks.len()
    );

    prompt
}
