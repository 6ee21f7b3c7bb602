//! Handoff directive parsing
//!
//! Agents suggest a different specialist by ending a reply with
//! `[[SWITCH_TO:<AGENT_ID>]]`. Only the first directive is considered.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::AgentMode;

static SWITCH_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[SWITCH_TO:(.*?)\]\]").expect("valid handoff regex"));

/// Reply text after handoff extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffOutcome {
    pub text: String,
    pub suggested_agent: Option<AgentMode>,
}

/// Extract a handoff suggestion from reply text.
///
/// A directive naming a known agent is removed and the remaining text
/// trimmed. An unknown identifier leaves the text exactly as it was.
pub fn extract_handoff(text: &str) -> HandoffOutcome {
    let unchanged = || HandoffOutcome {
        text: text.to_string(),
        suggested_agent: None,
    };

    let Some(caps) = SWITCH_DIRECTIVE.captures(text) else {
        return unchanged();
    };
    let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
        return unchanged();
    };

    match id.as_str().trim().parse::<AgentMode>() {
        Ok(agent) => {
            let cleaned = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
            debug!("Handoff directive suggests {}", agent);
            HandoffOutcome {
                text: cleaned.trim().to_string(),
                suggested_agent: Some(agent),
            }
        }
        Err(e) => {
            debug!("Ignoring handoff directive: {}", e);
            unchanged()
        }
    }
}
