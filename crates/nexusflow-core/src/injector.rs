//! Context injection: turns active tool state into context blocks ahead of the user request

use tracing::debug;

use crate::types::ToolState;

/// Marker separating injected context from the user's own words
pub const USER_REQUEST_MARKER: &str = "USER REQUEST:";

const SNIPPET_SEPARATOR: &str = "\n---\n";

/// Build the effective prompt for a request.
///
/// Blocks are emitted in a fixed order (retrieval, bridge, fetch). When no
/// block applies the raw prompt is returned unchanged.
pub fn inject_context(tools: &ToolState, raw_prompt: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if tools.retrieval.active && !tools.retrieval.snippets.is_empty() {
        blocks.push(format!(
            "[SYSTEM: RAG CONTEXT LOADED]\n\
The following information is provided from the local knowledge base. Use it to answer the user's request:\n{}",
            tools.retrieval.snippets.join(SNIPPET_SEPARATOR)
        ));
    }

    if tools.bridge.active {
        blocks.push(format!(
            "[SYSTEM: MCP BRIDGE ACTIVE]\n\
A local MCP bridge is reachable on port {}. You can assume access to local system commands if the user requests them.",
            tools.bridge.port
        ));
    }

    if tools.fetch.active {
        let target = tools.fetch.target_url.trim();
        if target.is_empty() {
            blocks.push(
                "[SYSTEM: WEB FETCH CONFIG]\n\
Web fetching is ENABLED. You may consult web sources to answer the user's request."
                    .to_string(),
            );
        } else {
            blocks.push(format!(
                "[SYSTEM: WEB FETCH CONFIG]\n\
The user is interested in this specific URL: {}. Look up information about it if needed.",
                target
            ));
        }
    }

    if blocks.is_empty() {
        return raw_prompt.to_string();
    }

    debug!("Injected {} context block(s)", blocks.len());

    format!(
        "{}\n\n{} {}",
        blocks.join("\n\n"),
        USER_REQUEST_MARKER,
        raw_prompt
    )
}
