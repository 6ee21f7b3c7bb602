//! nexusflow-core - agent orchestration and backend routing
//!
//! This crate provides:
//! - Eight fixed agent personas with their role templates
//! - System instruction composition (project context, task board, handoff policy)
//! - Context injection for the simulated retrieval, bridge and web fetch tools
//! - Gemini and Ollama backends behind one provider trait
//! - A router that picks backend and model and normalizes failures
//! - Handoff directive parsing and planner checklist extraction

pub mod agents;
pub mod context;
pub mod handoff;
pub mod injector;
pub mod providers;
pub mod tasks;
pub mod types;

// Re-export main types for convenience
pub use agents::{AgentProfile, profile};
pub use context::compose_system_instruction;
pub use handoff::{HandoffOutcome, extract_handoff};
pub use injector::inject_context;
pub use providers::{AgentRouter, ProviderKind, RouterSettings};
pub use tasks::{merge_tasks, parse_checklist};
pub use types::{
    AgentMode, Message, OrchestrationRequest, OrchestrationResult, Role, SuggestionLevel,
    TaskItem, TaskStatus, ToolState,
};
