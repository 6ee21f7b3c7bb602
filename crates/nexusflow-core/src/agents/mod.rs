//! Agent personas
//!
//! Each [`AgentMode`](crate::types::AgentMode) maps to a fixed
//! [`AgentProfile`] holding its display name, roster entry and role template.

pub mod profile;

pub use profile::{AgentProfile, FILE_FORMAT_INSTRUCTION, profile};
