//! Common imports for typical usage.
//!
//! This module exports the types most callers need to run chat turns, so
//! examples and application code need fewer import lines.
pub use crate::{
    AbortHandle, AgentBuilderClient, AgentBuilderConfig, AgentBuilderLlm, ChatChunk, ChatContext,
    ChatRole, ChatStream, ConnOptions, ConversationSession, Event, HarnessError,
};
