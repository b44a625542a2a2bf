//! Streams Agent Builder conversations and adapts them into chat chunks.
//!
//! The service answers each turn with a server-sent event stream. This crate
//! parses that stream into typed [`Event`]s, keeps the conversation id between
//! turns, and turns each turn into an ordered sequence of [`ChatChunk`]s.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agent_builder_bridge::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let client = AgentBuilderClient::from_env()?;
//! let config = client.config().clone();
//! let mut llm = AgentBuilderLlm::builder(Arc::new(client))
//!     .config(&config)
//!     .build()?;
//!
//! let mut ctx = ChatContext::new();
//! ctx.add_message(ChatRole::User, "Where is my order?");
//!
//! let mut stream = llm.chat(&ctx)?;
//! while let Some(chunk) = stream.next_chunk().await {
//!     print!("{}", chunk?.content);
//! }
//! # Ok(())
//! # }
//! ```

/// Turn state machine mapping events to chat chunks.
pub mod adapter;
/// Chat history input and chunk output types.
pub mod chat;
/// HTTP implementation of the converse transport.
pub mod client;
/// Client configuration and environment loading.
pub mod config;
/// Public error types.
pub mod errors;
/// Typed converse stream events.
pub mod event;
/// Chat model facade owning the conversation session.
pub mod llm;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Conversation continuity tracking.
pub mod session;
/// Line-oriented SSE frame parsing.
pub mod sse;
/// Pull-driven chat output of one turn.
pub mod stream;
/// Transport contract, request body and cancellation primitives.
pub mod transport;

pub use adapter::{AdapterState, ChatAdapter};
pub use chat::{ChatChunk, ChatContext, ChatItem, ChatMessage, ChatRole, ContentPart, MessageContent};
pub use client::AgentBuilderClient;
pub use config::AgentBuilderConfig;
pub use errors::{HarnessError, TransportError};
pub use event::{Event, RemoteError};
pub use llm::{AgentBuilderLlm, AgentBuilderLlmBuilder, ConnOptions};
pub use session::ConversationSession;
pub use sse::{SseDecoder, SseFrame, parse_events};
pub use stream::ChatStream;
pub use transport::{
    AbortHandle, AbortSignal, ConverseRequest, ConverseTransport, EventStream, abort_pair,
};
