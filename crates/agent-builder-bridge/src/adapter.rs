use tracing::{debug, error};

use crate::chat::ChatChunk;
use crate::errors::HarnessError;
use crate::event::Event;
use crate::session::ConversationSession;

/// Lifecycle of a single turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterState {
    /// Nothing emitted yet.
    Init,
    /// The role announcement has been sent.
    RoleEmitted,
    /// The event sequence ended normally.
    Done,
    /// The turn failed; later events are ignored.
    Failed,
}

/// Converts one turn's events into chat chunks.
#[derive(Debug)]
pub struct ChatAdapter {
    state: AdapterState,
    message_id: String,
}

impl ChatAdapter {
    /// Creates an adapter whose chunks use `message_id` until a completed
    /// message provides its own id.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            state: AdapterState::Init,
            message_id: message_id.into(),
        }
    }

    /// Creates an adapter with a `msg-<unix millis>` placeholder id.
    pub fn with_generated_id() -> Self {
        Self::new(format!("msg-{}", chrono::Utc::now().timestamp_millis()))
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Id of the message currently being produced.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, AdapterState::Done | AdapterState::Failed)
    }

    /// Applies one event and returns the chunks it produces.
    pub fn on_event(
        &mut self,
        event: &Event,
        session: &mut ConversationSession,
    ) -> Result<Vec<ChatChunk>, HarnessError> {
        if self.is_terminal() {
            debug!(kind = event.kind(), state = ?self.state, "ignoring event after turn ended");
            return Ok(Vec::new());
        }

        match event {
            Event::ToolProgress(progress) => {
                let mut chunks = self.announce_role();
                debug!(tool_call_id = %progress.tool_call_id, message = %progress.message, "tool_progress");
                chunks.push(ChatChunk::assistant(&self.message_id, &progress.message));
                Ok(chunks)
            }
            Event::MessageComplete(message) => {
                if !message.message_id.is_empty() {
                    self.message_id = message.message_id.clone();
                }
                let mut chunks = self.announce_role();
                chunks.push(ChatChunk::assistant(
                    &self.message_id,
                    &message.message_content,
                ));
                Ok(chunks)
            }
            Event::Error(remote) => {
                self.state = AdapterState::Failed;
                error!(code = %remote.code, message = %remote.message, "agent builder reported an error");
                Err(HarnessError::remote(&remote.code, &remote.message))
            }
            Event::ConversationIdSet(body) => {
                session.observe(event);
                debug!(conversation_id = %body.conversation_id, "conversation_id_set");
                Ok(Vec::new())
            }
            Event::Reasoning(_) => {
                debug!("reasoning event received");
                Ok(Vec::new())
            }
            Event::ToolCall(call) => {
                debug!(tool_id = %call.tool_id, tool_call_id = %call.tool_call_id, "tool_call");
                Ok(Vec::new())
            }
            Event::ToolResult(result) => {
                debug!(
                    tool_id = %result.tool_id,
                    tool_call_id = %result.tool_call_id,
                    results = result.results.len(),
                    "tool_result"
                );
                Ok(Vec::new())
            }
            Event::RoundComplete(round) => {
                debug!(round_id = %round.round.id, "round complete");
                Ok(Vec::new())
            }
            Event::ConversationCreated(info) => {
                debug!(title = %info.title, "conversation created");
                Ok(Vec::new())
            }
            Event::ConversationUpdated(info) => {
                debug!(title = %info.title, "conversation updated");
                Ok(Vec::new())
            }
            Event::Unrecognized { kind, .. } => {
                debug!(kind = %kind, "ignoring unrecognized event");
                Ok(Vec::new())
            }
        }
    }

    /// Marks the end of the event sequence.
    pub fn finish(&mut self) {
        if self.state != AdapterState::Failed {
            self.state = AdapterState::Done;
        }
    }

    /// Marks the turn as failed by a transport error.
    pub fn fail(&mut self) {
        self.state = AdapterState::Failed;
    }

    fn announce_role(&mut self) -> Vec<ChatChunk> {
        if self.state == AdapterState::Init {
            self.state = AdapterState::RoleEmitted;
            vec![ChatChunk::assistant(&self.message_id, "")]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        ConversationIdSet, MessageComplete, RemoteError, ToolCall, ToolProgress,
    };

    fn progress(message: &str) -> Event {
        Event::ToolProgress(ToolProgress {
            message: message.into(),
            tool_call_id: "t1".into(),
        })
    }

    fn complete(id: &str, content: &str) -> Event {
        Event::MessageComplete(MessageComplete {
            message_id: id.into(),
            message_content: content.into(),
        })
    }

    fn run(adapter: &mut ChatAdapter, events: &[Event]) -> Vec<ChatChunk> {
        let mut session = ConversationSession::new();
        let mut chunks = Vec::new();
        for event in events {
            chunks.extend(adapter.on_event(event, &mut session).expect("no error"));
        }
        adapter.finish();
        chunks
    }

    #[test]
    fn progress_then_completion_announces_role_once() {
        let mut adapter = ChatAdapter::new("msg-1");
        let chunks = run(
            &mut adapter,
            &[progress("searching"), complete("m-final", "final answer")],
        );
        assert_eq!(
            chunks,
            vec![
                ChatChunk::assistant("msg-1", ""),
                ChatChunk::assistant("msg-1", "searching"),
                ChatChunk::assistant("m-final", "final answer"),
            ]
        );
        assert_eq!(adapter.state(), AdapterState::Done);
    }

    #[test]
    fn completion_first_uses_its_id_for_the_role_chunk() {
        let mut adapter = ChatAdapter::new("msg-1");
        let chunks = run(&mut adapter, &[complete("m1", "hello")]);
        assert_eq!(
            chunks,
            vec![
                ChatChunk::assistant("m1", ""),
                ChatChunk::assistant("m1", "hello"),
            ]
        );
    }

    #[test]
    fn message_ids_follow_each_round() {
        let mut adapter = ChatAdapter::new("msg-1");
        let chunks = run(
            &mut adapter,
            &[
                complete("m1", "first"),
                progress("more"),
                complete("m2", "second"),
            ],
        );
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m1", "m1", "m2"]);
        assert_eq!(adapter.message_id(), "m2");
    }

    #[test]
    fn observability_events_emit_nothing() {
        let mut adapter = ChatAdapter::new("msg-1");
        let chunks = run(
            &mut adapter,
            &[
                Event::Reasoning(serde_json::json!({"reasoning": "hmm"})),
                Event::ToolCall(ToolCall {
                    tool_call_id: "t1".into(),
                    tool_id: "search".into(),
                    params: serde_json::json!({}),
                }),
                Event::Unrecognized {
                    kind: "heartbeat".into(),
                    body: serde_json::Value::Null,
                },
            ],
        );
        assert!(chunks.is_empty());
        assert_eq!(adapter.state(), AdapterState::Done);
    }

    #[test]
    fn conversation_id_is_forwarded_to_session() {
        let mut adapter = ChatAdapter::new("msg-1");
        let mut session = ConversationSession::new();
        let event = Event::ConversationIdSet(ConversationIdSet {
            conversation_id: "abc123".into(),
        });
        let chunks = adapter.on_event(&event, &mut session).expect("ok");
        assert!(chunks.is_empty());
        assert_eq!(session.get(), Some("abc123"));
        assert_eq!(adapter.state(), AdapterState::Init);
    }

    #[test]
    fn error_event_fails_the_turn_and_stops_processing() {
        let mut adapter = ChatAdapter::new("msg-1");
        let mut session = ConversationSession::new();
        let err = adapter
            .on_event(
                &Event::Error(RemoteError {
                    code: "E1".into(),
                    message: "boom".into(),
                }),
                &mut session,
            )
            .expect_err("error event");
        assert!(err.to_string().contains("boom"));
        assert_eq!(
            err,
            HarnessError::Remote {
                code: "E1".into(),
                message: "boom".into()
            }
        );

        let later = adapter
            .on_event(&complete("m1", "late"), &mut session)
            .expect("ignored");
        assert!(later.is_empty());
        adapter.finish();
        assert_eq!(adapter.state(), AdapterState::Failed);
    }

    #[test]
    fn completion_without_id_keeps_the_current_one() {
        let mut adapter = ChatAdapter::new("msg-1");
        let chunks = run(&mut adapter, &[progress(""), complete("", "answer")]);
        assert_eq!(
            chunks,
            vec![
                ChatChunk::assistant("msg-1", ""),
                ChatChunk::assistant("msg-1", ""),
                ChatChunk::assistant("msg-1", "answer"),
            ]
        );
    }

    #[test]
    fn generated_ids_use_msg_prefix() {
        assert!(ChatAdapter::with_generated_id().message_id().starts_with("msg-"));
    }
}
