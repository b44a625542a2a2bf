use tracing::{debug, warn};

use crate::event::Event;

/// Continuity state for one logical dialogue.
///
/// The service assigns a conversation id on the first turn; every later turn
/// sends it back so new rounds attach to the same server-side conversation.
/// There is no internal locking: turns on one session must run one at a time.
#[derive(Clone, Debug)]
pub struct ConversationSession {
    id: uuid::Uuid,
    conversation_id: Option<String>,
}

impl ConversationSession {
    /// Creates a session that will start a new dialogue on its first turn.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            conversation_id: None,
        }
    }

    /// Creates a session attached to an existing server-side conversation.
    pub fn resume(conversation_id: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.set(conversation_id.into());
        session
    }

    /// Local id used to correlate log lines across turns.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Returns the conversation id, if the service assigned one yet.
    pub fn get(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Updates continuity state from a stream event.
    ///
    /// Returns `true` when the event set the conversation id.
    pub fn observe(&mut self, event: &Event) -> bool {
        match event {
            Event::ConversationIdSet(body) => self.set(body.conversation_id.clone()),
            _ => false,
        }
    }

    pub(crate) fn set(&mut self, conversation_id: String) -> bool {
        if conversation_id.trim().is_empty() {
            warn!(session_id = %self.id, "ignoring empty conversation id");
            return false;
        }
        match &self.conversation_id {
            Some(existing) => {
                if *existing != conversation_id {
                    warn!(
                        session_id = %self.id,
                        existing = %existing,
                        ignored = %conversation_id,
                        "conversation id already set for this session"
                    );
                }
                false
            }
            None => {
                debug!(session_id = %self.id, conversation_id = %conversation_id, "conversation id set");
                self.conversation_id = Some(conversation_id);
                true
            }
        }
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ConversationIdSet, MessageComplete};

    fn id_set(id: &str) -> Event {
        Event::ConversationIdSet(ConversationIdSet {
            conversation_id: id.into(),
        })
    }

    #[test]
    fn new_session_has_no_conversation_id() {
        assert_eq!(ConversationSession::new().get(), None);
    }

    #[test]
    fn first_id_is_captured_and_kept() {
        let mut session = ConversationSession::new();
        assert!(session.observe(&id_set("abc123")));
        assert_eq!(session.get(), Some("abc123"));

        assert!(!session.observe(&id_set("other")));
        assert!(!session.observe(&id_set("")));
        assert_eq!(session.get(), Some("abc123"));
    }

    #[test]
    fn unrelated_events_do_not_touch_state() {
        let mut session = ConversationSession::new();
        let event = Event::MessageComplete(MessageComplete {
            message_id: "m1".into(),
            message_content: "hello".into(),
        });
        assert!(!session.observe(&event));
        assert_eq!(session.get(), None);
    }

    #[test]
    fn resume_starts_with_known_id() {
        let session = ConversationSession::resume("conv-9");
        assert_eq!(session.get(), Some("conv-9"));
    }
}
