use std::sync::Arc;
use std::time::Duration;

use crate::chat::ChatContext;
use crate::config::{AgentBuilderConfig, DEFAULT_AGENT_ID, DEFAULT_CONNECTOR_ID};
use crate::errors::HarnessError;
use crate::session::ConversationSession;
use crate::stream::ChatStream;
use crate::transport::{ConverseRequest, ConverseTransport};

const LABEL: &str = "agent-builder-llm";

/// Per-turn connection options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnOptions {
    /// Optional timeout for the whole streamed request.
    pub timeout: Option<Duration>,
}

impl ConnOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Chat model backed by an Agent Builder agent.
///
/// Each call to `chat` runs one turn; the conversation id assigned by the
/// service on the first turn is reused for every later turn.
pub struct AgentBuilderLlm {
    transport: Arc<dyn ConverseTransport>,
    agent_id: String,
    connector_id: String,
    conn_options: ConnOptions,
    session: ConversationSession,
}

impl AgentBuilderLlm {
    /// Starts a builder around a transport.
    pub fn builder(transport: Arc<dyn ConverseTransport>) -> AgentBuilderLlmBuilder {
        AgentBuilderLlmBuilder {
            transport,
            agent_id: DEFAULT_AGENT_ID.to_string(),
            connector_id: DEFAULT_CONNECTOR_ID.to_string(),
            conn_options: ConnOptions::default(),
            session: None,
        }
    }

    /// Human-readable label for diagnostics.
    pub fn label(&self) -> &'static str {
        LABEL
    }

    /// Model identifier, which is the agent id.
    pub fn model(&self) -> &str {
        &self.agent_id
    }

    pub fn connector_id(&self) -> &str {
        &self.connector_id
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.session.get()
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Starts a turn for the last message of `ctx`.
    ///
    /// Fails before any network call when the last item is not a message or
    /// its text is blank.
    pub fn chat(&mut self, ctx: &ChatContext) -> Result<ChatStream<'_>, HarnessError> {
        self.chat_with_options(ctx, self.conn_options.clone())
    }

    /// Like `chat`, with connection options for this turn only.
    pub fn chat_with_options(
        &mut self,
        ctx: &ChatContext,
        options: ConnOptions,
    ) -> Result<ChatStream<'_>, HarnessError> {
        let message = ctx
            .last_message()
            .ok_or_else(|| HarnessError::validation("No user message found in chat context"))?;
        let input = message.content.text();
        if input.trim().is_empty() {
            return Err(HarnessError::validation("User message is empty"));
        }

        let request = ConverseRequest::new(input, &self.agent_id, &self.connector_id)
            .timeout(options.timeout);
        Ok(ChatStream::new(
            self.transport.clone(),
            &mut self.session,
            request,
        ))
    }
}

/// Builder for `AgentBuilderLlm`.
pub struct AgentBuilderLlmBuilder {
    transport: Arc<dyn ConverseTransport>,
    agent_id: String,
    connector_id: String,
    conn_options: ConnOptions,
    session: Option<ConversationSession>,
}

impl AgentBuilderLlmBuilder {
    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    pub fn connector_id(mut self, connector_id: impl Into<String>) -> Self {
        self.connector_id = connector_id.into();
        self
    }

    /// Takes agent and connector ids from a client config.
    pub fn config(self, config: &AgentBuilderConfig) -> Self {
        self.agent_id(&config.agent_id)
            .connector_id(&config.connector_id)
    }

    /// Default connection options for every turn.
    pub fn conn_options(mut self, options: ConnOptions) -> Self {
        self.conn_options = options;
        self
    }

    /// Continues an existing dialogue instead of starting a new one.
    pub fn session(mut self, session: ConversationSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Result<AgentBuilderLlm, HarnessError> {
        if self.agent_id.trim().is_empty() {
            return Err(HarnessError::Config("agent_id must not be empty".into()));
        }
        if self.connector_id.trim().is_empty() {
            return Err(HarnessError::Config(
                "connector_id must not be empty".into(),
            ));
        }
        Ok(AgentBuilderLlm {
            transport: self.transport,
            agent_id: self.agent_id,
            connector_id: self.connector_id,
            conn_options: self.conn_options,
            session: self.session.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatItem, ChatRole, ContentPart, MessageContent, ChatMessage};
    use crate::errors::TransportError;
    use crate::event::{ConversationIdSet, Event, MessageComplete, ToolProgress};
    use crate::transport::{AbortSignal, EventStream};
    use futures::stream;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTransport {
        calls: AtomicUsize,
        turns: Vec<Vec<Event>>,
        requests: Mutex<Vec<ConverseRequest>>,
    }

    #[async_trait::async_trait]
    impl ConverseTransport for ScriptedTransport {
        async fn converse_stream(
            &self,
            request: ConverseRequest,
            _abort: AbortSignal,
        ) -> Result<EventStream, TransportError> {
            let turn = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().expect("lock").push(request);
            let events = self.turns.get(turn).cloned().unwrap_or_default();
            Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
        }
    }

    fn scripted(turns: Vec<Vec<Event>>) -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport {
            calls: AtomicUsize::new(0),
            turns,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn complete(id: &str, content: &str) -> Event {
        Event::MessageComplete(MessageComplete {
            message_id: id.into(),
            message_content: content.into(),
        })
    }

    fn user(text: &str) -> ChatContext {
        let mut ctx = ChatContext::new();
        ctx.add_message(ChatRole::User, text);
        ctx
    }

    #[test]
    fn exposes_label_and_model() {
        let llm = AgentBuilderLlm::builder(scripted(vec![]))
            .agent_id("orders_agent")
            .build()
            .expect("llm");
        assert_eq!(llm.label(), "agent-builder-llm");
        assert_eq!(llm.model(), "orders_agent");
        assert_eq!(llm.connector_id(), DEFAULT_CONNECTOR_ID);
        assert_eq!(llm.conversation_id(), None);
    }

    #[test]
    fn build_rejects_empty_ids() {
        let result = AgentBuilderLlm::builder(scripted(vec![])).agent_id(" ").build();
        assert!(matches!(result, Err(HarnessError::Config(msg)) if msg.contains("agent_id")));
        let result = AgentBuilderLlm::builder(scripted(vec![]))
            .connector_id("")
            .build();
        assert!(matches!(result, Err(HarnessError::Config(msg)) if msg.contains("connector_id")));
    }

    #[test]
    fn preconditions_are_checked_before_any_call() {
        let transport = scripted(vec![]);
        let mut llm = AgentBuilderLlm::builder(transport.clone()).build().expect("llm");

        let err = llm.chat(&ChatContext::new()).err().expect("empty context");
        assert_eq!(
            err,
            HarnessError::Validation("No user message found in chat context".into())
        );

        let mut ctx = user("hi");
        ctx.push(ChatItem::FunctionCall {
            call_id: "c1".into(),
            name: "lookup".into(),
            arguments: "{}".into(),
        });
        assert!(llm.chat(&ctx).is_err());

        let err = llm.chat(&user("   ")).err().expect("blank message");
        assert_eq!(err, HarnessError::Validation("User message is empty".into()));

        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn multi_turn_dialogue_reuses_the_conversation_id() {
        let transport = scripted(vec![
            vec![
                Event::ConversationIdSet(ConversationIdSet {
                    conversation_id: "abc123".into(),
                }),
                complete("m1", "Nice to meet you, Alice."),
            ],
            vec![
                Event::ToolProgress(ToolProgress {
                    message: "Recalling".into(),
                    tool_call_id: "t1".into(),
                }),
                complete("m2", "Your name is Alice."),
            ],
        ]);
        let mut llm = AgentBuilderLlm::builder(transport.clone())
            .conn_options(ConnOptions::default().timeout(Duration::from_secs(10)))
            .build()
            .expect("llm");

        let mut ctx = user("My name is Alice.");
        let first = llm.chat(&ctx).expect("turn 1").collect_text().await.expect("text");
        assert_eq!(first, "Nice to meet you, Alice.");
        assert_eq!(llm.conversation_id(), Some("abc123"));

        ctx.add_message(ChatRole::Assistant, first);
        ctx.push(ChatItem::Message(ChatMessage {
            role: ChatRole::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text("What is".into()),
                ContentPart::Json(serde_json::json!({"text": "my name?"})),
            ]),
        }));
        let second = llm.chat(&ctx).expect("turn 2").collect_text().await.expect("text");
        // Progress text and final text are both delivered as content.
        assert_eq!(second, "RecallingYour name is Alice.");

        let requests = transport.requests.lock().expect("lock");
        assert_eq!(requests[0].conversation_id, None);
        assert_eq!(requests[0].input, "My name is Alice.");
        assert_eq!(requests[1].conversation_id.as_deref(), Some("abc123"));
        assert_eq!(requests[1].input, "What is my name?");
        assert_eq!(requests[1].agent_id, DEFAULT_AGENT_ID);
        assert_eq!(requests[1].timeout, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn resumed_session_sends_its_id_on_the_first_turn() {
        let transport = scripted(vec![vec![complete("m1", "welcome back")]]);
        let mut llm = AgentBuilderLlm::builder(transport.clone())
            .session(ConversationSession::resume("conv-9"))
            .build()
            .expect("llm");
        llm.chat(&user("hello again"))
            .expect("turn")
            .collect_text()
            .await
            .expect("text");
        let requests = transport.requests.lock().expect("lock");
        assert_eq!(requests[0].conversation_id.as_deref(), Some("conv-9"));
    }
}
