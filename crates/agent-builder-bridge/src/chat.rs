/// Speaker of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One piece of message content.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// Structured content; contributes its `text` field when present.
    Json(serde_json::Value),
}

impl ContentPart {
    fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => match value.get("text") {
                Some(serde_json::Value::String(text)) => text.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        }
    }
}

/// Content of a chat message.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flattens the content into the text sent as the turn input.
    ///
    /// Parts are joined with a single space and the result is trimmed.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .map(ContentPart::text)
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

/// An entry of the host conversation history.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChatItem {
    Message(ChatMessage),
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

/// Ordered conversation history handed to `AgentBuilderLlm::chat`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatContext {
    pub items: Vec<ChatItem>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text message.
    pub fn add_message(&mut self, role: ChatRole, content: impl Into<String>) -> &mut Self {
        self.items.push(ChatItem::Message(ChatMessage {
            role,
            content: MessageContent::Text(content.into()),
        }));
        self
    }

    /// Appends an arbitrary item.
    pub fn push(&mut self, item: ChatItem) -> &mut Self {
        self.items.push(item);
        self
    }

    /// Returns the last item when it is a message.
    pub fn last_message(&self) -> Option<&ChatMessage> {
        match self.items.last() {
            Some(ChatItem::Message(message)) => Some(message),
            _ => None,
        }
    }
}

/// Assistant output delta delivered to the downstream sink.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatChunk {
    /// Id of the message being produced.
    pub id: String,
    pub role: ChatRole,
    pub content: String,
}

impl ChatChunk {
    pub(crate) fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
