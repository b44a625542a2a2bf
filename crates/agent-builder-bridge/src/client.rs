use futures::StreamExt as _;
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use crate::config::AgentBuilderConfig;
use crate::errors::{HarnessError, TransportError};
use crate::event::Event;
use crate::sse::parse_events;
use crate::transport::{
    AbortSignal, ByteStream, ConverseRequest, ConverseTransport, EventStream, decode_event_stream,
};

/// HTTP client for the Agent Builder converse API.
pub struct AgentBuilderClient {
    client: reqwest::Client,
    config: AgentBuilderConfig,
}

#[derive(serde::Serialize)]
struct OneShotBody<'a> {
    input: &'a str,
    agent_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
}

impl AgentBuilderClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: AgentBuilderConfig) -> Result<Self, HarnessError> {
        if config.api_key.trim().is_empty() {
            return Err(HarnessError::Config(
                "Agent Builder api_key must not be empty".into(),
            ));
        }
        if config.base_url.trim().is_empty() {
            return Err(HarnessError::Config(
                "Agent Builder base_url must not be empty".into(),
            ));
        }
        // Connect timeout only; streamed bodies have no length bound.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client from `KIBANA_BASE_URL` / `KIBANA_API_KEY`.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::new(AgentBuilderConfig::from_env()?)
    }

    pub fn config(&self) -> &AgentBuilderConfig {
        &self.config
    }

    fn post(&self) -> reqwest::RequestBuilder {
        self.client
            .post(self.config.converse_url())
            .header(AUTHORIZATION, format!("ApiKey {}", self.config.api_key))
            .header("kbn-xsrf", "true")
    }

    /// Sends one turn and waits for the whole body before decoding it.
    ///
    /// The request is bounded by the configured timeout and carries no
    /// connector id, so the agent's default connector is used.
    pub async fn converse(
        &self,
        input: &str,
        agent_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Vec<Event>, TransportError> {
        let response = self
            .post()
            .timeout(self.config.timeout)
            .json(&OneShotBody {
                input,
                agent_id,
                conversation_id,
            })
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let text = response.text().await?;
        let events = parse_events(&text);
        debug!(events = events.len(), "one-shot converse finished");
        Ok(events)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(TransportError::status(status.as_u16(), body))
}

#[async_trait::async_trait]
impl ConverseTransport for AgentBuilderClient {
    async fn converse_stream(
        &self,
        request: ConverseRequest,
        abort: AbortSignal,
    ) -> Result<EventStream, TransportError> {
        debug!(
            agent_id = %request.agent_id,
            connector_id = %request.connector_id,
            conversation_id = ?request.conversation_id,
            "opening converse stream"
        );
        let mut http_req = self.post().json(&request);
        if let Some(timeout) = request.timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = ensure_success(http_req.send().await?).await?;
        if response.content_length() == Some(0) {
            return Err(TransportError::MissingBody);
        }

        let bytes_stream: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from)),
        );
        Ok(decode_event_stream(bytes_stream, abort))
    }
}
