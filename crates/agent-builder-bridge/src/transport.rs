use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt as _;
use futures::stream;
use tokio::sync::watch;
use tracing::debug;

use crate::errors::TransportError;
use crate::event::Event;
use crate::sse::SseDecoder;

/// Decoded events of one turn, in arrival order.
pub type EventStream = Pin<Box<dyn futures::Stream<Item = Result<Event, TransportError>> + Send>>;

/// Raw response body chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send>>;

/// Body of a converse request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ConverseRequest {
    pub input: String,
    pub agent_id: String,
    /// Omitted on the first turn of a dialogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub connector_id: String,
    /// Per-request timeout; never sent on the wire.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ConverseRequest {
    pub fn new(
        input: impl Into<String>,
        agent_id: impl Into<String>,
        connector_id: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            agent_id: agent_id.into(),
            conversation_id: None,
            connector_id: connector_id.into(),
            timeout: None,
        }
    }

    pub fn conversation_id(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Opens converse streams against the agent service.
#[async_trait::async_trait]
pub trait ConverseTransport: Send + Sync {
    /// Sends one turn and returns its event stream.
    ///
    /// Implementations must stop yielding (without error) once `abort` fires.
    async fn converse_stream(
        &self,
        request: ConverseRequest,
        abort: AbortSignal,
    ) -> Result<EventStream, TransportError>;
}

/// Handle used to request cancellation of a running turn.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is cooperative: it takes effect at the next read or yield
    /// checkpoint and ends the stream without an error.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving side of an `AbortHandle`.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        abort_pair().1
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Creates a connected cancellation handle and signal.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

/// Turns a raw body into decoded events, honoring `abort` between reads.
pub fn decode_event_stream(bytes_stream: ByteStream, abort: AbortSignal) -> EventStream {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<Event>,
        abort: AbortSignal,
        done: bool,
    }

    let stream = stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            abort,
            done: false,
        },
        |mut state| async move {
            loop {
                if state.abort.is_aborted() {
                    debug!(dropped = state.pending.len(), "converse stream cancelled");
                    state.pending.clear();
                    state.decoder.finish();
                    return Ok(None);
                }
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            state.pending.push_back(Event::from_frame(frame));
                        }
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        state.decoder.finish();
                        state.done = true;
                    }
                }
            }
        },
    );
    Box::pin(stream)
}
