use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt as _;
use tracing::{Instrument as _, Span, debug, error};

use crate::adapter::{AdapterState, ChatAdapter};
use crate::chat::ChatChunk;
use crate::errors::HarnessError;
use crate::event::Event;
use crate::session::ConversationSession;
use crate::transport::{
    AbortHandle, AbortSignal, ConverseRequest, ConverseTransport, EventStream, abort_pair,
};

/// Pull-driven chat output of one turn.
///
/// The transport is opened on the first call to `next_chunk`. The stream holds
/// the session mutably for its whole lifetime, so turns on one dialogue cannot
/// overlap.
pub struct ChatStream<'a> {
    turn_id: uuid::Uuid,
    transport: Arc<dyn ConverseTransport>,
    session: &'a mut ConversationSession,
    request: Option<ConverseRequest>,
    events: Option<EventStream>,
    adapter: ChatAdapter,
    queued: VecDeque<ChatChunk>,
    abort_handle: AbortHandle,
    abort: AbortSignal,
    span: Span,
}

impl<'a> ChatStream<'a> {
    pub(crate) fn new(
        transport: Arc<dyn ConverseTransport>,
        session: &'a mut ConversationSession,
        request: ConverseRequest,
    ) -> Self {
        let (abort_handle, abort) = abort_pair();
        let turn_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "turn",
            turn_id = %turn_id,
            session_id = %session.id(),
            conversation_id = tracing::field::Empty,
        );
        Self {
            turn_id,
            transport,
            session,
            request: Some(request),
            events: None,
            adapter: ChatAdapter::with_generated_id(),
            queued: VecDeque::new(),
            abort_handle,
            abort,
            span,
        }
    }

    /// Id of this turn, as used in log fields.
    pub fn turn_id(&self) -> uuid::Uuid {
        self.turn_id
    }

    /// Returns a handle that cancels this turn.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    pub fn state(&self) -> AdapterState {
        self.adapter.state()
    }

    /// Waits for and returns the next chunk.
    ///
    /// Returns `None` once the turn ended, was cancelled, or failed. An error is
    /// returned at most once.
    pub async fn next_chunk(&mut self) -> Option<Result<ChatChunk, HarnessError>> {
        let span = self.span.clone();
        self.pull().instrument(span).await
    }

    async fn pull(&mut self) -> Option<Result<ChatChunk, HarnessError>> {
        loop {
            if self.abort.is_aborted() {
                if !self.adapter.is_terminal() {
                    debug!("turn cancelled");
                }
                self.queued.clear();
                self.adapter.finish();
                return None;
            }
            if let Some(chunk) = self.queued.pop_front() {
                return Some(Ok(chunk));
            }
            if self.adapter.is_terminal() {
                return None;
            }

            if self.events.is_none() {
                match self.open().await {
                    Ok(events) => self.events = Some(events),
                    Err(err) => return Some(Err(self.fail(err))),
                }
            }
            let Some(events) = self.events.as_mut() else {
                return None;
            };

            match events.next().await {
                Some(Ok(event)) => {
                    if self.abort.is_aborted() {
                        continue;
                    }
                    debug!(kind = event.kind(), "event received");
                    if let Event::ConversationIdSet(body) = &event {
                        self.span.record("conversation_id", body.conversation_id.as_str());
                    }
                    match self.adapter.on_event(&event, self.session) {
                        Ok(chunks) => self.queued.extend(chunks),
                        Err(err) => return Some(Err(self.fail(err))),
                    }
                }
                Some(Err(err)) => return Some(Err(self.fail(err.into()))),
                None => {
                    debug!("turn finished");
                    self.adapter.finish();
                }
            }
        }
    }

    /// Drains the turn and concatenates every chunk's content.
    pub async fn collect_text(mut self) -> Result<String, HarnessError> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await {
            text.push_str(&chunk?.content);
        }
        Ok(text)
    }

    async fn open(&mut self) -> Result<EventStream, HarnessError> {
        let request = self
            .request
            .take()
            .ok_or_else(|| HarnessError::Config("converse request already consumed".into()))?
            .conversation_id(self.session.get().map(ToOwned::to_owned));
        if let Some(conversation_id) = &request.conversation_id {
            self.span.record("conversation_id", conversation_id.as_str());
        }
        debug!("starting turn");
        Ok(self
            .transport
            .converse_stream(request, self.abort.clone())
            .await?)
    }

    fn fail(&mut self, err: HarnessError) -> HarnessError {
        self.adapter.fail();
        self.queued.clear();
        self.events = None;
        error!(error = %err, "error streaming from Agent Builder");
        err
    }
}
