use serde::Serialize;
use tracing::{debug, warn};

use super::body::{self, BodyAccumulator};
use super::event::{BodyChunk, HeaderEvent, PhaseEvent};
use super::request;
use super::response::{BodyEdit, HeaderMutation, MutationResponse};
use crate::config::ProcessorConfig;
use crate::context::RequestContext;
use crate::error::ProcessingError;
use crate::metadata::CONTENT_LENGTH_KEY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    AwaitingHeaders,
    ProcessingHeaders,
    AwaitingBody,
    ProcessingBody,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Per-stream state machine. Consumes events strictly in arrival order and
/// answers each with exactly one response until it fails; after that it
/// answers nothing.
///
/// ```text
/// AwaitingHeaders -> ProcessingHeaders -> AwaitingBody -> ProcessingBody -> Completed
///                                      \-> Completed (headers carried end_of_stream)
/// any non-terminal state -> Failed
/// ```
///
/// Response-phase events sit outside this machine and pass through
/// unchanged in every state except `Failed`.
#[derive(Debug)]
pub struct StreamController {
    phase: Phase,
    ctx: RequestContext,
    body: BodyAccumulator,
    config: ProcessorConfig,
}

impl StreamController {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            phase: Phase::AwaitingHeaders,
            ctx: RequestContext::new(),
            body: BodyAccumulator::new(config.max_body_bytes),
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn handle(&mut self, event: PhaseEvent) -> Result<MutationResponse, ProcessingError> {
        debug!(phase = ?self.phase, event = event.name(), "Handling stream event");

        if self.phase == Phase::Failed {
            return Err(self.violation(event.name()));
        }

        let result = match event {
            PhaseEvent::RequestHeaders(headers) => self.on_request_headers(headers),
            PhaseEvent::RequestBody(chunk) => self.on_request_body(chunk),
            PhaseEvent::RequestTrailers => self.on_request_trailers(),
            PhaseEvent::ResponseHeaders => Ok(MutationResponse::ResponseHeaders),
            PhaseEvent::ResponseBody => Ok(MutationResponse::ResponseBody),
            PhaseEvent::ResponseTrailers => Ok(MutationResponse::ResponseTrailers),
        };

        if let Err(e) = &result {
            warn!(
                phase = ?self.phase,
                request_id = ?self.ctx.request_id,
                error = %e,
                "Stream failed"
            );
            self.phase = Phase::Failed;
        }

        result
    }

    fn on_request_headers(
        &mut self,
        event: HeaderEvent,
    ) -> Result<MutationResponse, ProcessingError> {
        if self.phase != Phase::AwaitingHeaders {
            return Err(self.violation("request_headers"));
        }

        self.phase = Phase::ProcessingHeaders;
        let end_of_stream = event.end_of_stream;
        let mutation = request::handle_request_headers(&mut self.ctx, event, &self.config);

        self.phase = if end_of_stream {
            Phase::Completed
        } else {
            Phase::AwaitingBody
        };

        Ok(MutationResponse::RequestHeaders(mutation))
    }

    fn on_request_body(&mut self, chunk: BodyChunk) -> Result<MutationResponse, ProcessingError> {
        if !matches!(self.phase, Phase::AwaitingBody | Phase::ProcessingBody) {
            return Err(self.violation("request_body"));
        }

        self.phase = Phase::ProcessingBody;
        self.body.push(&chunk.bytes)?;

        if !chunk.end_of_stream {
            debug!(buffered = self.body.len(), "Holding back body chunk");
            return Ok(MutationResponse::RequestBody {
                body: BodyEdit::Hold,
                headers: HeaderMutation::default(),
            });
        }

        let encoded = body::handle_request_body(&mut self.ctx, self.body.take())?;
        self.phase = Phase::Completed;

        let mut headers = HeaderMutation::default();
        if encoded.mutated {
            headers
                .set
                .push((CONTENT_LENGTH_KEY.to_string(), encoded.bytes.len().to_string()));
        }

        Ok(MutationResponse::RequestBody {
            body: BodyEdit::Replace(encoded.bytes),
            headers,
        })
    }

    fn on_request_trailers(&mut self) -> Result<MutationResponse, ProcessingError> {
        match self.phase {
            // Headers without end_of_stream followed straight by trailers: no body
            Phase::AwaitingBody => {
                self.phase = Phase::Completed;
                Ok(MutationResponse::RequestTrailers)
            }
            // Envoy leaves the last chunk without end_of_stream when trailers follow
            Phase::ProcessingBody => {
                let held = self.body.take();
                warn!(
                    held = held.len(),
                    "Trailers ended the body; held-back chunks are not forwarded"
                );
                body::handle_request_body(&mut self.ctx, held)?;
                self.phase = Phase::Completed;
                Ok(MutationResponse::RequestTrailers)
            }
            Phase::Completed => Ok(MutationResponse::RequestTrailers),
            _ => Err(self.violation("request_trailers")),
        }
    }

    fn violation(&self, event: &'static str) -> ProcessingError {
        ProcessingError::ProtocolSequenceViolation {
            state: self.phase,
            event,
        }
    }
}
