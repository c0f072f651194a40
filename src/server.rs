use async_trait::async_trait;
use envoy_types::pb::envoy::service::ext_proc::v3::{
    external_processor_server::{ExternalProcessor, ExternalProcessorServer},
    processing_response, ProcessingRequest, ProcessingResponse,
};
use futures_util::{Stream, StreamExt};
use prost::Message;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    config::ProcessorConfig,
    error::ProcessingError,
    handlers::{Phase, PhaseEvent, StreamController},
    sink::{LoggingSink, RequestSink},
};

pub type ResponseStream = ReceiverStream<Result<ProcessingResponse, Status>>;

/// gRPC face of the processor. Each `Process` call gets its own task and its
/// own `StreamController`; nothing mutable is shared between streams.
#[derive(Clone)]
pub struct ExtProcService {
    config: ProcessorConfig,
    channel_capacity: usize,
    sink: Arc<dyn RequestSink>,
}

impl ExtProcService {
    pub fn new(config: ProcessorConfig, channel_capacity: usize) -> Self {
        Self {
            config,
            channel_capacity: channel_capacity.max(1),
            sink: Arc::new(LoggingSink::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn RequestSink>) -> Self {
        info!("Using request sink: {}", sink.name());
        self.sink = sink;
        self
    }

    pub fn into_server(self) -> ExternalProcessorServer<Self> {
        ExternalProcessorServer::new(self)
    }

    /// Spawns the worker for one inbound stream and returns its response side.
    pub fn open_stream<S>(&self, inbound: S) -> ResponseStream
    where
        S: Stream<Item = Result<ProcessingRequest, Status>> + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let span = info_span!("ext_proc_stream", stream_id = %Uuid::new_v4());

        tokio::spawn(
            drive_stream(inbound, tx, self.config.clone(), self.sink.clone()).instrument(span),
        );

        ReceiverStream::new(rx)
    }
}

#[async_trait]
impl ExternalProcessor for ExtProcService {
    type ProcessStream = ResponseStream;

    async fn process(
        &self,
        request: Request<Streaming<ProcessingRequest>>,
    ) -> Result<Response<Self::ProcessStream>, Status> {
        debug!(remote = ?request.remote_addr(), "Opening processing stream");
        Ok(Response::new(self.open_stream(request.into_inner())))
    }
}

/// Reads events until the peer closes the stream or processing fails. A
/// failure is reported once, then the stream is abandoned along with its
/// request context.
pub async fn drive_stream<S>(
    mut inbound: S,
    tx: mpsc::Sender<Result<ProcessingResponse, Status>>,
    config: ProcessorConfig,
    sink: Arc<dyn RequestSink>,
) where
    S: Stream<Item = Result<ProcessingRequest, Status>> + Unpin,
{
    let mut controller = StreamController::new(config);
    let mut submitted = false;

    while let Some(message) = inbound.next().await {
        let request = match message {
            Ok(request) => {
                debug!(size = request.encoded_len(), "Received processing request");
                request
            }
            Err(status) => {
                debug!(code = ?status.code(), "Inbound stream ended: {}", status.message());
                break;
            }
        };

        let outcome = PhaseEvent::try_from(request).and_then(|event| controller.handle(event));

        match outcome {
            Ok(mutation) => {
                debug!(phase = mutation.phase(), "Sending mutation response");
                if tx.send(Ok(mutation.into())).await.is_err() {
                    debug!("Response receiver dropped");
                    break;
                }

                if controller.phase() == Phase::Completed && !submitted {
                    submitted = true;
                    sink.submit(controller.context()).await;
                }
            }
            Err(e) => {
                error!(
                    kind = e.kind(),
                    request_id = ?controller.context().request_id,
                    "Request processing failed: {}", e
                );
                let _ = tx.send(rejection(e)).await;
                break;
            }
        }
    }

    let phase = controller.phase();
    if phase.is_terminal() {
        debug!(phase = ?phase, "Processing stream closed");
    } else {
        info!(phase = ?phase, "Stream closed before completion, discarding request");
    }
}

fn rejection(e: ProcessingError) -> Result<ProcessingResponse, Status> {
    match e.immediate_response() {
        Some(immediate) => Ok(ProcessingResponse {
            response: Some(processing_response::Response::ImmediateResponse(immediate)),
            ..Default::default()
        }),
        None => Err(e.into()),
    }
}
