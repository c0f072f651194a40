use envoy_types::pb::envoy::config::core::v3::{HeaderMap, HeaderValue};
use envoy_types::pb::envoy::service::ext_proc::v3::{
    body_mutation::Mutation, processing_request, processing_response, CommonResponse, HttpBody,
    HttpHeaders, HttpTrailers, ImmediateResponse, ProcessingRequest, ProcessingResponse,
};
use futures_util::StreamExt;
use inference_extproc::{ExtProcService, ProcessorConfig, RequestContext, RequestSink};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tonic::Status;

pub const FAIRNESS_KEY: &str = inference_extproc::metadata::FLOW_FAIRNESS_ID_KEY;

/// Sink that keeps every submitted context for later assertions
#[derive(Default)]
pub struct CollectingSink {
    pub submitted: Mutex<Vec<RequestContext>>,
}

impl CollectingSink {
    pub fn contexts(&self) -> Vec<RequestContext> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RequestSink for CollectingSink {
    async fn submit(&self, request: &RequestContext) {
        self.submitted.lock().unwrap().push(request.clone());
    }

    fn name(&self) -> &str {
        "collecting"
    }
}

pub fn request_headers(pairs: &[(&str, &str)], end_of_stream: bool) -> ProcessingRequest {
    let headers = pairs
        .iter()
        .map(|(key, value)| HeaderValue {
            key: key.to_string(),
            raw_value: value.as_bytes().to_vec().into(),
            ..Default::default()
        })
        .collect();

    ProcessingRequest {
        request: Some(processing_request::Request::RequestHeaders(HttpHeaders {
            headers: Some(HeaderMap { headers }),
            end_of_stream,
            ..Default::default()
        })),
        ..Default::default()
    }
}

pub fn request_body(bytes: &[u8], end_of_stream: bool) -> ProcessingRequest {
    ProcessingRequest {
        request: Some(processing_request::Request::RequestBody(HttpBody {
            body: bytes.to_vec().into(),
            end_of_stream,
            ..Default::default()
        })),
        ..Default::default()
    }
}

pub fn request_trailers() -> ProcessingRequest {
    ProcessingRequest {
        request: Some(processing_request::Request::RequestTrailers(HttpTrailers::default())),
        ..Default::default()
    }
}

pub fn response_headers() -> ProcessingRequest {
    ProcessingRequest {
        request: Some(processing_request::Request::ResponseHeaders(HttpHeaders::default())),
        ..Default::default()
    }
}

/// Runs one full stream through the service and collects everything it sent back
pub async fn run_stream(
    config: ProcessorConfig,
    sink: Arc<CollectingSink>,
    requests: Vec<ProcessingRequest>,
) -> Vec<Result<ProcessingResponse, Status>> {
    run_stream_items(config, sink, requests.into_iter().map(Ok).collect()).await
}

/// Same as `run_stream`, but the inbound side may carry transport errors
pub async fn run_stream_items(
    config: ProcessorConfig,
    sink: Arc<CollectingSink>,
    items: Vec<Result<ProcessingRequest, Status>>,
) -> Vec<Result<ProcessingResponse, Status>> {
    let service = ExtProcService::new(config, 8).with_sink(sink);
    service.open_stream(tokio_stream::iter(items)).collect().await
}

pub fn common_response(response: &ProcessingResponse) -> &CommonResponse {
    use processing_response::Response;
    let common = match response.response.as_ref().expect("response without phase") {
        Response::RequestHeaders(headers) | Response::ResponseHeaders(headers) => &headers.response,
        Response::RequestBody(body) | Response::ResponseBody(body) => &body.response,
        other => panic!("no common response in {:?}", other),
    };
    common.as_ref().expect("empty common response")
}

pub fn replaced_body(response: &ProcessingResponse) -> Value {
    match common_response(response)
        .body_mutation
        .as_ref()
        .and_then(|mutation| mutation.mutation.as_ref())
    {
        Some(Mutation::Body(bytes)) => serde_json::from_slice(&bytes[..]).expect("replacement is not JSON"),
        other => panic!("expected body replacement, got {:?}", other),
    }
}

pub fn removed_headers(response: &ProcessingResponse) -> Vec<String> {
    common_response(response)
        .header_mutation
        .as_ref()
        .map(|mutation| mutation.remove_headers.clone())
        .unwrap_or_default()
}

pub fn set_header(response: &ProcessingResponse, key: &str) -> Option<String> {
    common_response(response)
        .header_mutation
        .as_ref()?
        .set_headers
        .iter()
        .filter_map(|option| option.header.as_ref())
        .find(|header| header.key == key)
        .map(|header| String::from_utf8_lossy(&header.raw_value[..]).into_owned())
}

pub fn immediate_response(response: &ProcessingResponse) -> &ImmediateResponse {
    match response.response.as_ref() {
        Some(processing_response::Response::ImmediateResponse(immediate)) => immediate,
        other => panic!("expected immediate response, got {:?}", other),
    }
}
