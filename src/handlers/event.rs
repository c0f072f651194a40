use bytes::Bytes;
use envoy_types::pb::envoy::config::core::v3::HeaderValue;
use envoy_types::pb::envoy::service::ext_proc::v3::{
    processing_request::Request, HttpBody, HttpHeaders, ProcessingRequest,
};

use crate::error::ProcessingError;

/// One header frame off the stream. Pairs keep their arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderEvent {
    pub pairs: Vec<(String, String)>,
    pub end_of_stream: bool,
}

impl HeaderEvent {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>, end_of_stream: bool) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            end_of_stream,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyChunk {
    pub bytes: Bytes,
    pub end_of_stream: bool,
}

impl BodyChunk {
    pub fn new(bytes: impl Into<Bytes>, end_of_stream: bool) -> Self {
        Self {
            bytes: bytes.into(),
            end_of_stream,
        }
    }
}

/// A phase-tagged event, decoupled from the wire message it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEvent {
    RequestHeaders(HeaderEvent),
    RequestBody(BodyChunk),
    RequestTrailers,
    ResponseHeaders,
    ResponseBody,
    ResponseTrailers,
}

impl PhaseEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PhaseEvent::RequestHeaders(_) => "request_headers",
            PhaseEvent::RequestBody(_) => "request_body",
            PhaseEvent::RequestTrailers => "request_trailers",
            PhaseEvent::ResponseHeaders => "response_headers",
            PhaseEvent::ResponseBody => "response_body",
            PhaseEvent::ResponseTrailers => "response_trailers",
        }
    }
}

impl TryFrom<ProcessingRequest> for PhaseEvent {
    type Error = ProcessingError;

    fn try_from(request: ProcessingRequest) -> Result<Self, Self::Error> {
        let event = match request.request.ok_or(ProcessingError::EmptyRequest)? {
            Request::RequestHeaders(headers) => PhaseEvent::RequestHeaders(headers.into()),
            Request::RequestBody(body) => PhaseEvent::RequestBody(body.into()),
            Request::RequestTrailers(_) => PhaseEvent::RequestTrailers,
            Request::ResponseHeaders(_) => PhaseEvent::ResponseHeaders,
            Request::ResponseBody(_) => PhaseEvent::ResponseBody,
            Request::ResponseTrailers(_) => PhaseEvent::ResponseTrailers,
        };
        Ok(event)
    }
}

impl From<HttpHeaders> for HeaderEvent {
    fn from(headers: HttpHeaders) -> Self {
        let pairs = headers
            .headers
            .map(|map| map.headers.into_iter().map(header_pair).collect())
            .unwrap_or_default();

        Self {
            pairs,
            end_of_stream: headers.end_of_stream,
        }
    }
}

impl From<HttpBody> for BodyChunk {
    fn from(body: HttpBody) -> Self {
        Self {
            bytes: Bytes::from(body.body),
            end_of_stream: body.end_of_stream,
        }
    }
}

// Envoy fills either `value` or `raw_value` depending on its version and config
fn header_pair(header: HeaderValue) -> (String, String) {
    let value = if header.value.is_empty() {
        String::from_utf8_lossy(&header.raw_value).into_owned()
    } else {
        header.value
    };
    (header.key, value)
}
