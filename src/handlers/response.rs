use bytes::Bytes;
use envoy_types::pb::envoy::config::core::v3::{HeaderValue, HeaderValueOption};
use envoy_types::pb::envoy::service::ext_proc::v3::{
    body_mutation, common_response::ResponseStatus, processing_response, BodyMutation,
    BodyResponse, CommonResponse, HeaderMutation as EnvoyHeaderMutation, HeadersResponse,
    ProcessingResponse, TrailersResponse,
};

/// Header edits for one phase. `remove` keys are lower-case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMutation {
    pub set: Vec<(String, String)>,
    pub remove: Vec<String>,
}

impl HeaderMutation {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyEdit {
    /// Drop this chunk from the forwarded stream; its bytes are buffered
    Hold,
    /// Forward these bytes in place of the chunk
    Replace(Bytes),
}

/// What the processor tells the proxy for one event. Variants mirror the
/// phase of the event they answer.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationResponse {
    RequestHeaders(HeaderMutation),
    RequestBody {
        body: BodyEdit,
        headers: HeaderMutation,
    },
    RequestTrailers,
    ResponseHeaders,
    ResponseBody,
    ResponseTrailers,
}

impl MutationResponse {
    pub fn phase(&self) -> &'static str {
        match self {
            MutationResponse::RequestHeaders(_) => "request_headers",
            MutationResponse::RequestBody { .. } => "request_body",
            MutationResponse::RequestTrailers => "request_trailers",
            MutationResponse::ResponseHeaders => "response_headers",
            MutationResponse::ResponseBody => "response_body",
            MutationResponse::ResponseTrailers => "response_trailers",
        }
    }
}

impl From<MutationResponse> for ProcessingResponse {
    fn from(mutation: MutationResponse) -> Self {
        use processing_response::Response;

        let response = match mutation {
            MutationResponse::RequestHeaders(headers) => {
                Response::RequestHeaders(headers_response(common(Some(headers), None)))
            }
            MutationResponse::RequestBody { body, headers } => {
                let edit = match body {
                    BodyEdit::Hold => body_mutation::Mutation::ClearBody(true),
                    BodyEdit::Replace(bytes) => body_mutation::Mutation::Body(bytes.to_vec().into()),
                };
                let headers = (!headers.is_empty()).then_some(headers);
                Response::RequestBody(body_response(common(headers, Some(edit))))
            }
            MutationResponse::RequestTrailers => Response::RequestTrailers(TrailersResponse::default()),
            MutationResponse::ResponseHeaders => {
                Response::ResponseHeaders(headers_response(common(None, None)))
            }
            MutationResponse::ResponseBody => Response::ResponseBody(body_response(common(None, None))),
            MutationResponse::ResponseTrailers => {
                Response::ResponseTrailers(TrailersResponse::default())
            }
        };

        ProcessingResponse {
            response: Some(response),
            ..Default::default()
        }
    }
}

fn common(
    headers: Option<HeaderMutation>,
    body: Option<body_mutation::Mutation>,
) -> CommonResponse {
    CommonResponse {
        status: ResponseStatus::Continue as i32,
        header_mutation: headers.map(envoy_header_mutation),
        body_mutation: body.map(|mutation| BodyMutation {
            mutation: Some(mutation),
        }),
        ..Default::default()
    }
}

fn headers_response(response: CommonResponse) -> HeadersResponse {
    HeadersResponse {
        response: Some(response),
    }
}

fn body_response(response: CommonResponse) -> BodyResponse {
    BodyResponse {
        response: Some(response),
    }
}

fn envoy_header_mutation(mutation: HeaderMutation) -> EnvoyHeaderMutation {
    EnvoyHeaderMutation {
        set_headers: mutation
            .set
            .into_iter()
            .map(|(key, value)| HeaderValueOption {
                header: Some(HeaderValue {
                    key,
                    raw_value: value.into_bytes().into(),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect(),
        remove_headers: mutation.remove,
    }
}
