use envoy_types::pb::envoy::r#type::v3::{HttpStatus, StatusCode};
use envoy_types::pb::envoy::service::ext_proc::v3::ImmediateResponse;
use serde_json::json;
use tonic::Status;

use crate::handlers::stream::Phase;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Unexpected {event} event while {state:?}")]
    ProtocolSequenceViolation { state: Phase, event: &'static str },

    #[error("Processing request carried no phase")]
    EmptyRequest,
}

impl ProcessingError {
    /// The HTTP rejection sent back through the proxy for errors that are the
    /// client's fault. Protocol errors have none: the stream is aborted instead.
    pub fn immediate_response(&self) -> Option<ImmediateResponse> {
        let code = match self {
            ProcessingError::MalformedBody(_) => StatusCode::BadRequest,
            ProcessingError::BodyTooLarge { .. } => StatusCode::PayloadTooLarge,
            ProcessingError::ProtocolSequenceViolation { .. } | ProcessingError::EmptyRequest => {
                return None
            }
        };

        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        })
        .to_string();

        Some(ImmediateResponse {
            status: Some(HttpStatus { code: code as i32 }),
            body: body.into(),
            details: self.kind().to_string(),
            ..Default::default()
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::MalformedBody(_) => "malformed_body",
            ProcessingError::BodyTooLarge { .. } => "body_too_large",
            ProcessingError::ProtocolSequenceViolation { .. } => "protocol_sequence_violation",
            ProcessingError::EmptyRequest => "empty_request",
        }
    }
}

impl From<serde_json::Error> for ProcessingError {
    fn from(e: serde_json::Error) -> Self {
        ProcessingError::MalformedBody(e.to_string())
    }
}

impl From<ProcessingError> for Status {
    fn from(e: ProcessingError) -> Self {
        match &e {
            ProcessingError::MalformedBody(_) => Status::invalid_argument(e.to_string()),
            ProcessingError::BodyTooLarge { .. } => Status::resource_exhausted(e.to_string()),
            ProcessingError::ProtocolSequenceViolation { .. } => {
                Status::failed_precondition(e.to_string())
            }
            ProcessingError::EmptyRequest => Status::invalid_argument(e.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be true or false, got {value:?}")]
    InvalidBool { key: &'static str, value: String },

    #[error("Invalid listen address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),
}
