use bytes::{Bytes, BytesMut};
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::ProcessingError;
use crate::metadata::body::{INCLUDE_USAGE, MODEL, STREAM, STREAM_OPTIONS};

/// Buffers body chunks in arrival order. Nothing is parsed until the caller
/// takes the buffer at end of stream.
#[derive(Debug)]
pub struct BodyAccumulator {
    buffer: BytesMut,
    limit: usize,
}

impl BodyAccumulator {
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            limit,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<(), ProcessingError> {
        if self.buffer.len() + chunk.len() > self.limit {
            return Err(ProcessingError::BodyTooLarge { limit: self.limit });
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}

/// Result of running the body phase over a complete buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    /// False when `bytes` is the untouched input buffer
    pub mutated: bool,
}

pub fn decode(raw: &[u8]) -> Result<Map<String, Value>, ProcessingError> {
    match serde_json::from_slice::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(ProcessingError::MalformedBody(format!(
            "expected a JSON object at top level, got {}",
            value_kind(&other)
        ))),
    }
}

/// Enables usage reporting for streaming requests and drops it for everything
/// else. Only a literal `"stream": true` counts as streaming. Returns
/// `(streaming, changed)`.
pub fn apply_stream_usage(body: &mut Map<String, Value>) -> (bool, bool) {
    let streaming = matches!(body.get(STREAM), Some(Value::Bool(true)));

    if !streaming {
        let changed = body.remove(STREAM_OPTIONS).is_some();
        return (false, changed);
    }

    let mut options = Map::new();
    options.insert(INCLUDE_USAGE.to_string(), Value::Bool(true));
    let options = Value::Object(options);

    let changed = body.get(STREAM_OPTIONS) != Some(&options);
    body.insert(STREAM_OPTIONS.to_string(), options);
    (true, changed)
}

/// Decodes a complete request body into the context, applies the rewrite and
/// returns the bytes to forward. On error the context is left untouched.
pub fn handle_request_body(
    ctx: &mut RequestContext,
    raw: Bytes,
) -> Result<EncodedBody, ProcessingError> {
    let mut body = decode(&raw)?;
    let (streaming, changed) = apply_stream_usage(&mut body);

    let encoded = if changed {
        EncodedBody {
            bytes: Bytes::from(serde_json::to_vec(&body)?),
            mutated: true,
        }
    } else {
        EncodedBody {
            bytes: raw,
            mutated: false,
        }
    };

    ctx.stream_requested = streaming;
    ctx.model = body.get(MODEL).and_then(Value::as_str).map(str::to_owned);
    ctx.body = Some(body);
    ctx.body_processed = true;

    debug!(
        stream = streaming,
        model = ?ctx.model,
        mutated = encoded.mutated,
        size = encoded.bytes.len(),
        "Request body processed"
    );

    Ok(encoded)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
