/// Header carrying the flow-control fairness identifier. Gateway-internal: it
/// is captured into the request context and never forwarded to a model server.
pub const FLOW_FAIRNESS_ID_KEY: &str = "x-gateway-inference-fairness-id";

/// Correlation id header, captured for logging and the downstream hand-off.
pub const REQUEST_ID_KEY: &str = "x-request-id";

pub const CONTENT_LENGTH_KEY: &str = "content-length";

/// Request body fields the processor reads or rewrites
pub mod body {
    pub const MODEL: &str = "model";
    pub const PROMPT: &str = "prompt";
    pub const STREAM: &str = "stream";
    pub const STREAM_OPTIONS: &str = "stream_options";
    pub const INCLUDE_USAGE: &str = "include_usage";
}
