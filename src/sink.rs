use async_trait::async_trait;
use tracing::info;

use crate::context::RequestContext;

/// Receives every request that reaches `Completed`, exactly once, as a
/// read-only view. Scheduling and admission live behind this seam.
#[async_trait]
pub trait RequestSink: Send + Sync {
    async fn submit(&self, request: &RequestContext);
    fn name(&self) -> &str;
}

pub struct LoggingSink;

impl LoggingSink {
    pub fn new() -> Self {
        LoggingSink
    }
}

impl Default for LoggingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestSink for LoggingSink {
    async fn submit(&self, request: &RequestContext) {
        info!(
            request_id = ?request.request_id,
            fairness_id = %request.fairness_id,
            model = ?request.model,
            stream = request.stream_requested,
            headers = request.headers.len(),
            "Request ready for scheduling"
        );
    }

    fn name(&self) -> &str {
        "logging"
    }
}
