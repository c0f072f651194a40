use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::event::HeaderEvent;
use super::response::HeaderMutation;
use crate::config::ProcessorConfig;
use crate::context::RequestContext;
use crate::metadata::{FLOW_FAIRNESS_ID_KEY, REQUEST_ID_KEY};

/// Folds a header frame into the context and returns the mutation the proxy
/// must apply. Header keys are compared lower-cased; the fairness key is
/// captured and listed for removal instead of being forwarded.
pub fn handle_request_headers(
    ctx: &mut RequestContext,
    event: HeaderEvent,
    config: &ProcessorConfig,
) -> HeaderMutation {
    let mut mutation = HeaderMutation::default();

    for (key, value) in event.pairs {
        let key = key.to_ascii_lowercase();

        if key == FLOW_FAIRNESS_ID_KEY {
            ctx.fairness_id = value;
            if !mutation.remove.contains(&key) {
                mutation.remove.push(key);
            }
            continue;
        }

        ctx.headers.insert(key, value);
    }

    ctx.request_id = ctx.headers.get(REQUEST_ID_KEY).cloned();
    if ctx.request_id.is_none() && config.generate_request_id {
        let request_id = Uuid::new_v4().to_string();
        debug!(request_id = %request_id, "Generated request id");
        ctx.headers
            .insert(REQUEST_ID_KEY.to_string(), request_id.clone());
        mutation
            .set
            .push((REQUEST_ID_KEY.to_string(), request_id.clone()));
        ctx.request_id = Some(request_id);
    }

    ctx.received_at = Some(Utc::now());
    ctx.headers_processed = true;

    debug!(
        headers = ctx.headers.len(),
        fairness_id = %ctx.fairness_id,
        removed = ?mutation.remove,
        "Request headers normalized"
    );

    mutation
}
