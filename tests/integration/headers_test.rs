use inference_extproc::handlers::{request::handle_request_headers, HeaderEvent};
use inference_extproc::{ProcessorConfig, RequestContext};
use std::collections::HashMap;
use std::sync::Arc;

use super::common::{removed_headers, request_headers, run_stream, CollectingSink, FAIRNESS_KEY};

#[test]
fn test_handle_request_headers() {
    let mut ctx = RequestContext::new();
    let event = HeaderEvent::new(
        vec![
            ("x-test-header", "test-value"),
            (FAIRNESS_KEY, "test-fairness-id-value"),
        ],
        false,
    );

    handle_request_headers(&mut ctx, event, &ProcessorConfig::default());

    assert_eq!(ctx.fairness_id, "test-fairness-id-value");
    assert_eq!(ctx.header("x-test-header"), Some("test-value"));
    assert!(
        !ctx.headers.contains_key(FAIRNESS_KEY),
        "fairness id header should be removed from forwarded headers"
    );
}

#[test]
fn headers_without_reserved_key_are_lowercased_identity() {
    let input = vec![
        ("Content-Type", "application/json"),
        ("X-Project-Id", "TEST_PROJECT"),
        (":path", "/v1/completions"),
    ];

    let mut ctx = RequestContext::new();
    let mutation = handle_request_headers(
        &mut ctx,
        HeaderEvent::new(input.clone(), false),
        &ProcessorConfig::default(),
    );

    let expected: HashMap<String, String> = input
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();
    assert_eq!(ctx.headers, expected);
    assert_eq!(ctx.fairness_id, "");
    assert!(mutation.remove.is_empty());
}

#[test_log::test(tokio::test)]
async fn header_response_removes_fairness_key_on_the_wire() {
    let sink = Arc::new(CollectingSink::default());
    let responses = run_stream(
        ProcessorConfig::default(),
        sink.clone(),
        vec![request_headers(
            &[("x-test-header", "test-value"), ("X-Gateway-Inference-Fairness-Id", "fid-1")],
            true,
        )],
    )
    .await;

    assert_eq!(responses.len(), 1);
    let response = responses[0].as_ref().expect("header phase should succeed");
    assert_eq!(removed_headers(response), vec![FAIRNESS_KEY.to_string()]);

    let contexts = sink.contexts();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].fairness_id, "fid-1");
    assert!(contexts[0].headers.contains_key("x-test-header"));
    assert!(!contexts[0].headers.contains_key(FAIRNESS_KEY));
    assert!(contexts[0].body.is_none());
}
