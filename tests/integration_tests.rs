//! End-to-end tests: a call's context crossing a simulated wire:
//! client builds and tags the request, the headers travel as JSON, the
//! server rebuilds the context and answers, the client routes the reply.

use std::collections::HashMap;

use muxrpc_context::headers::{CORRELATION_ID, OP_ID};
use muxrpc_context::{
    ContextConfig, ContextError, Headers, OpIdSequence, RequestContext, SharedContext,
};
use serde_json::{Value, json};

/// Encode headers the way a JSON transport would put them on the wire.
fn to_wire(headers: &Headers) -> String {
    serde_json::to_string(headers).unwrap()
}

fn from_wire(frame: &str) -> Headers {
    serde_json::from_str(frame).unwrap()
}

/// Server half of a hop: rebuild the context, handle, return response headers.
fn serve(frame: &str) -> Result<String, ContextError> {
    let config = ContextConfig::new().with_generator(|| "server-generated".to_string());
    let mut ctx = RequestContext::from_request_headers(from_wire(frame), &config)?;
    let greeting = ctx
        .request_header("name")
        .map(|n| format!("hello {n}"))
        .unwrap_or_default();
    ctx.add_response_header("greeting", greeting);
    Ok(to_wire(&ctx.response_headers()))
}

#[test]
fn request_response_roundtrip() {
    let seq = OpIdSequence::new();
    let mut ctx = RequestContext::new("fooid");
    ctx.add_request_header("name", "ada");
    let op_id = seq.assign(&mut ctx);

    let reply = serve(&to_wire(&ctx.request_headers())).unwrap();
    ctx.merge_response_headers(from_wire(&reply)).unwrap();

    assert_eq!(ctx.response_header("greeting"), Some("hello ada"));
    assert_eq!(ctx.response_op_id().unwrap(), op_id);
    assert_eq!(ctx.response_header(CORRELATION_ID), Some("fooid"));
}

#[test]
fn out_of_order_replies_route_to_their_callers() {
    let seq = OpIdSequence::new();
    let mut pending: HashMap<u64, RequestContext> = HashMap::new();
    let mut frames = Vec::new();

    for name in ["a", "b", "c"] {
        let mut ctx = RequestContext::new(format!("call-{name}"));
        ctx.add_request_header("name", name);
        let op_id = seq.assign(&mut ctx);
        frames.push(to_wire(&ctx.request_headers()));
        pending.insert(op_id, ctx);
    }

    // Replies arrive in reverse order
    let replies: Vec<String> = frames.iter().rev().map(|f| serve(f).unwrap()).collect();
    for reply in replies {
        let headers = from_wire(&reply);
        let op_id: u64 = headers[OP_ID].parse().unwrap();
        let ctx = pending.get_mut(&op_id).unwrap();
        ctx.merge_response_headers(headers).unwrap();
    }

    for ctx in pending.values() {
        let name = ctx.request_header("name").unwrap();
        assert_eq!(ctx.response_header("greeting"), Some(format!("hello {name}").as_str()));
        assert_eq!(ctx.response_header(CORRELATION_ID), Some(ctx.correlation_id()));
    }
}

#[test]
fn misrouted_reply_is_rejected() {
    let seq = OpIdSequence::new();
    let mut first = RequestContext::new("first");
    let mut second = RequestContext::new("second");
    seq.assign(&mut first);
    seq.assign(&mut second);

    let reply_for_second = serve(&to_wire(&second.request_headers())).unwrap();
    let err = first.merge_response_headers(from_wire(&reply_for_second)).unwrap_err();
    assert_eq!(err, ContextError::OpIdMismatch { expected: 1, actual: 2 });
    assert!(err.is_routing_error());
}

#[test]
fn retry_keeps_correlation_id_with_fresh_op_id() {
    let seq = OpIdSequence::new();
    let mut ctx = RequestContext::new("");
    ctx.add_request_header("name", "retry");
    let first_op = seq.assign(&mut ctx);

    let mut retry = ctx.fork();
    let second_op = seq.assign(&mut retry);
    assert_ne!(first_op, second_op);
    assert_eq!(retry.correlation_id(), ctx.correlation_id());

    let reply = serve(&to_wire(&retry.request_headers())).unwrap();
    retry.merge_response_headers(from_wire(&reply)).unwrap();
    assert_eq!(retry.response_header("greeting"), Some("hello retry"));
}

#[test]
fn server_rejects_frame_without_op_id() {
    let frame = json!({ CORRELATION_ID: "fooid", "name": "x" }).to_string();
    assert_eq!(serve(&frame), Err(ContextError::MissingOpId));
}

#[test]
fn server_generates_correlation_id_when_missing() {
    let frame = json!({ OP_ID: "8" }).to_string();
    let reply: Value = serde_json::from_str(&serve(&frame).unwrap()).unwrap();
    assert_eq!(reply[CORRELATION_ID], "server-generated");
    assert_eq!(reply[OP_ID], "8");
}

#[test]
fn shared_context_observed_by_tracing_reader() {
    let seq = OpIdSequence::new();
    let shared = SharedContext::new(RequestContext::new("traced"));
    let exporter_view = shared.clone();

    shared.update(|ctx| seq.assign(ctx));
    let frame = to_wire(&shared.request_headers());
    let reply = serve(&frame).unwrap();
    shared
        .update(|ctx| ctx.merge_response_headers(from_wire(&reply)))
        .unwrap();

    let snapshot = exporter_view.snapshot();
    assert_eq!(snapshot.request_headers[CORRELATION_ID], "traced");
    assert_eq!(snapshot.response_headers[OP_ID], "1");
}
