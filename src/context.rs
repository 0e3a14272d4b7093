//! Resolving the parent context of a group or test at execution time.

use std::{collections::HashMap, env};

use opentelemetry::{Context, propagation::TextMapPropagator, trace::TraceContextExt};
use opentelemetry_sdk::propagation::TraceContextPropagator;

use crate::tree::TestTreeNode;

/// Environment variable holding the W3C trace-parent of the invoking pipeline.
pub const TRACEPARENT: &str = "TRACEPARENT";

/// Whether `cx` carries a span with a valid span context.
pub fn has_valid_span(cx: &Context) -> bool {
    cx.span().span_context().is_valid()
}

/// Seed `cx` with the remote parent from [`TRACEPARENT`].
///
/// If `cx` already carries a valid span it is returned unchanged and the
/// environment is not consulted. A missing, empty or malformed value leaves
/// the context without a parent.
pub fn inject_trace_parent(cx: Context) -> Context {
    if has_valid_span(&cx) {
        return cx;
    }

    let Ok(trace_parent) = env::var(TRACEPARENT) else {
        return cx;
    };
    if trace_parent.is_empty() {
        return cx;
    }

    let carrier = HashMap::from([("traceparent".to_owned(), trace_parent)]);
    let seeded = TraceContextPropagator::new().extract_with_context(&cx, &carrier);
    match has_valid_span(&seeded) {
        true => {
            tracing::debug!(
                trace_id = %seeded.span().span_context().trace_id(),
                "seeded context from {TRACEPARENT}"
            );
            seeded
        }
        false => {
            tracing::warn!(
                value = carrier["traceparent"].as_str(),
                "ignoring malformed {TRACEPARENT}"
            );
            cx
        }
    }
}

/// [`inject_trace_parent`] applied to the currently active context.
pub fn inject_trace_parent_in_context() -> Context {
    inject_trace_parent(Context::current())
}

/// Resolve the context a group or test span should be parented by.
///
/// `node` is the nearest enclosing group, captured at registration time.
///
/// 1. the group's own context, once its span started
/// 2. otherwise the active context, if it already carries a valid span
/// 3. otherwise the active context seeded from [`TRACEPARENT`]
pub fn resolve_parent_context(node: Option<&TestTreeNode>) -> Context {
    if let Some(cx) = node.and_then(TestTreeNode::context) {
        return cx.clone();
    }

    inject_trace_parent_in_context()
}
