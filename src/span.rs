//! Starting and ending group and test spans.

use std::{
    borrow::Cow,
    future::Future,
    panic::{self, AssertUnwindSafe},
};

use futures::FutureExt as _;
use opentelemetry::{
    Context,
    context::FutureExt as _,
    global::BoxedTracer,
    trace::{Status, TraceContextExt, Tracer},
};

use crate::{
    context::{self, resolve_parent_context},
    test::TestResult,
    tree::TestTreeNode,
};

/// Start the span of `node`, parented by its enclosing group.
///
/// Called from the group's setup hook. A second call for the same node keeps
/// the first span and starts nothing.
pub fn start_group_span(tracer: &BoxedTracer, node: &TestTreeNode) {
    if node.context().is_some() {
        tracing::warn!(group = node.name(), "group span already started");
        return;
    }

    let parent_cx = resolve_parent_context(node.parent());
    let span = tracer.start_with_context(node.name().to_owned(), &parent_cx);
    let cx = parent_cx.with_span(span);
    tracing::debug!(
        group = node.name(),
        path = ?node.path(),
        span_id = %cx.span().span_context().span_id(),
        "started group span"
    );

    if let Err(cx) = node.set_context(cx) {
        cx.span().end();
    }
}

/// End the span of `node`.
///
/// Called from the group's teardown hook. Does nothing if the group never
/// started.
pub fn end_group_span(node: &TestTreeNode) {
    let Some(cx) = node.context() else {
        return;
    };

    tracing::debug!(group = node.name(), "ending group span");
    cx.span().end();
}

/// Run a test callback inside a freshly started span named `name`.
///
/// The span is a child of the active context. If that context carries no
/// valid span, the test span is seeded from `TRACEPARENT` instead.
/// `f` is called with the span already active, and its future is polled with
/// the span active.
///
/// The span ends as soon as the callback settles. Errors and panics are
/// recorded on the span and then handed back unchanged. If the returned
/// future is dropped before it settles, dropping the span ends it.
pub async fn run_test_inside_span<F, Fut>(
    tracer: &BoxedTracer,
    name: impl Into<Cow<'static, str>>,
    f: F,
) -> TestResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = TestResult>,
{
    let parent_cx = context::inject_trace_parent_in_context();
    let span = tracer.start_with_context(name, &parent_cx);
    let cx = parent_cx.with_span(span);

    let called = {
        let _guard = cx.clone().attach();
        panic::catch_unwind(AssertUnwindSafe(f))
    };
    let settled = match called {
        Ok(fut) => {
            AssertUnwindSafe(fut.with_context(cx.clone()))
                .catch_unwind()
                .await
        }
        Err(payload) => Err(payload),
    };

    let span = cx.span();
    match &settled {
        Ok(TestResult(Ok(()))) => span.set_status(Status::Ok),
        Ok(TestResult(Err(msg))) => span.set_status(Status::error(msg.clone())),
        Err(payload) => span.set_status(Status::error(panic_message(payload.as_ref()))),
    }
    span.end();

    match settled {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Run `fut` with `cx` as the active context while it is polled.
pub fn in_context<Fut: Future>(cx: Context, fut: Fut) -> impl Future<Output = Fut::Output> {
    fut.with_context(cx)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_owned();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "test panicked".to_owned()
}
