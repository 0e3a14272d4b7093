use std::{
    cell::RefCell,
    mem,
    panic::AssertUnwindSafe,
    sync::Once,
    task::Poll,
};

use futures::{
    FutureExt as _,
    executor::block_on,
    future::{self, join_all},
};
use opentelemetry::{
    global::BoxedTracer,
    trace::{SpanId, TraceId},
};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

use crate::{
    context::TRACEPARENT,
    host::{GroupKind, Hook, TestHost, TestKind},
    telemetry::{self, Telemetry},
    test::{TestFnHandle, TestResult},
};

pub const TRACE_PARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

pub fn remote_trace_id() -> TraceId {
    TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap()
}

pub fn remote_span_id() -> SpanId {
    SpanId::from_hex("b7ad6b7169203331").unwrap()
}

/// Run `f` with `TRACEPARENT` set to `value`, or removed for `None`.
///
/// temp-env serializes all environment changes, so tests pinning the variable
/// never observe each other.
pub fn with_trace_parent<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
    temp_env::with_var(TRACEPARENT, value, f)
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Tracer provider exporting into memory.
///
/// Spans go through a batch processor whose worker thread does the exporting,
/// so spans can end inside a running executor. Reading spans flushes first.
pub struct SpanFixture {
    exporter: InMemorySpanExporter,
    provider: SdkTracerProvider,
    telemetry: Telemetry,
}

impl SpanFixture {
    pub fn new() -> Self {
        init_tracing();
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter.clone())
            .build();
        Self {
            exporter,
            telemetry: Telemetry::new(provider.clone()),
            provider,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn tracer(&self) -> BoxedTracer {
        self.telemetry.tracer("otel-test-runner/test")
    }

    pub fn spans(&self) -> Vec<SpanData> {
        let _ = self.provider.force_flush();
        self.exporter.get_finished_spans().unwrap()
    }

    /// Names of all ended spans, in the order they ended.
    pub fn span_names(&self) -> Vec<String> {
        self.spans().into_iter().map(|s| s.name.into_owned()).collect()
    }

    pub fn span(&self, name: &str) -> SpanData {
        let mut matching = self.spans().into_iter().filter(|s| s.name == name);
        let span = matching
            .next()
            .unwrap_or_else(|| panic!("no span named {name:?}, got {:?}", self.span_names()));
        assert!(matching.next().is_none(), "more than one span named {name:?}");
        span
    }

    /// Names from the root span down to the span called `name`.
    pub fn ancestry(&self, name: &str) -> Vec<String> {
        let spans = self.spans();
        let mut chain = Vec::new();
        let mut current = spans.iter().find(|s| s.name == name);
        while let Some(span) = current {
            chain.push(span.name.clone().into_owned());
            current = spans
                .iter()
                .find(|s| s.span_context.span_id() == span.parent_span_id);
        }
        chain.reverse();
        chain
    }
}

/// Install the process-wide telemetry with a provider that exports nowhere,
/// so nothing in the test run talks to a collector.
pub fn global_telemetry() -> &'static Telemetry {
    telemetry::initialize_with(|| Ok(Telemetry::new(SdkTracerProvider::builder().build())))
        .unwrap()
}

/// Panic with `msg` from inside a test future.
pub fn panics(msg: &str) -> TestResult {
    panic!("{msg}")
}

/// Yield once to the executor, waking immediately.
pub fn yield_now() -> impl Future<Output = ()> {
    let mut yielded = false;
    future::poll_fn(move |cx| {
        if yielded {
            return Poll::Ready(());
        }
        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
}

/// How the [`RecordingHost`] judged a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped,
    Todo,
}

struct RegisteredTest {
    kind: TestKind,
    name: String,
    f: TestFnHandle,
    retries: u32,
}

#[derive(Default)]
struct Group {
    kind: GroupKind,
    before_all: Vec<Hook>,
    after_all: Vec<Hook>,
    children: Vec<Item>,
}

enum Item {
    Test(RegisteredTest),
    Group(Group),
}

#[derive(Clone, Copy)]
struct Scope {
    only_mode: bool,
    skipped: bool,
    focused: bool,
}

impl Scope {
    fn enter(self, group: &Group) -> Self {
        Self {
            only_mode: self.only_mode,
            skipped: self.skipped || matches!(group.kind, GroupKind::Skip | GroupKind::Todo),
            focused: self.focused || group.kind == GroupKind::Only,
        }
    }

    fn runs(self, test: &RegisteredTest) -> bool {
        !self.skipped
            && !matches!(test.kind, TestKind::Skip | TestKind::Todo)
            && (!self.only_mode || self.focused || test.kind == TestKind::Only)
    }

    fn any_runs(self, group: &Group) -> bool {
        group.children.iter().any(|child| match child {
            Item::Test(test) => self.runs(test),
            Item::Group(group) => self.enter(group).any_runs(group),
        })
    }
}

/// A tiny in-process test framework.
///
/// Registration mirrors how jest-like frameworks collect tests: group bodies
/// run right away, tests and hooks are only recorded. [`RecordingHost::run`]
/// then executes everything in registration order with the futures executor.
///
/// Skip and todo are honored for tests and groups, `only` focuses the run,
/// failing tests pass when they fail, and consecutive concurrent tests are
/// polled together. The per-test options are a retry count.
#[derive(Default)]
pub struct RecordingHost {
    stack: RefCell<Vec<Group>>,
    root: RefCell<Group>,
    registered_tests: RefCell<Vec<(TestKind, String)>>,
    registered_groups: RefCell<Vec<(GroupKind, String)>>,
    handles: RefCell<Vec<(String, TestFnHandle)>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_current<T>(&self, f: impl FnOnce(&mut Group) -> T) -> T {
        let mut stack = self.stack.borrow_mut();
        match stack.last_mut() {
            Some(group) => f(group),
            None => f(&mut self.root.borrow_mut()),
        }
    }

    pub fn registered_tests(&self) -> Vec<(TestKind, String)> {
        self.registered_tests.borrow().clone()
    }

    pub fn registered_groups(&self) -> Vec<(GroupKind, String)> {
        self.registered_groups.borrow().clone()
    }

    pub fn test_titles(&self) -> Vec<String> {
        self.registered_tests().into_iter().map(|(_, name)| name).collect()
    }

    pub fn group_titles(&self) -> Vec<String> {
        self.registered_groups().into_iter().map(|(_, name)| name).collect()
    }

    /// The wrapped callback of the test registered as `name`.
    pub fn handle(&self, name: &str) -> TestFnHandle {
        self.handles
            .borrow()
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, f)| f.clone())
            .unwrap_or_else(|| panic!("no test registered as {name:?}"))
    }

    /// Execute everything registered so far.
    pub fn run(&self) -> Vec<(String, Outcome)> {
        let root = mem::take(&mut *self.root.borrow_mut());
        let only_mode = has_only(&root);
        let scope = Scope {
            only_mode,
            skipped: false,
            focused: false,
        };

        let mut outcomes = Vec::new();
        run_group(&root, scope, &mut outcomes);
        outcomes
    }
}

impl TestHost for RecordingHost {
    type Options = u32;

    fn describe(&self, kind: GroupKind, name: &str, body: &mut dyn FnMut()) {
        self.registered_groups.borrow_mut().push((kind, name.to_owned()));
        self.stack.borrow_mut().push(Group {
            kind,
            ..Default::default()
        });
        body();
        let group = self.stack.borrow_mut().pop().unwrap();
        self.with_current(|parent| parent.children.push(Item::Group(group)));
    }

    fn test(&self, kind: TestKind, name: &str, f: TestFnHandle, retries: u32) {
        self.registered_tests.borrow_mut().push((kind, name.to_owned()));
        self.handles.borrow_mut().push((name.to_owned(), f.clone()));
        let test = RegisteredTest {
            kind,
            name: name.to_owned(),
            f,
            retries,
        };
        self.with_current(|group| group.children.push(Item::Test(test)));
    }

    fn before_all(&self, hook: Hook) {
        self.with_current(|group| group.before_all.push(hook));
    }

    fn after_all(&self, hook: Hook) {
        self.with_current(|group| group.after_all.push(hook));
    }
}

fn has_only(group: &Group) -> bool {
    group.kind == GroupKind::Only
        || group.children.iter().any(|child| match child {
            Item::Test(test) => test.kind == TestKind::Only,
            Item::Group(group) => has_only(group),
        })
}

fn run_group(group: &Group, scope: Scope, outcomes: &mut Vec<(String, Outcome)>) {
    let active = scope.any_runs(group);
    if active {
        group.before_all.iter().for_each(|hook| hook());
    }

    let mut batch: Vec<&RegisteredTest> = Vec::new();
    for child in &group.children {
        if let Item::Test(test) = child
            && test.kind == TestKind::Concurrent
            && scope.runs(test)
        {
            batch.push(test);
            continue;
        }
        flush(&mut batch, outcomes);

        match child {
            Item::Test(test) if scope.runs(test) => {
                let status = block_on(execute(test));
                outcomes.push((test.name.clone(), status));
            }
            Item::Test(test) => {
                let outcome = match test.kind {
                    TestKind::Todo => Outcome::Todo,
                    _ => Outcome::Skipped,
                };
                outcomes.push((test.name.clone(), outcome));
            }
            Item::Group(child) => run_group(child, scope.enter(child), outcomes),
        }
    }
    flush(&mut batch, outcomes);

    if active {
        group.after_all.iter().for_each(|hook| hook());
    }
}

fn flush(batch: &mut Vec<&RegisteredTest>, outcomes: &mut Vec<(String, Outcome)>) {
    if batch.is_empty() {
        return;
    }

    let statuses = block_on(join_all(batch.iter().map(|test| execute(test))));
    for (test, status) in batch.drain(..).zip(statuses) {
        outcomes.push((test.name.clone(), status));
    }
}

async fn execute(test: &RegisteredTest) -> Outcome {
    let mut attempts = 0;
    let result = loop {
        let result = match AssertUnwindSafe(test.f.call()).catch_unwind().await {
            Ok(TestResult(result)) => result,
            Err(_) => Err("panicked".to_owned()),
        };
        if result.is_ok() || attempts >= test.retries {
            break result;
        }
        attempts += 1;
    };

    match (test.kind, result) {
        (TestKind::Failing, Ok(())) => Outcome::Failed("expected the test to fail".to_owned()),
        (TestKind::Failing, Err(_)) => Outcome::Passed,
        (_, Ok(())) => Outcome::Passed,
        (_, Err(msg)) => Outcome::Failed(msg),
    }
}
