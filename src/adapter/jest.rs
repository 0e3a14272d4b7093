//! Jest: `test`/`it` and `describe`.

use std::{ops::Deref, rc::Rc};

use crate::{
    Error,
    host::{GroupKind, TestHost, TestKind},
    telemetry::{self, Telemetry},
    traced::{Engine, TracedDescribe, TracedTest},
};

pub const SCOPE: &str = "otel-test-runner/jest";

/// `test` and its modifiers.
#[derive(Debug)]
pub struct Test<H> {
    base: TracedTest<H>,
    pub only: TracedTest<H>,
    pub skip: TracedTest<H>,
    pub todo: TracedTest<H>,
    pub failing: TracedTest<H>,
    pub concurrent: TracedTest<H>,
}

impl<H: TestHost> Test<H> {
    fn new(engine: &Rc<Engine<H>>) -> Self {
        let base = TracedTest::new(Rc::clone(engine), TestKind::Default);
        Self {
            only: base.with_kind(TestKind::Only),
            skip: base.with_kind(TestKind::Skip),
            todo: base.with_kind(TestKind::Todo),
            failing: base.with_kind(TestKind::Failing),
            concurrent: base.with_kind(TestKind::Concurrent),
            base,
        }
    }
}

impl<H> Deref for Test<H> {
    type Target = TracedTest<H>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// `describe` and its modifiers.
#[derive(Debug)]
pub struct Describe<H> {
    base: TracedDescribe<H>,
    pub only: TracedDescribe<H>,
    pub skip: TracedDescribe<H>,
}

impl<H: TestHost> Describe<H> {
    fn new(engine: &Rc<Engine<H>>) -> Self {
        let base = TracedDescribe::new(Rc::clone(engine), GroupKind::Default);
        Self {
            only: base.with_kind(GroupKind::Only),
            skip: base.with_kind(GroupKind::Skip),
            base,
        }
    }
}

impl<H> Deref for Describe<H> {
    type Target = TracedDescribe<H>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

pub struct Jest<H> {
    engine: Rc<Engine<H>>,
    pub test: Test<H>,
    pub describe: Describe<H>,
}

impl<H: TestHost> Jest<H> {
    pub fn new(host: H, telemetry: &Telemetry) -> Self {
        let engine = Engine::new(host, telemetry.tracer(SCOPE));
        Self {
            test: Test::new(&engine),
            describe: Describe::new(&engine),
            engine,
        }
    }

    /// Set up with the process-wide telemetry, closed again after the run.
    pub fn install(host: H) -> Result<Self, Error> {
        let jest = Self::new(host, telemetry::initialize()?);
        super::close_after_run(jest.host());
        Ok(jest)
    }

    /// Alias of [`Jest::test`](Jest#structfield.test).
    pub fn it(&self) -> &Test<H> {
        &self.test
    }

    pub fn host(&self) -> &H {
        self.engine.host()
    }
}
