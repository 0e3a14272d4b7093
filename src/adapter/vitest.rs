//! Vitest: `test`/`it` and `describe`.
//!
//! Vitest runs the global teardown itself, so [`Vitest::install`] leaves
//! closing the telemetry to the caller.

use std::{ops::Deref, rc::Rc};

use super::gate;
use crate::{
    Error,
    host::{GroupKind, TestHost, TestKind},
    telemetry::{self, Telemetry},
    traced::{Engine, TracedDescribe, TracedTest},
};

pub const SCOPE: &str = "otel-test-runner/vitest";

#[derive(Debug)]
pub struct Test<H> {
    base: TracedTest<H>,
    pub only: TracedTest<H>,
    pub skip: TracedTest<H>,
    pub todo: TracedTest<H>,
    pub fails: TracedTest<H>,
    pub concurrent: TracedTest<H>,
    pub sequential: TracedTest<H>,
}

impl<H: TestHost> Test<H> {
    fn new(engine: &Rc<Engine<H>>) -> Self {
        let base = TracedTest::new(Rc::clone(engine), TestKind::Default);
        Self {
            only: base.with_kind(TestKind::Only),
            skip: base.with_kind(TestKind::Skip),
            todo: base.with_kind(TestKind::Todo),
            fails: base.with_kind(TestKind::Failing),
            concurrent: base.with_kind(TestKind::Concurrent),
            sequential: base.with_kind(TestKind::Serial),
            base,
        }
    }

    pub fn skip_if(&self, condition: bool) -> TracedTest<H> {
        self.base
            .with_kind(gate(condition, TestKind::Skip, TestKind::Default))
    }

    pub fn run_if(&self, condition: bool) -> TracedTest<H> {
        self.base
            .with_kind(gate(condition, TestKind::Default, TestKind::Skip))
    }
}

impl<H> Deref for Test<H> {
    type Target = TracedTest<H>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

#[derive(Debug)]
pub struct Describe<H> {
    base: TracedDescribe<H>,
    pub only: TracedDescribe<H>,
    pub skip: TracedDescribe<H>,
    pub concurrent: TracedDescribe<H>,
    pub sequential: TracedDescribe<H>,
}

impl<H: TestHost> Describe<H> {
    fn new(engine: &Rc<Engine<H>>) -> Self {
        let base = TracedDescribe::new(Rc::clone(engine), GroupKind::Default);
        Self {
            only: base.with_kind(GroupKind::Only),
            skip: base.with_kind(GroupKind::Skip),
            concurrent: base.with_kind(GroupKind::Concurrent),
            sequential: base.with_kind(GroupKind::Serial),
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

pub struct Vitest<H> {
    engine: Rc<Engine<H>>,
    pub test: Test<H>,
    pub describe: Describe<H>,
}

impl<H: TestHost> Vitest<H> {
    pub fn new(host: H, telemetry: &Telemetry) -> Self {
        let engine = Engine::new(host, telemetry.tracer(SCOPE));
        Self {
            test: Test::new(&engine),
            describe: Describe::new(&engine),
            engine,
        }
    }

    /// Set up with the process-wide telemetry. Call [`telemetry::close`]
    /// from the global teardown.
    pub fn install(host: H) -> Result<Self, Error> {
        Ok(Self::new(host, telemetry::initialize()?))
    }

    pub fn it(&self) -> &Test<H> {
        &self.test
    }

    pub fn host(&self) -> &H {
        self.engine.host()
    }
}
