//! `bun:test`: `test` and `describe`, including the conditional modifiers.

use std::{ops::Deref, rc::Rc};

use super::gate;
use crate::{
    Error,
    host::{GroupKind, TestHost, TestKind},
    telemetry::{self, Telemetry},
    traced::{Engine, TracedDescribe, TracedTest},
};

pub const SCOPE: &str = "otel-test-runner/bun";

#[derive(Debug)]
pub struct Test<H> {
    base: TracedTest<H>,
    pub only: TracedTest<H>,
    pub skip: TracedTest<H>,
    pub todo: TracedTest<H>,
    pub failing: TracedTest<H>,
    pub concurrent: TracedTest<H>,
    pub serial: TracedTest<H>,
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
            serial: base.with_kind(TestKind::Serial),
            base,
        }
    }

    /// `test.if(condition)`: runs only when `condition` holds.
    pub fn when(&self, condition: bool) -> TracedTest<H> {
        self.gated(condition, TestKind::Default, TestKind::Skip)
    }

    pub fn skip_if(&self, condition: bool) -> TracedTest<H> {
        self.gated(condition, TestKind::Skip, TestKind::Default)
    }

    pub fn todo_if(&self, condition: bool) -> TracedTest<H> {
        self.gated(condition, TestKind::Todo, TestKind::Default)
    }

    pub fn failing_if(&self, condition: bool) -> TracedTest<H> {
        self.gated(condition, TestKind::Failing, TestKind::Default)
    }

    pub fn concurrent_if(&self, condition: bool) -> TracedTest<H> {
        self.gated(condition, TestKind::Concurrent, TestKind::Default)
    }

    pub fn serial_if(&self, condition: bool) -> TracedTest<H> {
        self.gated(condition, TestKind::Serial, TestKind::Default)
    }

    fn gated(&self, condition: bool, then: TestKind, otherwise: TestKind) -> TracedTest<H> {
        self.base.with_kind(gate(condition, then, otherwise))
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
    pub todo: TracedDescribe<H>,
    pub concurrent: TracedDescribe<H>,
    pub serial: TracedDescribe<H>,
}

impl<H: TestHost> Describe<H> {
    fn new(engine: &Rc<Engine<H>>) -> Self {
        let base = TracedDescribe::new(Rc::clone(engine), GroupKind::Default);
        Self {
            only: base.with_kind(GroupKind::Only),
            skip: base.with_kind(GroupKind::Skip),
            todo: base.with_kind(GroupKind::Todo),
            concurrent: base.with_kind(GroupKind::Concurrent),
            serial: base.with_kind(GroupKind::Serial),
            base,
        }
    }

    /// `describe.if(condition)`: runs only when `condition` holds.
    pub fn when(&self, condition: bool) -> TracedDescribe<H> {
        self.gated(condition, GroupKind::Default, GroupKind::Skip)
    }

    pub fn skip_if(&self, condition: bool) -> TracedDescribe<H> {
        self.gated(condition, GroupKind::Skip, GroupKind::Default)
    }

    pub fn todo_if(&self, condition: bool) -> TracedDescribe<H> {
        self.gated(condition, GroupKind::Todo, GroupKind::Default)
    }

    fn gated(&self, condition: bool, then: GroupKind, otherwise: GroupKind) -> TracedDescribe<H> {
        self.base.with_kind(gate(condition, then, otherwise))
    }
}

impl<H> Deref for Describe<H> {
    type Target = TracedDescribe<H>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

pub struct Bun<H> {
    engine: Rc<Engine<H>>,
    pub test: Test<H>,
    pub describe: Describe<H>,
}

impl<H: TestHost> Bun<H> {
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
        let bun = Self::new(host, telemetry::initialize()?);
        super::close_after_run(bun.host());
        Ok(bun)
    }

    pub fn host(&self) -> &H {
        self.engine.host()
    }
}
