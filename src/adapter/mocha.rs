//! Mocha BDD and QUnit style: `it`/`specify`/`test` and
//! `describe`/`context`/`suite`.
//!
//! Mocha has no todo modifier. A test registered without a body through
//! [`TracedTest::pending`] is still run by the host and shows up as an empty
//! span.

use std::{ops::Deref, rc::Rc};

use crate::{
    Error,
    host::{GroupKind, TestHost, TestKind},
    telemetry::{self, Telemetry},
    traced::{Engine, TracedDescribe, TracedTest},
};

pub const SCOPE: &str = "otel-test-runner/mocha";

#[derive(Debug)]
pub struct It<H> {
    base: TracedTest<H>,
    pub only: TracedTest<H>,
    pub skip: TracedTest<H>,
}

impl<H: TestHost> It<H> {
    fn new(engine: &Rc<Engine<H>>) -> Self {
        let base = TracedTest::new(Rc::clone(engine), TestKind::Default);
        Self {
            only: base.with_kind(TestKind::Only),
            skip: base.with_kind(TestKind::Skip),
            base,
        }
    }
}

impl<H> Deref for It<H> {
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

pub struct Mocha<H> {
    engine: Rc<Engine<H>>,
    pub it: It<H>,
    pub describe: Describe<H>,
}

impl<H: TestHost> Mocha<H> {
    pub fn new(host: H, telemetry: &Telemetry) -> Self {
        let engine = Engine::new(host, telemetry.tracer(SCOPE));
        Self {
            it: It::new(&engine),
            describe: Describe::new(&engine),
            engine,
        }
    }

    /// Set up with the process-wide telemetry, closed again after the run.
    pub fn install(host: H) -> Result<Self, Error> {
        let mocha = Self::new(host, telemetry::initialize()?);
        super::close_after_run(mocha.host());
        Ok(mocha)
    }

    pub fn specify(&self) -> &It<H> {
        &self.it
    }

    pub fn test(&self) -> &It<H> {
        &self.it
    }

    pub fn context(&self) -> &Describe<H> {
        &self.describe
    }

    pub fn suite(&self) -> &Describe<H> {
        &self.describe
    }

    pub fn host(&self) -> &H {
        self.engine.host()
    }
}
