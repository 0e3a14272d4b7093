//! Registrars that wrap a [`TestHost`] with spans.
//!
//! [`TracedTest`] and [`TracedDescribe`] stand for one modifier of the host's
//! test and group registration functions. They keep the host's signature and
//! only swap the callback: a test callback is wrapped so it runs inside its
//! own span, a group body additionally registers the hooks that start and
//! end the group span.
//!
//! All registrars of one framework share a single [`Engine`], which owns the
//! nesting tracker every group body pushes onto.

mod describe;
mod each;

use std::{rc::Rc, sync::Arc};

use opentelemetry::global::BoxedTracer;

pub use self::{
    describe::TracedDescribe,
    each::{EachDescribe, EachTest},
    test::TracedTest,
};
use crate::{host::TestHost, tree::TestTree};

/// State shared by all registrars of one framework.
pub struct Engine<H> {
    host: H,
    tree: TestTree,
    tracer: Arc<BoxedTracer>,
}

impl<H: TestHost> Engine<H> {
    pub fn new(host: H, tracer: BoxedTracer) -> Rc<Self> {
        Rc::new(Self {
            host,
            tree: TestTree::new(),
            tracer: Arc::new(tracer),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn tree(&self) -> &TestTree {
        &self.tree
    }

    pub fn tracer(&self) -> &Arc<BoxedTracer> {
        &self.tracer
    }
}
