use std::{borrow::Cow, fmt, rc::Rc, sync::Arc};

use serde::Serialize;

use super::{EachDescribe, Engine};
use crate::{
    host::{GroupKind, TestHost},
    span::{end_group_span, start_group_span},
    tree::TestTreeNode,
};

/// One group registrar of the host, for example `describe.only`.
pub struct TracedDescribe<H> {
    engine: Rc<Engine<H>>,
    kind: GroupKind,
}

impl<H> Clone for TracedDescribe<H> {
    fn clone(&self) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
            kind: self.kind,
        }
    }
}

impl<H> fmt::Debug for TracedDescribe<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedDescribe")
            .field("kind", &self.kind)
            .finish()
    }
}

impl<H: TestHost> TracedDescribe<H> {
    pub fn new(engine: Rc<Engine<H>>, kind: GroupKind) -> Self {
        Self { engine, kind }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// The registrar for another modifier of the same framework.
    pub fn with_kind(&self, kind: GroupKind) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
            kind,
        }
    }

    /// Register group `name`.
    ///
    /// Inside the host's group body the new node is pushed, the hooks that
    /// start and end the group span are registered, and `body` registers the
    /// children. The node is popped again as soon as `body` returns.
    pub fn call(&self, name: impl Into<Cow<'static, str>>, body: impl FnOnce()) {
        let name = name.into();
        let node = Arc::new(TestTreeNode::new(name.clone(), self.engine.tree().top()));
        tracing::trace!(group = %name, kind = ?self.kind, "registering group");

        let engine = &self.engine;
        let mut body = Some(body);
        engine.host().describe(self.kind, &name, &mut || {
            let Some(body) = body.take() else {
                tracing::warn!(group = node.name(), "host evaluated a group body twice");
                return;
            };
            let _entered = engine.tree().enter(Arc::clone(&node));

            let (tracer, started) = (Arc::clone(engine.tracer()), Arc::clone(&node));
            engine
                .host()
                .before_all(Box::new(move || start_group_span(&tracer, &started)));
            let ended = Arc::clone(&node);
            engine
                .host()
                .after_all(Box::new(move || end_group_span(&ended)));

            body();
        });
    }

    /// Register one group per row, see [`EachDescribe`].
    pub fn each<R, I>(&self, rows: I) -> EachDescribe<'_, H, R>
    where
        I: IntoIterator<Item = R>,
        R: Serialize,
    {
        EachDescribe::new(self, rows.into_iter().collect())
    }
}
