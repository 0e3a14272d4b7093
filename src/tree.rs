//! Nesting of groups during the registration pass.
//!
//! Frameworks evaluate group bodies synchronously, long before any test runs.
//! While a body is evaluated its node sits on top of the [`TestTree`] stack,
//! so children registered inside it can capture the node. By the time the
//! framework executes anything the stack is empty again, which is why every
//! callback owns an `Arc` of its node instead of looking at the stack.

use std::{borrow::Cow, cell::RefCell, sync::Arc, sync::OnceLock};

use opentelemetry::Context;

/// One group in the registration tree.
#[derive(Debug)]
pub struct TestTreeNode {
    name: Cow<'static, str>,
    parent: Option<Arc<TestTreeNode>>,
    context: OnceLock<Context>,
}

impl TestTreeNode {
    pub fn new(name: impl Into<Cow<'static, str>>, parent: Option<Arc<TestTreeNode>>) -> Self {
        Self {
            name: name.into(),
            parent,
            context: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&TestTreeNode> {
        self.parent.as_deref()
    }

    /// The context carrying this group's span, once the group started.
    pub fn context(&self) -> Option<&Context> {
        self.context.get()
    }

    /// Store the context of the group's span.
    ///
    /// Returns the context back if one was already stored.
    pub(crate) fn set_context(&self, cx: Context) -> Result<(), Context> {
        self.context.set(cx)
    }

    /// Names from the outermost group down to this one.
    pub(crate) fn path(&self) -> Vec<&str> {
        let mut path = match &self.parent {
            Some(parent) => parent.path(),
            None => Vec::new(),
        };
        path.push(self.name());
        path
    }
}

/// Stack of the groups whose bodies are currently being registered.
///
/// Only touched during the single-threaded registration pass.
#[derive(Debug, Default)]
pub struct TestTree(RefCell<Vec<Arc<TestTreeNode>>>);

impl TestTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, node: Arc<TestTreeNode>) {
        tracing::trace!(group = node.name(), depth = self.len(), "entering group body");
        self.0.borrow_mut().push(node);
    }

    pub fn pop(&self) -> Option<Arc<TestTreeNode>> {
        let node = self.0.borrow_mut().pop();
        if let Some(node) = &node {
            tracing::trace!(group = node.name(), depth = self.len(), "left group body");
        }
        node
    }

    /// The innermost open group, if any.
    pub fn top(&self) -> Option<Arc<TestTreeNode>> {
        self.0.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push `node` and pop it again when the returned guard drops.
    ///
    /// The guard also pops if the group body panics, so a failed registration
    /// does not leave a stale parent behind for the groups after it.
    pub fn enter(&self, node: Arc<TestTreeNode>) -> Entered<'_> {
        self.push(node);
        Entered(self)
    }
}

#[must_use = "the group is left as soon as the guard drops"]
#[derive(Debug)]
pub struct Entered<'t>(&'t TestTree);

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.0.pop();
    }
}
