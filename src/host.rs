//! The test framework seen from the inside.
//!
//! A [`TestHost`] is the registration surface of whatever framework actually
//! schedules and runs the tests. The tracing engine never runs a test itself:
//! it only hands wrapped callbacks and lifecycle hooks to the host, and relies
//! on the host for every execution policy (skipping, focusing, retries,
//! concurrency, timeouts, reporting).
//!
//! Modifiers are passed through as [`TestKind`] and [`GroupKind`] values.
//! A kind stands for the framework's own modifier registrar
//! (`test.skip`, `describe.only`, ...), so the engine wraps every modifier the
//! same way and never has to re-implement what the modifier means.

use crate::test::TestFnHandle;

/// A lifecycle hook registered with [`TestHost::before_all`] or
/// [`TestHost::after_all`].
pub type Hook = Box<dyn Fn() + Send + Sync>;

/// The modifier a test is registered with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    #[default]
    Default,
    Only,
    Skip,
    Todo,
    Failing,
    Concurrent,
    Serial,
}

/// The modifier a group is registered with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    #[default]
    Default,
    Only,
    Skip,
    Todo,
    Concurrent,
    Serial,
}

/// Registration surface of a test framework.
///
/// All methods are called during the synchronous registration pass.
/// The host is free to run the registered callbacks and hooks later, in any
/// order its own scheduler picks, as long as it keeps the usual guarantees:
/// a group's `before_all` hooks fire before any of its children run, and its
/// `after_all` hooks fire after all of them settled.
pub trait TestHost {
    /// Framework specific per-test options, for example a timeout.
    ///
    /// The engine passes these through untouched.
    type Options: Default;

    /// Register a group.
    ///
    /// `body` registers the group's children and must be called
    /// synchronously, exactly once, before this method returns.
    fn describe(&self, kind: GroupKind, name: &str, body: &mut dyn FnMut());

    /// Register a single test.
    fn test(&self, kind: TestKind, name: &str, f: TestFnHandle, options: Self::Options);

    /// Register a hook that runs once before the tests of the group currently
    /// being registered (or of the whole run, outside of any group).
    fn before_all(&self, hook: Hook);

    /// Register a hook that runs once after the tests of the group currently
    /// being registered (or of the whole run, outside of any group).
    fn after_all(&self, hook: Hook);
}

impl<H: TestHost + ?Sized> TestHost for &H {
    type Options = H::Options;

    fn describe(&self, kind: GroupKind, name: &str, body: &mut dyn FnMut()) {
        (**self).describe(kind, name, body)
    }

    fn test(&self, kind: TestKind, name: &str, f: TestFnHandle, options: Self::Options) {
        (**self).test(kind, name, f, options)
    }

    fn before_all(&self, hook: Hook) {
        (**self).before_all(hook)
    }

    fn after_all(&self, hook: Hook) {
        (**self).after_all(hook)
    }
}
