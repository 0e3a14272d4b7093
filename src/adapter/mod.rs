//! Capability sets of the supported frameworks.
//!
//! Each adapter exposes exactly the modifiers its framework has, as fields
//! holding a traced registrar per modifier. The base registrar is reached
//! through `Deref`, so `jest.test.call(..)` and `jest.test.only.call(..)`
//! read like their JavaScript counterparts.
//!
//! Boolean-gated modifiers (`skip_if`, `when`, `run_if`, ...) are methods that
//! evaluate their condition once and return the registrar it selects.

pub mod bun;
pub mod jest;
pub mod mocha;
pub mod vitest;

use std::fmt::Debug;

use crate::{host::TestHost, telemetry};

/// The modifier a boolean-gated registrar resolves to.
fn gate<K: Copy + Debug>(condition: bool, then: K, otherwise: K) -> K {
    let kind = match condition {
        true => then,
        false => otherwise,
    };
    tracing::trace!(condition, ?kind, "resolved gated modifier");
    kind
}

/// Close the process-wide telemetry once the whole run finished.
fn close_after_run<H: TestHost>(host: &H) {
    host.after_all(Box::new(telemetry::close));
}
