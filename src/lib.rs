//! Test and group spans for jest-like test frameworks.
//!
//! Every group becomes a span that starts in the group's setup hook and ends
//! in its teardown hook, and every test runs inside its own span below the
//! group it was registered in. Without an active trace the first spans are
//! parented by the W3C trace-parent in `TRACEPARENT`, so a run shows up inside
//! the CI pipeline trace that launched it.
//!
//! Frameworks plug in through [`TestHost`](host::TestHost). The adapters in
//! [`adapter`] expose each framework's own modifiers on top of it.

pub mod adapter;
pub mod context;
pub mod format;
pub mod host;
pub mod span;
pub mod telemetry;
pub mod traced;
pub mod tree;

mod error;
pub use error::Error;

#[cfg(test)]
mod test_support;
