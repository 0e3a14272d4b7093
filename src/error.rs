use thiserror::Error;

/// Errors surfaced while setting up tracing or registering tests.
#[derive(Debug, Error)]
pub enum Error {
    /// The OTLP span exporter could not be built.
    #[error("failed to build the OTLP span exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// A row passed to `each` could not be turned into a title row.
    #[error("row {index} of `each` could not be serialized: {source}")]
    EachRow {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}
