//! Process-wide tracing state.
//!
//! [`initialize`] builds the export pipeline on first use and hands out the
//! same [`Telemetry`] afterwards. [`close`] flushes and stops it. Both are
//! safe to call from every test file of a run.
//!
//! Callers that manage their own provider wrap it with [`Telemetry::new`]
//! and pass it to the adapters explicitly.

use std::{
    borrow::Cow,
    env,
    sync::{
        Mutex, OnceLock, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use opentelemetry::{
    global::{self, BoxedTracer},
    trace::TracerProvider as _,
};
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider},
};

use crate::Error;

pub const DEFAULT_SERVICE_NAME: &str = "otel-typescript-test-runner";

/// Spans are exported in small batches so they show up nearly live.
pub const DEFAULT_SCHEDULED_DELAY: Duration = Duration::from_millis(100);

const SERVICE_NAME_VAR: &str = "OTEL_SERVICE_NAME";
const SCHEDULE_DELAY_VAR: &str = "OTEL_BSP_SCHEDULE_DELAY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub service_name: Cow<'static, str>,
    pub scheduled_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.into(),
            scheduled_delay: DEFAULT_SCHEDULED_DELAY,
        }
    }
}

impl Config {
    /// Defaults, overridden by `OTEL_SERVICE_NAME` and
    /// `OTEL_BSP_SCHEDULE_DELAY` (milliseconds).
    ///
    /// Empty or unparsable values are ignored. Exporter endpoint and headers
    /// are read by the exporter itself from the `OTEL_EXPORTER_OTLP_*`
    /// variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = env::var(SERVICE_NAME_VAR)
            && !name.trim().is_empty()
        {
            config.service_name = name.into();
        }

        match env::var(SCHEDULE_DELAY_VAR).map(|v| v.trim().parse::<u64>()) {
            Ok(Ok(ms)) => config.scheduled_delay = Duration::from_millis(ms),
            Ok(Err(err)) => tracing::warn!(%err, "ignoring invalid {SCHEDULE_DELAY_VAR}"),
            Err(_) => {}
        }

        config
    }
}

/// Handle on a tracer provider that is shut down at most once.
#[derive(Debug)]
pub struct Telemetry {
    provider: SdkTracerProvider,
    closed: AtomicBool,
}

impl Telemetry {
    pub fn new(provider: SdkTracerProvider) -> Self {
        Self {
            provider,
            closed: AtomicBool::new(false),
        }
    }

    /// Build the OTLP/HTTP pipeline described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .build()?;
        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_scheduled_delay(config.scheduled_delay)
                    .build(),
            )
            .build();
        let resource = Resource::builder()
            .with_service_name(config.service_name.to_string())
            .build();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(resource)
            .build();

        tracing::debug!(
            service_name = %config.service_name,
            scheduled_delay = ?config.scheduled_delay,
            "built span export pipeline"
        );
        Ok(Self::new(provider))
    }

    pub fn tracer(&self, scope: impl Into<Cow<'static, str>>) -> BoxedTracer {
        BoxedTracer::new(Box::new(self.provider.tracer(scope)))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Flush pending spans and shut the provider down.
    ///
    /// Only the first call does anything. Failures are logged, never
    /// returned: a broken exporter must not fail the test run.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Err(err) = self.provider.force_flush() {
            tracing::warn!(%err, "failed to flush spans");
        }
        match self.provider.shutdown() {
            Ok(()) => tracing::debug!("telemetry closed"),
            Err(err) => tracing::warn!(%err, "failed to shut down tracer provider"),
        }
    }
}

static TELEMETRY: OnceLock<Telemetry> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// The process-wide [`Telemetry`], built from [`Config::from_env`] on first
/// use and installed as the global tracer provider.
///
/// Later calls return the same handle. A failing first call leaves nothing
/// installed, so the next call tries again.
pub fn initialize() -> Result<&'static Telemetry, Error> {
    initialize_with(|| Telemetry::from_config(&Config::from_env()))
}

pub(crate) fn initialize_with(
    build: impl FnOnce() -> Result<Telemetry, Error>,
) -> Result<&'static Telemetry, Error> {
    if let Some(telemetry) = TELEMETRY.get() {
        return Ok(telemetry);
    }

    let _lock = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(telemetry) = TELEMETRY.get() {
        return Ok(telemetry);
    }

    let telemetry = build()?;
    global::set_tracer_provider(telemetry.provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());
    tracing::debug!("telemetry initialized");
    Ok(TELEMETRY.get_or_init(|| telemetry))
}

/// The process-wide [`Telemetry`], if [`initialize`] already ran.
pub fn get() -> Option<&'static Telemetry> {
    TELEMETRY.get()
}

/// Close the process-wide [`Telemetry`]. Does nothing if it was never
/// initialized or is already closed.
pub fn close() {
    if let Some(telemetry) = TELEMETRY.get() {
        telemetry.close();
    }
}
