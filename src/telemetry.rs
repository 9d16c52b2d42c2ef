use std::{path::Path, time::Duration};

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

const SERVICE_NAME: &str = "busstop_ingest";

/// Keeps the file writer and the span exporter alive until the run ends.
pub struct TelemetryGuard {
    _file_guard: WorkerGuard,
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flushes pending spans.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down the tracer provider: {e:?}");
            }
        }
    }
}

/// Logs to stdout and to a daily rolling file in `log_dir`. Spans are also exported over
/// OTLP when an endpoint is given.
pub fn init_tracing(log_dir: &Path, otlp_endpoint: Option<&str>) -> Result<TelemetryGuard> {
    let provider = match otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .with_timeout(Duration::from_millis(1000))
                .build()?;

            Some(
                SdkTracerProvider::builder()
                    .with_batch_exporter(exporter)
                    .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
                    .build(),
            )
        }
        None => None,
    };

    let telemetry_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let appender = tracing_appender::rolling::daily(log_dir, "busstop_ingest.log");
    let (non_blocking_appender, file_guard) = tracing_appender::non_blocking(appender);

    // A layer that logs events to rolling files.
    let file_log = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false)
        .pretty();

    let stdout_log = tracing_subscriber::fmt::layer();

    Registry::default()
        .with(telemetry_layer)
        .with(stdout_log)
        .with(file_log)
        .with(env_filter)
        .try_init()?;

    Ok(TelemetryGuard {
        _file_guard: file_guard,
        provider,
    })
}
