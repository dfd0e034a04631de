//! Logging and trace export
//!
//! Console output is always on (pretty or JSON). When an OTLP endpoint is
//! configured, spans and log events are also exported over OTLP/HTTP.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::config::LoggingConfig;

const SERVICE_NAME: &str = "travelbudget";

/// Exporter pipelines must be flushed before exit; dropping this does it
#[must_use = "dropping the guard stops trace export"]
#[derive(Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to flush traces: {e}");
        }
        if let Some(provider) = self.logger_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to flush logs: {e}");
        }
    }
}

/// `RUST_LOG` wins; otherwise the configured level for this crate and HTTP
/// tracing, warnings for everything else
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("travelbudget={level},tower_http={level},warn")))
}

/// The OTLP exporter's own HTTP stack must not feed back into the log bridge
fn export_filter(level: &str) -> Result<EnvFilter> {
    let mut filter = env_filter(level);
    for target in ["hyper", "reqwest", "opentelemetry"] {
        filter = filter.add_directive(format!("{target}=off").parse::<Directive>()?);
    }
    Ok(filter)
}

fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_attribute(KeyValue::new(SERVICE_VERSION, crate::VERSION))
        .build()
}

fn endpoint(base: &str, signal: &str) -> String {
    format!("{}/v1/{signal}", base.trim_end_matches('/'))
}

/// Install the global subscriber. `verbose` forces debug level.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<TelemetryGuard> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let mut guard = TelemetryGuard::default();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = fmt::layer().with_target(true).with_writer(std::io::stderr);
    layers.push(if config.format == "json" {
        console.json().with_filter(env_filter(level)).boxed()
    } else {
        console.with_filter(env_filter(level)).boxed()
    });

    if let Some(base) = &config.otlp_endpoint {
        let span_exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint(base, "traces"))
            .build()
            .with_context(|| "Failed to create OTLP span exporter")?;
        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_resource(resource())
            .build();
        let tracer = tracer_provider.tracer(SERVICE_NAME);
        layers.push(
            tracing_opentelemetry::layer()
                .with_tracer(tracer)
                .with_filter(env_filter(level))
                .boxed(),
        );

        let log_exporter = LogExporter::builder()
            .with_http()
            .with_endpoint(endpoint(base, "logs"))
            .build()
            .with_context(|| "Failed to create OTLP log exporter")?;
        let logger_provider = SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource())
            .build();
        layers.push(
            OpenTelemetryTracingBridge::new(&logger_provider)
                .with_filter(export_filter(level)?)
                .boxed(),
        );

        guard.tracer_provider = Some(tracer_provider);
        guard.logger_provider = Some(logger_provider);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .with_context(|| "Failed to install tracing subscriber")?;

    Ok(guard)
}
