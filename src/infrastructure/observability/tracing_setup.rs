//! Subscriber setup for the server, with optional OTLP span export

use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
    Resource,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use super::config::TracingConfig;
use crate::config::LogFormat;
use crate::infrastructure::logging::LoggingConfig;

/// Install the global subscriber. Export failures fall back to console-only
/// logging; a second call is a no-op.
pub fn init_tracing(logging_config: &LoggingConfig, tracing_config: &TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging_config.level));

    match logging_config.format {
        LogFormat::Json => install(
            filter,
            fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true),
            tracing_config,
        ),
        LogFormat::Pretty => install(
            filter,
            fmt::layer().pretty().with_span_events(FmtSpan::CLOSE),
            tracing_config,
        ),
    }
}

fn install<L>(filter: EnvFilter, console: L, tracing_config: &TracingConfig)
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(console);

    let export = if tracing_config.enabled {
        Some(build_provider(tracing_config))
    } else {
        None
    };

    let installed = match export {
        None => registry.with(filter).try_init().is_ok(),
        Some(Err(e)) => {
            let installed = registry.with(filter).try_init().is_ok();
            tracing::warn!(error = %e, "OpenTelemetry export unavailable, logging to console only");
            installed
        }
        Some(Ok(provider)) => {
            let tracer = provider.tracer(tracing_config.service_name.clone());
            opentelemetry::global::set_tracer_provider(provider);

            let installed = registry
                .with(span_export(tracer))
                .with(filter)
                .try_init()
                .is_ok();
            tracing::info!(endpoint = %tracing_config.otlp_endpoint, "Exporting spans over OTLP");
            installed
        }
    };

    if !installed {
        tracing::debug!("Global subscriber already installed");
    }
}

fn span_export<S>(tracer: Tracer) -> OpenTelemetryLayer<S, Tracer>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(tracer)
}

fn sampler_for(ratio: f64) -> Sampler {
    match ratio {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::TraceIdRatioBased(r),
    }
}

fn build_provider(
    config: &TracingConfig,
) -> Result<TracerProvider, opentelemetry::trace::TraceError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    Ok(TracerProvider::builder()
        .with_sampler(Sampler::ParentBased(Box::new(sampler_for(
            config.effective_sampling_ratio(),
        ))))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            config.service_name.clone(),
        )]))
        .with_batch_exporter(exporter, runtime::Tokio)
        .build())
}

/// Flush pending spans
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
