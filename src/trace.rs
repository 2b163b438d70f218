use std::time::Duration;

use opentelemetry::{global, metrics::MetricsError, trace::TraceError, KeyValue};
use opentelemetry_otlp::{TonicExporterBuilder, WithExportConfig};
use opentelemetry_sdk::{
	metrics::{
		reader::{DefaultAggregationSelector, DefaultTemporalitySelector},
		MeterProviderBuilder, PeriodicReader, SdkMeterProvider,
	},
	runtime,
	trace::{BatchConfig, Sampler, Tracer},
	Resource,
};
use opentelemetry_semantic_conventions::{
	resource::{DEPLOYMENT_ENVIRONMENT, SERVICE_NAME, SERVICE_VERSION},
	SCHEMA_URL,
};
use tracing::level_filters::LevelFilter;
use tracing_opentelemetry::MetricsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const METRICS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("metrics exporter: {0}")]
	Metrics(#[from] MetricsError),
	#[error("trace exporter: {0}")]
	Trace(#[from] TraceError),
}

fn resource() -> Resource {
	let environment = if cfg!(debug_assertions) {
		"development"
	} else {
		"production"
	};

	Resource::from_schema_url(
		[
			KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
			KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
			KeyValue::new(DEPLOYMENT_ENVIRONMENT, environment),
		],
		SCHEMA_URL,
	)
}

/// An OTLP exporter, pointed at the configured collector if there is one.
fn exporter(config: &Config) -> TonicExporterBuilder {
	let exporter = opentelemetry_otlp::new_exporter().tonic();

	match &config.otel_endpoint {
		Some(endpoint) => exporter.with_endpoint(endpoint),
		None => exporter,
	}
}

/// Constructs the [`SdkMeterProvider`] behind the counters recorded through
/// `monotonic_counter.*` event fields.
fn init_meter_provider(config: &Config) -> Result<SdkMeterProvider, Error> {
	let exporter = exporter(config).build_metrics_exporter(
		Box::new(DefaultAggregationSelector::new()),
		Box::new(DefaultTemporalitySelector::new()),
	)?;

	let reader = PeriodicReader::builder(exporter, runtime::Tokio)
		.with_interval(METRICS_INTERVAL)
		.build();

	let meter_provider = MeterProviderBuilder::default();

	// For debugging in development
	#[cfg(debug_assertions)]
	let meter_provider = meter_provider.with_reader(
		PeriodicReader::builder(
			opentelemetry_stdout::MetricsExporter::default(),
			runtime::Tokio,
		)
		.with_interval(METRICS_INTERVAL)
		.build(),
	);

	let meter_provider = meter_provider
		.with_resource(resource())
		.with_reader(reader)
		.build();

	global::set_meter_provider(meter_provider.clone());

	Ok(meter_provider)
}

/// Constructs a [`Tracer`] that samples the configured share of new traces,
/// and follows the caller's decision for the rest.
fn init_tracer(config: &Config) -> Result<Tracer, Error> {
	let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
		config.otel_sample_ratio,
	)));

	let tracer = opentelemetry_otlp::new_pipeline()
		.tracing()
		.with_trace_config(
			opentelemetry_sdk::trace::Config::default()
				.with_sampler(sampler)
				.with_resource(resource()),
		)
		.with_batch_config(BatchConfig::default())
		.with_exporter(exporter(config))
		.install_batch(runtime::Tokio)?;

	Ok(tracer)
}

/// Initializes the tracing subscriber at the configured level.
///
/// With OpenTelemetry enabled, spans and counters are exported over OTLP as
/// well. Keep the returned guard alive until shutdown so the exporters get
/// flushed.
pub fn init_tracing_subscriber(config: &Config) -> Result<OtelGuard, Error> {
	let (meter_provider, tracer) = if config.otel_enabled {
		(Some(init_meter_provider(config)?), Some(init_tracer(config)?))
	} else {
		(None, None)
	};

	tracing_subscriber::registry()
		.with(LevelFilter::from_level(config.log_level))
		.with(tracing_subscriber::fmt::layer().with_ansi(true))
		.with(meter_provider.clone().map(MetricsLayer::new))
		.with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
		.init();

	Ok(OtelGuard { meter_provider })
}

pub struct OtelGuard {
	meter_provider: Option<SdkMeterProvider>,
}

impl Drop for OtelGuard {
	fn drop(&mut self) {
		let Some(meter_provider) = self.meter_provider.take() else {
			return;
		};

		if let Err(err) = meter_provider.shutdown() {
			eprintln!("{err:?}");
		}

		global::shutdown_tracer_provider();
	}
}
