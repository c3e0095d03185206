//! Logging and OpenTelemetry setup

use crate::config::{LogFormat, StudioConfig};
use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

const DEFAULT_FILTER: &str = "studio=info";
const LOG_FILE_PREFIX: &str = "studio.log";

/// What happened to OpenTelemetry export; logged once the subscriber is up
pub enum OtelStatus {
    NotConfigured,
    FeatureDisabled,
    Enabled { endpoint: String },
    Failed(anyhow::Error),
}

/// Keeps the file writer and tracer provider alive until shutdown
pub struct Telemetry {
    _file_guard: Option<WorkerGuard>,
    #[cfg(feature = "telemetry")]
    provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl Telemetry {
    pub fn shutdown(self) {
        #[cfg(feature = "telemetry")]
        {
            if let Some(provider) = self.provider {
                if let Err(e) = provider.shutdown() {
                    tracing::warn!(error = %e, "Failed to flush OpenTelemetry spans");
                }
            }
        }
    }
}

/// Initialize the global subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: studio=info)
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: studio-daemon)
pub fn init(config: &StudioConfig) -> Result<(Telemetry, OtelStatus)> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    layers.push(match config.log_format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    });

    let file_guard = match config.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    #[cfg(feature = "telemetry")]
    let (provider, status) = match otel_layer() {
        Ok(Some((layer, provider, endpoint))) => {
            layers.push(layer);
            (Some(provider), OtelStatus::Enabled { endpoint })
        }
        Ok(None) => (None, OtelStatus::NotConfigured),
        Err(e) => (None, OtelStatus::Failed(e)),
    };

    #[cfg(not(feature = "telemetry"))]
    let status = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        OtelStatus::FeatureDisabled
    } else {
        OtelStatus::NotConfigured
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    Ok((
        Telemetry {
            _file_guard: file_guard,
            #[cfg(feature = "telemetry")]
            provider,
        },
        status,
    ))
}

impl OtelStatus {
    pub fn log(&self) {
        match self {
            OtelStatus::NotConfigured => {
                tracing::debug!("OpenTelemetry not configured (OTEL_EXPORTER_OTLP_ENDPOINT not set)")
            }
            OtelStatus::FeatureDisabled => {
                tracing::warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
                tracing::warn!("Rebuild with: cargo build --features telemetry");
            }
            OtelStatus::Enabled { endpoint } => {
                tracing::info!(endpoint = %endpoint, "OpenTelemetry initialized successfully")
            }
            OtelStatus::Failed(e) => {
                tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)")
            }
        }
    }
}

#[cfg(feature = "telemetry")]
fn otel_layer() -> Result<Option<(BoxedLayer, opentelemetry_sdk::trace::TracerProvider, String)>> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "studio-daemon".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();

    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider.clone());

    let layer = tracing_opentelemetry::layer().with_tracer(tracer).boxed();
    Ok(Some((layer, provider, endpoint)))
}
