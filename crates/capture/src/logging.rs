use crate::config::CaptureConfig;
use anyhow::Context;
use common::{TelemetryGuard, setup_logging};
use tokio::runtime::Runtime;

const SERVICE_NAME: &str = "capture";

/// Keeps the telemetry exporters and the runtime they run on alive.
///
/// Fields drop in declaration order: the guard flushes its exporters before
/// the runtime goes away.
pub struct LoggingGuard {
    _telemetry: Option<TelemetryGuard>,
    _runtime: Option<Runtime>,
}

/// Install the global subscriber, exporting to OTLP when an endpoint is configured.
pub fn init(config: &CaptureConfig) -> anyhow::Result<LoggingGuard> {
    let Some(endpoint) = config.otel_endpoint.as_deref() else {
        setup_logging(config.environment);
        return Ok(LoggingGuard {
            _telemetry: None,
            _runtime: None,
        });
    };

    // The OTLP batch exporters are async and need a runtime to run on
    let runtime = Runtime::new().context("Failed to create telemetry runtime")?;
    let telemetry =
        runtime.block_on(async { TelemetryGuard::init(SERVICE_NAME, endpoint, config.environment) })?;

    Ok(LoggingGuard {
        _telemetry: Some(telemetry),
        _runtime: Some(runtime),
    })
}
