use anyhow::Context;
use capture::{
    config::{CaptureConfig, SourceKind},
    frame::YuvFrame,
    logging,
    sdc::SdcSession,
    service::{SessionSummary, run_pipeline},
    sink::FrameSink,
    simulator::SimulatedCamera,
    source::FrameSource,
};
use common::RetryPolicy;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn main() -> anyhow::Result<()> {
    let config = CaptureConfig::from_env()?;
    let _logging = logging::init(&config)?;
    config.validate().context("Invalid capture configuration")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");
    tracing::info!(config = ?config, "Loaded configuration");

    let result = match config.source {
        SourceKind::Sdc => {
            let (source, sink) = SdcSession::connect(
                &config.device_path,
                config.stream_params(),
                config.source_buffer_depth,
                RetryPolicy::default(),
            )
            .with_context(|| {
                format!(
                    "Failed to set up camera stream on {}",
                    config.device_path.display()
                )
            })?;
            run(source, Arc::new(sink), &config, shutdown)
        }
        SourceKind::Simulated => {
            let camera = SimulatedCamera {
                width: config.width,
                height: config.height,
                buffer_depth: config.source_buffer_depth as usize,
                frame_limit: None,
            };
            let (source, sink) = camera.realtime(config.frame_rate);
            run(source, sink, &config, shutdown)
        }
    };

    match result {
        Ok(_) => {
            tracing::info!("Capture stopped gracefully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Capture failed: {:#}", e);
            Err(e)
        }
    }
}

fn run<S, K>(
    source: S,
    sink: Arc<K>,
    config: &CaptureConfig,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<SessionSummary>
where
    S: FrameSource<Frame = YuvFrame> + 'static,
    K: FrameSink<Frame = YuvFrame> + 'static,
{
    run_pipeline(
        source,
        sink,
        config.pipeline_settings(),
        shutdown,
        |frames, report| {
            let _span = common::span_debug!("frame_window");
            tracing::debug!(
                generation = report.generation,
                frames = frames.len(),
                addr_virt = frames[0].addr_virt,
                pts = frames[0].pts,
                "Frame window"
            );
        },
    )
}
