use crate::sdc::{DEFAULT_DEVICE_PATH, StreamParams};
use crate::service::PipelineSettings;
use anyhow::{bail, ensure};
use bridge::{Backoff, CursorAdvance};
use common::env_or;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use common::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The on-device camera service
    Sdc,
    /// Software frames, for running without camera hardware
    Simulated,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sdc" => Ok(SourceKind::Sdc),
            "simulated" | "sim" => Ok(SourceKind::Simulated),
            other => bail!("Unknown capture source '{}' (expected 'sdc' or 'simulated')", other),
        }
    }
}

fn parse_advance(s: &str) -> anyhow::Result<CursorAdvance> {
    match s.trim().to_lowercase().as_str() {
        "one-slot" | "one_slot" | "slide" => Ok(CursorAdvance::OneSlot),
        "window" => Ok(CursorAdvance::Window),
        other => bail!("Unknown cursor advance '{}' (expected 'one-slot' or 'window')", other),
    }
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub environment: Environment,
    pub source: SourceKind,
    pub device_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Unreleased frames the camera service may hold for this subscriber
    pub source_buffer_depth: u32,
    pub queue_capacity: usize,
    pub window_size: usize,
    pub cursor_advance: CursorAdvance,
    pub poll_interval: Duration,
    pub consumer_backoff: Duration,
    /// Upper bound when empty reads back off exponentially; equal to
    /// `consumer_backoff` for a fixed delay
    pub consumer_backoff_max: Duration,
    pub otel_endpoint: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            source: SourceKind::Sdc,
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            width: 640,
            height: 480,
            frame_rate: 25,
            source_buffer_depth: 25,
            queue_capacity: 25,
            window_size: 1,
            cursor_advance: CursorAdvance::OneSlot,
            poll_interval: Duration::from_micros(1000),
            consumer_backoff: Duration::from_millis(30),
            consumer_backoff_max: Duration::from_millis(30),
            otel_endpoint: None,
        }
    }
}

impl CaptureConfig {
    /// Load configuration from environment variables, using the defaults for
    /// anything unset or unparsable. Only a misspelled source or cursor mode
    /// is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let source = match env::var("CAPTURE_SOURCE") {
            Ok(s) => s.parse()?,
            Err(_) => defaults.source,
        };
        let cursor_advance = match env::var("CURSOR_ADVANCE") {
            Ok(s) => parse_advance(&s)?,
            Err(_) => defaults.cursor_advance,
        };

        let device_path = env::var("SDC_DEVICE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.device_path);

        let backoff_ms = env_or("CONSUMER_BACKOFF_MS", 30);
        let backoff_max_ms = env_or("CONSUMER_BACKOFF_MAX_MS", backoff_ms);

        let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            environment: Environment::from_env(),
            source,
            device_path,
            width: env_or("FRAME_WIDTH", defaults.width),
            height: env_or("FRAME_HEIGHT", defaults.height),
            frame_rate: env_or("FRAME_RATE", defaults.frame_rate),
            source_buffer_depth: env_or("SOURCE_BUFFER_DEPTH", defaults.source_buffer_depth),
            queue_capacity: env_or("QUEUE_CAPACITY", defaults.queue_capacity),
            window_size: env_or("WINDOW_SIZE", defaults.window_size),
            cursor_advance,
            poll_interval: Duration::from_micros(env_or("PRODUCER_POLL_INTERVAL_US", 1000)),
            consumer_backoff: Duration::from_millis(backoff_ms),
            consumer_backoff_max: Duration::from_millis(backoff_max_ms.max(backoff_ms)),
            otel_endpoint,
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.queue_capacity > 0, "QUEUE_CAPACITY must be at least 1");
        ensure!(
            (1..=self.queue_capacity).contains(&self.window_size),
            "WINDOW_SIZE must be between 1 and QUEUE_CAPACITY ({}), got {}",
            self.queue_capacity,
            self.window_size
        );
        ensure!(self.frame_rate > 0, "FRAME_RATE must be at least 1");
        ensure!(
            self.width > 0 && self.height > 0,
            "Frame size must be non-zero, got {}x{}",
            self.width,
            self.height
        );
        Ok(())
    }

    pub fn stream_params(&self) -> StreamParams {
        StreamParams {
            width: self.width,
            height: self.height,
            fps: self.frame_rate,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            queue_capacity: self.queue_capacity,
            window_size: self.window_size,
            poll_interval: self.poll_interval,
            consumer_backoff: Backoff::exponential(self.consumer_backoff, self.consumer_backoff_max),
            advance: self.cursor_advance,
        }
    }
}
