use opentelemetry::{global, metrics::Counter};

const METER_NAME: &str = "capture";

/// Counters exported by the producer and the consumer.
///
/// Without an installed meter provider these are no-ops.
#[derive(Clone)]
pub struct CaptureMetrics {
    pub frames_received: Counter<u64>,
    pub frames_dropped: Counter<u64>,
    pub poll_errors: Counter<u64>,
    pub release_failures: Counter<u64>,
    pub frames_consumed: Counter<u64>,
    pub frames_missed: Counter<u64>,
}

impl CaptureMetrics {
    pub fn new() -> Self {
        let meter = global::meter(METER_NAME);

        Self {
            frames_received: meter
                .u64_counter("capture_frames_received_total")
                .with_description("Frame descriptors received from the camera service")
                .build(),
            frames_dropped: meter
                .u64_counter("capture_frames_dropped_total")
                .with_description("Frames released unread because the queue was full")
                .build(),
            poll_errors: meter
                .u64_counter("capture_poll_errors_total")
                .with_description("Failed reads from the camera service")
                .build(),
            release_failures: meter
                .u64_counter("capture_release_failures_total")
                .with_description("Frames the camera service refused to take back")
                .build(),
            frames_consumed: meter
                .u64_counter("capture_frames_consumed_total")
                .with_description("Frames removed from the queue by the consumer")
                .build(),
            frames_missed: meter
                .u64_counter("capture_frames_missed_total")
                .with_description("Frames produced but never seen by the consumer")
                .build(),
        }
    }
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self::new()
    }
}
