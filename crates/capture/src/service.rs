use crate::consumer::{ConsumerStats, FrameConsumer, ReadReport};
use crate::producer::{FrameProducer, ProducerStats};
use crate::sink::FrameSink;
use crate::source::FrameSource;
use anyhow::{Context, Result, anyhow};
use bridge::{Backoff, CursorAdvance, FrameQueue, QueueStats};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const STATUS_EVERY_READS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub queue_capacity: usize,
    pub window_size: usize,
    pub poll_interval: Duration,
    pub consumer_backoff: Backoff,
    pub advance: CursorAdvance,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 25,
            window_size: 1,
            poll_interval: Duration::from_millis(1),
            consumer_backoff: Backoff::default(),
            advance: CursorAdvance::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub producer: ProducerStats,
    pub consumer: ConsumerStats,
    pub queue: QueueStats,
    /// Frames still queued at shutdown and released by the service
    pub drained: usize,
}

/// Run the capture pipeline until `shutdown` is set.
///
/// The producer runs on its own thread; the consumer runs on the calling
/// thread and hands every window to `on_window`. On shutdown the consumer's
/// frames are released, the producer is joined, and whatever is still
/// queued is drained and released, so every frame the source handed out
/// goes back to the sink.
pub fn run_pipeline<S, K, F>(
    source: S,
    sink: Arc<K>,
    settings: PipelineSettings,
    shutdown: Arc<AtomicBool>,
    mut on_window: F,
) -> Result<SessionSummary>
where
    S: FrameSource + 'static,
    K: FrameSink<Frame = S::Frame> + 'static,
    F: FnMut(&[S::Frame], &ReadReport),
{
    let queue = Arc::new(
        FrameQueue::with_advance(settings.queue_capacity, settings.advance)
            .context("Failed to create frame queue")?,
    );
    let mut consumer = FrameConsumer::new(
        Arc::clone(&queue),
        Arc::clone(&sink),
        settings.window_size,
        settings.consumer_backoff,
    )
    .context("Invalid consumer window")?;

    let producer = FrameProducer::new(
        source,
        Arc::clone(&sink),
        Arc::clone(&queue),
        settings.poll_interval,
    )
    .spawn(Arc::clone(&shutdown))
    .context("Failed to spawn producer thread")?;

    tracing::info!(
        capacity = settings.queue_capacity,
        window = settings.window_size,
        advance = ?settings.advance,
        "Capture pipeline running"
    );

    let consumed = consume(&mut consumer, &queue, &shutdown, &mut on_window);

    // Stop the producer even when the consumer bailed out on its own
    shutdown.store(true, Ordering::Relaxed);
    consumer.release_consumed();

    let producer_stats = producer
        .join()
        .map_err(|_| anyhow!("Producer thread panicked"))?;

    let mut leftovers = Vec::with_capacity(queue.capacity());
    let drained = queue.drain(&mut leftovers);
    let mut release_failures = 0;
    for frame in &leftovers {
        if let Err(e) = sink.release(frame) {
            release_failures += 1;
            tracing::warn!("Failed to release queued frame at shutdown: {}", e);
        }
    }

    consumed?;

    let summary = SessionSummary {
        producer: producer_stats,
        consumer: consumer.stats(),
        queue: queue.stats(),
        drained,
    };
    tracing::info!(
        "Shutdown: {} received, {} dropped, {} consumed, {} missed, {} drained ({} release failures).",
        summary.producer.frames_received,
        summary.producer.frames_dropped,
        summary.consumer.frames_consumed,
        summary.consumer.frames_missed,
        drained,
        summary.producer.release_failures + summary.consumer.release_failures + release_failures
    );
    Ok(summary)
}

fn consume<T, K, F>(
    consumer: &mut FrameConsumer<T, K>,
    queue: &FrameQueue<T>,
    shutdown: &AtomicBool,
    on_window: &mut F,
) -> Result<()>
where
    T: Copy + Default,
    K: FrameSink<Frame = T>,
    F: FnMut(&[T], &ReadReport),
{
    while let Some(report) = consumer.read_blocking(shutdown)? {
        on_window(consumer.frames(), &report);

        let stats = consumer.stats();
        if stats.reads.is_multiple_of(STATUS_EVERY_READS) {
            let queue_stats = queue.stats();
            tracing::debug!(
                "Status: [Reads: {}] [Generation: {}] [Queued: {}] [Rejected: {}] [Missed: {}]",
                stats.reads,
                report.generation,
                queue_stats.stored,
                queue_stats.rejected,
                stats.frames_missed
            );
        }
    }
    Ok(())
}
