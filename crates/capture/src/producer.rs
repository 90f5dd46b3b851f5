use crate::metrics::CaptureMetrics;
use crate::sink::FrameSink;
use crate::source::FrameSource;
use bridge::{FrameQueue, QueueError};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const STATUS_EVERY_POLLS: u64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub polls: u64,
    pub poll_errors: u64,
    pub frames_received: u64,
    pub frames_enqueued: u64,
    /// Frames released straight back because the queue was full
    pub frames_dropped: u64,
    pub release_failures: u64,
}

/// Moves frame descriptors from a source into the queue.
///
/// A frame the queue rejects is released to the sink immediately, so the
/// producer never holds frames across polls and never blocks on the consumer.
pub struct FrameProducer<S: FrameSource, K> {
    source: S,
    sink: Arc<K>,
    queue: Arc<FrameQueue<S::Frame>>,
    poll_interval: Duration,
    batch: Vec<S::Frame>,
    stats: ProducerStats,
    metrics: CaptureMetrics,
}

impl<S, K> FrameProducer<S, K>
where
    S: FrameSource + 'static,
    K: FrameSink<Frame = S::Frame> + 'static,
{
    pub fn new(
        source: S,
        sink: Arc<K>,
        queue: Arc<FrameQueue<S::Frame>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            sink,
            queue,
            poll_interval,
            batch: Vec::new(),
            stats: ProducerStats::default(),
            metrics: CaptureMetrics::new(),
        }
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    /// Poll the source once and enqueue what it returned.
    ///
    /// Source errors are logged and counted; the next poll proceeds normally.
    pub fn poll_once(&mut self) {
        self.stats.polls += 1;
        self.batch.clear();

        if let Err(e) = self.source.poll_batch(&mut self.batch) {
            self.stats.poll_errors += 1;
            self.metrics.poll_errors.add(1, &[]);
            tracing::warn!("Frame poll failed: {}", e);
            return;
        }
        if self.batch.is_empty() {
            return;
        }

        let received = self.batch.len() as u64;
        self.stats.frames_received += received;
        self.metrics.frames_received.add(received, &[]);

        for frame in &self.batch {
            match self.queue.put(*frame) {
                Ok(()) => self.stats.frames_enqueued += 1,
                Err(QueueError::Full) => {
                    self.stats.frames_dropped += 1;
                    self.metrics.frames_dropped.add(1, &[]);
                    tracing::trace!("Queue full, releasing frame");
                    if let Err(e) = self.sink.release(frame) {
                        self.stats.release_failures += 1;
                        self.metrics.release_failures.add(1, &[]);
                        tracing::warn!("Failed to release dropped frame: {}", e);
                    }
                }
                Err(e) => {
                    // put only ever reports Full
                    tracing::error!("Unexpected queue error: {}", e);
                }
            }
        }
    }

    /// Poll until `shutdown` is set, sleeping `poll_interval` before each poll.
    pub fn run(mut self, shutdown: &AtomicBool) -> ProducerStats {
        let _span = common::span!("frame_producer");
        tracing::info!(poll_interval = ?self.poll_interval, "Frame producer started");

        while !shutdown.load(Ordering::Relaxed) {
            thread::sleep(self.poll_interval);
            self.poll_once();

            if self.stats.polls.is_multiple_of(STATUS_EVERY_POLLS) {
                let stats = self.stats;
                tracing::debug!(
                    "Status: [Received: {}] [Enqueued: {}] [Dropped: {}] [Poll errors: {}]",
                    stats.frames_received,
                    stats.frames_enqueued,
                    stats.frames_dropped,
                    stats.poll_errors
                );
            }
        }

        let stats = self.stats;
        tracing::info!(
            "Producer stopped: {} received, {} enqueued, {} dropped, {} poll errors",
            stats.frames_received,
            stats.frames_enqueued,
            stats.frames_dropped,
            stats.poll_errors
        );
        stats
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> io::Result<JoinHandle<ProducerStats>> {
        thread::Builder::new()
            .name("frame-producer".into())
            .spawn(move || self.run(&shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{SimulatedCamera, frame_id};

    #[test]
    fn test_poll_once_enqueues_batch() {
        let (source, sink) = SimulatedCamera::default().fixed(3);
        let queue = Arc::new(FrameQueue::new(5).unwrap());
        let mut producer = FrameProducer::new(source, sink.clone(), queue.clone(), Duration::ZERO);

        producer.poll_once();

        assert_eq!(queue.len(), 3);
        let stats = producer.stats();
        assert_eq!(stats.polls, 1);
        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.frames_enqueued, 3);
        assert_eq!(stats.frames_dropped, 0);
        assert_eq!(sink.outstanding(), 3);
    }

    #[test]
    fn test_full_queue_releases_rejected_frames() {
        let (source, sink) = SimulatedCamera::default().fixed(4);
        let queue = Arc::new(FrameQueue::new(3).unwrap());
        let mut producer = FrameProducer::new(source, sink.clone(), queue.clone(), Duration::ZERO);

        producer.poll_once();
        producer.poll_once();

        let stats = producer.stats();
        assert_eq!(stats.frames_received, 8);
        assert_eq!(stats.frames_enqueued, 3);
        assert_eq!(stats.frames_dropped, 5);
        assert_eq!(stats.release_failures, 0);

        // Only the queued frames are still held
        assert_eq!(sink.outstanding(), 3);
        assert_eq!(sink.released(), 5);
        assert_eq!(queue.produced_count(), 8);

        let mut drained = Vec::new();
        queue.drain(&mut drained);
        let ids: Vec<u64> = drained.iter().map(frame_id).collect();
        assert_eq!(ids, [0, 1, 2]);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let camera = SimulatedCamera {
            frame_limit: Some(10),
            ..Default::default()
        };
        let (source, sink) = camera.fixed(1);
        let queue = Arc::new(FrameQueue::new(25).unwrap());
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = FrameProducer::new(source, sink, queue.clone(), Duration::from_millis(1))
            .spawn(shutdown.clone())
            .unwrap();

        while queue.len() < 10 {
            thread::sleep(Duration::from_millis(1));
        }
        shutdown.store(true, Ordering::Relaxed);

        let stats = handle.join().unwrap();
        assert_eq!(stats.frames_enqueued, 10);
        assert!(stats.polls >= 10);
    }
}
