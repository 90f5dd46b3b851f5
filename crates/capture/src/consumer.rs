use crate::metrics::CaptureMetrics;
use crate::sink::FrameSink;
use bridge::{Backoff, FrameQueue, QueueError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Outcome of one successful windowed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReport {
    /// Enqueue attempts observed by the queue at the time of the read
    pub generation: u64,
    /// Attempts since the previous successful read; `None` on the first read
    pub delta: Option<u64>,
    /// Attempts beyond one window since the previous read
    pub excess: u64,
}

impl ReadReport {
    /// The producer went further than one window ahead since the last read,
    /// so frames were lost or skipped.
    pub fn loss_detected(&self) -> bool {
        self.excess > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub reads: u64,
    pub empty_reads: u64,
    pub frames_consumed: u64,
    pub frames_missed: u64,
    pub release_failures: u64,
}

/// Windowed reader over the frame queue.
///
/// Each read copies `window_size` frames. Only the frames that actually
/// left the queue on that read are owned by the consumer; they are released
/// by `release_consumed`, or automatically before the next read.
pub struct FrameConsumer<T, K> {
    queue: Arc<FrameQueue<T>>,
    sink: Arc<K>,
    window: Vec<T>,
    /// Leading frames of `window` that left the queue and are not released yet
    owned: usize,
    last_generation: Option<u64>,
    backoff: Backoff,
    stats: ConsumerStats,
    metrics: CaptureMetrics,
}

impl<T, K> FrameConsumer<T, K>
where
    T: Copy + Default,
    K: FrameSink<Frame = T>,
{
    pub fn new(
        queue: Arc<FrameQueue<T>>,
        sink: Arc<K>,
        window_size: usize,
        backoff: Backoff,
    ) -> Result<Self, QueueError> {
        if window_size == 0 || window_size > queue.capacity() {
            return Err(QueueError::InvalidWindow {
                window: window_size,
                capacity: queue.capacity(),
            });
        }

        Ok(Self {
            queue,
            sink,
            window: vec![T::default(); window_size],
            owned: 0,
            last_generation: None,
            backoff,
            stats: ConsumerStats::default(),
            metrics: CaptureMetrics::new(),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// The window returned by the last successful read.
    pub fn frames(&self) -> &[T] {
        &self.window
    }

    /// The frames of the last window that the consumer owns.
    pub fn consumed_frames(&self) -> &[T] {
        &self.window[..self.owned]
    }

    /// Release the frames that left the queue on the last read. Returns how
    /// many were handed to the sink; calling it twice releases nothing the
    /// second time.
    pub fn release_consumed(&mut self) -> usize {
        let owned = std::mem::take(&mut self.owned);
        for frame in &self.window[..owned] {
            if let Err(e) = self.sink.release(frame) {
                self.stats.release_failures += 1;
                self.metrics.release_failures.add(1, &[]);
                tracing::warn!("Failed to release consumed frame: {}", e);
            }
        }
        owned
    }

    /// One non-blocking read. `Ok(None)` when fewer than a window of frames
    /// is queued.
    pub fn try_read(&mut self) -> Result<Option<ReadReport>, QueueError> {
        self.release_consumed();

        let generation = match self.queue.get(&mut self.window) {
            Ok(generation) => generation,
            Err(e) if e.is_expected() => {
                self.stats.empty_reads += 1;
                tracing::trace!(window = self.window.len(), "Not enough frames queued");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let window = self.window.len();
        self.owned = self.queue.advance().consumed(window);

        let delta = self.last_generation.map(|last| generation - last);
        let excess = delta.map_or(0, |d| d.saturating_sub(window as u64));
        self.last_generation = Some(generation);

        self.stats.reads += 1;
        self.stats.frames_consumed += self.owned as u64;
        self.stats.frames_missed += excess;
        self.metrics.frames_consumed.add(self.owned as u64, &[]);
        if excess > 0 {
            self.metrics.frames_missed.add(excess, &[]);
            tracing::debug!(generation, excess, "Producer ran ahead of the consumer");
        }

        Ok(Some(ReadReport {
            generation,
            delta,
            excess,
        }))
    }

    /// Read until a window is available, backing off between empty reads.
    /// Returns `Ok(None)` once `shutdown` is set.
    pub fn read_blocking(&mut self, shutdown: &AtomicBool) -> Result<Option<ReadReport>, QueueError> {
        let mut attempt = 0u32;
        while !shutdown.load(Ordering::Relaxed) {
            if let Some(report) = self.try_read()? {
                return Ok(Some(report));
            }
            thread::sleep(self.backoff.delay_for_attempt(attempt));
            attempt = attempt.saturating_add(1);
        }
        Ok(None)
    }
}
