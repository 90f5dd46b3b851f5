/// Release side of the capture service contract.
///
/// Every frame obtained from a `FrameSource` goes back through `release`
/// exactly once: by the producer when the queue rejects it, by the consumer
/// after use, or by the service for frames still queued at shutdown.
/// Shared between the producer thread and the consumer, hence `Sync`.
pub trait FrameSink: Send + Sync {
    type Frame;
    type Error: std::error::Error + Send + Sync + 'static;

    fn release(&self, frame: &Self::Frame) -> Result<(), Self::Error>;
}
