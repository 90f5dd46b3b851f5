/// Producer-side half of the capture service contract.
///
/// `poll_batch` may block briefly but must not wait indefinitely for data:
/// the producer checks its stop flag between polls. Every frame appended to
/// `batch` is owned by the caller until it is handed to a `FrameSink`.
pub trait FrameSource: Send {
    type Frame: Copy + Default + Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append whatever frames are available right now; returns how many were appended.
    fn poll_batch(&mut self, batch: &mut Vec<Self::Frame>) -> Result<usize, Self::Error>;
}
