pub mod backoff;
pub mod errors;
pub mod queue;

pub use backoff::Backoff;
pub use errors::QueueError;
pub use queue::{CursorAdvance, FrameQueue, QueueState, QueueStats};
