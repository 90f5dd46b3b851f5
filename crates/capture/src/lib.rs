pub mod config;
pub mod consumer;
pub mod errors;
pub mod frame;
pub mod logging;
pub mod metrics;
pub mod pacing;
pub mod producer;
pub mod sdc;
pub mod service;
pub mod simulator;
pub mod sink;
pub mod source;

pub use config::{CaptureConfig, SourceKind};
pub use consumer::{ConsumerStats, FrameConsumer, ReadReport};
pub use errors::SdcError;
pub use frame::YuvFrame;
pub use producer::{FrameProducer, ProducerStats};
pub use service::{PipelineSettings, SessionSummary, run_pipeline};
pub use simulator::SimulatedCamera;
