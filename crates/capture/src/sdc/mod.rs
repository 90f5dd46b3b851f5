//! Client for the on-device camera service.
//!
//! The service is reached through a device file. Setup (`SdcSession`) is a
//! strict request/reply exchange; once subscribed, the handle is split into
//! a frame source that reads descriptor batches and a sink that returns
//! descriptors to the service.

mod session;
mod stream;
pub mod wire;

pub use session::{DEFAULT_DEVICE_PATH, DeviceIo, SdcSession, StreamParams};
pub use stream::{SdcFrameSink, SdcFrameSource};
