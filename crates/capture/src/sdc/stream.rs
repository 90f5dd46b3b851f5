use super::session::{DeviceIo, write_message};
use super::wire::{self, CommonHead, method, url};
use crate::errors::SdcError;
use crate::frame::YuvFrame;
use crate::sink::FrameSink;
use crate::source::FrameSource;
use std::io::{ErrorKind, IoSlice};
use std::sync::{Mutex, PoisonError};

/// Reading half of a subscribed session. Each read returns one message
/// carrying zero or more frame descriptors.
pub struct SdcFrameSource<D> {
    device: D,
    buf: Vec<u8>,
}

impl<D: DeviceIo> SdcFrameSource<D> {
    pub(crate) fn new(device: D, capacity: usize) -> Self {
        Self {
            device,
            buf: vec![0u8; capacity],
        }
    }
}

impl<D: DeviceIo> FrameSource for SdcFrameSource<D> {
    type Frame = YuvFrame;
    type Error = SdcError;

    fn poll_batch(&mut self, batch: &mut Vec<YuvFrame>) -> Result<usize, SdcError> {
        let n = match self.device.read(&mut self.buf) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Ok(0);
        }

        let reply = wire::parse_reply(&self.buf[..n])?;
        if reply.head.url != url::YUV_DATA {
            tracing::debug!(url = reply.head.url, "Ignoring non-frame message");
            return Ok(0);
        }
        // Descriptors in a message with an error code are still held by the
        // service, so they are taken and go through the normal release path
        if reply.head.code != wire::CODE_OK {
            tracing::warn!(code = reply.head.code, "Frame message carries error code");
        }
        if reply.content.is_empty() {
            tracing::debug!("Frame message without frames");
            return Ok(0);
        }

        let trailing = reply.content.len() % YuvFrame::SIZE;
        if trailing != 0 {
            tracing::warn!(
                bytes = reply.content.len(),
                trailing,
                "Frame message not a multiple of the descriptor size"
            );
        }

        let before = batch.len();
        batch.extend(wire::decode_records::<YuvFrame>(reply.content));
        Ok(batch.len() - before)
    }
}

/// Release half of a subscribed session. Shared by the producer and the
/// consumer; writes are serialized so messages never interleave.
pub struct SdcFrameSink<D> {
    device: Mutex<D>,
}

impl<D: DeviceIo> SdcFrameSink<D> {
    pub(crate) fn new(device: D) -> Self {
        Self {
            device: Mutex::new(device),
        }
    }
}

impl<D: DeviceIo> FrameSink for SdcFrameSink<D> {
    type Frame = YuvFrame;
    type Error = SdcError;

    fn release(&self, frame: &YuvFrame) -> Result<(), SdcError> {
        let head = CommonHead::request(url::YUV_DATA, method::DELETE, YuvFrame::SIZE);
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        write_message(
            &mut *device,
            &[
                IoSlice::new(bytemuck::bytes_of(&head)),
                IoSlice::new(bytemuck::bytes_of(frame)),
            ],
        )
    }
}
