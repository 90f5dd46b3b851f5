use super::stream::{SdcFrameSink, SdcFrameSource};
use super::wire::{
    self, ChannelInfo, ChannelParam, CommonHead, EXT_YUV_CACHED_COUNT_MAX, ExtendHead, method, url,
};
use crate::errors::SdcError;
use crate::frame::{YUV_420SP, YuvFrame};
use common::retry::{RetryPolicy, retry_with_backoff};
use std::fs::{File, OpenOptions};
use std::io::{self, IoSlice, Read, Write};
use std::path::Path;

pub const DEFAULT_DEVICE_PATH: &str = "/mnt/srvfs/video.iaas.sdc";

/// Large enough for any setup reply and for the frame batches of the
/// default cache depth; deeper subscriptions get a larger stream buffer.
pub(crate) const REPLY_BUFFER_SIZE: usize = 4096;

/// A handle to the camera service: one request or reply per `write`/`read`.
///
/// `try_clone` must yield a second handle to the same session so the frame
/// source can read while the sink writes releases.
pub trait DeviceIo: Read + Write + Send + Sized {
    fn try_clone(&self) -> io::Result<Self>;
}

impl DeviceIo for File {
    fn try_clone(&self) -> io::Result<Self> {
        File::try_clone(self)
    }
}

/// Write one message as a single vectored write; the service rejects split messages.
pub(crate) fn write_message<D: Write>(device: &mut D, parts: &[IoSlice<'_>]) -> Result<(), SdcError> {
    let expected: usize = parts.iter().map(|p| p.len()).sum();
    let written = device.write_vectored(parts)?;
    if written != expected {
        return Err(SdcError::ShortWrite { written, expected });
    }
    Ok(())
}

/// Bytes needed to read one frame message carrying `buffer_depth` descriptors.
pub(crate) fn frame_message_capacity(buffer_depth: u32) -> usize {
    let batch = CommonHead::SIZE + ExtendHead::SIZE + buffer_depth as usize * YuvFrame::SIZE;
    batch.max(REPLY_BUFFER_SIZE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Setup phase of a capture session: channel discovery, configuration and
/// subscription. Any failure here is fatal for the session and happens
/// before a producer thread exists.
pub struct SdcSession<D> {
    device: D,
    buf: Vec<u8>,
    /// Cache depth of the active subscription; bounds the frames per message
    buffer_depth: u32,
}

impl SdcSession<File> {
    /// Open the service device read/write.
    pub fn register(path: impl AsRef<Path>) -> Result<Self, SdcError> {
        let device = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "Registered with camera service");
        Ok(Self::from_device(device))
    }

    /// Register, pick a channel, configure it and subscribe, returning the
    /// streaming halves. Registration is retried; later steps are not.
    pub fn connect(
        path: impl AsRef<Path>,
        params: StreamParams,
        buffer_depth: u32,
        retry: RetryPolicy,
    ) -> Result<(SdcFrameSource<File>, SdcFrameSink<File>), SdcError> {
        let path = path.as_ref();
        let mut session = retry_with_backoff(|| Self::register(path), retry, "Camera service registration")?;

        let channel = session.negotiate_channel()?;
        session.configure_channel(channel, params)?;
        session.subscribe(channel, buffer_depth)?;
        session.into_stream()
    }
}

impl<D: DeviceIo> SdcSession<D> {
    pub fn from_device(device: D) -> Self {
        Self {
            device,
            buf: vec![0u8; REPLY_BUFFER_SIZE],
            buffer_depth: 0,
        }
    }

    fn read_reply(&mut self) -> Result<usize, SdcError> {
        let n = self.device.read(&mut self.buf)?;
        Ok(n)
    }

    /// Query every YUV channel the service exposes.
    pub fn list_channels(&mut self) -> Result<Vec<ChannelInfo>, SdcError> {
        let head = CommonHead::request(url::YUV_CHANNEL, method::GET, 0);
        write_message(&mut self.device, &[IoSlice::new(bytemuck::bytes_of(&head))])?;

        let n = self.read_reply()?;
        let reply = wire::parse_reply(&self.buf[..n])?;
        reply.head.ensure_ok()?;
        if reply.head.url != url::YUV_CHANNEL {
            return Err(SdcError::UnexpectedReply(reply.head.url));
        }

        Ok(wire::decode_records::<ChannelInfo>(reply.content).collect())
    }

    /// Pick the first streaming channel that is free and resolution-adjustable.
    pub fn negotiate_channel(&mut self) -> Result<u32, SdcError> {
        let channels = self.list_channels()?;
        tracing::debug!(count = channels.len(), "YUV channels reported");

        let channel = channels
            .iter()
            .find(|info| info.is_available())
            .map(|info| info.param.channel)
            .ok_or(SdcError::NoChannelAvailable)?;

        tracing::info!(channel, "Selected YUV channel");
        Ok(channel)
    }

    pub fn configure_channel(&mut self, channel: u32, params: StreamParams) -> Result<(), SdcError> {
        let param = ChannelParam {
            channel,
            width: params.width,
            height: params.height,
            fps: params.fps,
            on_off: 1,
            format: YUV_420SP,
        };
        let head = CommonHead::request(
            url::YUV_CHANNEL,
            method::UPDATE,
            std::mem::size_of::<ChannelParam>(),
        );

        write_message(
            &mut self.device,
            &[
                IoSlice::new(bytemuck::bytes_of(&head)),
                IoSlice::new(bytemuck::bytes_of(&param)),
            ],
        )?;

        let n = self.read_reply()?;
        wire::parse_reply(&self.buf[..n])?.head.ensure_ok()?;

        tracing::info!(
            channel,
            width = params.width,
            height = params.height,
            fps = params.fps,
            "Channel configured"
        );
        Ok(())
    }

    /// Start streaming `channel`; the service buffers at most `buffer_depth`
    /// frames that have not been released yet.
    pub fn subscribe(&mut self, channel: u32, buffer_depth: u32) -> Result<(), SdcError> {
        let extend = ExtendHead::new(EXT_YUV_CACHED_COUNT_MAX, buffer_depth);
        let mut head = CommonHead::request(url::YUV_DATA, method::GET, std::mem::size_of::<u32>());
        head.head_length += extend.length;

        write_message(
            &mut self.device,
            &[
                IoSlice::new(bytemuck::bytes_of(&head)),
                IoSlice::new(bytemuck::bytes_of(&extend)),
                IoSlice::new(&channel.to_ne_bytes()),
            ],
        )?;

        let n = self.read_reply()?;
        wire::parse_reply(&self.buf[..n])?.head.ensure_ok()?;
        self.buffer_depth = buffer_depth;

        tracing::info!(channel, buffer_depth, "Subscribed to YUV data");
        Ok(())
    }

    /// Split the session into a frame source and a release sink with
    /// independent handles. The source reads into a buffer that holds a
    /// full batch of the subscribed cache depth.
    pub fn into_stream(self) -> Result<(SdcFrameSource<D>, SdcFrameSink<D>), SdcError> {
        let sink_device = self.device.try_clone()?;
        Ok((
            SdcFrameSource::new(self.device, frame_message_capacity(self.buffer_depth)),
            SdcFrameSink::new(sink_device),
        ))
    }
}
