use std::io;
use thiserror::Error;

/// Errors from the camera service exchange and from frame sources in general.
#[derive(Error, Debug)]
pub enum SdcError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Service replied with code {code} (url {url}, method {method})")]
    Status { url: u16, method: u8, code: u16 },

    #[error("Reply truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("No available YUV channel (all busy, snapshot-only or fixed resolution)")]
    NoChannelAvailable,

    #[error("Unexpected reply for url {0}")]
    UnexpectedReply(u16),
}
