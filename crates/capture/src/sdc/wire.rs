use crate::errors::SdcError;
use bytemuck::{Pod, Zeroable};

/// Protocol version stamped on every request.
pub const SDC_VERSION: u16 = 0x5331;

pub const CODE_OK: u16 = 200;

pub mod url {
    pub const YUV_CHANNEL: u16 = 0;
    pub const YUV_DATA: u16 = 1;
}

pub mod method {
    pub const GET: u8 = 2;
    pub const UPDATE: u8 = 3;
    pub const DELETE: u8 = 4;
}

/// Extended header type carrying the service-side frame cache depth of a subscription.
pub const EXT_YUV_CACHED_COUNT_MAX: u16 = 2;

const RESPONSE_BIT: u8 = 0x80;
const METHOD_MASK: u8 = 0x7f;

/// Header prefixed to every request and reply.
///
/// `head_length` covers this header plus any extended headers that follow
/// it; the content starts right after and is `content_length` bytes long.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CommonHead {
    pub version: u16,
    pub url_version: u8,
    /// Method in the low 7 bits, response flag in the high bit
    pub method_flags: u8,
    pub url: u16,
    pub code: u16,
    pub head_length: u16,
    pub trans_id: u16,
    pub content_length: u32,
}

impl CommonHead {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn request(url: u16, method: u8, content_length: usize) -> Self {
        Self {
            version: SDC_VERSION,
            method_flags: method & METHOD_MASK,
            url,
            head_length: Self::SIZE as u16,
            content_length: content_length as u32,
            ..Default::default()
        }
    }

    pub fn method(&self) -> u8 {
        self.method_flags & METHOD_MASK
    }

    pub fn is_response(&self) -> bool {
        self.method_flags & RESPONSE_BIT != 0
    }

    pub fn ensure_ok(&self) -> Result<(), SdcError> {
        if self.code == CODE_OK {
            Ok(())
        } else {
            Err(SdcError::Status {
                url: self.url,
                method: self.method(),
                code: self.code,
            })
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExtendHead {
    pub kind: u16,
    pub length: u16,
    pub value: u32,
}

impl ExtendHead {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(kind: u16, value: u32) -> Self {
        Self {
            kind,
            length: Self::SIZE as u16,
            value,
        }
    }
}

/// Stream parameters of one YUV channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ChannelParam {
    pub channel: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub on_off: u32,
    pub format: u32,
}

/// One entry of the channel list returned by `GET yuv-channel`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ChannelInfo {
    pub is_snap_channel: u32,
    pub src_id: u32,
    pub subscribe_count: u32,
    pub resolution_modify: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub param: ChannelParam,
}

impl ChannelInfo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Streaming channel nobody else subscribed to, with an adjustable resolution.
    pub fn is_available(&self) -> bool {
        self.is_snap_channel == 0 && self.subscribe_count == 0 && self.resolution_modify == 1
    }
}

/// A reply split into its header and content.
#[derive(Debug)]
pub struct Reply<'a> {
    pub head: CommonHead,
    pub content: &'a [u8],
}

pub fn parse_reply(buf: &[u8]) -> Result<Reply<'_>, SdcError> {
    if buf.len() < CommonHead::SIZE {
        return Err(SdcError::Truncated {
            expected: CommonHead::SIZE,
            actual: buf.len(),
        });
    }

    let head: CommonHead = bytemuck::pod_read_unaligned(&buf[..CommonHead::SIZE]);

    let start = (head.head_length as usize).max(CommonHead::SIZE);
    let end = start + head.content_length as usize;
    if end > buf.len() {
        return Err(SdcError::Truncated {
            expected: end,
            actual: buf.len(),
        });
    }

    Ok(Reply {
        head,
        content: &buf[start..end],
    })
}

/// Decode a content area holding consecutive fixed-size records.
///
/// Trailing bytes that do not form a whole record are ignored.
pub fn decode_records<T: Pod>(content: &[u8]) -> impl Iterator<Item = T> + '_ {
    content
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::YuvFrame;

    #[test]
    fn test_wire_sizes() {
        assert_eq!(CommonHead::SIZE, 16);
        assert_eq!(ExtendHead::SIZE, 8);
        assert_eq!(std::mem::size_of::<ChannelParam>(), 24);
        assert_eq!(ChannelInfo::SIZE, 48);
    }

    #[test]
    fn test_request_head() {
        let head = CommonHead::request(url::YUV_DATA, method::DELETE, YuvFrame::SIZE);
        assert_eq!(head.version, SDC_VERSION);
        assert_eq!(head.url, url::YUV_DATA);
        assert_eq!(head.method(), method::DELETE);
        assert!(!head.is_response());
        assert_eq!(head.head_length as usize, CommonHead::SIZE);
        assert_eq!(head.content_length as usize, YuvFrame::SIZE);
    }

    #[test]
    fn test_response_bit_and_status() {
        let mut head = CommonHead::request(url::YUV_CHANNEL, method::GET, 0);
        head.method_flags |= RESPONSE_BIT;
        head.code = CODE_OK;
        assert!(head.is_response());
        assert_eq!(head.method(), method::GET);
        assert!(head.ensure_ok().is_ok());

        head.code = 500;
        match head.ensure_ok() {
            Err(SdcError::Status {
                url: u,
                method: m,
                code,
            }) => {
                assert_eq!(u, url::YUV_CHANNEL);
                assert_eq!(m, method::GET);
                assert_eq!(code, 500);
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_reply_skips_extended_headers() {
        let mut head = CommonHead::request(url::YUV_DATA, method::GET, 4);
        head.head_length = (CommonHead::SIZE + ExtendHead::SIZE) as u16;

        let mut buf = bytemuck::bytes_of(&head).to_vec();
        buf.extend_from_slice(bytemuck::bytes_of(&ExtendHead::new(
            EXT_YUV_CACHED_COUNT_MAX,
            25,
        )));
        buf.extend_from_slice(&7u32.to_ne_bytes());

        let reply = parse_reply(&buf).unwrap();
        assert_eq!(reply.head.url, url::YUV_DATA);
        assert_eq!(reply.content, &7u32.to_ne_bytes());
    }

    #[test]
    fn test_parse_reply_truncated() {
        assert!(matches!(
            parse_reply(&[0u8; 4]),
            Err(SdcError::Truncated {
                expected: 16,
                actual: 4
            })
        ));

        let head = CommonHead::request(url::YUV_DATA, method::GET, 80);
        let buf = bytemuck::bytes_of(&head).to_vec();
        assert!(matches!(
            parse_reply(&buf),
            Err(SdcError::Truncated {
                expected: 96,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_decode_records_ignores_trailing_bytes() {
        let frames = [
            YuvFrame {
                addr_virt: 1,
                ..Default::default()
            },
            YuvFrame {
                addr_virt: 2,
                ..Default::default()
            },
        ];
        let mut content = bytemuck::cast_slice::<YuvFrame, u8>(&frames).to_vec();
        content.extend_from_slice(&[0xff; 3]);

        let decoded: Vec<YuvFrame> = decode_records(&content).collect();
        assert_eq!(decoded, frames);
    }

    #[test]
    fn test_channel_availability() {
        let free = ChannelInfo {
            resolution_modify: 1,
            ..Default::default()
        };
        assert!(free.is_available());

        let snapshot = ChannelInfo {
            is_snap_channel: 1,
            ..free
        };
        assert!(!snapshot.is_available());

        let shared = ChannelInfo {
            subscribe_count: 2,
            ..free
        };
        assert!(!shared.is_available());

        let fixed = ChannelInfo {
            resolution_modify: 0,
            ..free
        };
        assert!(!fixed.is_available());
    }
}
