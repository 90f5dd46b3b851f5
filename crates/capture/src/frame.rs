use bytemuck::{Pod, Zeroable};

/// Pixel format code for semi-planar YUV 4:2:0 (NV21 layout).
pub const YUV_420SP: u32 = 1;

/// Descriptor of one captured YUV frame, as handed out by the camera service.
///
/// The pixel data stays in service-owned memory at `addr_phy`/`addr_virt`;
/// this record only describes it. Every descriptor obtained from the service
/// has to be handed back through `FrameSink::release` exactly once.
///
/// The layout is fixed (80 bytes, no padding) because it travels verbatim
/// over the device handle in both directions.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct YuvFrame {
    pub channel: u32,
    pub reserve: u32,
    pub addr_phy: u64,
    pub addr_virt: u64,
    pub size: u32,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: u32,
    pub pool_id: u32,
    /// Presentation timestamp from the sensor pipeline, microseconds
    pub pts: u64,
    /// System timestamp at capture, microseconds
    pub pts_sys: u64,
    /// Opaque release token, echoed back unchanged
    pub cookie: [u32; 4],
}

impl YuvFrame {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        assert_eq!(YuvFrame::SIZE, 80, "Frame descriptor must be 80 bytes");
        assert_eq!(std::mem::align_of::<YuvFrame>(), 8);
    }

    #[test]
    fn test_frame_bytes_roundtrip() {
        let frame = YuvFrame {
            channel: 3,
            addr_virt: 0xdead_beef,
            width: 640,
            height: 480,
            cookie: [1, 2, 3, 4],
            ..Default::default()
        };

        let bytes = bytemuck::bytes_of(&frame);
        assert_eq!(bytes.len(), YuvFrame::SIZE);

        let decoded: YuvFrame = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(decoded, frame);
    }
}
