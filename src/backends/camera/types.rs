// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for the capture backend

pub use v4l::FourCC;

/// Parse a user-supplied pixel format code
///
/// Exactly four ASCII characters (space allowed for codes like `Y16 `),
/// upper-cased the way the kernel spells them.
pub fn parse_fourcc(code: &str) -> Option<FourCC> {
    let bytes: [u8; 4] = code.as_bytes().try_into().ok()?;
    if !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        return None;
    }
    Some(FourCC::new(&bytes.map(|b| b.to_ascii_uppercase())))
}

/// Direction of a video stream on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    /// Frames flow from the device to the process
    Capture,
    /// Frames flow from the process to the device (loopback sink)
    Output,
}

/// Resolution and pixel layout of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
}

/// Time per frame as a fraction of a second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInterval {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameInterval {
    /// Interval of `1/fps` seconds
    pub fn from_fps(fps: u32) -> Self {
        Self {
            numerator: 1,
            denominator: fps,
        }
    }
}

/// Everything the pipeline needs to mirror a stream on another device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub pixel: PixelFormat,
    pub fps: u32,
}

/// Enumerated pixel format description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    pub fourcc: FourCC,
    pub description: String,
    pub compressed: bool,
    pub emulated: bool,
}

/// Driver identification and capability bits (VIDIOC_QUERYCAP)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityReport {
    pub driver: String,
    pub card: String,
    pub bus_info: String,
    /// Kernel version as (major, minor, patch)
    pub version: (u8, u8, u8),
    pub capabilities: u32,
    /// Capture formats the driver enumerates
    pub formats: Vec<FormatDescription>,
}

/// Enumerated input source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
    pub index: u32,
    pub name: String,
}

/// Location of a driver buffer (VIDIOC_QUERYBUF)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub index: u32,
    pub offset: u32,
    pub length: u32,
}

/// Buffer handed back by the driver (VIDIOC_DQBUF)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeuedBuffer {
    pub index: u32,
    pub bytes_used: u32,
}

/// Extract a null-terminated string from a fixed-size byte array
pub(crate) fn extract_name(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).to_string()
}
