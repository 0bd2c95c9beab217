// SPDX-License-Identifier: GPL-3.0-only

//! Capture device backend
//!
//! This module provides a trait-based abstraction over the kernel video
//! device so the capture pipeline can run against real V4L2 hardware or a
//! simulated device.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Capture session   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    CaptureDevice    │  ← Negotiation, buffer pool ownership
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  VideoDevice Trait  │  ← Kernel call surface
//! └──────────┬──────────┘
//!            │
//!            ▼
//!       ┌────────┐
//!       │  V4L2  │  ← v4l Device + per-slot requests
//!       └────────┘
//! ```

pub mod buffer_pool;
pub mod capture_device;
pub mod negotiation;
pub mod types;
pub mod v4l2_device;
pub mod v4l2_ioctl;

pub use buffer_pool::{BufferPool, MappedBuffer, ReleaseReport, SlotOwner};
pub use capture_device::CaptureDevice;
pub use types::*;
pub use v4l2_device::{MmapRegion, V4l2Device};

use std::io;
use std::time::Duration;

/// A region of driver buffer memory mapped into the process
///
/// Unmapping consumes the value, so a region can be unmapped at most once.
pub trait BufferMapping {
    /// The mapped bytes
    fn bytes(&self) -> &[u8];

    /// Release the mapping
    fn unmap(self) -> io::Result<()>;
}

/// Kernel call surface of a video device
///
/// Every method maps onto one V4L2 request (or `mmap`/`munmap`, `poll`,
/// `write`). Implementations must not retry beyond `EINTR`.
pub trait VideoDevice {
    /// Mapping type produced by [`VideoDevice::map_buffer`]
    type Mapping: BufferMapping;

    // ===== Identification =====

    /// Query driver identification and capability bits (VIDIOC_QUERYCAP)
    fn query_capabilities(&self) -> io::Result<CapabilityReport>;

    /// Every pixel format the driver lists for a stream direction (VIDIOC_ENUM_FMT)
    fn enum_formats(&self, direction: StreamDirection) -> io::Result<Vec<FormatDescription>>;

    // ===== Negotiation =====

    /// Enumerate the input source at `index` (VIDIOC_ENUMINPUT)
    fn enum_input(&self, index: u32) -> io::Result<InputInfo>;

    /// Select an input source (VIDIOC_S_INPUT)
    fn set_input(&self, index: u32) -> io::Result<()>;

    /// Request a pixel format; returns what the driver confirmed (VIDIOC_S_FMT)
    fn set_format(
        &self,
        direction: StreamDirection,
        format: &PixelFormat,
    ) -> io::Result<PixelFormat>;

    /// Request a frame interval; returns what the driver confirmed (VIDIOC_S_PARM)
    fn set_frame_interval(
        &self,
        direction: StreamDirection,
        interval: FrameInterval,
    ) -> io::Result<FrameInterval>;

    // ===== Buffers =====

    /// Request `count` mmap capture buffers; returns the granted count (VIDIOC_REQBUFS)
    fn request_buffers(&self, count: u32) -> io::Result<u32>;

    /// Query length and offset of a granted buffer (VIDIOC_QUERYBUF)
    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo>;

    /// Map a granted buffer into process memory
    fn map_buffer(&self, info: &BufferInfo) -> io::Result<Self::Mapping>;

    /// Hand a buffer slot to the driver (VIDIOC_QBUF)
    fn queue_buffer(&self, index: u32) -> io::Result<()>;

    /// Take a filled buffer slot back from the driver (VIDIOC_DQBUF)
    fn dequeue_buffer(&self) -> io::Result<DequeuedBuffer>;

    // ===== Streaming =====

    /// Start capture streaming (VIDIOC_STREAMON)
    fn stream_on(&self) -> io::Result<()>;

    /// Stop capture streaming (VIDIOC_STREAMOFF)
    fn stream_off(&self) -> io::Result<()>;

    /// Block until the device is readable or `timeout` elapses
    ///
    /// Returns `Ok(false)` when the timeout elapsed without data.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool>;

    /// Raw write of frame bytes (loopback sink)
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<usize>;
}
