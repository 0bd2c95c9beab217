// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 implementation of [`VideoDevice`]
//!
//! Identification and negotiation go through `v4l`'s `Device` and its
//! `Capture`/`Output` traits. Buffer slots are driven one request at a time
//! through [`super::v4l2_ioctl`], and mapped with `v4l::v4l2::mmap`.

use std::io::{self, Write};
use std::os::raw::{c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::time::Duration;

use tracing::trace;
use v4l::buffer::Type;
use v4l::format::description::Flags as DescriptionFlags;
use v4l::format::Description;
use v4l::v4l2;
use v4l::v4l2::vidioc;
use v4l::video::capture::Parameters as CaptureParameters;
use v4l::video::output::Parameters as OutputParameters;
use v4l::video::{Capture, Output};
use v4l::{Device, Format, Fraction};

use super::types::*;
use super::v4l2_ioctl::{self as ioctl, xioctl};
use super::{BufferMapping, VideoDevice};

/// An open V4L2 device node
pub struct V4l2Device {
    device: Device,
    path: PathBuf,
}

impl V4l2Device {
    /// Open a device node (read/write, non-blocking)
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let device = Device::with_path(path)?;
        Ok(Self {
            device,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fd(&self) -> c_int {
        self.device.handle().fd()
    }

    fn stream_request(&self, request: vidioc::_IOC_TYPE) -> io::Result<()> {
        let mut kind = Type::VideoCapture as u32;
        xioctl(self.fd(), request, &mut kind)
    }
}

fn describe(desc: Description) -> FormatDescription {
    FormatDescription {
        fourcc: desc.fourcc,
        compressed: desc.flags.contains(DescriptionFlags::COMPRESSED),
        emulated: desc.flags.contains(DescriptionFlags::EMULATED),
        description: desc.description,
    }
}

impl VideoDevice for V4l2Device {
    type Mapping = MmapRegion;

    fn query_capabilities(&self) -> io::Result<CapabilityReport> {
        let caps = self.device.query_caps()?;
        Ok(CapabilityReport {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            version: caps.version,
            capabilities: caps.capabilities.bits(),
            formats: Vec::new(),
        })
    }

    fn enum_formats(&self, direction: StreamDirection) -> io::Result<Vec<FormatDescription>> {
        let descriptions = match direction {
            StreamDirection::Capture => Capture::enum_formats(&self.device)?,
            StreamDirection::Output => Output::enum_formats(&self.device)?,
        };
        Ok(descriptions.into_iter().map(describe).collect())
    }

    fn enum_input(&self, index: u32) -> io::Result<InputInfo> {
        let mut input = ioctl::input_descriptor(index);
        xioctl(self.fd(), vidioc::VIDIOC_ENUMINPUT, &mut input)?;

        Ok(InputInfo {
            index: input.index,
            name: extract_name(&input.name),
        })
    }

    fn set_input(&self, index: u32) -> io::Result<()> {
        let mut input = index as c_int;
        xioctl(self.fd(), vidioc::VIDIOC_S_INPUT, &mut input)
    }

    fn set_format(
        &self,
        direction: StreamDirection,
        format: &PixelFormat,
    ) -> io::Result<PixelFormat> {
        let requested = Format::new(format.width, format.height, format.fourcc);
        let confirmed = match direction {
            StreamDirection::Capture => Capture::set_format(&self.device, &requested)?,
            StreamDirection::Output => Output::set_format(&self.device, &requested)?,
        };

        Ok(PixelFormat {
            width: confirmed.width,
            height: confirmed.height,
            fourcc: confirmed.fourcc,
        })
    }

    fn set_frame_interval(
        &self,
        direction: StreamDirection,
        interval: FrameInterval,
    ) -> io::Result<FrameInterval> {
        let requested = Fraction::new(interval.numerator, interval.denominator);
        let confirmed = match direction {
            StreamDirection::Capture => {
                Capture::set_params(&self.device, &CaptureParameters::new(requested))?.interval
            }
            StreamDirection::Output => {
                Output::set_params(&self.device, &OutputParameters::new(requested))?.interval
            }
        };

        Ok(FrameInterval {
            numerator: confirmed.numerator,
            denominator: confirmed.denominator,
        })
    }

    fn request_buffers(&self, count: u32) -> io::Result<u32> {
        let mut req = ioctl::mmap_capture_request(count);
        xioctl(self.fd(), vidioc::VIDIOC_REQBUFS, &mut req)?;
        Ok(req.count)
    }

    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo> {
        let mut buf = ioctl::mmap_capture_buffer(index);
        xioctl(self.fd(), vidioc::VIDIOC_QUERYBUF, &mut buf)?;
        Ok(BufferInfo {
            index: buf.index,
            offset: ioctl::buffer_offset(&buf),
            length: buf.length,
        })
    }

    fn map_buffer(&self, info: &BufferInfo) -> io::Result<MmapRegion> {
        MmapRegion::map(self.fd(), info.offset, info.length as usize)
    }

    fn queue_buffer(&self, index: u32) -> io::Result<()> {
        let mut buf = ioctl::mmap_capture_buffer(index);
        xioctl(self.fd(), vidioc::VIDIOC_QBUF, &mut buf)
    }

    fn dequeue_buffer(&self) -> io::Result<DequeuedBuffer> {
        let mut buf = ioctl::mmap_capture_buffer(0);
        xioctl(self.fd(), vidioc::VIDIOC_DQBUF, &mut buf)?;
        trace!(index = buf.index, bytes_used = buf.bytesused, sequence = buf.sequence, "DQBUF");
        Ok(DequeuedBuffer {
            index: buf.index,
            bytes_used: buf.bytesused,
        })
    }

    fn stream_on(&self) -> io::Result<()> {
        self.stream_request(vidioc::VIDIOC_STREAMON)
    }

    fn stream_off(&self) -> io::Result<()> {
        self.stream_request(vidioc::VIDIOC_STREAMOFF)
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let ready = self.device.handle().poll(libc::POLLIN, timeout_ms)?;
        Ok(ready > 0)
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.device.write(bytes)
    }
}

/// A driver buffer mapped with `PROT_READ | PROT_WRITE`, `MAP_SHARED`
#[derive(Debug)]
pub struct MmapRegion {
    ptr: NonNull<u8>,
    len: usize,
}

impl MmapRegion {
    fn map(fd: c_int, offset: u32, len: usize) -> io::Result<Self> {
        let ptr = unsafe {
            v4l2::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset as libc::off_t,
            )?
        };

        NonNull::new(ptr as *mut u8)
            .map(|ptr| Self { ptr, len })
            .ok_or_else(|| io::Error::other("mmap returned a null address"))
    }
}

impl BufferMapping for MmapRegion {
    fn bytes(&self) -> &[u8] {
        // The mapping stays valid until `unmap` consumes `self`
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn unmap(self) -> io::Result<()> {
        unsafe { v4l2::munmap(self.ptr.as_ptr() as *mut c_void, self.len) }
    }
}
