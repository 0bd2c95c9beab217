// SPDX-License-Identifier: GPL-3.0-only

//! Output sink for captured frames
//!
//! Frames go either to a byte stream (stdout) or into a second video device
//! opened in output mode, typically a v4l2loopback node that other
//! applications then read as a camera.
//!
//! # Architecture
//!
//! ```text
//! Captured frame (raw bytes)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │   OutputTarget   │
//! └──────────────────┘
//!        │
//!   ┌────┴─────┐
//!   ▼          ▼
//! stdout    loopback device  ← same width/height/fourcc/fps as the input
//! ```

use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, error, info, trace};

use crate::backends::camera::negotiation;
use crate::backends::camera::{StreamDirection, StreamFormat, V4l2Device, VideoDevice};
use crate::errors::{CaptureError, CaptureResult};

/// Unconfigured output choice, resolved once the input format is known
pub enum OutputRequest<D: VideoDevice> {
    /// Write raw bytes to a stream
    Stream(Box<dyn Write>),
    /// Feed an already-opened output device
    Mirror(D),
}

/// A device configured to mirror the input stream
pub struct MirrorDevice<D: VideoDevice> {
    device: D,
}

impl<D: VideoDevice> MirrorDevice<D> {
    /// Push the input's format and frame rate to `device`
    ///
    /// Any failure here is fatal: the capture loop never starts.
    pub fn configure(device: D, format: StreamFormat) -> CaptureResult<Self> {
        match device.query_capabilities() {
            Ok(caps) => info!(
                driver = %caps.driver,
                card = %caps.card,
                "Configuring loopback device"
            ),
            Err(e) => {
                error!(error = %e, "v4l2loopback: VIDIOC_QUERYCAP failed");
                return Err(CaptureError::OpenFailed(format!(
                    "output device is not a video device: {}",
                    e
                )));
            }
        }

        negotiation::set_pixel_format(&device, StreamDirection::Output, &format.pixel)?;
        let fps = negotiation::set_frame_rate(&device, StreamDirection::Output, format.fps)?;
        if fps != format.fps {
            debug!(requested = format.fps, confirmed = fps, "Loopback adjusted frame rate");
        }

        Ok(Self { device })
    }
}

/// Where each captured frame's bytes go; fixed for the whole run
pub enum OutputTarget<D: VideoDevice> {
    Stream {
        writer: Box<dyn Write>,
        hung_up: bool,
    },
    Mirror(MirrorDevice<D>),
}

impl<D: VideoDevice> OutputTarget<D> {
    /// Resolve an output request against the negotiated input format
    pub fn configure(request: OutputRequest<D>, format: StreamFormat) -> CaptureResult<Self> {
        match request {
            OutputRequest::Stream(writer) => Ok(Self::Stream {
                writer,
                hung_up: false,
            }),
            OutputRequest::Mirror(device) => {
                MirrorDevice::configure(device, format).map(Self::Mirror)
            }
        }
    }

    /// Write one frame
    ///
    /// Streams get the whole frame and a flush so a downstream pipe sees it
    /// immediately. Devices get a single raw write; a short write is not
    /// treated as an error.
    pub fn emit(&mut self, bytes: &[u8]) -> CaptureResult<()> {
        match self {
            Self::Stream { writer, hung_up } => {
                let result = writer.write_all(bytes).and_then(|()| writer.flush());
                result.map_err(|e| {
                    if e.kind() == io::ErrorKind::BrokenPipe {
                        *hung_up = true;
                    }
                    CaptureError::OutputWriteFailed(e.to_string())
                })
            }
            Self::Mirror(mirror) => match mirror.device.write_frame(bytes) {
                Ok(written) => {
                    if written < bytes.len() {
                        trace!(written, len = bytes.len(), "Short write to loopback device");
                    }
                    Ok(())
                }
                Err(e) => Err(CaptureError::OutputWriteFailed(e.to_string())),
            },
        }
    }

    /// Whether the stream reader went away (broken pipe)
    pub fn hung_up(&self) -> bool {
        matches!(self, Self::Stream { hung_up: true, .. })
    }

    pub fn is_mirror(&self) -> bool {
        matches!(self, Self::Mirror(_))
    }
}

/// Open an output device node read/write, non-blocking
pub fn open_mirror_device(path: &Path) -> CaptureResult<V4l2Device> {
    V4l2Device::open(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "v4l2loopback: opening virtual video device failed");
        CaptureError::OpenFailed(format!("{}: {}", path.display(), e))
    })
}
