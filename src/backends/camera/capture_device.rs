// SPDX-License-Identifier: GPL-3.0-only

//! The open input device and the buffers it owns

use std::time::Duration;

use tracing::{debug, info, warn};

use super::buffer_pool::{BufferPool, ReleaseReport};
use super::negotiation;
use super::types::*;
use super::VideoDevice;
use crate::config::CaptureSettings;
use crate::errors::CaptureResult;

/// Open input device with its negotiated stream parameters
///
/// Width, height and frame rate start at the requested values and are
/// replaced by driver-confirmed values during [`CaptureDevice::negotiate`].
/// The buffer pool is released when the device is dropped, on every path.
pub struct CaptureDevice<D: VideoDevice> {
    device: D,
    format: PixelFormat,
    fps: u32,
    timeout: Duration,
    capabilities: Option<CapabilityReport>,
    pool: Option<BufferPool<D::Mapping>>,
}

impl<D: VideoDevice> CaptureDevice<D> {
    pub fn new(device: D, settings: &CaptureSettings) -> Self {
        Self {
            device,
            format: PixelFormat {
                width: settings.width,
                height: settings.height,
                fourcc: settings.fourcc,
            },
            fps: settings.fps,
            timeout: settings.timeout,
            capabilities: None,
            pool: None,
        }
    }

    /// Capabilities, input, pixel format and frame rate, in that order
    pub fn negotiate(&mut self) -> CaptureResult<()> {
        self.capabilities = negotiation::query_capabilities(&self.device);
        negotiation::select_input(&self.device)?;

        let confirmed =
            negotiation::set_pixel_format(&self.device, StreamDirection::Capture, &self.format)?;
        self.format.width = confirmed.width;
        self.format.height = confirmed.height;

        self.fps = negotiation::set_frame_rate(&self.device, StreamDirection::Capture, self.fps)?;

        info!(
            width = self.format.width,
            height = self.format.height,
            pixfmt = %self.format.fourcc,
            fps = self.fps,
            "Negotiated capture stream"
        );
        Ok(())
    }

    /// Request and map `count` buffers; replaces any existing pool
    pub fn allocate_buffers(&mut self, count: u32) -> CaptureResult<usize> {
        if let Some(old) = self.pool.take() {
            warn!("Reallocating buffer pool");
            old.release();
        }
        let pool = BufferPool::allocate(&self.device, count)?;
        let granted = pool.len();
        debug!(requested = count, granted, "Buffer pool ready");
        self.pool = Some(pool);
        Ok(granted)
    }

    /// Unmap every buffer; a no-op when no pool is held
    pub fn release_buffers(&mut self) -> ReleaseReport {
        match self.pool.take() {
            Some(pool) => pool.release(),
            None => ReleaseReport::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Device and pool borrowed together for the capture loop
    pub fn parts_mut(&mut self) -> (&D, Option<&mut BufferPool<D::Mapping>>) {
        (&self.device, self.pool.as_mut())
    }

    pub fn pool(&self) -> Option<&BufferPool<D::Mapping>> {
        self.pool.as_ref()
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn capabilities(&self) -> Option<&CapabilityReport> {
        self.capabilities.as_ref()
    }

    /// Format and rate a mirror device must be configured with
    pub fn stream_format(&self) -> StreamFormat {
        StreamFormat {
            pixel: self.format,
            fps: self.fps,
        }
    }
}

impl<D: VideoDevice> Drop for CaptureDevice<D> {
    fn drop(&mut self) {
        if self.pool.is_some() {
            let report = self.release_buffers();
            if !report.is_clean() {
                warn!(failures = report.failures.len(), "Buffer pool released with failures");
            }
        }
    }
}
