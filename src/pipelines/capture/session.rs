// SPDX-License-Identifier: GPL-3.0-only

//! One capture run from negotiation to teardown

use tracing::{info, warn};

use super::capture_loop::{CaptureLoop, LoopStats, StopReason, TeardownReport};
use crate::backends::camera::{CaptureDevice, StreamFormat, VideoDevice};
use crate::backends::virtual_camera::{OutputRequest, OutputTarget};
use crate::config::CaptureSettings;
use crate::errors::CaptureResult;
use crate::lifecycle::Lifecycle;

/// What happened during a run that got past setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Negotiated stream parameters
    pub format: StreamFormat,
    /// Buffers the driver granted
    pub buffers: usize,
    pub stats: LoopStats,
    pub stop: StopReason,
    pub teardown: TeardownReport,
}

impl CaptureSummary {
    /// 0 when the loop ended on request, 1 when it ended on a failure
    pub fn exit_code(&self) -> u8 {
        match self.stop {
            StopReason::Requested => 0,
            StopReason::Failed(_) => 1,
        }
    }
}

/// Negotiate, allocate, configure the output, capture until stopped, tear down
///
/// Setup failures return `Err` before any frame is captured; buffers mapped
/// so far are released on the way out. Once streaming has started the run
/// always reaches teardown and returns a summary.
pub fn run_session<D: VideoDevice>(
    input: D,
    output: OutputRequest<D>,
    settings: &CaptureSettings,
    lifecycle: &Lifecycle,
) -> CaptureResult<CaptureSummary> {
    let mut capture = CaptureDevice::new(input, settings);
    capture.negotiate()?;
    let buffers = capture.allocate_buffers(settings.buffer_count)?;

    let format = capture.stream_format();
    let mut target = OutputTarget::configure(output, format)?;
    if target.is_mirror() {
        info!(
            width = format.pixel.width,
            height = format.pixel.height,
            pixfmt = %format.pixel.fourcc,
            fps = format.fps,
            "Loopback device configured"
        );
    }

    let mut capture_loop = CaptureLoop::new(&mut capture);
    capture_loop.prepare()?;
    capture_loop.start()?;

    let stop = capture_loop.run(&mut target, lifecycle);
    let stats = capture_loop.stats();
    let teardown = capture_loop.drain();
    if !teardown.is_clean() {
        warn!(?teardown, "Teardown finished with errors");
    }

    Ok(CaptureSummary {
        format,
        buffers,
        stats,
        stop,
        teardown,
    })
}
