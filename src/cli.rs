// SPDX-License-Identifier: GPL-3.0-only

//! Capture command
//!
//! Opens the devices named on the command line and runs one capture
//! session, mapping the outcome to a process exit status.

use std::io;

use tracing::{error, info, warn};
use vidcopy::backends::camera::negotiation::open_capture_device;
use vidcopy::backends::virtual_camera::{OutputRequest, open_mirror_device};
use vidcopy::config::{CaptureSettings, OutputSpec};
use vidcopy::errors::CaptureResult;
use vidcopy::lifecycle::Lifecycle;
use vidcopy::pipelines::capture::{CaptureSummary, StopReason, run_session};

/// Run a capture session and return the process exit status
pub fn run_capture(settings: &CaptureSettings) -> u8 {
    match capture(settings) {
        Ok(summary) => {
            if let StopReason::Failed(e) = &summary.stop {
                error!(error = %e, "Capture stopped on error");
            }
            info!(
                frames = summary.stats.frames,
                bytes = summary.stats.bytes,
                "Done"
            );
            summary.exit_code()
        }
        Err(e) => {
            error!(error = %e, "Capture setup failed");
            1
        }
    }
}

fn capture(settings: &CaptureSettings) -> CaptureResult<CaptureSummary> {
    info!(
        width = settings.width,
        height = settings.height,
        fps = settings.fps,
        pixfmt = %settings.fourcc,
        input = %settings.input.display(),
        output = ?settings.output,
        "Required parameters"
    );

    let input = open_capture_device(&settings.input)?;

    let lifecycle = Lifecycle::new();
    if let Err(e) = lifecycle.install() {
        warn!(error = %e, "Failed to install termination handler");
    }

    let output = match &settings.output {
        OutputSpec::Stdout => OutputRequest::Stream(Box::new(io::stdout().lock())),
        OutputSpec::Device(path) => OutputRequest::Mirror(open_mirror_device(path)?),
    };

    run_session(input, output, settings, &lifecycle)
}
