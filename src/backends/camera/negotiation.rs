// SPDX-License-Identifier: GPL-3.0-only

//! Device negotiation
//!
//! Opening the capture device, reporting its capabilities, and fixing input,
//! pixel format and frame rate to driver-confirmed values.

use std::path::Path;

use tracing::{debug, error, info, warn};

use super::types::*;
use super::{V4l2Device, VideoDevice};
use crate::errors::{CaptureError, CaptureResult, NegotiationStage};

/// Upper bound on input enumeration
const MAX_ENUMERATED_INPUTS: u32 = 256;

/// Open a video device read/write, non-blocking
pub fn open_capture_device(path: &Path) -> CaptureResult<V4l2Device> {
    V4l2Device::open(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Opening video device failed");
        CaptureError::OpenFailed(format!("{}: {}", path.display(), e))
    })
}

/// Query and log device capabilities
///
/// Best-effort: a failing QUERYCAP is logged and yields `None`.
pub fn query_capabilities<D: VideoDevice>(device: &D) -> Option<CapabilityReport> {
    let mut report = match device.query_capabilities() {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "Querying capabilities failed");
            return None;
        }
    };

    match device.enum_formats(StreamDirection::Capture) {
        Ok(formats) => report.formats = formats,
        Err(e) => debug!(error = %e, "Enumerating formats failed"),
    }

    log_capabilities(&report);
    Some(report)
}

fn log_capabilities(report: &CapabilityReport) {
    let (major, minor, patch) = report.version;
    info!(
        driver = %report.driver,
        card = %report.card,
        bus = %report.bus_info,
        version = format!("{}.{}.{}", major, minor, patch),
        capabilities = format!("{:08x}", report.capabilities),
        "Driver capabilities"
    );

    for desc in &report.formats {
        let c = if desc.compressed { 'C' } else { ' ' };
        let e = if desc.emulated { 'E' } else { ' ' };
        info!("  {}: {}{} {}", desc.fourcc, c, e, desc.description);
    }
}

/// Select the highest input index the driver enumerates
///
/// Some drivers report an unusable default input, so enumeration is walked
/// until it fails and the last successful index is selected.
pub fn select_input<D: VideoDevice>(device: &D) -> CaptureResult<u32> {
    let mut count = 0;
    while count < MAX_ENUMERATED_INPUTS {
        match device.enum_input(count) {
            Ok(input) => {
                debug!(index = input.index, name = %input.name, "Found input");
                count += 1;
            }
            Err(_) => break,
        }
    }

    let Some(index) = count.checked_sub(1) else {
        error!("Device enumerates no inputs");
        return Err(CaptureError::NegotiationRejected(
            NegotiationStage::Input,
            "no input could be enumerated".to_string(),
        ));
    };

    device.set_input(index).map_err(|e| {
        error!(index, error = %e, "Selecting input failed");
        CaptureError::NegotiationRejected(
            NegotiationStage::Input,
            format!("VIDIOC_S_INPUT {}: {}", index, e),
        )
    })?;

    debug!(index, "Selected input");
    Ok(index)
}

/// Request a pixel format for `direction`
///
/// The driver may replace width and height; it may not replace the pixel
/// format code. Returns the confirmed format.
pub fn set_pixel_format<D: VideoDevice>(
    device: &D,
    direction: StreamDirection,
    requested: &PixelFormat,
) -> CaptureResult<PixelFormat> {
    let confirmed = device.set_format(direction, requested).map_err(|e| {
        error!(error = %e, "Setting pixel format failed");
        CaptureError::NegotiationRejected(NegotiationStage::Format, format!("VIDIOC_S_FMT: {}", e))
    })?;

    info!(
        width = confirmed.width,
        height = confirmed.height,
        pixfmt = %confirmed.fourcc,
        ?direction,
        "Selected camera mode"
    );

    if (confirmed.width, confirmed.height) != (requested.width, requested.height) {
        debug!(
            requested_width = requested.width,
            requested_height = requested.height,
            width = confirmed.width,
            height = confirmed.height,
            "Driver adjusted resolution"
        );
    }

    if confirmed.fourcc != requested.fourcc {
        error!(
            requested = %requested.fourcc,
            confirmed = %confirmed.fourcc,
            "Pixel format not accepted"
        );
        return Err(CaptureError::NegotiationRejected(
            NegotiationStage::Format,
            format!(
                "requested {}, driver confirmed {}",
                requested.fourcc, confirmed.fourcc
            ),
        ));
    }

    Ok(confirmed)
}

/// Request a frame interval of `1/fps` for `direction`
///
/// Returns the confirmed denominator, which becomes the frame rate.
pub fn set_frame_rate<D: VideoDevice>(
    device: &D,
    direction: StreamDirection,
    fps: u32,
) -> CaptureResult<u32> {
    let confirmed = device
        .set_frame_interval(direction, FrameInterval::from_fps(fps))
        .map_err(|e| {
            error!(fps, error = %e, "Setting frame rate failed");
            CaptureError::NegotiationRejected(
                NegotiationStage::FrameRate,
                format!("VIDIOC_S_PARM: {}", e),
            )
        })?;

    if confirmed.denominator == 0 {
        error!(fps, "Driver confirmed a zero frame rate");
        return Err(CaptureError::NegotiationRejected(
            NegotiationStage::FrameRate,
            "driver confirmed a zero frame rate".to_string(),
        ));
    }

    if confirmed.denominator != fps || confirmed.numerator != 1 {
        info!(
            requested = fps,
            numerator = confirmed.numerator,
            denominator = confirmed.denominator,
            "Driver adjusted frame interval"
        );
    }

    Ok(confirmed.denominator)
}
