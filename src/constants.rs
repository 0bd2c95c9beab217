// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Default capture width in pixels
pub const DEFAULT_WIDTH: u32 = 320;

/// Default capture height in pixels
pub const DEFAULT_HEIGHT: u32 = 240;

/// Default frame rate (frames per second)
pub const DEFAULT_FPS: u32 = 30;

/// Number of memory-mapped buffers requested from the driver
pub const DEFAULT_BUFFER_COUNT: u32 = 4;

/// How long to wait for a frame before giving up
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capture device
pub const DEFAULT_INPUT_DEVICE: &str = "/dev/video0";

/// Output argument meaning "write frames to stdout"
pub const STDOUT_OUTPUT: &str = "-";

/// Default pixel format (packed YUV 4:2:2)
pub const DEFAULT_PIXEL_FORMAT: &[u8; 4] = b"YUYV";

/// Application version string
pub fn app_version() -> &'static str {
    env!("GIT_VERSION")
}
