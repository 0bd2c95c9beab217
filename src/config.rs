// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::FourCC;
use crate::constants;
use std::path::PathBuf;
use std::time::Duration;

/// Where captured frames are written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputSpec {
    /// Raw frames back-to-back on stdout
    #[default]
    Stdout,
    /// A second video device opened in output mode (v4l2loopback)
    Device(PathBuf),
}

impl OutputSpec {
    /// Interpret an `-o` argument: `-` means stdout, anything else is a device
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with(constants::STDOUT_OUTPUT) {
            Self::Stdout
        } else {
            Self::Device(PathBuf::from(arg))
        }
    }
}

/// Requested capture parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Requested frame width (the driver may override it)
    pub width: u32,
    /// Requested frame height (the driver may override it)
    pub height: u32,
    /// Requested frame rate
    pub fps: u32,
    /// Pixel format; the driver must accept it unchanged
    pub fourcc: FourCC,
    /// Number of mmap buffers to request
    pub buffer_count: u32,
    /// Bound on each wait for a frame
    pub timeout: Duration,
    /// Capture device path
    pub input: PathBuf,
    /// Frame destination
    pub output: OutputSpec,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: constants::DEFAULT_WIDTH,
            height: constants::DEFAULT_HEIGHT,
            fps: constants::DEFAULT_FPS,
            fourcc: FourCC::new(constants::DEFAULT_PIXEL_FORMAT),
            buffer_count: constants::DEFAULT_BUFFER_COUNT,
            timeout: constants::DEFAULT_FRAME_TIMEOUT,
            input: PathBuf::from(constants::DEFAULT_INPUT_DEVICE),
            output: OutputSpec::Stdout,
        }
    }
}
