// SPDX-License-Identifier: GPL-3.0-only

//! vidcopy - copy frames from a V4L2 capture device
//!
//! Frames are captured through memory-mapped driver buffers and written
//! either to stdout or to a second video device opened in output mode
//! (typically a v4l2loopback node).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Video device abstraction, V4L2 implementation and output sinks
//! - [`pipelines`]: Capture loop and session orchestration
//! - [`config`]: Requested capture parameters
//! - [`lifecycle`]: Run/stop flag and termination signal handling
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```ignore
//! // Capture 640x480 YUYV at 30 fps and pipe it to a player:
//! // vidcopy -w 640 -h 480 -r 30 -i /dev/video0 | ffplay -f rawvideo -pixel_format yuyv422 -video_size 640x480 -
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod lifecycle;
pub mod pipelines;

// Re-export commonly used types
pub use backends::camera::{FourCC, VideoDevice};
pub use config::{CaptureSettings, OutputSpec};
pub use errors::{CaptureError, CaptureResult};
pub use lifecycle::{Lifecycle, StopHandle};
