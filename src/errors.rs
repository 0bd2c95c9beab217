// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture pipeline
//!
//! Setup failures (open, negotiation, allocation, stream start, mirror
//! configuration) abort the run. Steady-state failures (wait, transfer,
//! output) stop the capture loop and still go through teardown. Teardown
//! failures (stream stop, unmap) are only reported.

use std::fmt;

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Which negotiation step the driver rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStage {
    /// Input source enumeration or selection
    Input,
    /// Pixel format / resolution
    Format,
    /// Frame interval
    FrameRate,
}

/// Which streaming control request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    Start,
    Stop,
}

/// Capture pipeline error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Device could not be opened
    OpenFailed(String),
    /// Driver refused input, format or frame rate
    NegotiationRejected(NegotiationStage, String),
    /// Buffer request, query or mapping failed
    AllocationFailed(String),
    /// Stream on/off request failed
    StreamControlFailed(StreamControl, String),
    /// Readiness wait timed out or failed (not distinguished)
    WaitFailed(String),
    /// Queue/dequeue of a buffer slot failed
    TransferFailed(String),
    /// Frame bytes could not be written to the output
    OutputWriteFailed(String),
    /// A mapped buffer could not be unmapped
    UnmapFailed(String),
}

impl fmt::Display for NegotiationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationStage::Input => write!(f, "input"),
            NegotiationStage::Format => write!(f, "pixel format"),
            NegotiationStage::FrameRate => write!(f, "frame rate"),
        }
    }
}

impl fmt::Display for StreamControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamControl::Start => write!(f, "start"),
            StreamControl::Stop => write!(f, "stop"),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::OpenFailed(msg) => write!(f, "Failed to open device: {}", msg),
            CaptureError::NegotiationRejected(stage, msg) => {
                write!(f, "Driver rejected {}: {}", stage, msg)
            }
            CaptureError::AllocationFailed(msg) => write!(f, "Buffer allocation failed: {}", msg),
            CaptureError::StreamControlFailed(control, msg) => {
                write!(f, "Failed to {} streaming: {}", control, msg)
            }
            CaptureError::WaitFailed(msg) => write!(f, "Waiting for frame failed: {}", msg),
            CaptureError::TransferFailed(msg) => write!(f, "Buffer transfer failed: {}", msg),
            CaptureError::OutputWriteFailed(msg) => write!(f, "Output write failed: {}", msg),
            CaptureError::UnmapFailed(msg) => write!(f, "Unmapping buffer failed: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}
