// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipeline
//!
//! - [`capture_loop`]: the queue/stream/dequeue/requeue state machine
//! - [`session`]: a full run from negotiation to teardown

pub mod capture_loop;
pub mod session;

pub use capture_loop::{
    CaptureLoop, CaptureState, LoopStats, StepOutcome, StopReason, TeardownReport,
};
pub use session::{CaptureSummary, run_session};
