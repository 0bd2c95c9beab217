// SPDX-License-Identifier: GPL-3.0-only

//! Capture loop state machine
//!
//! ```text
//! Idle ──prepare──▶ Prepared ──start──▶ Streaming ──drain──▶ Draining ──▶ Stopped
//!                                        │     ▲
//!                                        └step─┘  wait → dequeue → emit → requeue
//! ```
//!
//! The run flag is checked between frames only, so a dequeued slot is always
//! requeued before the loop honours a stop request.

use std::io;

use tracing::{debug, error, info, trace, warn};

use crate::backends::camera::{CaptureDevice, ReleaseReport, VideoDevice};
use crate::backends::virtual_camera::OutputTarget;
use crate::errors::{CaptureError, CaptureResult, StreamControl};
use crate::lifecycle::Lifecycle;

/// Capture loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Buffers mapped, none handed to the driver
    Idle,
    /// Every buffer queued once
    Prepared,
    /// Driver is filling buffers
    Streaming,
    /// Stream stop issued, buffers being unmapped
    Draining,
    /// Teardown finished
    Stopped,
}

/// Why the loop exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Stop requested by a signal or by the output reader going away
    Requested,
    /// A steady-state failure ended the loop
    Failed(CaptureError),
}

/// Outcome of one loop iteration that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A frame went out and its slot went back to the driver
    Forwarded,
    /// A signal interrupted the wait; no slot changed hands
    Interrupted,
}

/// Frame counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub bytes: u64,
    pub waits: u64,
}

/// Result of teardown; failures are reported, never fatal
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    pub stream_stop: Option<CaptureError>,
    pub release: ReleaseReport,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.stream_stop.is_none() && self.release.is_clean()
    }
}

/// Drives one capture device through the streaming protocol
pub struct CaptureLoop<'a, D: VideoDevice> {
    capture: &'a mut CaptureDevice<D>,
    state: CaptureState,
    stats: LoopStats,
}

impl<'a, D: VideoDevice> CaptureLoop<'a, D> {
    pub fn new(capture: &'a mut CaptureDevice<D>) -> Self {
        Self {
            capture,
            state: CaptureState::Idle,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Idle → Prepared: queue every buffer exactly once
    pub fn prepare(&mut self) -> CaptureResult<()> {
        if self.state != CaptureState::Idle {
            return Err(CaptureError::TransferFailed(format!(
                "cannot queue buffers in state {:?}",
                self.state
            )));
        }

        let (device, pool) = self.capture.parts_mut();
        let pool = pool
            .ok_or_else(|| CaptureError::TransferFailed("no buffer pool allocated".to_string()))?;
        pool.enqueue_all(device).inspect_err(|e| error!(error = %e, "Queueing buffers failed"))?;

        debug!(buffers = pool.len(), "Queued all buffers");
        self.state = CaptureState::Prepared;
        Ok(())
    }

    /// Prepared → Streaming: a single stream-on request
    pub fn start(&mut self) -> CaptureResult<()> {
        if self.state != CaptureState::Prepared {
            return Err(CaptureError::StreamControlFailed(
                StreamControl::Start,
                format!("buffers not queued (state {:?})", self.state),
            ));
        }

        self.capture.device().stream_on().map_err(|e| {
            error!(error = %e, "VIDIOC_STREAMON failed");
            CaptureError::StreamControlFailed(StreamControl::Start, e.to_string())
        })?;

        self.state = CaptureState::Streaming;
        Ok(())
    }

    /// One frame: wait, dequeue, emit, requeue
    ///
    /// The slot is requeued even when emitting fails, so ownership always
    /// returns to the driver before the error is reported. A wait cut short
    /// by a signal returns [`StepOutcome::Interrupted`] without touching any
    /// slot.
    pub fn step(&mut self, target: &mut OutputTarget<D>) -> CaptureResult<StepOutcome> {
        let timeout = self.capture.timeout();
        let (device, pool) = self.capture.parts_mut();
        let pool = pool
            .ok_or_else(|| CaptureError::TransferFailed("no buffer pool allocated".to_string()))?;

        self.stats.waits += 1;
        match device.wait_readable(timeout) {
            Ok(true) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("Wait interrupted by signal");
                return Ok(StepOutcome::Interrupted);
            }
            Ok(false) => {
                warn!(timeout_secs = timeout.as_secs_f32(), "Timed out waiting for frame");
                return Err(CaptureError::WaitFailed(format!(
                    "no frame within {:?}",
                    timeout
                )));
            }
            Err(e) => {
                warn!(error = %e, "Waiting for frame failed");
                return Err(CaptureError::WaitFailed(e.to_string()));
            }
        }

        let (index, used) = pool.dequeue(device)?;

        let emitted = match pool.slot(index) {
            Some(slot) if used <= slot.len() => target.emit(&slot.bytes()[..used]),
            Some(slot) => Err(CaptureError::TransferFailed(format!(
                "slot {} reports {} bytes but maps only {}",
                index,
                used,
                slot.len()
            ))),
            None => Err(CaptureError::TransferFailed(format!("no buffer slot {}", index))),
        };

        let requeued = pool.enqueue(device, index);

        emitted?;
        requeued?;

        self.stats.frames += 1;
        self.stats.bytes += used as u64;
        trace!(index, bytes = used, frame = self.stats.frames, "Frame forwarded");
        Ok(StepOutcome::Forwarded)
    }

    /// Run frames until the run flag clears, a signal interrupts the wait,
    /// or an iteration fails
    ///
    /// Interruptions and failures clear the run flag before returning.
    pub fn run(&mut self, target: &mut OutputTarget<D>, lifecycle: &Lifecycle) -> StopReason {
        if self.state != CaptureState::Streaming {
            return StopReason::Failed(CaptureError::StreamControlFailed(
                StreamControl::Start,
                format!("capture loop is not streaming (state {:?})", self.state),
            ));
        }

        info!("capturing..");
        while lifecycle.is_running() {
            match self.step(target) {
                Ok(StepOutcome::Forwarded) => {}
                Ok(StepOutcome::Interrupted) => {
                    // The signal handler thread may not have run yet
                    lifecycle.request_stop();
                    debug!("Stopping after interrupted wait");
                    break;
                }
                Err(e) => {
                    let reason = Self::classify_failure(e, target, lifecycle);
                    self.log_stop();
                    return reason;
                }
            }
        }

        self.log_stop();
        StopReason::Requested
    }

    /// Clear the run flag and decide whether a failed iteration is a real failure
    fn classify_failure(
        error: CaptureError,
        target: &OutputTarget<D>,
        lifecycle: &Lifecycle,
    ) -> StopReason {
        // A stop that arrived before a failed wait is not a failure
        let stop_pending = !lifecycle.is_running();
        lifecycle.request_stop();

        if target.hung_up() {
            info!("Output reader closed the pipe");
            return StopReason::Requested;
        }
        if stop_pending && matches!(error, CaptureError::WaitFailed(_)) {
            debug!(error = %error, "Wait interrupted by stop request");
            return StopReason::Requested;
        }

        error!(error = %error, "Capture loop failed");
        StopReason::Failed(error)
    }

    fn log_stop(&self) {
        info!(
            frames = self.stats.frames,
            bytes = self.stats.bytes,
            "Capture loop stopped"
        );
    }

    /// Streaming → Draining → Stopped: stream off, then unmap every buffer
    ///
    /// Each step runs even if the previous one failed.
    pub fn drain(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        if self.state == CaptureState::Stopped {
            return report;
        }

        if self.state == CaptureState::Streaming {
            self.state = CaptureState::Draining;
            if let Err(e) = self.capture.device().stream_off() {
                error!(error = %e, "VIDIOC_STREAMOFF failed");
                report.stream_stop = Some(CaptureError::StreamControlFailed(
                    StreamControl::Stop,
                    e.to_string(),
                ));
            }
        }

        self.state = CaptureState::Draining;
        report.release = self.capture.release_buffers();
        debug!(
            unmapped = report.release.unmapped,
            failures = report.release.failures.len(),
            "Buffers released"
        );

        self.state = CaptureState::Stopped;
        report
    }
}

impl<D: VideoDevice> Drop for CaptureLoop<'_, D> {
    fn drop(&mut self) {
        if self.state != CaptureState::Stopped {
            self.drain();
        }
    }
}
