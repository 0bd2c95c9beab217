// SPDX-License-Identifier: GPL-3.0-only

//! Termination signal delivered while the loop waits for a frame
//!
//! Kept in its own test binary: the process-wide handler can only be
//! installed once.

mod common;

use common::{CapturedStream, SimState, SimulatedDevice, StopTrigger};
use vidcopy::backends::virtual_camera::OutputRequest;
use vidcopy::config::CaptureSettings;
use vidcopy::lifecycle::Lifecycle;
use vidcopy::pipelines::capture::{StopReason, run_session};

#[test]
fn test_sigint_during_wait_is_a_requested_stop() {
    let lifecycle = Lifecycle::new();
    lifecycle.install().expect("handler installs");

    let input = SimulatedDevice::new(SimState {
        stop_trigger: Some(StopTrigger::RaiseSigint(3)),
        ..SimState::default()
    });
    let stream = CapturedStream::default();

    let summary = run_session(
        input.clone(),
        OutputRequest::Stream(Box::new(stream.clone())),
        &CaptureSettings::default(),
        &lifecycle,
    )
    .expect("session should get past setup");

    assert_eq!(summary.stop, StopReason::Requested);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.stats.frames, 3);
    assert_eq!(stream.write_sizes().len(), 3);
    assert!(!lifecycle.is_running());

    input.with(|s| {
        assert_eq!(s.waits, 4);
        assert!(!s.streaming);
    });
}
