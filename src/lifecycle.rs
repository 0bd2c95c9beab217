// SPDX-License-Identifier: GPL-3.0-only

//! Process run/stop state
//!
//! A single flag, set at startup and cleared once by a termination signal
//! or by the capture loop itself. The loop reads it between frames only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Owner of the run flag
#[derive(Debug, Clone)]
pub struct Lifecycle {
    running: Arc<AtomicBool>,
}

/// Cloneable handle that can only request a stop
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Register the handler for SIGINT, SIGTERM and SIGHUP
    ///
    /// The handler only clears the run flag. SIGPIPE stays ignored (the Rust
    /// runtime default), so a vanished stdout reader shows up as an `EPIPE`
    /// write error that the output sink turns into a stop request.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let handle = self.stop_handle();
        ctrlc::set_handler(move || {
            handle.request_stop();
        })?;
        debug!("Termination handler installed");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    /// Clear the run flag; safe from any context
    pub fn request_stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stop requested, exiting...");
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}
