// SPDX-License-Identifier: GPL-3.0-only

//! Backend layer for video devices
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Capture pipeline               │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │      Camera      │  │ Virtual Camera  │  │
//! │  │ (V4L2 + mmap)    │  │ (stdout / loop) │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Device seam, ioctl layer, negotiation and buffer pool
//! - [`virtual_camera`]: Output sink (stdout or v4l2loopback device)

pub mod camera;
pub mod virtual_camera;
