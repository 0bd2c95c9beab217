// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ V4L2 capture │ ──▶ │  Capture Loop     │ ──▶ │ stdout or    │
//! │   (mmap)     │     │  - wait / DQBUF   │     │ loopback dev │
//! │              │     │  - emit / QBUF    │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`capture`]: Capture state machine and session orchestration

pub mod capture;
