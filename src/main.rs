// SPDX-License-Identifier: GPL-3.0-only

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use vidcopy::backends::camera::{FourCC, parse_fourcc as fourcc_from_str};
use vidcopy::config::{CaptureSettings, OutputSpec};
use vidcopy::constants;

mod cli;

/// Parse a 4-character pixel format code (case-insensitive)
fn parse_fourcc(code: &str) -> Result<FourCC, String> {
    fourcc_from_str(code).ok_or_else(|| format!("'{}' is not a 4-character pixel format code", code))
}

#[derive(Parser, Debug)]
#[command(name = "vidcopy")]
#[command(about = "Copy frames from a V4L2 capture device to stdout or a v4l2loopback device")]
#[command(version = constants::app_version())]
#[command(disable_help_flag = true)]
struct Cli {
    /// Frame width
    #[arg(short = 'w', value_name = "width", default_value_t = constants::DEFAULT_WIDTH,
          value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Frame height
    #[arg(short = 'h', value_name = "height", default_value_t = constants::DEFAULT_HEIGHT,
          value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Frame rate
    #[arg(short = 'r', value_name = "framerate", default_value_t = constants::DEFAULT_FPS,
          value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Input (capture) device
    #[arg(short = 'i', value_name = "input device", default_value = constants::DEFAULT_INPUT_DEVICE)]
    input: PathBuf,

    /// Output device, or "-" for stdout. Use a v4l2loopback node to copy to another device
    #[arg(short = 'o', value_name = "output device", default_value = constants::STDOUT_OUTPUT,
          allow_hyphen_values = true)]
    output: String,

    /// FourCC pixel format, e.g. YUYV, UYVY, YV12, YU12
    #[arg(short = 'f', value_name = "pixformat", default_value = "YUYV", value_parser = parse_fourcc)]
    format: FourCC,

    /// Number of memory-mapped buffers to request
    #[arg(long, value_name = "count", default_value_t = constants::DEFAULT_BUFFER_COUNT,
          value_parser = clap::value_parser!(u32).range(1..))]
    buffers: u32,

    /// Seconds to wait for each frame
    #[arg(long, value_name = "secs", default_value_t = constants::DEFAULT_FRAME_TIMEOUT.as_secs(),
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn into_settings(self) -> CaptureSettings {
        CaptureSettings {
            width: self.width,
            height: self.height,
            fps: self.fps,
            fourcc: self.format,
            buffer_count: self.buffers,
            timeout: std::time::Duration::from_secs(self.timeout),
            input: self.input,
            output: OutputSpec::from_arg(&self.output),
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=vidcopy=trace
    // Always stderr: stdout carries frame data
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vidcopy=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let settings = Cli::parse().into_settings();
    ExitCode::from(cli::run_capture(&settings))
}
