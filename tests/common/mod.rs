// SPDX-License-Identifier: GPL-3.0-only

//! Simulated video device shared by the integration tests
//!
//! Behaves like a well-mannered V4L2 driver: a FIFO of queued slots, one
//! filled frame per readiness wait, and knobs for the failure modes the
//! capture pipeline has to survive.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

use vidcopy::backends::camera::{
    BufferInfo, BufferMapping, CapabilityReport, DequeuedBuffer, FormatDescription, FourCC,
    FrameInterval, InputInfo, PixelFormat, StreamDirection, VideoDevice,
};
use vidcopy::lifecycle::StopHandle;

/// When the simulated stop signal arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTrigger {
    /// Right after frame `n` is dequeued, before it is emitted
    AfterDequeue(u64),
    /// During the wait that follows frame `n`; the wait reports `EINTR`
    DuringWait(u64),
    /// The wait that follows frame `n` reports `EINTR` before the stop
    /// handler has run
    InterruptWait(u64),
    /// The wait that follows frame `n` raises a real SIGINT, then reports `EINTR`
    RaiseSigint(u64),
}

/// Driver behaviour and call log
#[derive(Debug)]
pub struct SimState {
    // ----- behaviour -----
    pub max_buffers: u32,
    pub buffer_len: u32,
    pub inputs: u32,
    pub max_fps: u32,
    /// Resolution the driver forces, if any
    pub forced_size: Option<(u32, u32)>,
    /// Pixel format the driver confirms instead of the requested one
    pub forced_fourcc: Option<FourCC>,
    /// `bytes_used` reported on dequeue; defaults to the full buffer
    pub bytes_used: Option<u32>,
    pub stop_trigger: Option<StopTrigger>,
    pub stop_handle: Option<StopHandle>,
    /// Number of frames after which every wait times out
    pub frames_before_timeout: Option<u64>,
    pub fail_querycap: bool,
    pub fail_map_at: Option<u32>,
    pub fail_stream_on: bool,
    pub fail_stream_off: bool,
    pub fail_unmap: bool,
    pub fail_write: bool,
    pub fail_queue_after: Option<u64>,
    /// Index reported by the next dequeue instead of the queue head
    pub rogue_dequeue_index: Option<u32>,

    // ----- observations -----
    pub calls: Vec<&'static str>,
    pub selected_input: Option<u32>,
    pub formats_set: Vec<(StreamDirection, PixelFormat)>,
    pub intervals_set: Vec<(StreamDirection, FrameInterval)>,
    pub requested_buffers: Option<u32>,
    pub granted: u32,
    pub mapped: Vec<u32>,
    pub unmapped: Vec<u32>,
    pub queue: VecDeque<u32>,
    pub queue_calls: u64,
    pub dequeued: u64,
    pub waits: u64,
    pub streaming: bool,
    pub writes: Vec<usize>,
    /// Set if the driver ever saw a slot dequeued while already dequeued
    pub ownership_violation: bool,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            max_buffers: 4,
            buffer_len: 320 * 240 * 2,
            inputs: 1,
            max_fps: 60,
            forced_size: None,
            forced_fourcc: None,
            bytes_used: None,
            stop_trigger: None,
            stop_handle: None,
            frames_before_timeout: None,
            fail_querycap: false,
            fail_map_at: None,
            fail_stream_on: false,
            fail_stream_off: false,
            fail_unmap: false,
            fail_write: false,
            fail_queue_after: None,
            rogue_dequeue_index: None,
            calls: Vec::new(),
            selected_input: None,
            formats_set: Vec::new(),
            intervals_set: Vec::new(),
            requested_buffers: None,
            granted: 0,
            mapped: Vec::new(),
            unmapped: Vec::new(),
            queue: VecDeque::new(),
            queue_calls: 0,
            dequeued: 0,
            waits: 0,
            streaming: false,
            writes: Vec::new(),
            ownership_violation: false,
        }
    }
}

impl SimState {
    fn stop(&self) {
        if let Some(handle) = &self.stop_handle {
            handle.request_stop();
        }
    }

    /// Slots the driver has never handed back and that are not queued
    pub fn in_process(&self) -> Vec<u32> {
        (0..self.granted)
            .filter(|i| !self.queue.contains(i))
            .collect()
    }
}

/// Simulated V4L2 device; clones share state
#[derive(Debug, Clone, Default)]
pub struct SimulatedDevice {
    pub state: Rc<RefCell<SimState>>,
}

impl SimulatedDevice {
    pub fn new(state: SimState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }
}

fn einval(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, what.to_string())
}

/// Mapped buffer of a simulated device; records its unmap
#[derive(Debug)]
pub struct SimMapping {
    index: u32,
    data: Vec<u8>,
    state: Rc<RefCell<SimState>>,
}

impl BufferMapping for SimMapping {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn unmap(self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.unmapped.push(self.index);
        if state.fail_unmap {
            return Err(einval("munmap"));
        }
        Ok(())
    }
}

impl VideoDevice for SimulatedDevice {
    type Mapping = SimMapping;

    fn query_capabilities(&self) -> io::Result<CapabilityReport> {
        let mut s = self.state.borrow_mut();
        s.calls.push("querycap");
        if s.fail_querycap {
            return Err(einval("querycap"));
        }
        Ok(CapabilityReport {
            driver: "simulated".to_string(),
            card: "Simulated Camera".to_string(),
            bus_info: "platform:sim".to_string(),
            version: (6, 1, 0),
            capabilities: 0x8420_0001,
            formats: Vec::new(),
        })
    }

    fn enum_formats(&self, direction: StreamDirection) -> io::Result<Vec<FormatDescription>> {
        if direction != StreamDirection::Capture {
            return Err(einval("enum_fmt"));
        }
        let formats: [(&[u8; 4], &str, bool); 2] =
            [(b"YUYV", "YUYV 4:2:2", false), (b"MJPG", "Motion-JPEG", true)];
        Ok(formats
            .iter()
            .map(|&(code, desc, compressed)| FormatDescription {
                fourcc: FourCC::new(code),
                description: desc.to_string(),
                compressed,
                emulated: false,
            })
            .collect())
    }

    fn enum_input(&self, index: u32) -> io::Result<InputInfo> {
        let s = self.state.borrow();
        if index >= s.inputs {
            return Err(einval("enuminput"));
        }
        Ok(InputInfo {
            index,
            name: format!("Camera {}", index),
        })
    }

    fn set_input(&self, index: u32) -> io::Result<()> {
        let mut s = self.state.borrow_mut();
        s.calls.push("s_input");
        if index >= s.inputs {
            return Err(einval("s_input"));
        }
        s.selected_input = Some(index);
        Ok(())
    }

    fn set_format(
        &self,
        direction: StreamDirection,
        format: &PixelFormat,
    ) -> io::Result<PixelFormat> {
        let mut s = self.state.borrow_mut();
        s.calls.push("s_fmt");
        s.formats_set.push((direction, *format));
        let (width, height) = s.forced_size.unwrap_or((format.width, format.height));
        Ok(PixelFormat {
            width,
            height,
            fourcc: s.forced_fourcc.unwrap_or(format.fourcc),
        })
    }

    fn set_frame_interval(
        &self,
        direction: StreamDirection,
        interval: FrameInterval,
    ) -> io::Result<FrameInterval> {
        let mut s = self.state.borrow_mut();
        s.calls.push("s_parm");
        s.intervals_set.push((direction, interval));
        Ok(FrameInterval {
            numerator: 1,
            denominator: interval.denominator.min(s.max_fps),
        })
    }

    fn request_buffers(&self, count: u32) -> io::Result<u32> {
        let mut s = self.state.borrow_mut();
        s.calls.push("reqbufs");
        s.requested_buffers = Some(count);
        s.granted = count.min(s.max_buffers);
        Ok(s.granted)
    }

    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo> {
        let s = self.state.borrow();
        if index >= s.granted {
            return Err(einval("querybuf"));
        }
        Ok(BufferInfo {
            index,
            offset: index * s.buffer_len,
            length: s.buffer_len,
        })
    }

    fn map_buffer(&self, info: &BufferInfo) -> io::Result<SimMapping> {
        let mut s = self.state.borrow_mut();
        if s.fail_map_at == Some(info.index) {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }
        s.mapped.push(info.index);
        Ok(SimMapping {
            index: info.index,
            // Each slot carries its own fill byte so frames are traceable
            data: vec![info.index as u8 + 1; info.length as usize],
            state: Rc::clone(&self.state),
        })
    }

    fn queue_buffer(&self, index: u32) -> io::Result<()> {
        let mut s = self.state.borrow_mut();
        s.calls.push("qbuf");
        if let Some(limit) = s.fail_queue_after {
            if s.queue_calls >= limit {
                return Err(einval("qbuf"));
            }
        }
        if index >= s.granted || s.queue.contains(&index) {
            return Err(einval("qbuf"));
        }
        s.queue_calls += 1;
        s.queue.push_back(index);
        Ok(())
    }

    fn dequeue_buffer(&self) -> io::Result<DequeuedBuffer> {
        let mut s = self.state.borrow_mut();
        s.calls.push("dqbuf");
        if !s.streaming {
            return Err(einval("dqbuf"));
        }

        let index = match s.rogue_dequeue_index.take() {
            Some(index) => index,
            None => s
                .queue
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))?,
        };
        if s.queue.contains(&index) {
            s.ownership_violation = true;
        }

        s.dequeued += 1;
        if s.stop_trigger == Some(StopTrigger::AfterDequeue(s.dequeued)) {
            s.stop();
        }

        Ok(DequeuedBuffer {
            index,
            bytes_used: s.bytes_used.unwrap_or(s.buffer_len),
        })
    }

    fn stream_on(&self) -> io::Result<()> {
        let mut s = self.state.borrow_mut();
        s.calls.push("streamon");
        if s.fail_stream_on {
            return Err(einval("streamon"));
        }
        s.streaming = true;
        Ok(())
    }

    fn stream_off(&self) -> io::Result<()> {
        let mut s = self.state.borrow_mut();
        s.calls.push("streamoff");
        s.streaming = false;
        if s.fail_stream_off {
            return Err(einval("streamoff"));
        }
        // Stream off returns every queued buffer to the process
        s.queue.clear();
        Ok(())
    }

    fn wait_readable(&self, _timeout: Duration) -> io::Result<bool> {
        let mut s = self.state.borrow_mut();
        s.calls.push("wait");
        s.waits += 1;

        match s.stop_trigger {
            Some(StopTrigger::DuringWait(n)) if n == s.dequeued => {
                s.stop();
                return Err(io::Error::from_raw_os_error(libc::EINTR));
            }
            Some(StopTrigger::InterruptWait(n)) if n == s.dequeued => {
                return Err(io::Error::from_raw_os_error(libc::EINTR));
            }
            Some(StopTrigger::RaiseSigint(n)) if n == s.dequeued => {
                unsafe { libc::raise(libc::SIGINT) };
                return Err(io::Error::from_raw_os_error(libc::EINTR));
            }
            _ => {}
        }
        if let Some(limit) = s.frames_before_timeout {
            if s.dequeued >= limit {
                return Ok(false);
            }
        }
        Ok(!s.queue.is_empty())
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut s = self.state.borrow_mut();
        s.calls.push("write");
        if s.fail_write {
            return Err(io::Error::from_raw_os_error(libc::ENOSPC));
        }
        s.writes.push(bytes.len());
        Ok(bytes.len())
    }
}

/// In-memory stdout that records every write call
#[derive(Debug, Clone, Default)]
pub struct CapturedStream {
    pub writes: Rc<RefCell<Vec<Vec<u8>>>>,
    pub flushes: Rc<RefCell<usize>>,
}

impl CapturedStream {
    pub fn write_sizes(&self) -> Vec<usize> {
        self.writes.borrow().iter().map(Vec::len).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.writes.borrow().iter().map(Vec::len).sum()
    }
}

impl Write for CapturedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.borrow_mut().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.flushes.borrow_mut() += 1;
        Ok(())
    }
}

/// A stdout whose reader went away after `accept` frames
#[derive(Debug, Default)]
pub struct ClosingPipe {
    pub accept: usize,
    pub written: Rc<RefCell<usize>>,
}

impl Write for ClosingPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = self.written.borrow_mut();
        if *written >= self.accept {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        *written += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
