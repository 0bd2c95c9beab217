// SPDX-License-Identifier: GPL-3.0-only

//! Per-slot V4L2 requests
//!
//! `v4l`'s `Stream` owns its buffers and hides the slot index, while the
//! capture loop needs to hand slots back and forth one by one. These helpers
//! issue the buffer and input requests directly through `v4l::v4l2` with the
//! `v4l_sys` structures.

use std::io;
use std::mem;
use std::os::raw::{c_int, c_void};

use v4l::buffer::Type;
use v4l::memory::Memory;
use v4l::v4l_sys::{v4l2_buffer, v4l2_input, v4l2_requestbuffers};
use v4l::v4l2;
use v4l::v4l2::vidioc;

/// Issue a request, retrying while it is interrupted by a signal
pub fn xioctl<T>(fd: c_int, request: vidioc::_IOC_TYPE, arg: &mut T) -> io::Result<()> {
    loop {
        let result = unsafe { v4l2::ioctl(fd, request, arg as *mut T as *mut c_void) };
        match result {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Zeroed mmap capture buffer descriptor for slot `index`
pub fn mmap_capture_buffer(index: u32) -> v4l2_buffer {
    let mut buf: v4l2_buffer = unsafe { mem::zeroed() };
    buf.type_ = Type::VideoCapture as u32;
    buf.memory = Memory::Mmap as u32;
    buf.index = index;
    buf
}

/// Mmap offset of a queried buffer
pub fn buffer_offset(buf: &v4l2_buffer) -> u32 {
    // `m.offset` is the active member for V4L2_MEMORY_MMAP
    unsafe { buf.m.offset }
}

/// Zeroed mmap capture buffer request for `count` slots
pub fn mmap_capture_request(count: u32) -> v4l2_requestbuffers {
    let mut req: v4l2_requestbuffers = unsafe { mem::zeroed() };
    req.count = count;
    req.type_ = Type::VideoCapture as u32;
    req.memory = Memory::Mmap as u32;
    req
}

/// Zeroed input descriptor for VIDIOC_ENUMINPUT
pub fn input_descriptor(index: u32) -> v4l2_input {
    let mut input: v4l2_input = unsafe { mem::zeroed() };
    input.index = index;
    input
}
