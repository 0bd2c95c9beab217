// SPDX-License-Identifier: GPL-3.0-only

//! Memory-mapped buffer pool
//!
//! Slots are addressed by the index the driver reports, never by pointer.
//! Each slot is owned by exactly one side at a time: queued slots belong to
//! the driver, dequeued slots to the process until they are queued again.

use tracing::{debug, error, info};

use super::{BufferMapping, VideoDevice};
use crate::errors::{CaptureError, CaptureResult};

/// Who currently owns a buffer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOwner {
    Driver,
    Process,
}

/// One mapped driver buffer
#[derive(Debug)]
pub struct MappedBuffer<M> {
    mapping: M,
    length: usize,
    owner: SlotOwner,
}

impl<M: BufferMapping> MappedBuffer<M> {
    pub fn bytes(&self) -> &[u8] {
        self.mapping.bytes()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn owner(&self) -> SlotOwner {
        self.owner
    }
}

/// Outcome of unmapping a pool
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub unmapped: usize,
    pub failures: Vec<CaptureError>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pool of mapped capture buffers granted by the driver
#[derive(Debug)]
pub struct BufferPool<M: BufferMapping> {
    slots: Vec<MappedBuffer<M>>,
}

impl<M: BufferMapping> BufferPool<M> {
    /// Request `requested` mmap buffers and map every granted one
    ///
    /// The driver may grant fewer buffers than requested. Any query or
    /// mapping failure aborts allocation; slots mapped so far are unmapped
    /// when the partial pool is dropped.
    pub fn allocate<D>(device: &D, requested: u32) -> CaptureResult<Self>
    where
        D: VideoDevice<Mapping = M>,
    {
        let granted = device.request_buffers(requested).map_err(|e| {
            error!(requested, error = %e, "Requesting buffers failed");
            CaptureError::AllocationFailed(format!("VIDIOC_REQBUFS: {}", e))
        })?;

        if granted == 0 {
            error!(requested, "Driver granted no buffers");
            return Err(CaptureError::AllocationFailed(
                "driver granted no buffers".to_string(),
            ));
        }

        if granted < requested {
            info!(requested, granted, "Driver granted fewer buffers than requested");
        }

        let mut pool = Self {
            slots: Vec::with_capacity(granted as usize),
        };

        for index in 0..granted {
            let info = device.query_buffer(index).map_err(|e| {
                error!(index, error = %e, "Querying buffer failed");
                CaptureError::AllocationFailed(format!("VIDIOC_QUERYBUF {}: {}", index, e))
            })?;

            let mapping = device.map_buffer(&info).map_err(|e| {
                error!(index, length = info.length, error = %e, "Mapping buffer failed");
                CaptureError::AllocationFailed(format!("mmap buffer {}: {}", index, e))
            })?;

            debug!(index, offset = info.offset, length = info.length, "Mapped buffer");

            pool.slots.push(MappedBuffer {
                mapping,
                length: info.length as usize,
                // Not queued yet; the process holds every slot until prepare
                owner: SlotOwner::Process,
            });
        }

        Ok(pool)
    }

    /// Number of slots the driver granted
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at `index`, if the index is inside the pool
    pub fn slot(&self, index: u32) -> Option<&MappedBuffer<M>> {
        self.slots.get(index as usize)
    }

    pub fn owners(&self) -> Vec<SlotOwner> {
        self.slots.iter().map(|s| s.owner).collect()
    }

    /// Hand slot `index` to the driver
    pub fn enqueue<D>(&mut self, device: &D, index: u32) -> CaptureResult<()>
    where
        D: VideoDevice<Mapping = M>,
    {
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or_else(|| CaptureError::TransferFailed(format!("no buffer slot {}", index)))?;

        if slot.owner != SlotOwner::Process {
            return Err(CaptureError::TransferFailed(format!(
                "buffer slot {} is already queued",
                index
            )));
        }

        device
            .queue_buffer(index)
            .map_err(|e| CaptureError::TransferFailed(format!("VIDIOC_QBUF {}: {}", index, e)))?;
        slot.owner = SlotOwner::Driver;
        Ok(())
    }

    /// Hand every slot to the driver, once each
    pub fn enqueue_all<D>(&mut self, device: &D) -> CaptureResult<()>
    where
        D: VideoDevice<Mapping = M>,
    {
        for index in 0..self.slots.len() as u32 {
            self.enqueue(device, index)?;
        }
        Ok(())
    }

    /// Take the next filled slot back from the driver
    ///
    /// Returns the slot index and the number of valid bytes in it.
    pub fn dequeue<D>(&mut self, device: &D) -> CaptureResult<(u32, usize)>
    where
        D: VideoDevice<Mapping = M>,
    {
        let buf = device
            .dequeue_buffer()
            .map_err(|e| CaptureError::TransferFailed(format!("VIDIOC_DQBUF: {}", e)))?;

        let pool_size = self.slots.len();
        let slot = self.slots.get_mut(buf.index as usize).ok_or_else(|| {
            CaptureError::TransferFailed(format!(
                "driver returned slot {} outside pool of {}",
                buf.index, pool_size
            ))
        })?;

        if slot.owner != SlotOwner::Driver {
            return Err(CaptureError::TransferFailed(format!(
                "driver returned slot {} which it does not own",
                buf.index
            )));
        }

        slot.owner = SlotOwner::Process;
        Ok((buf.index, buf.bytes_used as usize))
    }

    /// Unmap every slot, continuing past individual failures
    pub fn release(mut self) -> ReleaseReport {
        self.release_slots()
    }

    fn release_slots(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();

        for (index, slot) in self.slots.drain(..).enumerate() {
            match slot.mapping.unmap() {
                Ok(()) => report.unmapped += 1,
                Err(e) => {
                    error!(index, error = %e, "munmap failed");
                    report
                        .failures
                        .push(CaptureError::UnmapFailed(format!("buffer {}: {}", index, e)));
                }
            }
        }

        report
    }
}

impl<M: BufferMapping> Drop for BufferPool<M> {
    fn drop(&mut self) {
        if !self.slots.is_empty() {
            debug!(slots = self.slots.len(), "Releasing buffer pool on drop");
            self.release_slots();
        }
    }
}
