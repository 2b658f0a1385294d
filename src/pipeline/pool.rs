// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-format pixel buffer pool
//!
//! Recycles frame storage to keep the capture path free of per-frame
//! allocation. A pool lends at most `retained_count_hint` buffers at a
//! time; an `acquire` past that limit fails with
//! [`PipelineError::Exhausted`] and the caller is expected to drop the
//! current frame rather than wait.
//!
//! Re-preparing with a different format invalidates the pool: the free
//! list is discarded and buffers still in flight become inert (returning
//! one neither recycles storage nor frees a slot of the new pool).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::errors::{PipelineError, PipelineResult};
use crate::frame::{Frame, FrameDescriptor};

#[derive(Debug)]
struct PoolInner {
    epoch: u64,
    outstanding: usize,
    free: Vec<Vec<u8>>,
}

/// Return path for a pooled frame; held inside [`Frame`]
///
/// Reclaiming checks the pool epoch so buffers lent before an
/// invalidation cannot re-enter the recreated pool.
pub(crate) struct PoolTicket {
    inner: Arc<Mutex<PoolInner>>,
    epoch: u64,
}

impl PoolTicket {
    /// Give the slot and the storage back to the pool
    pub(crate) fn reclaim(self, data: Vec<u8>) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if inner.epoch == self.epoch {
            inner.outstanding -= 1;
            inner.free.push(data);
        }
    }

    /// Give the slot back but let the storage leave the pool
    pub(crate) fn forfeit(self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if inner.epoch == self.epoch {
            inner.outstanding -= 1;
        }
    }
}

/// A format-keyed pool of frame storage
#[derive(Debug)]
pub struct PixelBufferPool {
    desc: Option<FrameDescriptor>,
    retained_hint: usize,
    inner: Arc<Mutex<PoolInner>>,
}

impl PixelBufferPool {
    pub fn new() -> Self {
        Self {
            desc: None,
            retained_hint: 0,
            inner: Arc::new(Mutex::new(PoolInner {
                epoch: 0,
                outstanding: 0,
                free: Vec::new(),
            })),
        }
    }

    /// Configure the pool for a frame format
    ///
    /// Calling again with the same descriptor and hint is a no-op; any
    /// other change invalidates and recreates the pool.
    pub fn prepare(&mut self, desc: FrameDescriptor, retained_count_hint: usize) {
        if self.desc == Some(desc) && self.retained_hint == retained_count_hint {
            return;
        }
        if self.desc.is_some() {
            debug!(
                width = desc.width,
                height = desc.height,
                "Pool format changed, invalidating"
            );
        }
        self.invalidate();
        self.desc = Some(desc);
        self.retained_hint = retained_count_hint;
    }

    pub fn is_prepared(&self) -> bool {
        self.desc.is_some()
    }

    /// The descriptor this pool was prepared with, if any
    pub fn descriptor(&self) -> Option<&FrameDescriptor> {
        self.desc.as_ref()
    }

    /// Lend a frame, recycled if storage is available
    ///
    /// Fails with `Exhausted` when the outstanding count has reached the
    /// retained-count hint. Never blocks.
    pub fn acquire(&mut self, timestamp: Duration) -> PipelineResult<Frame> {
        let desc = self.desc.ok_or(PipelineError::Unprepared("pixel buffer pool"))?;
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if inner.outstanding >= self.retained_hint {
            return Err(PipelineError::Exhausted);
        }
        let data = inner
            .free
            .pop()
            .unwrap_or_else(|| vec![0u8; desc.buffer_len()]);
        inner.outstanding += 1;
        let ticket = PoolTicket {
            inner: Arc::clone(&self.inner),
            epoch: inner.epoch,
        };
        drop(inner);
        Ok(Frame::pooled(desc, timestamp, data, ticket))
    }

    /// Return a frame to the pool
    ///
    /// Equivalent to dropping the frame; the storage re-enters the free
    /// list if the frame belongs to the current pool generation. Frames
    /// from other pools or a stale generation are simply discarded.
    pub fn release(&mut self, frame: Frame) {
        drop(frame);
    }

    /// Discard all pooled storage and disown in-flight buffers
    pub fn invalidate(&mut self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        inner.epoch += 1;
        inner.outstanding = 0;
        inner.free.clear();
        self.desc = None;
        self.retained_hint = 0;
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .outstanding
    }
}

impl Default for PixelBufferPool {
    fn default() -> Self {
        Self::new()
    }
}
