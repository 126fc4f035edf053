// SPDX-License-Identifier: Apache-2.0

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use log::trace;
use parking_lot::Mutex;

/// Free buffers kept around by [`BufferPool::new`] and the shared pool.
const DEFAULT_RETENTION: usize = 64;

/// Counters describing a pool's activity so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Leases handed out.
    pub acquired: usize,
    /// Leases returned.
    pub released: usize,
    /// Fresh allocations made because no free buffer was large enough.
    pub allocated: usize,
    /// Leases currently held by callers.
    pub outstanding: usize,
    /// Free buffers waiting for reuse.
    pub retained: usize,
}

/// Hands out byte buffers and takes them back for reuse.
///
/// Acquisition never blocks and never fails. Buffers are returned by dropping
/// the [`PooledBuffer`] lease, so every exit path of a caller (success, error,
/// or a dropped future) gives them back.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Box<[u8]>>>,
    max_retained: usize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    allocated: AtomicUsize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// A pool that keeps at most `max_retained` free buffers; extra returns are freed.
    pub fn with_retention(max_retained: usize) -> Self {
        BufferPool {
            free: Mutex::new(Vec::new()),
            max_retained,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            allocated: AtomicUsize::new(0),
        }
    }

    /// The process-wide pool.
    pub fn shared() -> &'static BufferPool {
        static SHARED: OnceLock<BufferPool> = OnceLock::new();
        SHARED.get_or_init(BufferPool::new)
    }

    /// Lease a buffer of at least `min_size` bytes.
    ///
    /// The contents are whatever the previous holder left behind.
    pub fn acquire(&self, min_size: usize) -> PooledBuffer<'_> {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        let reused = {
            let mut free = self.free.lock();
            let fit = free.iter().position(|buf| buf.len() >= min_size);
            fit.map(|at| free.swap_remove(at))
        };
        let buf = reused.unwrap_or_else(|| {
            self.allocated.fetch_add(1, Ordering::Relaxed);
            trace!("pool allocating {} byte buffer", min_size);
            vec![0u8; min_size].into_boxed_slice()
        });
        PooledBuffer { buf, pool: self }
    }

    fn release(&self, buf: Box<[u8]>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() < self.max_retained {
            free.push(buf);
        }
    }

    pub fn stats(&self) -> PoolStats {
        let acquired = self.acquired.load(Ordering::Relaxed);
        let released = self.released.load(Ordering::Relaxed);
        PoolStats {
            acquired,
            released,
            allocated: self.allocated.load(Ordering::Relaxed),
            outstanding: acquired.saturating_sub(released),
            retained: self.free.lock().len(),
        }
    }
}

/// A leased buffer; goes back to its pool when dropped.
///
/// Not `Clone`, so a buffer is owned by exactly one holder and released once.
pub struct PooledBuffer<'p> {
    buf: Box<[u8]>,
    pool: &'p BufferPool,
}

impl<'p> PooledBuffer<'p> {
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The pool this buffer returns to.
    pub fn pool(&self) -> &'p BufferPool {
        self.pool
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl std::fmt::Debug for PooledBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("capacity", &self.buf.len())
            .finish()
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
