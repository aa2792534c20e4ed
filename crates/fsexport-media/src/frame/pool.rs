//! Reusable payload buffers.
//!
//! Every decoded frame leases its payload storage from a [`BufferPool`]. The
//! lease is returned when the [`PooledBuffer`] is dropped, so a frame's storage
//! goes back to the pool exactly once on every path: written, rejected,
//! skipped, or unwound by a panic.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Default number of idle buffers kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Buffers that grew beyond this capacity are freed instead of pooled.
const MAX_RETAINED_CAPACITY: usize = 4 * 1024 * 1024;

#[derive(Debug)]
struct PoolInner {
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    outstanding: AtomicUsize,
}

/// Shared pool of payload buffers. Cloning is cheap and clones share storage.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    #[must_use]
    pub fn new(max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::new()),
                max_idle,
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Lease a buffer and fill it with a copy of `data`.
    pub fn lease(&self, data: &[u8]) -> PooledBuffer {
        let mut buf = self.inner.idle.lock().pop().unwrap_or_default();
        buf.extend_from_slice(data);
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        PooledBuffer {
            buf,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of leased buffers not yet returned.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Number of buffers waiting for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.inner.idle.lock().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

/// A leased buffer. Dropping it returns the storage to its pool.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl PooledBuffer {
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        self.pool.outstanding.fetch_sub(1, Ordering::AcqRel);
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();
        let mut idle = self.pool.idle.lock();
        if idle.len() < self.pool.max_idle {
            idle.push(buf);
        }
    }
}
