//! Pool of reusable `BytesMut` buffers for per-connection read/write scratch space.
//!
//! Every connection needs a read buffer and a write buffer for the lifetime of
//! the socket; allocating and freeing those on every accept/disconnect cycle
//! under heavy churn is wasted work the allocator doesn't need to do twice.

use std::sync::{Arc, OnceLock};

use bytes::BytesMut;
use crossbeam_queue::ArrayQueue;

/// Capacity a freshly-allocated buffer starts at when the pool is empty.
const FRESH_BUFFER_CAPACITY: usize = 2048;

/// Upper bound on how many idle buffers the pool holds onto at once.
const POOL_CAPACITY: usize = 256;

/// A buffer larger than this is released instead of recycled — holding onto
/// an outlier-sized allocation forever would waste more memory than the pool
/// saves in reuse.
const RECYCLE_SIZE_CEILING: usize = 16 * 1024;

pub struct BufferPool {
    slots: ArrayQueue<BytesMut>,
    fresh_capacity: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_buffer_size(FRESH_BUFFER_CAPACITY)
    }

    pub fn with_buffer_size(fresh_capacity: usize) -> Self {
        Self {
            slots: ArrayQueue::new(POOL_CAPACITY),
            fresh_capacity,
        }
    }

    /// Take a buffer out of the pool, falling back to a fresh allocation.
    #[inline]
    pub fn get(&self) -> BytesMut {
        self.slots
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.fresh_capacity))
    }

    /// Return a buffer for reuse. Cleared first so the next caller sees an
    /// empty buffer; dropped instead of recycled if it grew past the ceiling
    /// or the pool is already full.
    #[inline]
    pub fn put(&self, mut buf: BytesMut) {
        if buf.capacity() > RECYCLE_SIZE_CEILING {
            return;
        }
        buf.clear();
        let _ = self.slots.push(buf);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

static SHARED: OnceLock<Arc<BufferPool>> = OnceLock::new();

/// The process-wide pool every connection draws from.
pub fn global_pool() -> &'static Arc<BufferPool> {
    SHARED.get_or_init(|| Arc::new(BufferPool::new()))
}

#[inline]
pub fn get_buffer() -> BytesMut {
    global_pool().get()
}

#[inline]
pub fn put_buffer(buf: BytesMut) {
    global_pool().put(buf);
}
