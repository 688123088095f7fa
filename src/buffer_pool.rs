use log::warn;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Internal state for buffer pool accounting.
struct BufferPoolState {
    inner: Mutex<Vec<Vec<u8>>>,
    max_buffers: usize,
    allocated: AtomicUsize,
    buf_size: usize,
}

/// A pool of reusable byte buffers to reduce allocation churn.
///
/// The pool stores `Vec<u8>` buffers and hands out a `PooledBuffer`
/// wrapper which returns the buffer to the pool on drop. It enforces a
/// soft maximum number of buffers (budget) and tracks outstanding
/// allocations to avoid unbounded memory growth. Used by both pipelines
/// to reuse one read/write buffer per worker rather than reallocating
/// per file.
#[derive(Clone)]
pub struct BufferPool {
    state: Arc<BufferPoolState>,
}

impl BufferPool {
    /// Create a new pool with `num_buffers` buffers preallocated to `buf_size`.
    /// `num_buffers` is a soft budget; callers may still receive allocated
    /// buffers if the pool is exhausted (after waiting briefly for returns).
    pub fn new(num_buffers: usize, buf_size: usize) -> Self {
        let mut v = Vec::with_capacity(num_buffers);
        for _ in 0..num_buffers {
            v.push(vec![0u8; buf_size]);
        }
        let state = BufferPoolState {
            inner: Mutex::new(v),
            max_buffers: std::cmp::max(1, num_buffers),
            allocated: AtomicUsize::new(num_buffers),
            buf_size,
        };
        Self {
            state: Arc::new(state),
        }
    }

    pub fn get(&self) -> PooledBuffer {
        if let Ok(mut guard) = self.state.inner.lock() {
            if let Some(mut b) = guard.pop() {
                b.resize(self.state.buf_size, 0u8);
                return PooledBuffer {
                    buf: Some(b),
                    pool: Some(self.state.clone()),
                };
            }
        }

        let allocated = self.state.allocated.load(Ordering::SeqCst);
        if allocated < self.state.max_buffers {
            self.state.allocated.fetch_add(1, Ordering::SeqCst);
            PooledBuffer {
                buf: Some(vec![0u8; self.state.buf_size]),
                pool: Some(self.state.clone()),
            }
        } else {
            for _ in 0..5 {
                thread::sleep(Duration::from_millis(10));
                if let Ok(mut guard) = self.state.inner.lock() {
                    if let Some(mut b) = guard.pop() {
                        b.resize(self.state.buf_size, 0u8);
                        return PooledBuffer {
                            buf: Some(b),
                            pool: Some(self.state.clone()),
                        };
                    }
                }
            }
            warn!(
                "buffer pool exhausted (max_buffers={}), allocating beyond budget",
                self.state.max_buffers
            );
            self.state.allocated.fetch_add(1, Ordering::SeqCst);
            PooledBuffer {
                buf: Some(vec![0u8; self.state.buf_size]),
                pool: Some(self.state.clone()),
            }
        }
    }

    pub fn buf_size(&self) -> usize {
        self.state.buf_size
    }

    pub fn allocated_buffers(&self) -> usize {
        self.state.allocated.load(Ordering::SeqCst)
    }

    pub fn max_buffers(&self) -> usize {
        self.state.max_buffers
    }
}

/// A wrapper that returns its buffer to the pool when dropped.
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Option<Arc<BufferPoolState>>,
}

impl PooledBuffer {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_mut().map(|b| &mut b[..]).unwrap_or(&mut [])
    }

    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_ref().map(|b| &b[..]).unwrap_or(&[])
    }
}

impl AsMut<[u8]> for PooledBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut().map(|b| &mut b[..]).unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let (Some(b), Some(pool)) = (self.buf.take(), self.pool.take()) {
            if let Ok(mut guard) = pool.inner.lock() {
                if guard.len() < pool.max_buffers {
                    let mut b = b;
                    b.resize(pool.buf_size, 0u8);
                    guard.push(b);
                    return;
                }
            }
            let prev = pool.allocated.fetch_sub(1, Ordering::SeqCst);
            if prev == 0 {
                pool.allocated.store(0, Ordering::SeqCst);
            }
        }
    }
}
