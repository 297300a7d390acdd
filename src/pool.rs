// Process-wide buffer pool.
//
// Sessions acquire their raw byte buffer and decoded text buffer here and
// return them on drop. Guard types make release exactly-once on every exit
// path (normal completion, early break, error propagation) without any
// explicit cleanup at call sites.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Buffers retained per pool; beyond this, returned buffers are simply freed.
const MAX_POOLED: usize = 8;

/// Returned buffers larger than this are freed rather than retained, so one
/// pathological session cannot pin a huge allocation for the process.
const MAX_RETAINED_CAPACITY: usize = 4 * 1024 * 1024;

static BYTE_POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());
static TEXT_POOL: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn lock<T>(m: &Mutex<Vec<T>>) -> std::sync::MutexGuard<'_, Vec<T>> {
    // A poisoned pool only means another thread panicked mid-push; the
    // free list itself is always in a usable state.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Pooled raw byte buffer. Dereferences to `Vec<u8>`; returns itself to the
/// pool when dropped.
pub struct PooledBytes(Option<Vec<u8>>);

/// Pooled decoded text buffer. Dereferences to `String`; returns itself to
/// the pool when dropped.
pub struct PooledText(Option<String>);

/// Acquire a byte buffer with at least `capacity` bytes available.
pub fn acquire_bytes(capacity: usize) -> PooledBytes {
    let mut buf = lock(&BYTE_POOL).pop().unwrap_or_default();
    if buf.capacity() < capacity {
        buf.reserve(capacity - buf.len());
    }
    PooledBytes(Some(buf))
}

/// Acquire a text buffer.
pub fn acquire_text() -> PooledText {
    let buf = lock(&TEXT_POOL).pop().unwrap_or_default();
    PooledText(Some(buf))
}

impl Deref for PooledBytes {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        // Invariant: the Option is Some until drop.
        self.0.as_ref().unwrap()
    }
}

impl DerefMut for PooledBytes {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.0.as_mut().unwrap()
    }
}

impl Drop for PooledBytes {
    fn drop(&mut self) {
        if let Some(mut buf) = self.0.take() {
            if buf.capacity() <= MAX_RETAINED_CAPACITY {
                buf.clear();
                let mut pool = lock(&BYTE_POOL);
                if pool.len() < MAX_POOLED {
                    pool.push(buf);
                }
            }
        }
    }
}

impl Deref for PooledText {
    type Target = String;
    fn deref(&self) -> &String {
        self.0.as_ref().unwrap()
    }
}

impl DerefMut for PooledText {
    fn deref_mut(&mut self) -> &mut String {
        self.0.as_mut().unwrap()
    }
}

impl Drop for PooledText {
    fn drop(&mut self) {
        if let Some(mut buf) = self.0.take() {
            if buf.capacity() <= MAX_RETAINED_CAPACITY {
                buf.clear();
                let mut pool = lock(&TEXT_POOL);
                if pool.len() < MAX_POOLED {
                    pool.push(buf);
                }
            }
        }
    }
}
