//! Block pool for field buffers.
//!
//! Solvers create and drop many temporaries of identical size every time
//! step. The pool keeps released buffers keyed by element count and hands
//! them out again, so steady-state stepping does not hit the system
//! allocator. Buffers taken from the pool hold stale values; callers must
//! overwrite them before marking them valid.

use std::collections::HashMap;

use log::trace;
use num_complex::Complex64;
use parking_lot::Mutex;

/// Upper bound on buffers retained per size class.
const MAX_CACHED_PER_SIZE: usize = 64;

#[derive(Debug, Default)]
pub struct BufferPool {
    real: Mutex<HashMap<usize, Vec<Vec<f64>>>>,
    complex: Mutex<HashMap<usize, Vec<Vec<Complex64>>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub cached_real: usize,
    pub cached_complex: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_real(&self, len: usize) -> Vec<f64> {
        take(&self.real, len, 0.0)
    }

    pub fn take_complex(&self, len: usize) -> Vec<Complex64> {
        take(&self.complex, len, Complex64::default())
    }

    pub fn give_real(&self, buffer: Vec<f64>) {
        give(&self.real, buffer);
    }

    pub fn give_complex(&self, buffer: Vec<Complex64>) {
        give(&self.complex, buffer);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            cached_real: self.real.lock().values().map(Vec::len).sum(),
            cached_complex: self.complex.lock().values().map(Vec::len).sum(),
        }
    }

    /// Release every cached buffer.
    pub fn clear(&self) {
        self.real.lock().clear();
        self.complex.lock().clear();
    }
}

fn take<T: Clone>(slots: &Mutex<HashMap<usize, Vec<Vec<T>>>>, len: usize, fill: T) -> Vec<T> {
    if let Some(buffer) = slots.lock().get_mut(&len).and_then(Vec::pop) {
        return buffer;
    }
    trace!("buffer pool miss for {len} elements");
    vec![fill; len]
}

fn give<T>(slots: &Mutex<HashMap<usize, Vec<Vec<T>>>>, buffer: Vec<T>) {
    if buffer.is_empty() {
        return;
    }
    let mut slots = slots.lock();
    let class = slots.entry(buffer.len()).or_default();
    if class.len() < MAX_CACHED_PER_SIZE {
        class.push(buffer);
    }
}
