//! Last-writer-wins shared cells.
//!
//! The pipeline shares its newest rendered frame and smoothed detection with
//! observers (a window thread, the health log) through single-slot cells
//! instead of ambient globals. The detection history itself is never shared;
//! it stays owned by the loop that appends to it.

use std::sync::{Arc, Mutex, PoisonError};

/// A single-slot cell shared between one writer and any number of readers.
///
/// Writers overwrite the slot; readers only ever see the freshest value.
pub struct SharedSlot<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for SharedSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SharedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SharedSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace whatever the slot holds. Never blocks beyond the lock.
    pub fn publish(&self, value: T) {
        // A panicked writer still leaves a usable slot; recover the guard.
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(value);
    }

    /// Remove and return the current value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }
}

impl<T: Clone> SharedSlot<T> {
    /// Read the current value without consuming it.
    pub fn peek(&self) -> Option<T> {
        let slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }
}
