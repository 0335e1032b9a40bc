use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::Generation;

#[derive(Debug, Default)]
struct LogInner {
    accepting: Option<Generation>,
    entries: VecDeque<String>,
}

/// Append-only text buffer drained by observers.
///
/// Philosophers append through [`LogBuffer::append_from`] tagged with their
/// population's generation; once that population is replaced or stopped its
/// entries are discarded, so a retired population can never write to the log.
#[derive(Debug, Default)]
pub struct LogBuffer {
    inner: Mutex<LogInner>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: impl Into<String>) {
        self.lock().entries.push_back(entry.into());
    }

    /// Appends on behalf of a population. Returns `false` if the entry was dropped.
    pub fn append_from(&self, generation: Generation, entry: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if inner.accepting != Some(generation) {
            return false;
        }
        inner.entries.push_back(entry.into());
        true
    }

    /// Empties the buffer, returning its entries concatenated in arrival order.
    pub fn drain(&self) -> String {
        let mut inner = self.lock();
        inner.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn accept_generation(&self, generation: Generation) {
        self.lock().accepting = Some(generation);
    }

    pub(crate) fn close(&self) {
        self.lock().accepting = None;
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
