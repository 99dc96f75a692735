//! Groups small files into jobs sized by aggregate bytes.

use crate::file::{Batch, FileTask, Job};

const INITIAL_BATCH_CAPACITY: usize = 100;

/// Accumulates small files until their combined size reaches the flush
/// threshold, then hands the batch out as a [`Job`].
#[derive(Debug)]
pub(crate) struct Batcher {
    flush_threshold: u64,
    current: Batch,
}

impl Batcher {
    pub(crate) fn new(flush_threshold: u64) -> Self {
        Self {
            flush_threshold,
            current: Batch::with_capacity(INITIAL_BATCH_CAPACITY),
        }
    }

    /// Adds a task, returning the batch once it is full.
    pub(crate) fn add(&mut self, task: FileTask) -> Option<Job> {
        self.current.push(task);

        if self.current.size >= self.flush_threshold {
            let full = std::mem::replace(
                &mut self.current,
                Batch::with_capacity(INITIAL_BATCH_CAPACITY),
            );
            return Some(Job::Batch(full));
        }

        None
    }

    /// Emits whatever is left, however small.
    pub(crate) fn finish(self) -> Option<Job> {
        (!self.current.is_empty()).then_some(Job::Batch(self.current))
    }
}
