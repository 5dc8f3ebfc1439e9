// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Thread-safe, unbounded FIFO of [`LineRecord`]s with an interruptible blocking pop.
//!
//! Any number of producers push while a consumer blocks in [`LineBuffer::blocking_pop`].
//! [`LineBuffer::close`] is the only cancellation: it is irreversible, drops later pushes
//! and wakes every waiter. Lines already buffered when the buffer is closed are still
//! handed out, after which `blocking_pop` returns `None` without blocking. Closing therefore
//! does not discard pending lines; call [`LineBuffer::clear`] first to drop them.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::line::LineRecord;

#[derive(Debug, Default)]
struct State {
    lines: VecDeque<LineRecord>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct LineBuffer {
    state: Mutex<State>,
    available: Condvar,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` and wakes one waiting consumer. No-op once closed.
    pub fn push(&self, line: LineRecord) {
        let mut state = self.lock();
        if !state.closed {
            state.lines.push_back(line);
            self.available.notify_one();
        }
    }

    /// Removes and returns the oldest line, blocking while the buffer is open and empty.
    ///
    /// Returns `None` once the buffer is closed and drained.
    pub fn blocking_pop(&self) -> Option<LineRecord> {
        let mut state = self
            .available
            .wait_while(self.lock(), |state| state.lines.is_empty() && !state.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.lines.pop_front()
    }

    /// Closes the buffer and wakes all waiters. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            self.available.notify_all();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of buffered lines. Advisory, races with concurrent push and pop.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all buffered lines without closing the buffer.
    pub fn clear(&self) {
        self.lock().lines.clear();
    }

    // State stays consistent across a panicking holder: every mutation is a single
    // VecDeque operation or a flag store.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
