use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Condvar, Mutex};

use crate::error::{Error, Result};

/// A blocking FIFO queue of fixed (but adjustable) capacity.
///
/// Producers block in [`push`](Buffer::push) while the buffer is full and
/// consumers block in [`pull`](Buffer::pull) while it is empty. A single
/// mutex covers the queue and a single condition variable covers both the
/// fullness and the emptiness predicate, so every state change broadcasts:
/// a removal may unblock producers and an insertion may unblock consumers.
///
/// [`interrupt_consume`](Buffer::interrupt_consume) latches a shutdown
/// signal for consumers: the next `pull` that would otherwise wait on an
/// empty queue fails with [`Error::Interrupted`] instead, clearing the
/// latch.
#[derive(Debug)]
pub struct Buffer<E> {
    state: Mutex<State<E>>,
    available: Condvar,
    capacity: AtomicUsize,
}

#[derive(Debug)]
struct State<E> {
    queue: VecDeque<E>,
    interrupt: bool,
}

impl<E> Buffer<E> {
    /// Create a buffer holding at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Buffer<E> {
        assert!(capacity > 0, "buffer capacity must be positive");

        Buffer {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                interrupt: false,
            }),
            available: Condvar::new(),
            capacity: AtomicUsize::new(capacity),
        }
    }

    /// Append an element, blocking while the buffer is full.
    pub fn push(&self, element: E) {
        let mut state = self.state.lock().unwrap();
        while state.queue.len() >= self.capacity.load(SeqCst) {
            state = self.available.wait(state).unwrap();
        }
        state.queue.push_back(element);
        drop(state);
        self.available.notify_all();
    }

    /// Remove and return the head element, blocking while the buffer is
    /// empty and not interrupted.
    ///
    /// Returns [`Error::Interrupted`] when an interrupt was latched and no
    /// element was available; the latch is cleared in that case.
    pub fn pull(&self) -> Result<E> {
        let mut state = self.state.lock().unwrap();
        while state.queue.is_empty() && !state.interrupt {
            state = self.available.wait(state).unwrap();
        }
        if state.interrupt && state.queue.is_empty() {
            state.interrupt = false;
            return Err(Error::Interrupted);
        }
        let head = state.queue.pop_front().expect("waited for a non-empty queue");
        drop(state);
        self.available.notify_all();
        Ok(head)
    }

    /// The number of elements currently buffered.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    /// The maximum number of elements the buffer may hold.
    pub fn capacity(&self) -> usize {
        self.capacity.load(SeqCst)
    }

    /// Change the capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or below the current size.
    pub fn set_capacity(&self, capacity: usize) {
        assert!(capacity > 0, "buffer capacity must be positive");
        assert!(
            capacity >= self.size(),
            "cannot reduce capacity below the current buffer size"
        );
        self.capacity.store(capacity, SeqCst);
        // A larger capacity may unblock producers.
        self.available.notify_all();
    }

    /// Latch the consumer interrupt and wake all waiters.
    ///
    /// Intended for cooperative shutdown of a consumer loop; see
    /// [`pull`](Buffer::pull).
    pub fn interrupt_consume(&self) {
        self.state.lock().unwrap().interrupt = true;
        self.available.notify_all();
    }
}
