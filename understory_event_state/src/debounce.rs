// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debounced scheduling over caller-supplied timestamps.
//!
//! A [`Debouncer`] holds at most one pending action. Calling [`Debouncer::schedule`]
//! while an action is pending replaces it (the old action is returned so callers can
//! observe the supersession), and [`Debouncer::cancel`] drops it. The host drives time
//! by calling [`Debouncer::poll`] with the current timestamp; the action is handed back
//! exactly once, when its deadline has been reached.
//!
//! ## Rules
//!
//! 1. **Single slot**: there is never more than one outstanding action.
//! 2. **Supersession**: a new schedule always replaces, never queues beside, the old one.
//! 3. **Fire once**: a fired or cancelled action is gone; later polls return `None`.
//!
//! Timestamps are in milliseconds and only need to be monotonic for a given debouncer.

/// A pending action and its deadline.
#[derive(Clone, Debug)]
struct Scheduled<A> {
    deadline: u64,
    action: A,
}

/// Single-slot debounced scheduler.
///
/// See the [module docs](self) for the scheduling rules.
#[derive(Clone, Debug)]
pub struct Debouncer<A> {
    pending: Option<Scheduled<A>>,
}

impl<A> Debouncer<A> {
    /// Create an idle debouncer.
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Schedule `action` to fire `delay` milliseconds after `now`.
    ///
    /// Any pending action is cancelled first and returned.
    pub fn schedule(&mut self, now: u64, delay: u64, action: A) -> Option<A> {
        let previous = self.pending.replace(Scheduled {
            deadline: now.saturating_add(delay),
            action,
        });
        previous.map(|s| s.action)
    }

    /// Cancel the pending action, if any, and return it.
    pub fn cancel(&mut self) -> Option<A> {
        self.pending.take().map(|s| s.action)
    }

    /// Return the pending action if its deadline is at or before `now`.
    pub fn poll(&mut self, now: u64) -> Option<A> {
        match &self.pending {
            Some(s) if s.deadline <= now => self.cancel(),
            _ => None,
        }
    }

    /// Whether an action is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending action.
    pub fn deadline(&self) -> Option<u64> {
        self.pending.as_ref().map(|s| s.deadline)
    }

    /// Borrow the pending action without consuming it.
    pub fn pending(&self) -> Option<&A> {
        self.pending.as_ref().map(|s| &s.action)
    }
}

impl<A> Default for Debouncer<A> {
    fn default() -> Self {
        Self::new()
    }
}
