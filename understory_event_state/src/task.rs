// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancellable repeating tasks.
//!
//! A [`RepeatingTask`] models work that should run on every frame (or every tick) while
//! some predicate holds, such as re-placing floating menus while any menu is open. The
//! host starts the task when the predicate becomes true and cancels it when it becomes
//! false; each start hands out a fresh [`TaskToken`].
//!
//! Work that captured a token checks it with [`RepeatingTask::is_current`] before running,
//! so a frame callback scheduled before a cancel can never act on the new state.
//!
//! ```
//! use understory_event_state::task::RepeatingTask;
//!
//! let mut task = RepeatingTask::new();
//! let token = task.start();
//! assert!(task.is_current(token));
//!
//! task.cancel();
//! assert!(!task.is_current(token));
//!
//! // Restarting issues a new token; the old one stays dead.
//! let again = task.start();
//! assert_ne!(token, again);
//! assert!(!task.is_current(token));
//! ```

/// Cancellation token for one run of a [`RepeatingTask`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

/// A repeating task that is either idle or running under a single token.
#[derive(Clone, Debug)]
pub struct RepeatingTask {
    active: Option<TaskToken>,
    next: u64,
    runs: u64,
}

impl RepeatingTask {
    /// Create an idle task.
    pub const fn new() -> Self {
        Self {
            active: None,
            next: 1,
            runs: 0,
        }
    }

    /// Start the task, or return the current token if it is already running.
    pub fn start(&mut self) -> TaskToken {
        if let Some(token) = self.active {
            return token;
        }
        let token = TaskToken(self.next);
        self.next += 1;
        self.runs = 0;
        self.active = Some(token);
        token
    }

    /// Cancel the task. Returns `true` if it was running.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }

    /// Whether the task is running.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Whether `token` belongs to the current run.
    pub fn is_current(&self, token: TaskToken) -> bool {
        self.active == Some(token)
    }

    /// Token of the current run.
    pub fn token(&self) -> Option<TaskToken> {
        self.active
    }

    /// Account for one iteration and return `true` if the task should do its work.
    ///
    /// Returns `false` while idle.
    pub fn tick(&mut self) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.runs += 1;
        true
    }

    /// Number of iterations performed since the current run started.
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl Default for RepeatingTask {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_idempotent_while_running() {
        let mut task = RepeatingTask::new();
        let a = task.start();
        let b = task.start();
        assert_eq!(a, b);
        assert!(task.is_active());
    }

    #[test]
    fn tick_counts_only_while_active() {
        let mut task = RepeatingTask::new();
        assert!(!task.tick());

        task.start();
        assert!(task.tick());
        assert!(task.tick());
        assert_eq!(task.runs(), 2);

        assert!(task.cancel());
        assert!(!task.tick());
        assert!(!task.cancel());

        task.start();
        assert_eq!(task.runs(), 0);
    }
}
