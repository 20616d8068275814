// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fade-out timing for the phantom echo of an activated item.
//!
//! The phantom itself lives in the [`MenuStack`](crate::MenuStack); this only tracks when
//! its fade started. The owner clears the stack's phantom once [`PhantomAnimator::is_expired`].

/// Linear fade from opaque to transparent over a fixed duration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PhantomAnimator {
    duration: u64,
    started: Option<u64>,
}

impl PhantomAnimator {
    /// An idle animator that fades over `duration` milliseconds.
    pub const fn new(duration: u64) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    /// Start (or restart) the fade at `now`.
    pub fn start(&mut self, now: u64) {
        self.started = Some(now);
    }

    /// Stop tracking the fade.
    pub fn reset(&mut self) {
        self.started = None;
    }

    /// Whether a fade is being tracked.
    pub fn is_active(&self) -> bool {
        self.started.is_some()
    }

    /// Opacity at `now`, from `1.0` down to `0.0`; `None` while idle.
    pub fn opacity(&self, now: u64) -> Option<f64> {
        let started = self.started?;
        if self.duration == 0 {
            return Some(0.0);
        }
        let elapsed = now.saturating_sub(started).min(self.duration);
        Some(1.0 - elapsed as f64 / self.duration as f64)
    }

    /// Whether the fade has finished at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        self.started
            .is_some_and(|s| now.saturating_sub(s) >= self.duration)
    }
}
