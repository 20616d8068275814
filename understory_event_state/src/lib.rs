// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Event State: small state machines that sit between raw input and UI policy.
//!
//! - [`debounce`]: a single-slot debounced scheduler. Scheduling a new action always
//!   supersedes the pending one, which is exactly what hover-intent needs.
//! - [`task`]: a cancellable repeating task identified by a [`task::TaskToken`], used for
//!   per-frame work that should only run while some predicate holds (for example "any menu
//!   is open").
//!
//! Neither helper owns a clock. Callers pass millisecond timestamps into every call, which
//! keeps the state machines deterministic and trivially testable with a mock clock.
//!
//! ```
//! use understory_event_state::debounce::Debouncer;
//!
//! let mut intent: Debouncer<&str> = Debouncer::new();
//! intent.schedule(0, 350, "open");
//! // A newer intent replaces the older one.
//! intent.schedule(100, 350, "close");
//!
//! assert_eq!(intent.poll(400), None);
//! assert_eq!(intent.poll(450), Some("close"));
//! assert!(!intent.is_pending());
//! ```
//!
//! This crate is `no_std`.

#![no_std]

pub mod debounce;
pub mod task;
