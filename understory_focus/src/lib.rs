// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Focus: focus scopes, tab order, and focus interception.
//!
//! This crate models keyboard focus for a headless UI tree as a combination of:
//! - An **element tree** ([`ElementTree`]) that records structure, per-element focus
//!   properties ([`ElementProps`]), and the currently focused element.
//! - **Tab order** ([`tab_order`]) that reproduces platform sequential navigation:
//!   positive tab indices first, then source order, with radio-group exclusivity.
//! - **Focus scopes** ([`FocusScopeState`] / [`ScopeRegistry`]) that either remove a
//!   subtree from the tab sequence ([`ScopeBehavior::Exclude`]) or trap focus inside it
//!   ([`ScopeBehavior::Contain`]).
//! - An **interception service** ([`FocusScopes`]) that the host feeds pointer, Tab and
//!   focus-in events, and that answers whether the default action should run.
//!
//! ## Minimal example
//!
//! A dialog that traps focus, with a button before and after it on the page:
//!
//! ```rust
//! use understory_focus::{
//!     Disposition, ElementKind, ElementProps, ElementTree, FocusOptions, FocusScopeState,
//!     FocusScopes, ScopeBehavior,
//! };
//!
//! let mut tree = ElementTree::new();
//! let page = tree.insert(None, ElementProps::default());
//! let _before = tree.insert(Some(page), ElementProps::new(ElementKind::Button));
//! let dialog = tree.insert(Some(page), ElementProps::default());
//! let ok = tree.insert(Some(dialog), ElementProps::new(ElementKind::Button));
//! let cancel = tree.insert(Some(dialog), ElementProps::new(ElementKind::Button));
//! let _after = tree.insert(Some(page), ElementProps::new(ElementKind::Button));
//!
//! let mut scopes = FocusScopes::new();
//! scopes.register(FocusScopeState::new(ScopeBehavior::Contain, Some(dialog)));
//!
//! tree.focus(cancel, FocusOptions::default());
//! // Tab on the last element of the trap wraps to its first.
//! assert_eq!(scopes.on_tab(&mut tree, false), Disposition::Prevented);
//! assert_eq!(tree.focused(), Some(ok));
//! ```
//!
//! ## Patterns: radio groups
//!
//! [`FocusSymbol`] is a small, copyable handle the host uses to name radio groups. Only
//! the checked member of a named group is tab-reachable.
//!
//! ```rust
//! use understory_focus::{ElementFlags, ElementKind, ElementProps, ElementTree, FocusSymbol};
//! use understory_focus::tab_order::is_tab_reachable;
//!
//! const SIZE: FocusSymbol = FocusSymbol(1);
//!
//! let mut tree = ElementTree::new();
//! let small = tree.insert(None, ElementProps::new(ElementKind::Radio).in_radio_group(SIZE));
//! let large = tree.insert(
//!     None,
//!     ElementProps::new(ElementKind::Radio)
//!         .in_radio_group(SIZE)
//!         .with_flags(ElementFlags::CHECKED),
//! );
//! assert!(!is_tab_reachable(&tree, small));
//! assert!(is_tab_reachable(&tree, large));
//! ```
//!
//! Geometry is expressed in terms of [`kurbo::Rect`], which matches the rest of the
//! Understory crates. Element bounds are written by the host and read by placement code.
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for dependencies such as `kurbo` and `tracing`.
//! - `libm`: enables `no_std` + `alloc` builds that rely on `libm` for floating-point math.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod intercept;
pub mod scope;
pub mod tab_order;
pub mod tree;

pub use intercept::{Disposition, FocusScopes};
pub use scope::{
    Classification, FocusScopeState, PointerDownOutside, ScopeBehavior, ScopeGroups, ScopeKey,
    ScopeRegistry,
};
pub use tab_order::{FocusableOptions, TabGroup};
pub use tree::{ElementFlags, ElementId, ElementKind, ElementProps, ElementTree, FocusOptions};

/// Symbol-like identifier used for naming groups of elements.
///
/// This is a small, copyable handle. The host is responsible for managing the meaning and
/// lifecycle of individual symbols (for example via an interned string table,
/// enum-to-symbol mapping, or static constants).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FocusSymbol(pub u64);
