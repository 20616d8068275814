// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Menu: hierarchical menus for headless UI.
//!
//! This crate decides which menus are open, which item is highlighted, and where each
//! menu goes on screen. It is split into layers that can be used independently:
//!
//! - [`registry`]: an arena of mounted menus and items ([`MenuRegistry`]). Menus and items
//!   are addressed by generational handles ([`MenuId`], [`ItemId`]); a handle that
//!   outlives its registration is reported as a [`MenuError`] instead of silently reading
//!   stale state.
//! - [`stack`]: the [`MenuStack`], an immutable root-to-leaf chain of open menus plus the
//!   current item. Every change goes through the pure [`MenuStack::reduce`].
//! - [`owner`]: the [`MenuOwner`], which turns pointer motion, clicks, key presses and
//!   frame ticks into reducer actions. It owns the hover-intent timer, restores focus when
//!   the last menu closes, and places open menus once per frame.
//! - [`phantom`]: a fade-out echo of the item that was just activated.
//! - [`key`]: the key model and the [`ShortcutMap`] lookup capability.
//!
//! Geometry comes from [`understory_placement`], focus from [`understory_focus`], and
//! timers from [`understory_event_state`]. Time is always passed in by the caller as
//! milliseconds.
//!
//! ## Minimal example
//!
//! A "File" menu with an "Export" submenu, driven from the keyboard:
//!
//! ```rust
//! use kurbo::{Rect, Size};
//! use understory_focus::{ElementKind, ElementProps};
//! use understory_menu::{Anchor, ItemSpec, Key, KeyOutcome, KeyPress, MenuHost, MenuOwner};
//! use understory_placement::Placement;
//!
//! let mut host = MenuHost::default();
//! let page = host.tree.insert(None, ElementProps::default());
//! let file_elem = host.tree.insert(Some(page), ElementProps::default().with_tab_index(-1));
//! let export_elem = host.tree.insert(Some(file_elem), ElementProps::new(ElementKind::Button));
//! let sub_elem = host.tree.insert(Some(page), ElementProps::default().with_tab_index(-1));
//! let pdf_elem = host.tree.insert(Some(sub_elem), ElementProps::new(ElementKind::Button));
//!
//! let file = host.registry.register_menu(file_elem, None, Some("File")).unwrap();
//! let export = host.registry.register_item(file, ItemSpec::new(export_elem, "Export")).unwrap();
//! let sub = host.registry.register_menu(sub_elem, Some(export), None).unwrap();
//! let pdf = host.registry.register_item(sub, ItemSpec::new(pdf_elem, "PDF")).unwrap();
//!
//! let mut owner = MenuOwner::default();
//! let anchor = Anchor::Rect(Rect::new(0.0, 0.0, 40.0, 20.0));
//! owner.open(&mut host, 0, file, anchor, Placement::default(), true);
//! assert_eq!(owner.stack().current_item(), Some(export));
//!
//! let right = KeyPress::new(Key::ArrowRight);
//! assert_eq!(owner.on_key_down(&mut host, 10, right, &()), KeyOutcome::Handled);
//! assert_eq!(owner.stack().len(), 2);
//! assert_eq!(owner.stack().current_item(), Some(pdf));
//!
//! // Geometry is committed once per frame; focus follows the deepest menu afterwards.
//! let frame = owner.frame_token().unwrap();
//! owner.on_frame(&mut host, frame, Size::new(800.0, 600.0));
//! assert_eq!(host.tree.focused(), Some(pdf_elem));
//! ```
//!
//! ## Diagnostics
//!
//! Invalid operations (opening a submenu for an item that is not in the stack, closing a
//! menu that is already closed) are no-ops. In builds with `debug_assertions` they emit a
//! `tracing` warning. Transitions are logged at `debug` level.
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for dependencies such as `kurbo` and `tracing`.
//! - `libm`: enables `no_std` + `alloc` builds that rely on `libm` for floating-point math.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

/// Development-time warning for operations that are silently ignored.
macro_rules! diagnostic {
    ($($arg:tt)+) => {
        if cfg!(debug_assertions) {
            tracing::warn!($($arg)+);
        }
    };
}

pub mod key;
pub mod owner;
pub mod phantom;
pub mod registry;
pub mod stack;

pub use key::{CommandId, Key, KeyPress, Modifiers, ShortcutMap};
pub use owner::{KeyOutcome, MenuConfig, MenuHost, MenuOwner};
pub use phantom::PhantomAnimator;
pub use registry::{
    ActivateFn, CheckType, ItemId, ItemSpec, MenuError, MenuHit, MenuId, MenuRegistry,
    RegisteredItem, RegisteredMenu,
};
pub use stack::{Anchor, MenuStack, OpenMenu, Phantom, StackAction, StackContext, Transition};
