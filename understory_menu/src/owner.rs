// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Menu owner: pointer, keyboard and frame choreography on top of the stack reducer.
//!
//! A [`MenuOwner`] translates raw input into [`StackAction`]s and applies them to its
//! [`MenuStack`]. The host forwards events and ticks; the owner never reads a clock.
//!
//! ## Hover intent
//!
//! Pointer motion is debounced by a single intent timer:
//!
//! - Dwelling on an enabled item with a submenu schedules opening it.
//! - Dwelling on an item without a submenu schedules closing any deeper menus.
//! - Leaving the menus schedules closing everything deeper than the last hovered menu;
//!   re-entering one of those deeper menus before the deadline cancels it.
//!
//! A new intent always supersedes the pending one, and any synchronous transition
//! (click, key press, outside pointer-down, open) cancels it. Pending intents fire from
//! [`MenuOwner::tick`].
//!
//! ## Keyboard
//!
//! Keys always target the deepest open menu. Up/Down move the highlight (wrapping and
//! skipping disabled items), Home/End jump, the "into" arrow opens a submenu, the "out"
//! arrow and Escape close the deepest menu, Enter activates, Tab is swallowed, and
//! printable characters select by label prefix. See [`MenuOwner::on_key_down`].
//!
//! ## Frames and focus
//!
//! While any menu is open a [`RepeatingTask`] is active. The host requests animation
//! frames with the [`TaskToken`] from [`MenuOwner::frame_token`]; a frame that arrives
//! after the menus closed (or closed and reopened) carries a dead token and does nothing.
//! Each live [`MenuOwner::on_frame`] places every open menu and writes the result back
//! into the element tree. Focus moves to a newly deepest menu only after that placement,
//! so menus never take focus at a stale position. When the last menu closes, focus
//! returns to whatever held it before the root menu opened, and focus-scope enforcement,
//! suspended while menus are open, resumes.

use alloc::vec::Vec;

use kurbo::Size;
use smallvec::SmallVec;
use understory_event_state::debounce::Debouncer;
use understory_event_state::task::{RepeatingTask, TaskToken};
use understory_focus::{ElementId, ElementTree, FocusOptions, FocusScopes};
use understory_placement::{Placed, Placement, TextDirection, place, submenu_placement};

use crate::key::{CommandId, Key, KeyPress, ShortcutMap};
use crate::phantom::PhantomAnimator;
use crate::registry::{ItemId, MenuHit, MenuId, MenuRegistry};
use crate::stack::{Anchor, MenuStack, StackAction, StackContext, Transition, first_enabled};

/// Tunables for a [`MenuOwner`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MenuConfig {
    /// Hover-intent delay in milliseconds.
    pub intent_delay: u64,
    /// Phantom fade-out duration in milliseconds.
    pub phantom_duration: u64,
    /// Writing direction; picks the "into" and "out" arrows and the submenu side.
    pub direction: TextDirection,
    /// Keep menus open when the window loses focus (for inspecting menus in a debugger).
    pub keep_open_on_blur: bool,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            intent_delay: 350,
            phantom_duration: 200,
            direction: TextDirection::Ltr,
            keep_open_on_blur: false,
        }
    }
}

/// Everything the owner works against: the visual tree, the menu registry, and the
/// focus-scope service.
#[derive(Debug, Default)]
pub struct MenuHost {
    /// The visual tree.
    pub tree: ElementTree,
    /// Registered menus and items.
    pub registry: MenuRegistry,
    /// Focus scopes; suspended while any menu is open.
    pub scopes: FocusScopes,
}

impl MenuHost {
    /// An empty host.
    pub fn new() -> Self {
        Self::default()
    }

    fn cx(&self) -> StackContext<'_> {
        StackContext {
            registry: &self.registry,
            tree: &self.tree,
        }
    }
}

/// Whether a key press was consumed by the menus.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyOutcome {
    /// The menus handled the key; stop propagation.
    Handled,
    /// Let an enclosing handler (for example a menu bar) see the key.
    Propagate,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Intent {
    OpenSubmenu(ItemId),
    CloseDeeperThan(MenuId),
}

/// Drives a [`MenuStack`] from host events.
#[derive(Debug)]
pub struct MenuOwner {
    config: MenuConfig,
    stack: MenuStack,
    intent: Debouncer<Intent>,
    hovered_item: Option<ItemId>,
    hovered_menu: Option<MenuId>,
    restore_focus: Option<ElementId>,
    pending_activations: Vec<ItemId>,
    frame: RepeatingTask,
    focus_deepest_pending: bool,
    placed: SmallVec<[Placed; 4]>,
    phantom: PhantomAnimator,
}

impl Default for MenuOwner {
    fn default() -> Self {
        Self::new(MenuConfig::default())
    }
}

impl MenuOwner {
    /// An owner with no open menus.
    pub fn new(config: MenuConfig) -> Self {
        Self {
            config,
            stack: MenuStack::new(),
            intent: Debouncer::new(),
            hovered_item: None,
            hovered_menu: None,
            restore_focus: None,
            pending_activations: Vec::new(),
            frame: RepeatingTask::new(),
            focus_deepest_pending: false,
            placed: SmallVec::new(),
            phantom: PhantomAnimator::new(config.phantom_duration),
        }
    }

    /// Configuration.
    pub fn config(&self) -> &MenuConfig {
        &self.config
    }

    /// Current stack.
    pub fn stack(&self) -> &MenuStack {
        &self.stack
    }

    /// Whether any menu is open.
    pub fn is_open(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Placement of each open menu from the last frame, root first.
    pub fn placed(&self) -> &[Placed] {
        &self.placed
    }

    /// Deadline of the pending hover intent.
    pub fn intent_deadline(&self) -> Option<u64> {
        self.intent.deadline()
    }

    /// Token for the running per-frame placement task; `None` while no menu is open.
    ///
    /// Pass it back to [`MenuOwner::on_frame`] when the requested frame arrives.
    pub fn frame_token(&self) -> Option<TaskToken> {
        self.frame.token()
    }

    /// Whether activations are waiting for [`MenuOwner::flush_microtasks`].
    pub fn has_pending_activations(&self) -> bool {
        !self.pending_activations.is_empty()
    }

    /// Opacity of the phantom echo at `now`, while there is one.
    pub fn phantom_opacity(&self, now: u64) -> Option<f64> {
        self.stack.phantom()?;
        self.phantom.opacity(now)
    }

    /// Open `menu` as the root menu, replacing any open menus.
    ///
    /// When opened from the keyboard, the first enabled item is highlighted.
    pub fn open(
        &mut self,
        host: &mut MenuHost,
        now: u64,
        menu: MenuId,
        anchor: Anchor,
        placement: Placement,
        from_keyboard: bool,
    ) {
        self.intent.cancel();
        self.hovered_item = None;
        self.hovered_menu = None;
        self.dispatch(
            host,
            now,
            StackAction::OpenRoot {
                menu,
                anchor,
                placement,
                from_keyboard,
            },
        );
        if from_keyboard
            && self.stack.root().is_some_and(|r| r.menu == menu)
            && let Some(first) = first_enabled(&host.registry, menu)
        {
            self.dispatch(host, now, StackAction::FocusItem(Some(first)));
        }
    }

    /// Close every menu.
    pub fn close_all(&mut self, host: &mut MenuHost, now: u64) {
        self.intent.cancel();
        if self.is_open() {
            self.dispatch(host, now, StackAction::CloseAll);
        }
    }

    /// Pointer moved over `target` (`None` when it is over nothing).
    pub fn on_pointer_move(&mut self, host: &mut MenuHost, now: u64, target: Option<ElementId>) {
        if !self.is_open() {
            return;
        }
        match target.and_then(|t| host.registry.hit(&host.tree, t)) {
            Some(MenuHit::Item(item)) => self.hover_item(host, now, item),
            Some(MenuHit::Menu(menu)) if self.stack.contains_menu(menu) => {
                self.hovered_item = None;
                self.enter_menu(menu);
            }
            _ => self.pointer_left(now),
        }
    }

    /// Advance time: run due microtasks, fire a due hover intent, and retire the phantom.
    pub fn tick(&mut self, host: &mut MenuHost, now: u64) {
        self.flush_microtasks(host);
        if let Some(intent) = self.intent.poll(now) {
            tracing::trace!(intent = ?intent, "hover intent fired");
            let action = match intent {
                Intent::OpenSubmenu(item) => StackAction::OpenSubmenu {
                    item,
                    from_keyboard: false,
                },
                Intent::CloseDeeperThan(menu) => StackAction::CloseUpTo(menu),
            };
            self.dispatch(host, now, action);
        }
        if self.phantom.is_expired(now) {
            self.phantom.reset();
            if self.stack.phantom().is_some() {
                self.dispatch(host, now, StackAction::ClearPhantom);
            }
        }
    }

    /// Click on `target`. Returns `true` if the click hit an item of an open menu.
    ///
    /// A click acts like a hover intent that fires at once: items with a submenu open it,
    /// other items activate.
    pub fn on_click(&mut self, host: &mut MenuHost, now: u64, target: ElementId) -> bool {
        if !self.is_open() {
            return false;
        }
        let Some(MenuHit::Item(item)) = host.registry.hit(&host.tree, target) else {
            return false;
        };
        let Ok(record) = host.registry.item(item) else {
            return false;
        };
        if !self.stack.contains_menu(record.parent) {
            return false;
        }
        let disabled = record.disabled;
        self.intent.cancel();
        if disabled {
            return true;
        }
        self.hovered_item = Some(item);
        self.dispatch(host, now, StackAction::FocusItem(Some(item)));
        self.dispatch(
            host,
            now,
            StackAction::ActivateCurrent {
                from_keyboard: false,
            },
        );
        true
    }

    /// Pointer down (or touch start) on `target`.
    ///
    /// Outside every open menu this closes all menus immediately. Returns `true` if it did.
    pub fn on_pointer_down(&mut self, host: &mut MenuHost, now: u64, target: ElementId) -> bool {
        if !self.is_open() {
            return false;
        }
        let inside = self.stack.open_menus().iter().any(|open| {
            host.registry
                .menu(open.menu)
                .is_ok_and(|m| host.tree.contains(m.elem, target))
        });
        if inside {
            return false;
        }
        tracing::debug!(target = ?target, "pointer down outside menus");
        self.close_all(host, now);
        true
    }

    /// Key press while menus may be open.
    ///
    /// Returns [`KeyOutcome::Propagate`] when no menu is open, when the "into" arrow has
    /// no submenu to open, when the root menu is closed by the "out" arrow or Escape, and
    /// for command-modified keys that match no item.
    pub fn on_key_down<S>(
        &mut self,
        host: &mut MenuHost,
        now: u64,
        press: KeyPress,
        shortcuts: &S,
    ) -> KeyOutcome
    where
        S: ShortcutMap + ?Sized,
    {
        let Some(deepest) = self.stack.deepest().map(|m| m.menu) else {
            return KeyOutcome::Propagate;
        };
        self.intent.cancel();

        if let Some(command) = shortcuts.get(&press)
            && let Some(item) = self.item_for_command(&host.registry, command)
        {
            tracing::debug!(item = ?item, command = ?command, "menu shortcut");
            self.dispatch(host, now, StackAction::FocusItem(Some(item)));
            self.dispatch(
                host,
                now,
                StackAction::ActivateCurrent {
                    from_keyboard: true,
                },
            );
            return KeyOutcome::Handled;
        }

        let (into, out) = match self.config.direction {
            TextDirection::Ltr => (Key::ArrowRight, Key::ArrowLeft),
            TextDirection::Rtl => (Key::ArrowLeft, Key::ArrowRight),
        };
        let items = host.registry.enabled_items(deepest).unwrap_or_default();
        let current = self.stack.current_item();

        match press.key {
            Key::ArrowDown | Key::ArrowUp => {
                let forward = press.key == Key::ArrowDown;
                if let Some(next) = step(&items, current, forward) {
                    self.dispatch(host, now, StackAction::FocusItem(Some(next)));
                }
                KeyOutcome::Handled
            }
            Key::Home | Key::End => {
                let edge = if press.key == Key::Home {
                    items.first()
                } else {
                    items.last()
                };
                if let Some(&edge) = edge {
                    self.dispatch(host, now, StackAction::FocusItem(Some(edge)));
                }
                KeyOutcome::Handled
            }
            key if key == into => {
                let opens = current.is_some_and(|c| {
                    host.registry
                        .item(c)
                        .is_ok_and(|r| !r.disabled && r.submenu.is_some())
                });
                match current {
                    Some(item) if opens => {
                        self.dispatch(
                            host,
                            now,
                            StackAction::OpenSubmenu {
                                item,
                                from_keyboard: true,
                            },
                        );
                        KeyOutcome::Handled
                    }
                    _ => KeyOutcome::Propagate,
                }
            }
            key if key == out || key == Key::Escape => {
                let at_root = self.stack.len() == 1;
                self.dispatch(host, now, StackAction::CloseDeepest);
                if at_root {
                    KeyOutcome::Propagate
                } else {
                    KeyOutcome::Handled
                }
            }
            Key::Enter => {
                if current.is_some() {
                    self.dispatch(
                        host,
                        now,
                        StackAction::ActivateCurrent {
                            from_keyboard: true,
                        },
                    );
                }
                KeyOutcome::Handled
            }
            Key::Tab => KeyOutcome::Handled,
            Key::Character(c) if !press.has_command_modifier() => {
                self.type_ahead(host, now, &items, c);
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Propagate,
        }
    }

    /// The window lost focus: close every menu unless configured to stay open.
    pub fn on_window_blur(&mut self, host: &mut MenuHost, now: u64) {
        if self.config.keep_open_on_blur {
            return;
        }
        self.close_all(host, now);
    }

    /// Animation frame: place every open menu inside `viewport`, write the placed bounds
    /// into the tree, then move focus to the deepest menu if it changed.
    ///
    /// Returns `false` (doing nothing) when `token` is not the current frame token, which
    /// is always the case while no menu is open.
    pub fn on_frame(&mut self, host: &mut MenuHost, token: TaskToken, viewport: Size) -> bool {
        if !self.frame.is_current(token) || !self.frame.tick() {
            return false;
        }
        tracing::trace!(frame = self.frame.runs(), "placing open menus");
        self.placed.clear();
        for open in self.stack.open_menus() {
            let Ok(elem) = host.registry.menu(open.menu).map(|m| m.elem) else {
                diagnostic!(menu = ?open.menu, "open menu is no longer registered");
                break;
            };
            let Some(anchor) = open.parent.resolve(&host.registry, &host.tree) else {
                break;
            };
            let size = host.tree.bounds(elem).map_or(Size::ZERO, |r| r.size());
            let placement = match self.placed.last() {
                Some(parent) if open.depth > 0 => {
                    submenu_placement(parent, open.placement.direction)
                }
                _ => open.placement,
            };
            let placed = place(anchor, size, viewport, placement);
            host.tree.set_bounds(elem, placed.rect(size));
            self.placed.push(placed);
        }
        if core::mem::take(&mut self.focus_deepest_pending) {
            self.focus_deepest(host);
        }
        true
    }

    /// Run work deferred to the end of the current event: item activations, then the
    /// focus-scope consistency check.
    pub fn flush_microtasks(&mut self, host: &mut MenuHost) {
        for item in core::mem::take(&mut self.pending_activations) {
            if let Err(err) = host.registry.activate(item) {
                diagnostic!(error = %err, "dropping activation of an unmounted item");
            }
        }
        if host.scopes.needs_flush() {
            host.scopes.flush(&mut host.tree);
        }
    }

    // --- internals ---

    fn dispatch(&mut self, host: &mut MenuHost, now: u64, action: StackAction) {
        let Transition { stack, activate } = self.stack.reduce(host.cx(), &action);
        if stack == self.stack && activate.is_none() {
            return;
        }
        let was_open = self.is_open();
        let before_deepest = self.stack.deepest().map(|m| m.menu);
        let before_current = self.stack.current_item();
        self.stack = stack;
        tracing::debug!(
            action = ?action,
            depth = self.stack.len(),
            current = ?self.stack.current_item(),
            "menu stack transition"
        );

        if let Some(item) = activate {
            self.pending_activations.push(item);
            self.phantom.start(now);
        }
        if self.stack.phantom().is_none() {
            self.phantom.reset();
        }

        match (was_open, self.is_open()) {
            (false, true) => {
                self.restore_focus = host.tree.focused();
                host.scopes.disable();
                self.frame.start();
            }
            (true, false) => {
                self.all_closed(host);
                return;
            }
            (false, false) => return,
            (true, true) => {}
        }

        if self.stack.deepest().map(|m| m.menu) != before_deepest {
            self.focus_deepest_pending = true;
        } else if self.stack.current_item() != before_current && !self.focus_deepest_pending {
            self.focus_current(host);
        }
    }

    fn all_closed(&mut self, host: &mut MenuHost) {
        self.intent.cancel();
        self.frame.cancel();
        self.placed.clear();
        self.hovered_item = None;
        self.hovered_menu = None;
        self.focus_deepest_pending = false;
        host.scopes.enable();
        if let Some(elem) = self.restore_focus.take()
            && host.tree.is_alive(elem)
        {
            host.tree.focus(elem, FocusOptions::default());
        }
    }

    fn hover_item(&mut self, host: &mut MenuHost, now: u64, item: ItemId) {
        let Ok(record) = host.registry.item(item) else {
            return;
        };
        let (parent, submenu, disabled) = (record.parent, record.submenu, record.disabled);
        let Some(depth) = self.stack.depth_of(parent) else {
            self.pointer_left(now);
            return;
        };
        self.enter_menu(parent);
        if self.hovered_item == Some(item) {
            return;
        }
        self.hovered_item = Some(item);
        if !disabled && self.stack.current_item() != Some(item) {
            self.dispatch(host, now, StackAction::FocusItem(Some(item)));
        }

        let submenu_open = submenu.is_some_and(|m| {
            self.stack
                .open_menus()
                .get(depth + 1)
                .is_some_and(|o| o.menu == m)
        });
        if submenu_open {
            self.intent.cancel();
        } else if submenu.is_some() && !disabled {
            self.schedule(now, Intent::OpenSubmenu(item));
        } else if depth + 1 < self.stack.len() {
            self.schedule(now, Intent::CloseDeeperThan(parent));
        } else {
            self.intent.cancel();
        }
    }

    /// The pointer is inside `menu`; a pending close of menus at or below it is withdrawn.
    fn enter_menu(&mut self, menu: MenuId) {
        self.hovered_menu = Some(menu);
        let entered = self.stack.depth_of(menu);
        if let Some(&Intent::CloseDeeperThan(target)) = self.intent.pending()
            && let (Some(entered), Some(floor)) = (entered, self.stack.depth_of(target))
            && entered > floor
        {
            self.intent.cancel();
        }
    }

    fn pointer_left(&mut self, now: u64) {
        self.hovered_item = None;
        if let Some(menu) = self.hovered_menu
            && self.stack.contains_menu(menu)
        {
            self.schedule(now, Intent::CloseDeeperThan(menu));
        }
    }

    fn schedule(&mut self, now: u64, intent: Intent) {
        if self.intent.pending() == Some(&intent) {
            return;
        }
        let superseded = self.intent.schedule(now, self.config.intent_delay, intent);
        tracing::trace!(intent = ?intent, superseded = ?superseded, "scheduled hover intent");
    }

    fn type_ahead(&mut self, host: &mut MenuHost, now: u64, items: &[ItemId], c: char) {
        let matches: SmallVec<[usize; 8]> = items
            .iter()
            .enumerate()
            .filter(|&(_, &i)| {
                host.registry
                    .item(i)
                    .is_ok_and(|r| label_starts_with(&r.label, c))
            })
            .map(|(pos, _)| pos)
            .collect();
        let target = match matches.as_slice() {
            [] => return,
            &[only] => {
                let item = items[only];
                self.dispatch(host, now, StackAction::FocusItem(Some(item)));
                self.dispatch(
                    host,
                    now,
                    StackAction::ActivateCurrent {
                        from_keyboard: true,
                    },
                );
                return;
            }
            &[first, ..] => {
                let after = self
                    .stack
                    .current_item()
                    .and_then(|c| items.iter().position(|&i| i == c));
                let next = after.and_then(|a| matches.iter().copied().find(|&m| m > a));
                items[next.unwrap_or(first)]
            }
        };
        self.dispatch(host, now, StackAction::FocusItem(Some(target)));
    }

    fn item_for_command(&self, registry: &MenuRegistry, command: CommandId) -> Option<ItemId> {
        self.stack.open_menus().iter().rev().find_map(|open| {
            let menu = registry.menu(open.menu).ok()?;
            menu.items.iter().copied().find(|&i| {
                registry
                    .item(i)
                    .is_ok_and(|r| !r.disabled && r.shortcut == Some(command))
            })
        })
    }

    fn focus_deepest(&self, host: &mut MenuHost) {
        let Some(deepest) = self.stack.deepest() else {
            return;
        };
        let target = self
            .stack
            .current_item()
            .and_then(|c| host.registry.item(c).ok())
            .filter(|r| r.parent == deepest.menu)
            .map(|r| r.elem)
            .or_else(|| host.registry.menu(deepest.menu).ok().map(|m| m.elem));
        if let Some(elem) = target {
            host.tree.focus(elem, FocusOptions::default());
        }
    }

    fn focus_current(&self, host: &mut MenuHost) {
        if let Some(elem) = self
            .stack
            .current_item()
            .and_then(|c| host.registry.item(c).ok())
            .map(|r| r.elem)
        {
            host.tree.focus(elem, FocusOptions::default());
        }
    }
}

/// Next (or previous) item after `current`, wrapping; the first (or last) without one.
fn step(items: &[ItemId], current: Option<ItemId>, forward: bool) -> Option<ItemId> {
    let n = items.len();
    if n == 0 {
        return None;
    }
    let idx = match current.and_then(|c| items.iter().position(|&i| i == c)) {
        Some(pos) if forward => (pos + 1) % n,
        Some(pos) => (pos + n - 1) % n,
        None if forward => 0,
        None => n - 1,
    };
    Some(items[idx])
}

fn label_starts_with(label: &str, c: char) -> bool {
    label
        .trim_start()
        .chars()
        .next()
        .is_some_and(|first| first.to_lowercase().eq(c.to_lowercase()))
}
