// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The menu stack and its reducer.
//!
//! A [`MenuStack`] is the single source of truth for which menus are open. It is an
//! immutable value: [`MenuStack::reduce`] maps `(stack, action)` to a new stack (plus an
//! item to activate, if any) and never mutates in place.
//!
//! ## Invariants
//!
//! - `open_menus` is ordered root to leaf; `open_menus[i].depth == i`.
//! - For every `i > 0`, `open_menus[i].parent` is [`Anchor::Item`] of an item belonging to
//!   `open_menus[i - 1].menu`. There is only ever one open chain.
//! - A menu appears at most once.
//! - `current_item`, when set, belongs to one of the open menus.
//!
//! ## Failure modes
//!
//! Actions that do not apply to the current stack (opening the submenu of an item that is
//! not open, closing when nothing is open) return the stack unchanged. With
//! `debug_assertions` on they also log a warning; they can legitimately happen when a
//! timer races an unmount, so they never panic.

use alloc::string::String;

use kurbo::Rect;
use smallvec::SmallVec;
use understory_focus::{ElementId, ElementTree};
use understory_placement::{HorizontalGrowth, Placement};

use crate::registry::{ItemId, MenuId, MenuRegistry};

/// What an open menu is positioned against.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Anchor {
    /// A fixed rectangle, such as a context-menu click point.
    Rect(Rect),
    /// An element, such as a menu button.
    Element(ElementId),
    /// The item that opened this submenu.
    Item(ItemId),
}

impl Anchor {
    /// The anchoring item, for submenus.
    pub fn item(&self) -> Option<ItemId> {
        match *self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Current rectangle of the anchor, or `None` if its element is gone.
    pub fn resolve(&self, registry: &MenuRegistry, tree: &ElementTree) -> Option<Rect> {
        match *self {
            Self::Rect(rect) => Some(rect),
            Self::Element(elem) => tree.bounds(elem),
            Self::Item(item) => registry.item(item).ok().and_then(|i| tree.bounds(i.elem)),
        }
    }
}

/// One open menu in the stack.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenMenu {
    /// The menu.
    pub menu: MenuId,
    /// Position in the stack; 0 is the root menu.
    pub depth: usize,
    /// What the menu is positioned against.
    pub parent: Anchor,
    /// Requested placement.
    pub placement: Placement,
    /// Whether the first item should be highlighted when the menu opens.
    pub focus_first_on_open: bool,
}

/// Echo of a just-activated item, shown while the menus collapse.
#[derive(Clone, Debug, PartialEq)]
pub struct Phantom {
    /// The activated item.
    pub item: ItemId,
    /// Its label at activation time.
    pub label: String,
    /// Its bounds at activation time.
    pub rect: Rect,
}

/// Messages understood by [`MenuStack::reduce`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StackAction {
    /// Replace the stack with a single root menu.
    OpenRoot {
        /// Menu to open.
        menu: MenuId,
        /// What to position it against.
        anchor: Anchor,
        /// Requested placement.
        placement: Placement,
        /// Opened from the keyboard.
        from_keyboard: bool,
    },
    /// Open the submenu of `item`, closing anything deeper than `item`'s menu.
    OpenSubmenu {
        /// Item whose submenu to open.
        item: ItemId,
        /// Opened from the keyboard; highlights the submenu's first enabled item.
        from_keyboard: bool,
    },
    /// Open the current item's submenu, or activate it and close everything.
    ActivateCurrent {
        /// Triggered from the keyboard.
        from_keyboard: bool,
    },
    /// Close the deepest menu.
    CloseDeepest,
    /// Close every menu deeper than the given one.
    CloseUpTo(MenuId),
    /// Close every menu.
    CloseAll,
    /// Highlight an item of an open menu, or clear the highlight.
    FocusItem(Option<ItemId>),
    /// Drop the phantom echo.
    ClearPhantom,
}

/// Read-only view of the world the reducer consults.
#[derive(Copy, Clone, Debug)]
pub struct StackContext<'a> {
    /// Registered menus and items.
    pub registry: &'a MenuRegistry,
    /// The visual tree, for item geometry.
    pub tree: &'a ElementTree,
}

/// Result of [`MenuStack::reduce`].
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// The new stack.
    pub stack: MenuStack,
    /// Item to activate once the new stack is committed.
    pub activate: Option<ItemId>,
}

impl Transition {
    fn to(stack: MenuStack) -> Self {
        Self {
            stack,
            activate: None,
        }
    }
}

/// Immutable chain of open menus plus the highlighted item.
///
/// ```rust
/// use kurbo::Rect;
/// use understory_focus::{ElementKind, ElementProps, ElementTree};
/// use understory_menu::{Anchor, ItemSpec, MenuRegistry, MenuStack, StackAction, StackContext};
/// use understory_placement::Placement;
///
/// let mut tree = ElementTree::new();
/// let menu_elem = tree.insert(None, ElementProps::default());
/// let item_elem = tree.insert(Some(menu_elem), ElementProps::new(ElementKind::Button));
/// let mut registry = MenuRegistry::new();
/// let menu = registry.register_menu(menu_elem, None, None).unwrap();
/// let quit = registry.register_item(menu, ItemSpec::new(item_elem, "Quit")).unwrap();
///
/// let cx = StackContext { registry: &registry, tree: &tree };
/// let open = MenuStack::new().reduce(cx, &StackAction::OpenRoot {
///     menu,
///     anchor: Anchor::Rect(Rect::ZERO),
///     placement: Placement::default(),
///     from_keyboard: false,
/// });
/// let stack = open.stack.reduce(cx, &StackAction::FocusItem(Some(quit))).stack;
///
/// let done = stack.reduce(cx, &StackAction::ActivateCurrent { from_keyboard: true });
/// assert!(done.stack.is_empty());
/// assert_eq!(done.activate, Some(quit));
/// assert_eq!(done.stack.phantom().map(|p| p.label.as_str()), Some("Quit"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MenuStack {
    open_menus: SmallVec<[OpenMenu; 4]>,
    current_item: Option<ItemId>,
    phantom: Option<Phantom>,
}

impl MenuStack {
    /// The empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open menus, root first.
    pub fn open_menus(&self) -> &[OpenMenu] {
        &self.open_menus
    }

    /// Highlighted item.
    pub fn current_item(&self) -> Option<ItemId> {
        self.current_item
    }

    /// Phantom echo of the last activated item.
    pub fn phantom(&self) -> Option<&Phantom> {
        self.phantom.as_ref()
    }

    /// Whether no menu is open.
    pub fn is_empty(&self) -> bool {
        self.open_menus.is_empty()
    }

    /// Number of open menus.
    pub fn len(&self) -> usize {
        self.open_menus.len()
    }

    /// The root menu.
    pub fn root(&self) -> Option<&OpenMenu> {
        self.open_menus.first()
    }

    /// The deepest open menu; keyboard input targets it.
    pub fn deepest(&self) -> Option<&OpenMenu> {
        self.open_menus.last()
    }

    /// Depth of `menu` if it is open.
    pub fn depth_of(&self, menu: MenuId) -> Option<usize> {
        self.open_menus.iter().position(|m| m.menu == menu)
    }

    /// Whether `menu` is open.
    pub fn contains_menu(&self, menu: MenuId) -> bool {
        self.depth_of(menu).is_some()
    }

    /// Apply `action`.
    pub fn reduce(&self, cx: StackContext<'_>, action: &StackAction) -> Transition {
        match *action {
            StackAction::OpenRoot {
                menu,
                anchor,
                placement,
                from_keyboard,
            } => self.open_root(cx, menu, anchor, placement, from_keyboard),
            StackAction::OpenSubmenu {
                item,
                from_keyboard,
            } => self.open_submenu(cx, item, from_keyboard),
            StackAction::ActivateCurrent { from_keyboard } => {
                self.activate_current(cx, from_keyboard)
            }
            StackAction::CloseDeepest => self.close_deepest(),
            StackAction::CloseUpTo(menu) => self.close_up_to(cx, menu),
            StackAction::CloseAll => Transition::to(Self {
                open_menus: SmallVec::new(),
                current_item: None,
                phantom: self.phantom.clone(),
            }),
            StackAction::FocusItem(item) => self.focus_item(cx, item),
            StackAction::ClearPhantom => Transition::to(Self {
                phantom: None,
                ..self.clone()
            }),
        }
    }

    fn unchanged(&self) -> Transition {
        Transition::to(self.clone())
    }

    fn open_root(
        &self,
        cx: StackContext<'_>,
        menu: MenuId,
        anchor: Anchor,
        placement: Placement,
        from_keyboard: bool,
    ) -> Transition {
        if !cx.registry.contains_menu(menu) {
            diagnostic!(menu = ?menu, "ignoring OpenRoot for an unregistered menu");
            return self.unchanged();
        }
        let mut open_menus = SmallVec::new();
        open_menus.push(OpenMenu {
            menu,
            depth: 0,
            parent: anchor,
            placement,
            focus_first_on_open: from_keyboard,
        });
        Transition::to(Self {
            open_menus,
            current_item: None,
            phantom: self.phantom.clone(),
        })
    }

    fn open_submenu(&self, cx: StackContext<'_>, item: ItemId, from_keyboard: bool) -> Transition {
        let Ok(record) = cx.registry.item(item) else {
            diagnostic!(item = ?item, "ignoring OpenSubmenu for an unregistered item");
            return self.unchanged();
        };
        let Some(submenu) = record.submenu.filter(|&m| cx.registry.contains_menu(m)) else {
            diagnostic!(item = ?item, "ignoring OpenSubmenu for an item without a submenu");
            return self.unchanged();
        };
        let Some(depth) = self.depth_of(record.parent) else {
            diagnostic!(item = ?item, "ignoring OpenSubmenu for an item whose menu is not open");
            return self.unchanged();
        };
        if self.open_menus[..=depth].iter().any(|m| m.menu == submenu) {
            diagnostic!(menu = ?submenu, "ignoring OpenSubmenu that would open a menu twice");
            return self.unchanged();
        }

        let mut next = self.clone();
        let already_open = self
            .open_menus
            .get(depth + 1)
            .is_some_and(|m| m.menu == submenu && m.parent == Anchor::Item(item));
        if already_open {
            next.open_menus.truncate(depth + 2);
        } else {
            next.open_menus.truncate(depth + 1);
            let direction = self.open_menus[depth].placement.direction;
            next.open_menus.push(OpenMenu {
                menu: submenu,
                depth: depth + 1,
                parent: Anchor::Item(item),
                placement: Placement::beside(HorizontalGrowth::for_direction(direction), direction),
                focus_first_on_open: from_keyboard,
            });
        }
        next.current_item = if from_keyboard {
            first_enabled(cx.registry, submenu).or(Some(item))
        } else {
            Some(item)
        };
        Transition::to(next)
    }

    fn activate_current(&self, cx: StackContext<'_>, from_keyboard: bool) -> Transition {
        let Some(current) = self.current_item else {
            diagnostic!("ignoring ActivateCurrent without a current item");
            return self.unchanged();
        };
        let Ok(record) = cx.registry.item(current) else {
            diagnostic!(item = ?current, "ignoring ActivateCurrent for an unregistered item");
            return self.unchanged();
        };
        if record.disabled {
            diagnostic!(item = ?current, "ignoring ActivateCurrent for a disabled item");
            return self.unchanged();
        }
        if record.submenu.is_some() {
            return self.open_submenu(cx, current, from_keyboard);
        }
        Transition {
            stack: Self {
                open_menus: SmallVec::new(),
                current_item: None,
                phantom: Some(Phantom {
                    item: current,
                    label: record.label.clone(),
                    rect: cx.tree.bounds(record.elem).unwrap_or(Rect::ZERO),
                }),
            },
            activate: Some(current),
        }
    }

    fn close_deepest(&self) -> Transition {
        let Some(closed) = self.open_menus.last() else {
            diagnostic!("ignoring CloseDeepest with no open menu");
            return self.unchanged();
        };
        let mut next = self.clone();
        next.open_menus.pop();
        next.current_item = if next.open_menus.is_empty() {
            None
        } else {
            closed.parent.item()
        };
        Transition::to(next)
    }

    fn close_up_to(&self, cx: StackContext<'_>, menu: MenuId) -> Transition {
        let Some(depth) = self.depth_of(menu) else {
            diagnostic!(menu = ?menu, "ignoring CloseUpTo for a menu that is not open");
            return self.unchanged();
        };
        if depth + 1 == self.open_menus.len() {
            return self.unchanged();
        }
        let mut next = self.clone();
        let first_closed = next.open_menus[depth + 1].parent.item();
        next.open_menus.truncate(depth + 1);
        if let Some(current) = next.current_item
            && !next.owns(cx.registry, current)
        {
            next.current_item = first_closed;
        }
        Transition::to(next)
    }

    fn focus_item(&self, cx: StackContext<'_>, item: Option<ItemId>) -> Transition {
        if let Some(item) = item {
            if !cx.registry.is_enabled(item) {
                diagnostic!(item = ?item, "ignoring FocusItem for a disabled or unregistered item");
                return self.unchanged();
            }
            if !self.owns(cx.registry, item) {
                diagnostic!(item = ?item, "ignoring FocusItem for an item whose menu is not open");
                return self.unchanged();
            }
        }
        Transition::to(Self {
            current_item: item,
            ..self.clone()
        })
    }

    /// Whether `item` belongs to an open menu.
    fn owns(&self, registry: &MenuRegistry, item: ItemId) -> bool {
        registry
            .item(item)
            .is_ok_and(|i| self.contains_menu(i.parent))
    }
}

/// First enabled item of `menu`.
pub(crate) fn first_enabled(registry: &MenuRegistry, menu: MenuId) -> Option<ItemId> {
    let record = registry.menu(menu).ok()?;
    record.items.iter().copied().find(|&i| registry.is_enabled(i))
}
