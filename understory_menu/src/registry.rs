// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry of mounted menus and menu items.
//!
//! Each mounted menu registers a [`RegisteredMenu`] and each mounted item a
//! [`RegisteredItem`]; the registry hands back generational handles. Records are plain
//! values: the live element handle is the only link to the visual tree, and reverse maps
//! (`element -> menu`, `element -> item`) make hit tests and "nearest enclosing menu"
//! lookups iterative walks up the tree.
//!
//! Looking up a handle whose registration has ended returns a [`MenuError`]. That always
//! means a component forgot to unregister or kept a handle past its own lifetime.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use understory_focus::{ElementId, ElementTree};

use crate::key::CommandId;

/// Handle of a registered menu (generational).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MenuId(u32, u32);

/// Handle of a registered menu item (generational).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(u32, u32);

/// Lookup failures for stale handles and unparented items.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MenuError {
    /// The menu was unregistered (or never existed in this registry).
    #[error("menu {0:?} is not registered; its owner unmounted without unregistering or a stale handle was kept")]
    StaleMenu(MenuId),
    /// The item was unregistered (or never existed in this registry).
    #[error("menu item {0:?} is not registered; its owner unmounted without unregistering or a stale handle was kept")]
    StaleItem(ItemId),
    /// No registered menu element encloses the element.
    #[error("element {0:?} is not inside any registered menu")]
    NoEnclosingMenu(ElementId),
}

/// Check decoration of an item.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CheckType {
    /// Plain item.
    #[default]
    Plain,
    /// Independent checkbox.
    Checkbox,
    /// One of a set of mutually exclusive options.
    Radio,
}

/// Callback run when an item is activated.
pub type ActivateFn = Box<dyn FnMut(ItemId)>;

/// A mounted menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredMenu {
    /// Element of the menu's popup.
    pub elem: ElementId,
    /// Items in registration order.
    pub items: Vec<ItemId>,
    /// Item this menu is the submenu of, if any.
    pub parent_item: Option<ItemId>,
    /// Optional debugging name.
    pub name: Option<String>,
}

/// A mounted menu item.
pub struct RegisteredItem {
    /// Element of the item.
    pub elem: ElementId,
    /// Menu the item belongs to.
    pub parent: MenuId,
    /// Submenu opened by this item.
    pub submenu: Option<MenuId>,
    /// Disabled items cannot be highlighted or activated.
    pub disabled: bool,
    /// Text used for type-ahead and the phantom echo.
    pub label: String,
    /// Command shown as this item's shortcut.
    pub shortcut: Option<CommandId>,
    /// Check decoration.
    pub check: CheckType,
    on_activate: Option<ActivateFn>,
}

impl fmt::Debug for RegisteredItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredItem")
            .field("elem", &self.elem)
            .field("parent", &self.parent)
            .field("submenu", &self.submenu)
            .field("disabled", &self.disabled)
            .field("label", &self.label)
            .field("shortcut", &self.shortcut)
            .field("check", &self.check)
            .field("on_activate", &self.on_activate.is_some())
            .finish()
    }
}

/// Declaration of an item, consumed by [`MenuRegistry::register_item`].
pub struct ItemSpec {
    /// Element of the item.
    pub elem: ElementId,
    /// Label text.
    pub label: String,
    /// Disabled state.
    pub disabled: bool,
    /// Shortcut command.
    pub shortcut: Option<CommandId>,
    /// Check decoration.
    pub check: CheckType,
    /// Submenu opened by this item.
    pub submenu: Option<MenuId>,
    /// Activation callback.
    pub on_activate: Option<ActivateFn>,
}

impl ItemSpec {
    /// An enabled plain item.
    pub fn new(elem: ElementId, label: &str) -> Self {
        Self {
            elem,
            label: label.into(),
            disabled: false,
            shortcut: None,
            check: CheckType::Plain,
            submenu: None,
            on_activate: None,
        }
    }

    /// Set the disabled state.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Set the shortcut command.
    pub fn with_shortcut(mut self, command: CommandId) -> Self {
        self.shortcut = Some(command);
        self
    }

    /// Set the check decoration.
    pub fn with_check(mut self, check: CheckType) -> Self {
        self.check = check;
        self
    }

    /// Attach an already registered submenu.
    pub fn with_submenu(mut self, submenu: MenuId) -> Self {
        self.submenu = Some(submenu);
        self
    }

    /// Set the activation callback.
    pub fn on_activate(mut self, callback: impl FnMut(ItemId) + 'static) -> Self {
        self.on_activate = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for ItemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemSpec")
            .field("elem", &self.elem)
            .field("label", &self.label)
            .field("disabled", &self.disabled)
            .field("shortcut", &self.shortcut)
            .field("check", &self.check)
            .field("submenu", &self.submenu)
            .field("on_activate", &self.on_activate.is_some())
            .finish()
    }
}

/// What an element belongs to, nearest first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MenuHit {
    /// Inside a registered item.
    Item(ItemId),
    /// Inside a registered menu, outside any of its items.
    Menu(MenuId),
}

/// Generational slot storage shared by menus and items.
#[derive(Debug)]
struct Slots<T> {
    entries: Vec<(u32, Option<T>)>,
    free_list: Vec<usize>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<T> Slots<T> {
    fn insert(&mut self, value: T) -> (u32, u32) {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.entries[idx];
            slot.0 = slot.0.saturating_add(1);
            slot.1 = Some(value);
            (idx, slot.0)
        } else {
            self.entries.push((1, Some(value)));
            (self.entries.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Registry handles use 32-bit indices by design."
        )]
        let idx = idx as u32;
        (idx, generation)
    }

    fn get(&self, idx: u32, generation: u32) -> Option<&T> {
        match self.entries.get(idx as usize) {
            Some((g, Some(v))) if *g == generation => Some(v),
            _ => None,
        }
    }

    fn get_mut(&mut self, idx: u32, generation: u32) -> Option<&mut T> {
        match self.entries.get_mut(idx as usize) {
            Some((g, Some(v))) if *g == generation => Some(v),
            _ => None,
        }
    }

    fn remove(&mut self, idx: u32, generation: u32) -> Option<T> {
        let slot = self.entries.get_mut(idx as usize)?;
        if slot.0 != generation {
            return None;
        }
        let value = slot.1.take()?;
        self.free_list.push(idx as usize);
        Some(value)
    }
}

/// Arena of registered menus and items.
///
/// ```rust
/// use understory_focus::{ElementKind, ElementProps, ElementTree};
/// use understory_menu::{ItemSpec, MenuError, MenuRegistry};
///
/// let mut tree = ElementTree::new();
/// let menu_elem = tree.insert(None, ElementProps::default());
/// let item_elem = tree.insert(Some(menu_elem), ElementProps::new(ElementKind::Button));
///
/// let mut registry = MenuRegistry::new();
/// let menu = registry.register_menu(menu_elem, None, Some("Edit")).unwrap();
/// // Items find their menu by walking up the tree.
/// let undo = registry.register_item_in(&tree, ItemSpec::new(item_elem, "Undo")).unwrap();
/// assert_eq!(registry.item(undo).unwrap().parent, menu);
///
/// registry.unregister_menu(menu).unwrap();
/// assert_eq!(registry.item(undo).unwrap_err(), MenuError::StaleItem(undo));
/// ```
#[derive(Debug, Default)]
pub struct MenuRegistry {
    menus: Slots<RegisteredMenu>,
    items: Slots<RegisteredItem>,
    menu_by_elem: HashMap<ElementId, MenuId>,
    item_by_elem: HashMap<ElementId, ItemId>,
}

impl MenuRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a menu rendered at `elem`.
    ///
    /// When `parent_item` is given, the menu becomes that item's submenu.
    pub fn register_menu(
        &mut self,
        elem: ElementId,
        parent_item: Option<ItemId>,
        name: Option<&str>,
    ) -> Result<MenuId, MenuError> {
        if let Some(item) = parent_item {
            self.item(item)?;
        }
        let (idx, generation) = self.menus.insert(RegisteredMenu {
            elem,
            items: Vec::new(),
            parent_item,
            name: name.map(String::from),
        });
        let id = MenuId(idx, generation);
        self.menu_by_elem.insert(elem, id);
        if let Some(item) = parent_item {
            self.link_submenu(item, Some(id))?;
        }
        tracing::trace!(menu = ?id, name = ?name, "registered menu");
        Ok(id)
    }

    /// Unregister a menu and every item it still owns.
    ///
    /// The parent item, if any, loses its submenu.
    pub fn unregister_menu(&mut self, id: MenuId) -> Result<RegisteredMenu, MenuError> {
        let mut menu = self
            .menus
            .remove(id.0, id.1)
            .ok_or(MenuError::StaleMenu(id))?;
        if self.menu_by_elem.get(&menu.elem) == Some(&id) {
            self.menu_by_elem.remove(&menu.elem);
        }
        if let Some(parent) = menu.parent_item
            && let Some(item) = self.items.get_mut(parent.0, parent.1)
            && item.submenu == Some(id)
        {
            item.submenu = None;
        }
        for item in core::mem::take(&mut menu.items) {
            if let Some(removed) = self.items.remove(item.0, item.1) {
                self.forget_item(item, &removed);
            }
        }
        tracing::trace!(menu = ?id, "unregistered menu");
        Ok(menu)
    }

    /// Register an item in `menu`.
    pub fn register_item(&mut self, menu: MenuId, spec: ItemSpec) -> Result<ItemId, MenuError> {
        self.menu(menu)?;
        if let Some(submenu) = spec.submenu {
            self.menu(submenu)?;
        }
        let (idx, generation) = self.items.insert(RegisteredItem {
            elem: spec.elem,
            parent: menu,
            submenu: spec.submenu,
            disabled: spec.disabled,
            label: spec.label,
            shortcut: spec.shortcut,
            check: spec.check,
            on_activate: spec.on_activate,
        });
        let id = ItemId(idx, generation);
        self.item_by_elem.insert(spec.elem, id);
        self.menu_mut(menu)?.items.push(id);
        if let Some(submenu) = spec.submenu {
            self.adopt_submenu(id, submenu)?;
        }
        Ok(id)
    }

    /// Register an item under the nearest registered menu enclosing its element.
    pub fn register_item_in(
        &mut self,
        tree: &ElementTree,
        spec: ItemSpec,
    ) -> Result<ItemId, MenuError> {
        let menu = self
            .nearest_menu(tree, spec.elem)
            .ok_or(MenuError::NoEnclosingMenu(spec.elem))?;
        self.register_item(menu, spec)
    }

    /// Unregister an item. Its submenu, if any, stays registered but loses its parent item.
    pub fn unregister_item(&mut self, id: ItemId) -> Result<RegisteredItem, MenuError> {
        let item = self
            .items
            .remove(id.0, id.1)
            .ok_or(MenuError::StaleItem(id))?;
        if let Some(menu) = self.menus.get_mut(item.parent.0, item.parent.1) {
            menu.items.retain(|i| *i != id);
        }
        self.forget_item(id, &item);
        Ok(item)
    }

    /// Nearest registered menu whose element is `elem` or one of its ancestors.
    pub fn nearest_menu(&self, tree: &ElementTree, elem: ElementId) -> Option<MenuId> {
        core::iter::once(elem)
            .chain(tree.ancestors(elem))
            .find_map(|e| self.menu_by_elem.get(&e).copied())
    }

    /// What `elem` belongs to: the nearest registered item or menu element at or above it.
    pub fn hit(&self, tree: &ElementTree, elem: ElementId) -> Option<MenuHit> {
        core::iter::once(elem)
            .chain(tree.ancestors(elem))
            .find_map(|e| {
                if let Some(&item) = self.item_by_elem.get(&e) {
                    Some(MenuHit::Item(item))
                } else {
                    self.menu_by_elem.get(&e).map(|&m| MenuHit::Menu(m))
                }
            })
    }

    /// A registered menu.
    pub fn menu(&self, id: MenuId) -> Result<&RegisteredMenu, MenuError> {
        self.menus.get(id.0, id.1).ok_or(MenuError::StaleMenu(id))
    }

    /// A registered item.
    pub fn item(&self, id: ItemId) -> Result<&RegisteredItem, MenuError> {
        self.items.get(id.0, id.1).ok_or(MenuError::StaleItem(id))
    }

    /// Whether `id` is registered.
    pub fn contains_menu(&self, id: MenuId) -> bool {
        self.menus.get(id.0, id.1).is_some()
    }

    /// Whether `id` is registered.
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.items.get(id.0, id.1).is_some()
    }

    /// Whether `id` is registered and enabled.
    pub fn is_enabled(&self, id: ItemId) -> bool {
        self.item(id).is_ok_and(|i| !i.disabled)
    }

    /// Enabled items of `menu`, in order.
    pub fn enabled_items(&self, menu: MenuId) -> Result<Vec<ItemId>, MenuError> {
        Ok(self
            .menu(menu)?
            .items
            .iter()
            .copied()
            .filter(|&i| self.is_enabled(i))
            .collect())
    }

    /// Change the disabled state of an item.
    pub fn set_disabled(&mut self, id: ItemId, disabled: bool) -> Result<(), MenuError> {
        self.item_mut(id)?.disabled = disabled;
        Ok(())
    }

    /// Change the label of an item.
    pub fn set_label(&mut self, id: ItemId, label: &str) -> Result<(), MenuError> {
        self.item_mut(id)?.label = label.into();
        Ok(())
    }

    /// Change the shortcut of an item.
    pub fn set_shortcut(
        &mut self,
        id: ItemId,
        shortcut: Option<CommandId>,
    ) -> Result<(), MenuError> {
        self.item_mut(id)?.shortcut = shortcut;
        Ok(())
    }

    /// Attach or detach a submenu.
    pub fn set_submenu(&mut self, id: ItemId, submenu: Option<MenuId>) -> Result<(), MenuError> {
        self.item(id)?;
        if let Some(menu) = submenu {
            self.adopt_submenu(id, menu)?;
        }
        self.link_submenu(id, submenu)
    }

    /// Run an item's activation callback.
    ///
    /// Returns `Ok(false)` if the item has no callback.
    pub fn activate(&mut self, id: ItemId) -> Result<bool, MenuError> {
        let item = self.item_mut(id)?;
        tracing::debug!(item = ?id, label = %item.label, "activating menu item");
        match item.on_activate.as_mut() {
            Some(callback) => {
                callback(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- internals ---

    fn menu_mut(&mut self, id: MenuId) -> Result<&mut RegisteredMenu, MenuError> {
        self.menus.get_mut(id.0, id.1).ok_or(MenuError::StaleMenu(id))
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut RegisteredItem, MenuError> {
        self.items.get_mut(id.0, id.1).ok_or(MenuError::StaleItem(id))
    }

    /// Point `item` at `submenu`, unlinking any previous submenu's back reference.
    fn link_submenu(&mut self, item: ItemId, submenu: Option<MenuId>) -> Result<(), MenuError> {
        let previous = core::mem::replace(&mut self.item_mut(item)?.submenu, submenu);
        if let Some(old) = previous
            && Some(old) != submenu
            && let Some(menu) = self.menus.get_mut(old.0, old.1)
            && menu.parent_item == Some(item)
        {
            menu.parent_item = None;
        }
        Ok(())
    }

    /// Make `item` the parent of `submenu`, detaching it from its previous parent item.
    fn adopt_submenu(&mut self, item: ItemId, submenu: MenuId) -> Result<(), MenuError> {
        let previous = self.menu_mut(submenu)?.parent_item.replace(item);
        if let Some(old) = previous
            && old != item
            && let Some(old_item) = self.items.get_mut(old.0, old.1)
            && old_item.submenu == Some(submenu)
        {
            old_item.submenu = None;
        }
        Ok(())
    }

    fn forget_item(&mut self, id: ItemId, item: &RegisteredItem) {
        if self.item_by_elem.get(&item.elem) == Some(&id) {
            self.item_by_elem.remove(&item.elem);
        }
        if let Some(sub) = item.submenu
            && let Some(menu) = self.menus.get_mut(sub.0, sub.1)
            && menu.parent_item == Some(id)
        {
            menu.parent_item = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;
    use understory_focus::{ElementKind, ElementProps};

    fn button() -> ElementProps {
        ElementProps::new(ElementKind::Button)
    }

    #[test]
    fn submenus_link_both_ways() {
        let mut tree = ElementTree::new();
        let file_elem = tree.insert(None, ElementProps::default());
        let export_elem = tree.insert(Some(file_elem), button());
        let sub_elem = tree.insert(Some(export_elem), ElementProps::default());

        let mut registry = MenuRegistry::new();
        let file = registry.register_menu(file_elem, None, Some("File")).unwrap();
        let export = registry
            .register_item(file, ItemSpec::new(export_elem, "Export"))
            .unwrap();
        let sub = registry.register_menu(sub_elem, Some(export), None).unwrap();

        assert_eq!(registry.item(export).unwrap().submenu, Some(sub));
        assert_eq!(registry.menu(sub).unwrap().parent_item, Some(export));
        assert_eq!(registry.menu(file).unwrap().name.as_deref(), Some("File"));

        registry.unregister_menu(sub).unwrap();
        assert_eq!(registry.item(export).unwrap().submenu, None);
    }

    #[test]
    fn a_submenu_has_one_parent_item() {
        let mut tree = ElementTree::new();
        let file_elem = tree.insert(None, ElementProps::default());
        let export_elem = tree.insert(Some(file_elem), button());
        let share_elem = tree.insert(Some(file_elem), button());
        let print_elem = tree.insert(Some(file_elem), button());
        let sub_elem = tree.insert(None, ElementProps::default());

        let mut registry = MenuRegistry::new();
        let file = registry.register_menu(file_elem, None, None).unwrap();
        let export = registry
            .register_item(file, ItemSpec::new(export_elem, "Export"))
            .unwrap();
        let sub = registry.register_menu(sub_elem, Some(export), None).unwrap();

        // Registering a second item that claims the submenu takes it over.
        let share = registry
            .register_item(file, ItemSpec::new(share_elem, "Share").with_submenu(sub))
            .unwrap();
        assert_eq!(registry.item(export).unwrap().submenu, None);
        assert_eq!(registry.item(share).unwrap().submenu, Some(sub));
        assert_eq!(registry.menu(sub).unwrap().parent_item, Some(share));

        // So does pointing an existing item at it.
        let print = registry
            .register_item(file, ItemSpec::new(print_elem, "Print"))
            .unwrap();
        registry.set_submenu(print, Some(sub)).unwrap();
        assert_eq!(registry.item(share).unwrap().submenu, None);
        assert_eq!(registry.item(print).unwrap().submenu, Some(sub));
        assert_eq!(registry.menu(sub).unwrap().parent_item, Some(print));

        // Re-linking the current parent is a no-op.
        registry.set_submenu(print, Some(sub)).unwrap();
        assert_eq!(registry.item(print).unwrap().submenu, Some(sub));
        assert_eq!(registry.menu(sub).unwrap().parent_item, Some(print));
    }

    #[test]
    fn nearest_menu_walks_up_past_items() {
        let mut tree = ElementTree::new();
        let outer_elem = tree.insert(None, ElementProps::default());
        let item_elem = tree.insert(Some(outer_elem), button());
        let inner_elem = tree.insert(Some(item_elem), ElementProps::default());
        let nested_elem = tree.insert(Some(inner_elem), button());
        let label = tree.insert(Some(nested_elem), ElementProps::default());
        let stray = tree.insert(None, button());

        let mut registry = MenuRegistry::new();
        let outer = registry.register_menu(outer_elem, None, None).unwrap();
        let inner = registry.register_menu(inner_elem, None, None).unwrap();
        assert_eq!(registry.nearest_menu(&tree, nested_elem), Some(inner));
        assert_eq!(registry.nearest_menu(&tree, item_elem), Some(outer));
        assert_eq!(registry.nearest_menu(&tree, stray), None);

        let nested = registry
            .register_item_in(&tree, ItemSpec::new(nested_elem, "Nested"))
            .unwrap();
        assert_eq!(registry.item(nested).unwrap().parent, inner);
        assert_eq!(registry.hit(&tree, label), Some(MenuHit::Item(nested)));
        assert_eq!(registry.hit(&tree, inner_elem), Some(MenuHit::Menu(inner)));
        assert_eq!(
            registry.register_item_in(&tree, ItemSpec::new(stray, "Stray")).unwrap_err(),
            MenuError::NoEnclosingMenu(stray)
        );
    }

    #[test]
    fn stale_handles_are_errors() {
        let mut tree = ElementTree::new();
        let menu_elem = tree.insert(None, ElementProps::default());
        let a = tree.insert(Some(menu_elem), button());
        let b = tree.insert(Some(menu_elem), button());

        let mut registry = MenuRegistry::new();
        let menu = registry.register_menu(menu_elem, None, None).unwrap();
        let first = registry.register_item(menu, ItemSpec::new(a, "A")).unwrap();
        registry.unregister_item(first).unwrap();
        assert_eq!(registry.unregister_item(first).unwrap_err(), MenuError::StaleItem(first));
        assert!(registry.menu(menu).unwrap().items.is_empty());

        // The freed slot is reused with a new generation.
        let second = registry.register_item(menu, ItemSpec::new(b, "B")).unwrap();
        assert_ne!(first, second);
        assert!(!registry.contains_item(first));
        assert_eq!(registry.set_label(first, "x").unwrap_err(), MenuError::StaleItem(first));

        registry.unregister_menu(menu).unwrap();
        assert_eq!(registry.menu(menu).unwrap_err(), MenuError::StaleMenu(menu));
        assert_eq!(
            registry.register_item(menu, ItemSpec::new(a, "A")).unwrap_err(),
            MenuError::StaleMenu(menu)
        );
        assert_eq!(registry.hit(&tree, b), None);
    }

    #[test]
    fn activation_runs_the_callback() {
        let mut tree = ElementTree::new();
        let menu_elem = tree.insert(None, ElementProps::default());
        let a = tree.insert(Some(menu_elem), button());
        let b = tree.insert(Some(menu_elem), button());

        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let mut registry = MenuRegistry::new();
        let menu = registry.register_menu(menu_elem, None, None).unwrap();
        let save = registry
            .register_item(
                menu,
                ItemSpec::new(a, "Save").on_activate(move |_| seen.set(seen.get() + 1)),
            )
            .unwrap();
        let quiet = registry
            .register_item(menu, ItemSpec::new(b, "Quiet").disabled(true))
            .unwrap();

        assert_eq!(registry.activate(save), Ok(true));
        assert_eq!(registry.activate(quiet), Ok(false));
        assert_eq!(count.get(), 1);
        assert_eq!(registry.enabled_items(menu).unwrap(), [save]);
    }
}
