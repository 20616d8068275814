// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus interception: enforce the active scopes on pointer, Tab and focus-in events.
//!
//! [`FocusScopes`] is the service object a host constructs once and passes to whatever
//! needs focus scopes. It owns the [`ScopeRegistry`] and decides, per event, whether the
//! host should run its default behavior.
//!
//! ## Activation
//!
//! Interception is *listening* only while at least one scope has a behavior other than
//! [`ScopeBehavior::Normal`]; hosts can query [`FocusScopes::is_listening`] to attach or
//! detach their global handlers. Independently, [`FocusScopes::disable`] /
//! [`FocusScopes::enable`] suspend enforcement without touching registrations (the menu
//! system does this while a menu is open). Calls nest and must be paired.
//!
//! ## Event rules
//!
//! - **Tab**: only group boundaries are handled. Shift+Tab on a group's `first` jumps to
//!   the previous group's `last`; Tab on a group's `last` jumps to the next group's
//!   `first`. Everything else is left to default traversal.
//! - **Pointer down / click**: with a `contain` scope active, a target that is not
//!   [`Classification::Valid`] is prevented. Pointer-downs outside a `contain` root are
//!   remembered and reported to every `contain` scope's callback.
//! - **Focus in**: focus landing on an invalid target is re-routed to the first reachable
//!   element (selecting its text).
//! - **Consistency check**: scope changes schedule a single deferred re-validation of the
//!   focused element, run by [`FocusScopes::flush`].

use alloc::vec::Vec;

use crate::scope::{
    Classification, FocusScopeState, PointerDownOutside, ScopeBehavior, ScopeGroups, ScopeKey,
    ScopeRegistry,
};
use crate::tab_order::{TabGroup, current_tab_groups};
use crate::tree::{ElementId, ElementTree, FocusOptions};

/// Whether the host should run its default handling for an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Let the event through.
    Default,
    /// Cancel the event's default action.
    Prevented,
}

/// Focus-scope service: registry plus interception state.
///
/// ```rust
/// use understory_focus::{
///     Disposition, ElementKind, ElementProps, ElementTree, FocusScopeState, FocusScopes,
///     ScopeBehavior,
/// };
///
/// let mut tree = ElementTree::new();
/// let body = tree.insert(None, ElementProps::default());
/// let dialog = tree.insert(Some(body), ElementProps::default());
/// let ok = tree.insert(Some(dialog), ElementProps::new(ElementKind::Button));
/// let elsewhere = tree.insert(Some(body), ElementProps::new(ElementKind::Button));
///
/// let mut scopes = FocusScopes::new();
/// let trap = scopes.register(FocusScopeState::new(ScopeBehavior::Contain, Some(dialog)));
/// assert!(scopes.is_listening());
///
/// assert_eq!(scopes.on_pointer_down(&tree, elsewhere), Disposition::Prevented);
/// assert_eq!(scopes.on_pointer_down(&tree, ok), Disposition::Default);
///
/// scopes.unregister(trap);
/// assert!(!scopes.is_listening());
/// ```
#[derive(Debug, Default)]
pub struct FocusScopes {
    registry: ScopeRegistry,
    suspended: u32,
    listening: bool,
    check_pending: bool,
    last_pointer_down_outside: Option<ElementId>,
}

impl FocusScopes {
    /// Create a service with no scopes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every scope and detach.
    pub fn dispose(&mut self) {
        self.registry.clear();
        self.suspended = 0;
        self.check_pending = false;
        self.last_pointer_down_outside = None;
        self.update_listening();
    }

    /// Register a scope.
    pub fn register(&mut self, state: FocusScopeState) -> ScopeKey {
        let key = self.registry.register(state);
        tracing::trace!(scope = ?key, "registered focus scope");
        self.scopes_changed();
        key
    }

    /// Change a scope's root.
    pub fn set_root(&mut self, key: ScopeKey, root: Option<ElementId>) -> bool {
        let known = self.registry.set_root(key, root);
        if known {
            self.scopes_changed();
        }
        known
    }

    /// Change a scope's behavior.
    pub fn set_behavior(&mut self, key: ScopeKey, behavior: ScopeBehavior) -> bool {
        let known = self.registry.set_behavior(key, behavior);
        if known {
            self.scopes_changed();
        }
        known
    }

    /// Replace a scope's pointer-down-outside callback.
    pub fn set_on_pointer_down_outside(
        &mut self,
        key: ScopeKey,
        callback: Option<PointerDownOutside>,
    ) -> bool {
        self.registry.set_on_pointer_down_outside(key, callback)
    }

    /// Remove a scope.
    pub fn unregister(&mut self, key: ScopeKey) -> Option<FocusScopeState> {
        let removed = self.registry.unregister(key);
        if removed.is_some() {
            tracing::trace!(scope = ?key, "unregistered focus scope");
            self.scopes_changed();
        }
        removed
    }

    /// Read-only access to the registry.
    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    /// Current partition of scope roots.
    pub fn scope_groups(&mut self) -> &ScopeGroups {
        self.registry.groups()
    }

    /// Suspend enforcement. Must be paired with [`FocusScopes::enable`]; calls nest.
    pub fn disable(&mut self) {
        self.suspended += 1;
    }

    /// Lift one level of suspension.
    pub fn enable(&mut self) {
        let Some(next) = self.suspended.checked_sub(1) else {
            if cfg!(debug_assertions) {
                tracing::warn!("FocusScopes::enable called without a matching disable");
            }
            return;
        };
        self.suspended = next;
        if next == 0 {
            self.check_pending = true;
        }
    }

    /// Whether enforcement is suspended.
    pub fn is_suspended(&self) -> bool {
        self.suspended > 0
    }

    /// Whether global handlers should be attached (some scope is not `Normal`).
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether events are currently being enforced.
    pub fn is_enforcing(&self) -> bool {
        self.listening && self.suspended == 0
    }

    /// Classify `target` against the active scopes.
    pub fn classify(&mut self, tree: &ElementTree, target: ElementId) -> Classification {
        self.registry.groups().classify(tree, target)
    }

    /// Current tab groups.
    pub fn tab_groups(&mut self, tree: &ElementTree) -> Vec<TabGroup> {
        current_tab_groups(tree, self.registry.groups())
    }

    /// Most recent pointer-down target outside a `contain` scope.
    pub fn last_pointer_down_outside(&self) -> Option<ElementId> {
        self.last_pointer_down_outside
    }

    /// Pointer down (or touch start) on `target`.
    pub fn on_pointer_down(&mut self, tree: &ElementTree, target: ElementId) -> Disposition {
        let Some(class) = self.contained_class(tree, target) else {
            return Disposition::Default;
        };
        match class {
            Classification::Valid => Disposition::Default,
            Classification::OutsideContain => {
                tracing::debug!(target = ?target, "pointer down outside focus trap");
                self.last_pointer_down_outside = Some(target);
                self.registry.notify_pointer_down_outside(target);
                Disposition::Prevented
            }
            Classification::InsideExclude => Disposition::Prevented,
        }
    }

    /// Click on `target`.
    pub fn on_click(&mut self, tree: &ElementTree, target: ElementId) -> Disposition {
        match self.contained_class(tree, target) {
            None | Some(Classification::Valid) => Disposition::Default,
            Some(_) => Disposition::Prevented,
        }
    }

    /// Tab (or Shift+Tab when `shift`) pressed.
    pub fn on_tab(&mut self, tree: &mut ElementTree, shift: bool) -> Disposition {
        if !self.is_enforcing() {
            return Disposition::Default;
        }
        let groups = self.tab_groups(tree);
        let trapped = self.registry.groups().has_contain(tree);
        let Some(edge) = edge_target(&groups, shift) else {
            // Nothing reachable: inside a trap, Tab goes nowhere.
            return if trapped {
                Disposition::Prevented
            } else {
                Disposition::Default
            };
        };

        let Some(focused) = tree.focused() else {
            return if trapped {
                focus_with_select(tree, edge);
                Disposition::Prevented
            } else {
                Disposition::Default
            };
        };

        let n = groups.len();
        for (i, group) in groups.iter().enumerate() {
            let target = if shift && group.first == Some(focused) {
                groups[(i + n - 1) % n].last
            } else if !shift && group.last == Some(focused) {
                groups[(i + 1) % n].first
            } else {
                continue;
            };
            if let Some(target) = target {
                focus_with_select(tree, target);
                return Disposition::Prevented;
            }
        }

        if self.classify(tree, focused) != Classification::Valid {
            focus_with_select(tree, edge);
            return Disposition::Prevented;
        }
        Disposition::Default
    }

    /// Focus landed on `target`. Returns `true` if focus was re-routed.
    pub fn on_focus_in(&mut self, tree: &mut ElementTree, target: ElementId) -> bool {
        if !self.is_enforcing() || self.classify(tree, target) == Classification::Valid {
            return false;
        }
        tracing::debug!(target = ?target, "focus landed outside the active scopes");
        self.focus_first_reachable(tree);
        true
    }

    /// Whether a consistency check is waiting for [`FocusScopes::flush`].
    pub fn needs_flush(&self) -> bool {
        self.check_pending
    }

    /// Run the pending consistency check, if any. Returns `true` if focus was re-routed.
    pub fn flush(&mut self, tree: &mut ElementTree) -> bool {
        if !core::mem::take(&mut self.check_pending) || !self.is_enforcing() {
            return false;
        }
        match tree.focused() {
            Some(focused) if self.classify(tree, focused) != Classification::Valid => {
                self.focus_first_reachable(tree);
                true
            }
            _ => false,
        }
    }

    // --- internals ---

    /// Classification of `target` when enforcing with a live `contain` scope.
    fn contained_class(&mut self, tree: &ElementTree, target: ElementId) -> Option<Classification> {
        if !self.is_enforcing() {
            return None;
        }
        let groups = self.registry.groups();
        groups
            .has_contain(tree)
            .then(|| groups.classify(tree, target))
    }

    fn focus_first_reachable(&mut self, tree: &mut ElementTree) {
        match self.tab_groups(tree).first() {
            Some(group) => focus_with_select(tree, group.first_reachable),
            None => tree.blur(),
        }
    }

    fn scopes_changed(&mut self) {
        self.update_listening();
        self.check_pending = true;
    }

    fn update_listening(&mut self) {
        let listening = self.registry.has_active();
        if listening != self.listening {
            if listening {
                tracing::trace!("focus scope interceptors attached");
            } else {
                tracing::trace!("focus scope interceptors detached");
            }
            self.listening = listening;
        }
    }
}

/// Entry point when focus is nowhere useful: the first element, or the last for Shift+Tab.
fn edge_target(groups: &[TabGroup], shift: bool) -> Option<ElementId> {
    if shift {
        groups.last().map(|g| g.last.unwrap_or(g.first_reachable))
    } else {
        groups.first().map(|g| g.first_reachable)
    }
}

fn focus_with_select(tree: &mut ElementTree, target: ElementId) {
    tree.focus(target, FocusOptions { select_all: true });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ElementKind, ElementProps};
    use alloc::rc::Rc;
    use core::cell::Cell;

    struct Page {
        tree: ElementTree,
        before: ElementId,
        dialog: ElementId,
        name: ElementId,
        ok: ElementId,
        label: ElementId,
        after: ElementId,
    }

    fn page() -> Page {
        let mut tree = ElementTree::new();
        let body = tree.insert(None, ElementProps::default());
        let before = tree.insert(Some(body), ElementProps::new(ElementKind::Button));
        let dialog = tree.insert(Some(body), ElementProps::default());
        let name = tree.insert(Some(dialog), ElementProps::new(ElementKind::TextInput));
        let ok = tree.insert(Some(dialog), ElementProps::new(ElementKind::Button));
        let label = tree.insert(Some(dialog), ElementProps::default());
        let after = tree.insert(Some(body), ElementProps::new(ElementKind::Button));
        Page {
            tree,
            before,
            dialog,
            name,
            ok,
            label,
            after,
        }
    }

    #[test]
    fn pointer_down_outside_contain_is_prevented() {
        let mut p = page();
        let hits = Rc::new(Cell::new(0));
        let mut scopes = FocusScopes::new();
        let counter = hits.clone();
        scopes.register(
            FocusScopeState::new(ScopeBehavior::Contain, Some(p.dialog))
                .with_pointer_down_outside(move |_| counter.set(counter.get() + 1)),
        );
        assert!(p.tree.focus(p.name, FocusOptions::default()));

        assert_eq!(
            scopes.on_pointer_down(&p.tree, p.before),
            Disposition::Prevented
        );
        assert_eq!(p.tree.focused(), Some(p.name), "focus must not move");
        assert_eq!(scopes.last_pointer_down_outside(), Some(p.before));
        assert_eq!(hits.get(), 1);

        assert_eq!(scopes.on_pointer_down(&p.tree, p.ok), Disposition::Default);
        assert_eq!(scopes.on_pointer_down(&p.tree, p.label), Disposition::Default);
        assert_eq!(scopes.on_click(&p.tree, p.after), Disposition::Prevented);
        assert_eq!(hits.get(), 1, "clicks do not report outside pointer-downs");
    }

    #[test]
    fn exclude_only_does_not_cancel_pointers() {
        let p = page();
        let mut scopes = FocusScopes::new();
        scopes.register(FocusScopeState::new(ScopeBehavior::Exclude, Some(p.dialog)));
        assert!(scopes.is_listening());
        assert_eq!(scopes.on_pointer_down(&p.tree, p.ok), Disposition::Default);
    }

    #[test]
    fn tab_wraps_inside_a_trap() {
        let mut p = page();
        let mut scopes = FocusScopes::new();
        scopes.register(FocusScopeState::new(ScopeBehavior::Contain, Some(p.dialog)));

        p.tree.focus(p.ok, FocusOptions::default());
        assert_eq!(scopes.on_tab(&mut p.tree, false), Disposition::Prevented);
        assert_eq!(p.tree.focused(), Some(p.name));
        assert!(p.tree.has_select_all(p.name));

        assert_eq!(scopes.on_tab(&mut p.tree, true), Disposition::Prevented);
        assert_eq!(p.tree.focused(), Some(p.ok));

        // Interior movement is left to the host.
        p.tree.focus(p.name, FocusOptions::default());
        assert_eq!(scopes.on_tab(&mut p.tree, false), Disposition::Default);
    }

    #[test]
    fn tab_from_outside_a_trap_enters_at_the_edge() {
        let mut p = page();
        let mut scopes = FocusScopes::new();
        scopes.register(FocusScopeState::new(ScopeBehavior::Contain, Some(p.dialog)));

        p.tree.focus(p.before, FocusOptions::default());
        assert_eq!(scopes.on_tab(&mut p.tree, false), Disposition::Prevented);
        assert_eq!(p.tree.focused(), Some(p.name));

        p.tree.focus(p.before, FocusOptions::default());
        assert_eq!(scopes.on_tab(&mut p.tree, true), Disposition::Prevented);
        assert_eq!(p.tree.focused(), Some(p.ok));

        // With nothing focused, Tab enters at the first element.
        p.tree.blur();
        assert_eq!(scopes.on_tab(&mut p.tree, false), Disposition::Prevented);
        assert_eq!(p.tree.focused(), Some(p.name));
        assert!(p.tree.has_select_all(p.name));
    }

    #[test]
    fn tab_jumps_over_excluded_gap() {
        let mut p = page();
        let mut scopes = FocusScopes::new();
        scopes.register(FocusScopeState::new(ScopeBehavior::Exclude, Some(p.dialog)));

        p.tree.focus(p.before, FocusOptions::default());
        assert_eq!(scopes.on_tab(&mut p.tree, false), Disposition::Prevented);
        assert_eq!(p.tree.focused(), Some(p.after));

        assert_eq!(scopes.on_tab(&mut p.tree, true), Disposition::Prevented);
        assert_eq!(p.tree.focused(), Some(p.before));

        // The sequence wraps from `after` to `before` without a gap.
        p.tree.focus(p.after, FocusOptions::default());
        assert_eq!(scopes.on_tab(&mut p.tree, false), Disposition::Default);
    }

    #[test]
    fn focus_in_outside_trap_is_rerouted() {
        let mut p = page();
        let mut scopes = FocusScopes::new();
        scopes.register(FocusScopeState::new(ScopeBehavior::Contain, Some(p.dialog)));

        p.tree.focus(p.after, FocusOptions::default());
        assert!(scopes.on_focus_in(&mut p.tree, p.after));
        assert_eq!(p.tree.focused(), Some(p.name));
        assert!(p.tree.has_select_all(p.name));

        assert!(!scopes.on_focus_in(&mut p.tree, p.ok));
    }

    #[test]
    fn suspension_nests_and_schedules_a_check() {
        let mut p = page();
        let mut scopes = FocusScopes::new();
        p.tree.focus(p.before, FocusOptions::default());
        scopes.register(FocusScopeState::new(ScopeBehavior::Contain, Some(p.dialog)));
        scopes.flush(&mut p.tree);
        assert_eq!(p.tree.focused(), Some(p.name));
        assert!(!scopes.needs_flush());

        scopes.disable();
        scopes.disable();
        assert!(!scopes.is_enforcing());
        assert_eq!(
            scopes.on_pointer_down(&p.tree, p.before),
            Disposition::Default
        );
        p.tree.focus(p.before, FocusOptions::default());

        scopes.enable();
        assert!(!scopes.is_enforcing());
        assert!(!scopes.flush(&mut p.tree));
        scopes.enable();
        assert!(scopes.is_enforcing());
        assert!(scopes.needs_flush());
        assert!(scopes.flush(&mut p.tree));
        assert_eq!(p.tree.focused(), Some(p.name));

        // Unpaired enables are ignored.
        scopes.enable();
        assert!(scopes.is_enforcing());
    }

    #[test]
    fn behavior_changes_toggle_listening() {
        let p = page();
        let mut scopes = FocusScopes::new();
        let key = scopes.register(FocusScopeState::new(ScopeBehavior::Normal, Some(p.dialog)));
        assert!(!scopes.is_listening());
        scopes.set_behavior(key, ScopeBehavior::Contain);
        assert!(scopes.is_listening());
        scopes.dispose();
        assert!(!scopes.is_listening());
        assert!(scopes.registry().is_empty());
    }
}
