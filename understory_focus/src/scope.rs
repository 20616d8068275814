// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus-scope registry.
//!
//! Every mounted scope or trap registers a [`FocusScopeState`] and receives a
//! [`ScopeKey`]. The registry partitions the active scopes into `contain` and `exclude`
//! root buckets ([`ScopeGroups`]), recomputed lazily after any mutation, and classifies
//! candidate focus targets against them.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::fmt;

use smallvec::SmallVec;

use crate::tree::{ElementId, ElementTree};

/// Focus policy of a scope.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScopeBehavior {
    /// No effect on focus.
    #[default]
    Normal,
    /// The subtree is removed from the tab sequence.
    Exclude,
    /// Focus is trapped inside the subtree.
    Contain,
}

/// Process-unique key of a registered scope.
///
/// Keys are handed out in increasing order, so iteration over the registry follows
/// registration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(u64);

/// Callback invoked with the target of a pointer-down outside a `contain` scope.
pub type PointerDownOutside = Box<dyn FnMut(ElementId)>;

/// State of one registered scope.
pub struct FocusScopeState {
    /// Root of the scope's subtree, once mounted.
    pub root: Option<ElementId>,
    /// Focus policy.
    pub behavior: ScopeBehavior,
    /// Called for pointer-downs outside this scope while it is a `contain` scope.
    pub on_pointer_down_outside: Option<PointerDownOutside>,
}

impl FocusScopeState {
    /// A scope with `behavior` rooted at `root`.
    pub fn new(behavior: ScopeBehavior, root: Option<ElementId>) -> Self {
        Self {
            root,
            behavior,
            on_pointer_down_outside: None,
        }
    }

    /// Attach a pointer-down-outside callback.
    pub fn with_pointer_down_outside(mut self, callback: impl FnMut(ElementId) + 'static) -> Self {
        self.on_pointer_down_outside = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for FocusScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusScopeState")
            .field("root", &self.root)
            .field("behavior", &self.behavior)
            .field(
                "on_pointer_down_outside",
                &self.on_pointer_down_outside.is_some(),
            )
            .finish()
    }
}

/// How a candidate focus target relates to the active scopes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The target may hold focus.
    Valid,
    /// The target lies outside at least one `contain` root.
    OutsideContain,
    /// The target lies inside an `exclude` root (and inside every `contain` root).
    InsideExclude,
}

/// Roots of the active scopes, partitioned by behavior.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeGroups {
    /// Roots of `contain` scopes, in registration order.
    pub contain: SmallVec<[ElementId; 2]>,
    /// Roots of `exclude` scopes, in registration order.
    pub exclude: SmallVec<[ElementId; 4]>,
}

impl ScopeGroups {
    /// `contain` roots that are still alive in `tree`.
    pub fn live_contain(&self, tree: &ElementTree) -> SmallVec<[ElementId; 2]> {
        self.contain
            .iter()
            .copied()
            .filter(|&r| tree.is_alive(r))
            .collect()
    }

    /// Classify `target`. Being outside a `contain` root wins over being inside an `exclude` root.
    pub fn classify(&self, tree: &ElementTree, target: ElementId) -> Classification {
        if self
            .contain
            .iter()
            .any(|&r| tree.is_alive(r) && !tree.contains(r, target))
        {
            Classification::OutsideContain
        } else if self.exclude.iter().any(|&r| tree.contains(r, target)) {
            Classification::InsideExclude
        } else {
            Classification::Valid
        }
    }

    /// Whether `target` may appear in a tab group.
    ///
    /// With at most one live `contain` root the containment check is implied by the walk
    /// root chosen in [`current_tab_groups`](crate::tab_order::current_tab_groups).
    pub fn is_reachable(&self, tree: &ElementTree, target: ElementId) -> bool {
        let contain = self.live_contain(tree);
        let inside_all = contain.len() <= 1 || contain.iter().all(|&r| tree.contains(r, target));
        inside_all && !self.exclude.iter().any(|&r| tree.contains(r, target))
    }

    /// Whether any `contain` root is alive.
    pub fn has_contain(&self, tree: &ElementTree) -> bool {
        self.contain.iter().any(|&r| tree.is_alive(r))
    }
}

/// Table of registered scopes.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    scopes: BTreeMap<ScopeKey, FocusScopeState>,
    next_key: u64,
    groups: Option<ScopeGroups>,
}

impl ScopeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scope and return its key.
    pub fn register(&mut self, state: FocusScopeState) -> ScopeKey {
        self.next_key += 1;
        let key = ScopeKey(self.next_key);
        self.scopes.insert(key, state);
        self.groups = None;
        key
    }

    /// Change the root of a scope. Returns `false` for unknown keys.
    pub fn set_root(&mut self, key: ScopeKey, root: Option<ElementId>) -> bool {
        let Some(scope) = self.scopes.get_mut(&key) else {
            return false;
        };
        if scope.root != root {
            scope.root = root;
            self.groups = None;
        }
        true
    }

    /// Change the behavior of a scope. Returns `false` for unknown keys.
    pub fn set_behavior(&mut self, key: ScopeKey, behavior: ScopeBehavior) -> bool {
        let Some(scope) = self.scopes.get_mut(&key) else {
            return false;
        };
        if scope.behavior != behavior {
            scope.behavior = behavior;
            self.groups = None;
        }
        true
    }

    /// Replace the pointer-down-outside callback of a scope. Returns `false` for unknown keys.
    pub fn set_on_pointer_down_outside(
        &mut self,
        key: ScopeKey,
        callback: Option<PointerDownOutside>,
    ) -> bool {
        let Some(scope) = self.scopes.get_mut(&key) else {
            return false;
        };
        scope.on_pointer_down_outside = callback;
        true
    }

    /// Remove a scope and return its state.
    pub fn unregister(&mut self, key: ScopeKey) -> Option<FocusScopeState> {
        let removed = self.scopes.remove(&key);
        if removed.is_some() {
            self.groups = None;
        }
        removed
    }

    /// Remove every scope.
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.groups = None;
    }

    /// State of a registered scope.
    pub fn get(&self, key: ScopeKey) -> Option<&FocusScopeState> {
        self.scopes.get(&key)
    }

    /// Number of registered scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether no scope is registered.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Whether any registered scope has a behavior other than [`ScopeBehavior::Normal`].
    pub fn has_active(&self) -> bool {
        self.scopes
            .values()
            .any(|s| s.behavior != ScopeBehavior::Normal)
    }

    /// Current partition of scope roots, recomputed if any scope changed since the last call.
    pub fn groups(&mut self) -> &ScopeGroups {
        self.groups.get_or_insert_with(|| {
            let mut groups = ScopeGroups::default();
            for scope in self.scopes.values() {
                let Some(root) = scope.root else {
                    continue;
                };
                match scope.behavior {
                    ScopeBehavior::Contain => groups.contain.push(root),
                    ScopeBehavior::Exclude => groups.exclude.push(root),
                    ScopeBehavior::Normal => {}
                }
            }
            groups
        })
    }

    /// Invoke the pointer-down-outside callback of every `contain` scope.
    pub fn notify_pointer_down_outside(&mut self, target: ElementId) {
        for scope in self.scopes.values_mut() {
            if scope.behavior != ScopeBehavior::Contain {
                continue;
            }
            if let Some(callback) = scope.on_pointer_down_outside.as_mut() {
                callback(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ElementKind, ElementProps};
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    fn setup() -> (ElementTree, ElementId, ElementId, ElementId, ElementId) {
        let mut tree = ElementTree::new();
        let root = tree.insert(None, ElementProps::default());
        let dialog = tree.insert(Some(root), ElementProps::default());
        let inside = tree.insert(Some(dialog), ElementProps::new(ElementKind::Button));
        let outside = tree.insert(Some(root), ElementProps::new(ElementKind::Button));
        (tree, root, dialog, inside, outside)
    }

    #[test]
    fn groups_are_recomputed_after_mutation() {
        let (_tree, root, dialog, _, _) = setup();
        let mut registry = ScopeRegistry::new();
        let key = registry.register(FocusScopeState::new(ScopeBehavior::Normal, Some(dialog)));
        assert!(registry.groups().contain.is_empty());
        assert!(!registry.has_active());

        registry.set_behavior(key, ScopeBehavior::Contain);
        assert_eq!(registry.groups().contain.as_slice(), &[dialog]);

        registry.set_root(key, Some(root));
        assert_eq!(registry.groups().contain.as_slice(), &[root]);

        registry.unregister(key);
        assert_eq!(registry.groups(), &ScopeGroups::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn outside_contain_wins_over_inside_exclude() {
        let (tree, root, dialog, inside, outside) = setup();
        let groups = ScopeGroups {
            contain: [dialog].into_iter().collect(),
            exclude: [root].into_iter().collect(),
        };
        assert_eq!(groups.classify(&tree, outside), Classification::OutsideContain);
        assert_eq!(groups.classify(&tree, inside), Classification::InsideExclude);

        let only_contain = ScopeGroups {
            contain: [dialog].into_iter().collect(),
            ..ScopeGroups::default()
        };
        assert_eq!(only_contain.classify(&tree, inside), Classification::Valid);
    }

    #[test]
    fn dead_contain_roots_are_ignored() {
        let (mut tree, _, dialog, _, outside) = setup();
        let groups = ScopeGroups {
            contain: [dialog].into_iter().collect(),
            ..ScopeGroups::default()
        };
        tree.remove(dialog);
        assert!(!groups.has_contain(&tree));
        assert_eq!(groups.classify(&tree, outside), Classification::Valid);
    }

    #[test]
    fn pointer_down_outside_reaches_only_contain_scopes() {
        let (_tree, _, dialog, _, outside) = setup();
        let seen: Rc<RefCell<Vec<(u8, ElementId)>>> = Rc::default();
        let mut registry = ScopeRegistry::new();

        let log = seen.clone();
        registry.register(
            FocusScopeState::new(ScopeBehavior::Contain, Some(dialog))
                .with_pointer_down_outside(move |t| log.borrow_mut().push((1, t))),
        );
        let log = seen.clone();
        registry.register(
            FocusScopeState::new(ScopeBehavior::Exclude, Some(dialog))
                .with_pointer_down_outside(move |t| log.borrow_mut().push((2, t))),
        );

        registry.notify_pointer_down_outside(outside);
        assert_eq!(seen.borrow().as_slice(), &[(1, outside)]);
    }
}
