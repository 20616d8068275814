// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tab order: focusable candidates, platform tab sorting, and tab groups split by gaps.
//!
//! ## Sorting
//!
//! [`sort_by_tab_order`] reproduces platform semantics, which are *not* a plain numeric
//! sort: elements with a positive tab index come first, ascending, ties kept in source
//! order; everything with tab index 0 follows in source order.
//!
//! ## Radio groups
//!
//! An unchecked radio input is not tab-reachable when another radio in its named group is
//! checked, so only one member of a group is ever in the tab sequence.
//!
//! ## Tab groups
//!
//! [`current_tab_groups`] walks the tab sequence under the active `contain` roots and
//! splits it into [`TabGroup`]s: maximal runs of elements that the active scopes allow.
//! A gap between runs is where default traversal would land somewhere forbidden, so the
//! interception layer only needs to step in at group boundaries.

use alloc::vec::Vec;

use crate::FocusSymbol;
use crate::scope::ScopeGroups;
use crate::tree::{ElementFlags, ElementId, ElementKind, ElementTree};

/// Options for [`focusable`] and [`tab_reachable`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FocusableOptions {
    /// Include the root itself when it qualifies.
    pub include_root: bool,
    /// Return tab order instead of source order.
    pub sorted: bool,
}

/// A maximal run of consecutive elements that the active scopes allow in the tab sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TabGroup {
    /// First element of the run, always present.
    pub first_reachable: ElementId,
    /// Boundary element for Shift+Tab; `None` when traversal wraps into this group without a gap.
    pub first: Option<ElementId>,
    /// Boundary element for Tab; `None` when traversal wraps out of this group without a gap.
    pub last: Option<ElementId>,
}

/// Effective tab index: the explicit one, else 0 for native kinds.
///
/// Returns `None` for stale ids and for containers without an explicit index.
pub fn effective_tab_index(tree: &ElementTree, id: ElementId) -> Option<i32> {
    let props = tree.props(id)?;
    match props.tab_index {
        Some(i) => Some(i),
        None if props.kind.is_natively_focusable() => Some(0),
        None => None,
    }
}

/// Whether `id` is in the sequential navigation order.
pub fn is_tab_reachable(tree: &ElementTree, id: ElementId) -> bool {
    let checked = checked_radio_groups(tree);
    is_tab_reachable_with(tree, id, &checked)
}

/// Focusable elements under `root` (the whole tree when `None`).
pub fn focusable(
    tree: &ElementTree,
    root: Option<ElementId>,
    options: FocusableOptions,
) -> Vec<ElementId> {
    let mut out: Vec<ElementId> = candidates(tree, root, options.include_root)
        .into_iter()
        .filter(|&id| tree.is_focusable(id))
        .collect();
    if options.sorted {
        sort_by_tab_order(tree, &mut out);
    }
    out
}

/// Tab-reachable elements under `root` (the whole tree when `None`).
pub fn tab_reachable(
    tree: &ElementTree,
    root: Option<ElementId>,
    options: FocusableOptions,
) -> Vec<ElementId> {
    let checked = checked_radio_groups(tree);
    let mut out: Vec<ElementId> = candidates(tree, root, options.include_root)
        .into_iter()
        .filter(|&id| is_tab_reachable_with(tree, id, &checked))
        .collect();
    if options.sorted {
        sort_by_tab_order(tree, &mut out);
    }
    out
}

/// Sort source-ordered elements into tab order.
///
/// Positive indices first (ascending, stable), then the rest in their existing order.
pub fn sort_by_tab_order(tree: &ElementTree, elements: &mut [ElementId]) {
    sort_by_order_key(elements, |id| effective_tab_index(tree, *id).unwrap_or(0));
}

/// Tab-order sort over an arbitrary key; see [`sort_by_tab_order`].
pub fn sort_by_order_key<T>(elements: &mut [T], mut order: impl FnMut(&T) -> i32) {
    // `sort_by_key` is stable, which is what keeps ties in source order.
    elements.sort_by_key(|e| match order(e) {
        i if i > 0 => (0_u8, i),
        _ => (1_u8, 0),
    });
}

/// Split the current tab sequence into groups allowed by `scopes`.
///
/// The walk covers the tab-reachable elements under the lowest common ancestor of the
/// live `contain` roots, or the whole tree when there are none. When there are no
/// `contain` roots and both the first and the last element of the walk are allowed,
/// traversal wraps without a gap, so the first group's `first` and the last group's
/// `last` are cleared.
pub fn current_tab_groups(tree: &ElementTree, scopes: &ScopeGroups) -> Vec<TabGroup> {
    let contain = scopes.live_contain(tree);
    let walk_root = if contain.is_empty() {
        None
    } else {
        tree.lowest_common_ancestor(&contain)
    };
    let elements = tab_reachable(
        tree,
        walk_root,
        FocusableOptions {
            include_root: true,
            sorted: true,
        },
    );

    let mut groups: Vec<TabGroup> = Vec::new();
    let mut open = false;
    for &id in &elements {
        if scopes.is_reachable(tree, id) {
            match groups.last_mut() {
                Some(group) if open => group.last = Some(id),
                _ => {
                    groups.push(TabGroup {
                        first_reachable: id,
                        first: Some(id),
                        last: Some(id),
                    });
                    open = true;
                }
            }
        } else {
            open = false;
        }
    }

    if contain.is_empty()
        && open
        && groups.first().map(|g| g.first_reachable) == elements.first().copied()
    {
        if let Some(first) = groups.first_mut() {
            first.first = None;
        }
        if let Some(last) = groups.last_mut() {
            last.last = None;
        }
    }
    groups
}

fn candidates(tree: &ElementTree, root: Option<ElementId>, include_root: bool) -> Vec<ElementId> {
    match root {
        Some(root) => tree.descendants(root, include_root),
        None => tree.document_order(),
    }
}

fn checked_radio_groups(tree: &ElementTree) -> Vec<FocusSymbol> {
    let mut groups = Vec::new();
    for id in tree.document_order() {
        let Some(props) = tree.props(id) else {
            continue;
        };
        if props.kind == ElementKind::Radio
            && props.flags.contains(ElementFlags::CHECKED)
            && let Some(group) = props.radio_group
            && !groups.contains(&group)
        {
            groups.push(group);
        }
    }
    groups
}

fn is_tab_reachable_with(tree: &ElementTree, id: ElementId, checked: &[FocusSymbol]) -> bool {
    if !tree.is_focusable(id) || effective_tab_index(tree, id).is_none_or(|i| i < 0) {
        return false;
    }
    let Some(props) = tree.props(id) else {
        return false;
    };
    let unreachable_radio = props.kind == ElementKind::Radio
        && !props.flags.contains(ElementFlags::CHECKED)
        && props.radio_group.is_some_and(|g| checked.contains(&g));
    !unreachable_radio
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeGroups;
    use crate::tree::ElementProps;
    use alloc::vec;

    fn button() -> ElementProps {
        ElementProps::new(ElementKind::Button)
    }

    #[test]
    fn positive_indices_sort_first_then_source_order() {
        // (source position, tab index)
        let mut items = vec![(0, 0), (1, 3), (2, 0), (3, 1), (4, 3), (5, 0), (6, 2)];
        sort_by_order_key(&mut items, |&(_, order)| order);
        let positions: Vec<u32> = items.iter().map(|&(p, _)| p).collect();
        assert_eq!(positions, vec![3, 6, 1, 4, 0, 2, 5]);
    }

    #[test]
    fn sorting_uses_effective_indices() {
        let mut tree = ElementTree::new();
        let root = tree.insert(None, ElementProps::default());
        let a = tree.insert(Some(root), button());
        let b = tree.insert(Some(root), button().with_tab_index(2));
        let c = tree.insert(Some(root), ElementProps::default().with_tab_index(0));
        let d = tree.insert(Some(root), button().with_tab_index(1));
        let skipped = tree.insert(Some(root), button().with_tab_index(-1));

        let sorted = tab_reachable(
            &tree,
            Some(root),
            FocusableOptions {
                include_root: false,
                sorted: true,
            },
        );
        assert_eq!(sorted, vec![d, b, a, c]);

        let unsorted = focusable(&tree, Some(root), FocusableOptions::default());
        assert_eq!(unsorted, vec![a, b, c, d, skipped]);
    }

    #[test]
    fn checked_radio_excludes_its_siblings() {
        let name = FocusSymbol(7);
        let other = FocusSymbol(8);
        let mut tree = ElementTree::new();
        let root = tree.insert(None, ElementProps::default());
        let r1 = tree.insert(
            Some(root),
            ElementProps::new(ElementKind::Radio).in_radio_group(name),
        );
        let r2 = tree.insert(
            Some(root),
            ElementProps::new(ElementKind::Radio)
                .in_radio_group(name)
                .with_flags(ElementFlags::CHECKED),
        );
        let r3 = tree.insert(
            Some(root),
            ElementProps::new(ElementKind::Radio).in_radio_group(name),
        );
        // Nothing checked in this group, so every member stays reachable.
        let o1 = tree.insert(
            Some(root),
            ElementProps::new(ElementKind::Radio).in_radio_group(other),
        );
        let o2 = tree.insert(
            Some(root),
            ElementProps::new(ElementKind::Radio).in_radio_group(other),
        );

        let reachable = tab_reachable(&tree, None, FocusableOptions::default());
        assert_eq!(reachable, vec![r2, o1, o2]);
        assert!(!is_tab_reachable(&tree, r1));
        assert!(!is_tab_reachable(&tree, r3));
        // Unreachable radios are still focusable by pointer.
        assert!(tree.is_focusable(r1));
    }

    #[test]
    fn no_scopes_wraps_without_gap() {
        let mut tree = ElementTree::new();
        let root = tree.insert(None, ElementProps::default());
        let a = tree.insert(Some(root), button());
        let _b = tree.insert(Some(root), button());

        let groups = current_tab_groups(&tree, &ScopeGroups::default());
        assert_eq!(
            groups,
            vec![TabGroup {
                first_reachable: a,
                first: None,
                last: None,
            }]
        );
    }

    #[test]
    fn exclude_scope_splits_groups() {
        let mut tree = ElementTree::new();
        let root = tree.insert(None, ElementProps::default());
        let a = tree.insert(Some(root), button());
        let excluded = tree.insert(Some(root), ElementProps::default());
        let _x1 = tree.insert(Some(excluded), button());
        let _x2 = tree.insert(Some(excluded), button());
        let b = tree.insert(Some(root), button());
        let c = tree.insert(Some(root), button());

        let scopes = ScopeGroups {
            exclude: [excluded].into_iter().collect(),
            ..ScopeGroups::default()
        };
        let groups = current_tab_groups(&tree, &scopes);
        assert_eq!(
            groups,
            vec![
                TabGroup {
                    first_reachable: a,
                    first: None,
                    last: Some(a),
                },
                TabGroup {
                    first_reachable: b,
                    first: Some(b),
                    last: None,
                },
            ]
        );
        let _ = c;
    }

    #[test]
    fn contain_scope_never_leaks_outside() {
        let mut tree = ElementTree::new();
        let root = tree.insert(None, ElementProps::default());
        let before = tree.insert(Some(root), button());
        let dialog = tree.insert(Some(root), ElementProps::default());
        let ok = tree.insert(Some(dialog), button());
        let cancel = tree.insert(Some(dialog), button());
        let after = tree.insert(Some(root), button());

        let scopes = ScopeGroups {
            contain: [dialog].into_iter().collect(),
            ..ScopeGroups::default()
        };
        let groups = current_tab_groups(&tree, &scopes);
        for group in &groups {
            for id in [Some(group.first_reachable), group.first, group.last]
                .into_iter()
                .flatten()
            {
                assert!(tree.contains(dialog, id), "group escaped the dialog");
                assert_ne!(id, before);
                assert_ne!(id, after);
            }
        }
        // A single contain root keeps its boundary markers: wrapping is handled by the
        // interception layer rather than left to default traversal.
        assert_eq!(
            groups,
            vec![TabGroup {
                first_reachable: ok,
                first: Some(ok),
                last: Some(cancel),
            }]
        );
    }

    #[test]
    fn nested_contain_roots_require_all() {
        let mut tree = ElementTree::new();
        let root = tree.insert(None, ElementProps::default());
        let outer = tree.insert(Some(root), ElementProps::default());
        let outer_btn = tree.insert(Some(outer), button());
        let inner = tree.insert(Some(outer), ElementProps::default());
        let inner_btn = tree.insert(Some(inner), button());

        let scopes = ScopeGroups {
            contain: [outer, inner].into_iter().collect(),
            ..ScopeGroups::default()
        };
        let groups = current_tab_groups(&tree, &scopes);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].first_reachable, inner_btn);
        assert!(!scopes.is_reachable(&tree, outer_btn));
    }
}
