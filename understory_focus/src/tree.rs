// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element tree: the host-side view of the visual tree that focus logic inspects.
//!
//! The tree stores structure (parent/children in source order), per-element focus
//! properties ([`ElementProps`]), geometry, and the single focused element. It plays the
//! role a DOM plays for a browser toolkit: focus scopes and menus query it, and move
//! focus through [`ElementTree::focus`], but never own it.

use alloc::{vec, vec::Vec};
use kurbo::Rect;

use crate::FocusSymbol;

/// Identifier for an element in the tree (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Element state that affects focusability.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Element is disabled and cannot take focus.
        const DISABLED  = 0b0000_0001;
        /// Element is not rendered (`display: none`); applies to the whole subtree.
        const HIDDEN    = 0b0000_0010;
        /// Element is rendered but invisible (`visibility: hidden`); inherited by descendants.
        const INVISIBLE = 0b0000_0100;
        /// Checkable element (radio, checkbox) is checked.
        const CHECKED   = 0b0000_1000;
    }
}

/// What kind of element this is, as far as focus is concerned.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Generic container; focusable only with an explicit tab index.
    #[default]
    Container,
    /// Push button.
    Button,
    /// Hyperlink with a target.
    Link,
    /// Single-line text input.
    TextInput,
    /// Multi-line text input.
    TextArea,
    /// Drop-down selector.
    Select,
    /// Checkbox input.
    Checkbox,
    /// Radio input; see [`ElementProps::radio_group`].
    Radio,
    /// Content-editable region.
    Editable,
}

impl ElementKind {
    /// Whether elements of this kind take focus without an explicit tab index.
    pub const fn is_natively_focusable(self) -> bool {
        !matches!(self, Self::Container)
    }

    /// Whether focusing elements of this kind can select their text.
    pub const fn is_text_entry(self) -> bool {
        matches!(self, Self::TextInput | Self::TextArea | Self::Editable)
    }
}

/// Per-element properties provided by the host.
#[derive(Clone, Debug, Default)]
pub struct ElementProps {
    /// Kind of element.
    pub kind: ElementKind,
    /// Explicit tab index.
    ///
    /// `None` uses the kind's default (0 for natively focusable kinds, not focusable for
    /// containers). Negative values make an element focusable but not tab-reachable.
    pub tab_index: Option<i32>,
    /// Radio group name; only meaningful for [`ElementKind::Radio`].
    pub radio_group: Option<FocusSymbol>,
    /// State flags.
    pub flags: ElementFlags,
    /// Bounds in viewport coordinates.
    pub bounds: Rect,
}

impl ElementProps {
    /// Properties for an element of `kind` with defaults for everything else.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Set an explicit tab index.
    pub fn with_tab_index(mut self, tab_index: i32) -> Self {
        self.tab_index = Some(tab_index);
        self
    }

    /// Set state flags.
    pub fn with_flags(mut self, flags: ElementFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set bounds.
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    /// Put a radio input into a named group.
    pub fn in_radio_group(mut self, group: FocusSymbol) -> Self {
        self.radio_group = Some(group);
        self
    }
}

/// Options for [`ElementTree::focus`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FocusOptions {
    /// Select all text when the target is a text entry.
    pub select_all: bool,
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    props: ElementProps,
}

/// Arena of elements with source-ordered children and a single focus slot.
///
/// ```rust
/// use understory_focus::{ElementKind, ElementProps, ElementTree, FocusOptions};
///
/// let mut tree = ElementTree::new();
/// let form = tree.insert(None, ElementProps::default());
/// let name = tree.insert(Some(form), ElementProps::new(ElementKind::TextInput));
///
/// assert!(tree.contains(form, name));
/// assert!(tree.focus(name, FocusOptions { select_all: true }));
/// assert_eq!(tree.focused(), Some(name));
/// assert!(tree.has_select_all(name));
///
/// // Containers are not focusable without a tab index.
/// assert!(!tree.focus(form, FocusOptions::default()));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ElementTree {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    roots: Vec<ElementId>,
    focused: Option<ElementId>,
    select_all: bool,
}

impl ElementTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new element as the last child of `parent` (or as a new root if `None`).
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn insert(&mut self, parent: Option<ElementId>, props: ElementProps) -> ElementId {
        if let Some(p) = parent {
            assert!(self.is_alive(p), "dangling parent ElementId");
        }
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            (idx, generation)
        } else {
            self.nodes.push(None);
            self.generations.push(1);
            (self.nodes.len() - 1, 1)
        };
        self.nodes[idx] = Some(Node {
            generation,
            parent,
            children: Vec::new(),
            props,
        });
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ElementId uses 32-bit indices by design."
        )]
        let id = ElementId::new(idx as u32, generation);
        match parent {
            Some(p) => self.node_mut(p).children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Remove an element and its subtree.
    ///
    /// Focus inside the removed subtree is dropped.
    pub fn remove(&mut self, id: ElementId) {
        if !self.is_alive(id) {
            return;
        }
        match self.node(id).parent {
            Some(parent) => self.node_mut(parent).children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if self.focused == Some(cur) {
                self.focused = None;
                self.select_all = false;
            }
            if let Some(node) = self.nodes[cur.idx()].take() {
                stack.extend(node.children);
                self.free_list.push(cur.idx());
            }
        }
    }

    /// Returns true if `id` refers to a live element.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    /// Properties of a live element.
    pub fn props(&self, id: ElementId) -> Option<&ElementProps> {
        self.node_opt(id).map(|n| &n.props)
    }

    /// Mutable properties of a live element.
    pub fn props_mut(&mut self, id: ElementId) -> Option<&mut ElementProps> {
        self.node_opt_mut(id).map(|n| &mut n.props)
    }

    /// Flags of a live element.
    pub fn flags(&self, id: ElementId) -> Option<ElementFlags> {
        self.props(id).map(|p| p.flags)
    }

    /// Replace the flags of a live element.
    pub fn set_flags(&mut self, id: ElementId, flags: ElementFlags) {
        if let Some(p) = self.props_mut(id) {
            p.flags = flags;
        }
    }

    /// Bounds of a live element.
    pub fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.props(id).map(|p| p.bounds)
    }

    /// Replace the bounds of a live element.
    pub fn set_bounds(&mut self, id: ElementId, bounds: Rect) {
        if let Some(p) = self.props_mut(id) {
            p.bounds = bounds;
        }
    }

    /// Parent of a live element, or `None` for roots and stale ids.
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Children of a live element in source order, or an empty slice for stale ids.
    pub fn children_of(&self, id: ElementId) -> &[ElementId] {
        self.node_opt(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Root elements in insertion order.
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// Iterate the strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        core::iter::successors(self.parent_of(id), move |&cur| self.parent_of(cur))
    }

    /// Whether `node` is `ancestor` or one of its descendants. False if either is stale.
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        if !self.is_alive(ancestor) || !self.is_alive(node) {
            return false;
        }
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Deepest element that contains every element of `ids`.
    ///
    /// Returns `None` when `ids` is empty, any id is stale, or the ids live under
    /// different roots.
    pub fn lowest_common_ancestor(&self, ids: &[ElementId]) -> Option<ElementId> {
        let (&first, rest) = ids.split_first()?;
        if !self.is_alive(first) {
            return None;
        }
        // Inclusive chain from `first` up to its root; candidates shrink toward the root.
        let mut chain: Vec<ElementId> = core::iter::once(first)
            .chain(self.ancestors(first))
            .collect();
        for &id in rest {
            if !self.is_alive(id) {
                return None;
            }
            let pos = core::iter::once(id)
                .chain(self.ancestors(id))
                .find_map(|a| chain.iter().position(|&c| c == a))?;
            chain = chain.split_off(pos);
        }
        chain.first().copied()
    }

    /// Elements under `root` in document (pre-)order.
    pub fn descendants(&self, root: ElementId, include_root: bool) -> Vec<ElementId> {
        let mut out = Vec::new();
        if !self.is_alive(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id != root || include_root {
                out.push(id);
            }
            // Reverse so children are visited in source order.
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// Every live element in document order, roots in insertion order.
    pub fn document_order(&self) -> Vec<ElementId> {
        self.roots
            .iter()
            .flat_map(|&r| self.descendants(r, true))
            .collect()
    }

    /// Whether the element and all its ancestors are rendered and visible.
    pub fn is_rendered(&self, id: ElementId) -> bool {
        let hidden = ElementFlags::HIDDEN | ElementFlags::INVISIBLE;
        self.is_alive(id)
            && core::iter::once(id)
                .chain(self.ancestors(id))
                .all(|a| !self.node(a).props.flags.intersects(hidden))
    }

    /// Whether the element can receive focus at all (by pointer or programmatically).
    pub fn is_focusable(&self, id: ElementId) -> bool {
        let Some(props) = self.props(id) else {
            return false;
        };
        !props.flags.contains(ElementFlags::DISABLED)
            && (props.kind.is_natively_focusable() || props.tab_index.is_some())
            && self.is_rendered(id)
    }

    /// Currently focused element.
    pub fn focused(&self) -> Option<ElementId> {
        self.focused.filter(|&f| self.is_alive(f))
    }

    /// Move focus to `id`. Returns `false` (and leaves focus unchanged) if it is not focusable.
    pub fn focus(&mut self, id: ElementId, options: FocusOptions) -> bool {
        if !self.is_focusable(id) {
            return false;
        }
        self.focused = Some(id);
        self.select_all = options.select_all && self.node(id).props.kind.is_text_entry();
        true
    }

    /// Drop focus.
    pub fn blur(&mut self) {
        self.focused = None;
        self.select_all = false;
    }

    /// Whether `id` is focused with all of its text selected.
    pub fn has_select_all(&self, id: ElementId) -> bool {
        self.focused() == Some(id) && self.select_all
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale.
    fn node(&self, id: ElementId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling ElementId")
    }

    /// Access a node mutably; panics if `id` is stale.
    fn node_mut(&mut self, id: ElementId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling ElementId")
    }

    fn node_opt(&self, id: ElementId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_opt_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }
}
