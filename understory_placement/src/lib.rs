// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Placement: position floating boxes next to an anchor, inside a viewport.
//!
//! [`place`] is a pure function from an anchor rectangle, the size of the box to place,
//! the viewport size, and a [`Placement`] request to the box's top-left corner.
//!
//! Two axes are solved independently:
//!
//! - **Attachment axis**: the box sits on the requested [`Side`] of the anchor. If it does
//!   not fit there and the opposite side does (and flipping is allowed), it flips.
//!   Otherwise it stays on the requested side and is clamped, accepting overflow.
//! - **Alignment axis**: the box grows in the writing direction from the anchor's leading
//!   edge (left edge for LTR, right edge for RTL). If that does not fit it tries the other
//!   direction, then clamps.
//!
//! The result is always clamped to `[0, viewport - size]` on both axes (or `0` when the box
//! is larger than the viewport), and non-finite or negative inputs are treated as zero, so
//! the output never contains `NaN` or infinities.
//!
//! Submenus use [`submenu_placement`] to keep growing in the same horizontal direction as
//! their parent, so a chain of submenus does not zig-zag across the screen.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Point, Rect, Size};
//! use understory_placement::{HorizontalGrowth, Placement, Side, TextDirection, place};
//!
//! let viewport = Size::new(800.0, 600.0);
//! let menu = Size::new(150.0, 200.0);
//!
//! // A menu button near the bottom of the window: the menu flips above it.
//! let anchor = Rect::new(100.0, 500.0, 200.0, 520.0);
//! let placed = place(anchor, menu, viewport, Placement::below(TextDirection::Ltr));
//! assert_eq!(placed.side, Side::Above);
//! assert_eq!(placed.origin, Point::new(100.0, 300.0));
//! assert_eq!(placed.growth, HorizontalGrowth::Rightward);
//! ```
//!
//! This crate is `no_std`.

#![no_std]

use kurbo::{Point, Rect, Size};

/// Side of the anchor a box is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Below the anchor (root menus, dropdowns).
    Below,
    /// Above the anchor.
    Above,
    /// To the right of the anchor (submenus in LTR).
    Right,
    /// To the left of the anchor (submenus in RTL).
    Left,
}

impl Side {
    /// The side across the anchor from this one.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Below => Self::Above,
            Self::Above => Self::Below,
            Self::Right => Self::Left,
            Self::Left => Self::Right,
        }
    }

    /// Whether the attachment axis is vertical.
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Below | Self::Above)
    }
}

/// Writing direction used to pick the preferred alignment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextDirection {
    /// Left-to-right.
    #[default]
    Ltr,
    /// Right-to-left.
    Rtl,
}

/// Horizontal direction in which a placed box extends away from its anchor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HorizontalGrowth {
    /// The box extends to the right.
    Rightward,
    /// The box extends to the left.
    Leftward,
}

impl HorizontalGrowth {
    /// Natural growth for a writing direction.
    pub const fn for_direction(direction: TextDirection) -> Self {
        match direction {
            TextDirection::Ltr => Self::Rightward,
            TextDirection::Rtl => Self::Leftward,
        }
    }
}

/// A placement request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Preferred side of the anchor.
    pub side: Side,
    /// Writing direction; selects the preferred alignment.
    pub direction: TextDirection,
    /// Whether the box may move to the opposite side when the preferred side is too small.
    pub allow_flip: bool,
}

impl Placement {
    /// Request placement on `side`, allowing flips.
    pub const fn new(side: Side, direction: TextDirection) -> Self {
        Self {
            side,
            direction,
            allow_flip: true,
        }
    }

    /// Dropdown-style placement below the anchor.
    pub const fn below(direction: TextDirection) -> Self {
        Self::new(Side::Below, direction)
    }

    /// Placement beside the anchor in the given horizontal growth direction.
    pub const fn beside(growth: HorizontalGrowth, direction: TextDirection) -> Self {
        let side = match growth {
            HorizontalGrowth::Rightward => Side::Right,
            HorizontalGrowth::Leftward => Side::Left,
        };
        Self::new(side, direction)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::below(TextDirection::Ltr)
    }
}

/// Result of [`place`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placed {
    /// Top-left corner of the placed box, in viewport coordinates.
    pub origin: Point,
    /// Side of the anchor the box ended up on (after any flip).
    pub side: Side,
    /// Horizontal direction the box extends in, used to orient nested submenus.
    pub growth: HorizontalGrowth,
}

impl Placed {
    /// The placed box as a rectangle of the given size.
    pub fn rect(&self, size: Size) -> Rect {
        Rect::from_origin_size(self.origin, size)
    }
}

/// Placement for a submenu whose parent menu was placed as `parent`.
///
/// The submenu keeps the parent's horizontal growth; a root menu with no horizontal
/// attachment passes on the growth chosen by its alignment.
pub fn submenu_placement(parent: &Placed, direction: TextDirection) -> Placement {
    Placement::beside(parent.growth, direction)
}

/// Place a box of `size` next to `anchor` inside a viewport of `viewport`.
///
/// See the [crate docs](crate) for the rules. This function is total: degenerate inputs
/// (zero-size viewport, non-finite anchor, negative sizes) still produce a finite,
/// in-range origin.
pub fn place(anchor: Rect, size: Size, viewport: Size, placement: Placement) -> Placed {
    let anchor = sanitize_rect(anchor);
    let size = sanitize_size(size);
    let viewport = sanitize_size(viewport);

    if placement.side.is_vertical() {
        let (y, after) = attach(
            anchor.y0,
            anchor.y1,
            size.height,
            viewport.height,
            placement.side == Side::Below,
            placement.allow_flip,
        );
        let (x, forward) = align(
            anchor.x0,
            anchor.x1,
            size.width,
            viewport.width,
            placement.direction == TextDirection::Ltr,
        );
        Placed {
            origin: Point::new(x, y),
            side: if after { Side::Below } else { Side::Above },
            growth: if forward {
                HorizontalGrowth::Rightward
            } else {
                HorizontalGrowth::Leftward
            },
        }
    } else {
        let (x, after) = attach(
            anchor.x0,
            anchor.x1,
            size.width,
            viewport.width,
            placement.side == Side::Right,
            placement.allow_flip,
        );
        // Beside the anchor, boxes always prefer to grow downward from its top edge.
        let (y, _) = align(anchor.y0, anchor.y1, size.height, viewport.height, true);
        let (side, growth) = if after {
            (Side::Right, HorizontalGrowth::Rightward)
        } else {
            (Side::Left, HorizontalGrowth::Leftward)
        };
        Placed {
            origin: Point::new(x, y),
            side,
            growth,
        }
    }
}

/// Clamp `pos` so that `[pos, pos + len]` lies within `[0, extent]` where possible.
///
/// When `len > extent` the result is `0`. Non-finite positions map to `0`.
pub fn clamp_axis(pos: f64, len: f64, extent: f64) -> f64 {
    if !pos.is_finite() {
        return 0.0;
    }
    let max = finite_or_zero(extent - len).max(0.0);
    pos.clamp(0.0, max)
}

/// Solve the attachment axis. Returns the position and whether the box is after the anchor.
fn attach(start: f64, end: f64, len: f64, extent: f64, after: bool, allow_flip: bool) -> (f64, bool) {
    let after_pos = end;
    let before_pos = start - len;
    let (preferred, alternate) = if after {
        (after_pos, before_pos)
    } else {
        (before_pos, after_pos)
    };
    if fits(preferred, len, extent) {
        (preferred, after)
    } else if allow_flip && fits(alternate, len, extent) {
        (alternate, !after)
    } else {
        (clamp_axis(preferred, len, extent), after)
    }
}

/// Solve the alignment axis. Returns the position and whether the box grows forward.
fn align(start: f64, end: f64, len: f64, extent: f64, forward: bool) -> (f64, bool) {
    let forward_pos = start;
    let backward_pos = end - len;
    let (preferred, alternate) = if forward {
        (forward_pos, backward_pos)
    } else {
        (backward_pos, forward_pos)
    };
    if fits(preferred, len, extent) {
        (preferred, forward)
    } else if fits(alternate, len, extent) {
        (alternate, !forward)
    } else {
        (clamp_axis(preferred, len, extent), forward)
    }
}

fn fits(pos: f64, len: f64, extent: f64) -> bool {
    pos >= 0.0 && pos + len <= extent
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn sanitize_size(size: Size) -> Size {
    Size::new(
        finite_or_zero(size.width).max(0.0),
        finite_or_zero(size.height).max(0.0),
    )
}

fn sanitize_rect(rect: Rect) -> Rect {
    Rect::new(
        finite_or_zero(rect.x0),
        finite_or_zero(rect.y0),
        finite_or_zero(rect.x1),
        finite_or_zero(rect.y1),
    )
    .abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size::new(800.0, 600.0);

    fn in_range(placed: &Placed, size: Size, viewport: Size) -> bool {
        let max_x = (viewport.width - size.width).max(0.0);
        let max_y = (viewport.height - size.height).max(0.0);
        placed.origin.x >= 0.0
            && placed.origin.y >= 0.0
            && placed.origin.x <= max_x
            && placed.origin.y <= max_y
    }

    #[test]
    fn below_when_it_fits() {
        let anchor = Rect::new(100.0, 100.0, 200.0, 120.0);
        let placed = place(
            anchor,
            Size::new(150.0, 200.0),
            VIEWPORT,
            Placement::below(TextDirection::Ltr),
        );
        assert_eq!(placed.origin, Point::new(100.0, 120.0));
        assert_eq!(placed.side, Side::Below);
        assert_eq!(placed.growth, HorizontalGrowth::Rightward);
    }

    #[test]
    fn flips_only_when_allowed() {
        let anchor = Rect::new(100.0, 500.0, 200.0, 520.0);
        let size = Size::new(150.0, 200.0);

        let flipped = place(anchor, size, VIEWPORT, Placement::below(TextDirection::Ltr));
        assert_eq!(flipped.side, Side::Above);
        assert_eq!(flipped.origin.y, 300.0);

        let pinned = place(
            anchor,
            size,
            VIEWPORT,
            Placement {
                allow_flip: false,
                ..Placement::below(TextDirection::Ltr)
            },
        );
        assert_eq!(pinned.side, Side::Below);
        assert_eq!(pinned.origin.y, 400.0, "clamped to viewport - size");
    }

    #[test]
    fn clamps_when_neither_side_fits() {
        let viewport = Size::new(800.0, 250.0);
        let anchor = Rect::new(100.0, 100.0, 200.0, 120.0);
        let size = Size::new(150.0, 200.0);
        let placed = place(anchor, size, viewport, Placement::below(TextDirection::Ltr));
        assert_eq!(placed.side, Side::Below);
        assert_eq!(placed.origin.y, 50.0);
        assert!(in_range(&placed, size, viewport));
    }

    #[test]
    fn alignment_follows_writing_direction() {
        let anchor = Rect::new(600.0, 10.0, 700.0, 30.0);
        let size = Size::new(150.0, 100.0);

        let rtl = place(anchor, size, VIEWPORT, Placement::below(TextDirection::Rtl));
        assert_eq!(rtl.origin.x, 550.0);
        assert_eq!(rtl.growth, HorizontalGrowth::Leftward);

        // LTR near the right edge falls back to growing leftward.
        let edge = Rect::new(700.0, 10.0, 780.0, 30.0);
        let ltr = place(edge, size, VIEWPORT, Placement::below(TextDirection::Ltr));
        assert_eq!(ltr.origin.x, 630.0);
        assert_eq!(ltr.growth, HorizontalGrowth::Leftward);
    }

    #[test]
    fn submenu_flips_left_at_the_edge() {
        let item = Rect::new(600.0, 100.0, 750.0, 120.0);
        let size = Size::new(150.0, 100.0);
        let placed = place(
            item,
            size,
            VIEWPORT,
            Placement::beside(HorizontalGrowth::Rightward, TextDirection::Ltr),
        );
        assert_eq!(placed.side, Side::Left);
        assert_eq!(placed.origin, Point::new(450.0, 100.0));
        assert_eq!(placed.growth, HorizontalGrowth::Leftward);

        // Its own submenu keeps growing leftward even though the right side has room.
        let nested_anchor = Rect::new(450.0, 140.0, 600.0, 160.0);
        let nested = place(
            nested_anchor,
            size,
            VIEWPORT,
            submenu_placement(&placed, TextDirection::Ltr),
        );
        assert_eq!(nested.side, Side::Left);
        assert_eq!(nested.origin.x, 300.0);
    }

    #[test]
    fn submenu_grows_upward_near_bottom() {
        let item = Rect::new(100.0, 560.0, 250.0, 580.0);
        let size = Size::new(150.0, 100.0);
        let placed = place(
            item,
            size,
            VIEWPORT,
            Placement::beside(HorizontalGrowth::Rightward, TextDirection::Ltr),
        );
        assert_eq!(placed.origin, Point::new(250.0, 480.0));
    }

    #[test]
    fn oversized_boxes_pin_to_origin() {
        let size = Size::new(1000.0, 1000.0);
        for side in [Side::Below, Side::Above, Side::Right, Side::Left] {
            let placed = place(
                Rect::new(300.0, 300.0, 400.0, 320.0),
                size,
                VIEWPORT,
                Placement::new(side, TextDirection::Ltr),
            );
            assert_eq!(placed.origin, Point::ZERO, "side {side:?}");
        }
    }

    #[test]
    fn degenerate_inputs_stay_finite() {
        let size = Size::new(f64::NAN, 40.0);
        let placed = place(
            Rect::new(f64::NAN, f64::INFINITY, 10.0, -f64::INFINITY),
            size,
            Size::ZERO,
            Placement::below(TextDirection::Ltr),
        );
        assert!(placed.origin.x.is_finite() && placed.origin.y.is_finite());
        assert_eq!(placed.origin, Point::ZERO);

        let placed = place(
            Rect::new(50.0, 50.0, 60.0, 60.0),
            Size::new(-5.0, -5.0),
            Size::new(f64::NAN, 100.0),
            Placement::below(TextDirection::Rtl),
        );
        assert!(placed.origin.x.is_finite() && placed.origin.y.is_finite());
        assert!(in_range(&placed, Size::ZERO, Size::new(0.0, 100.0)));
    }

    #[test]
    fn clamp_axis_bounds() {
        assert_eq!(clamp_axis(-10.0, 50.0, 100.0), 0.0);
        assert_eq!(clamp_axis(80.0, 50.0, 100.0), 50.0);
        assert_eq!(clamp_axis(20.0, 150.0, 100.0), 0.0);
        assert_eq!(clamp_axis(f64::NAN, 10.0, 100.0), 0.0);
    }
}
