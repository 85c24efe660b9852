// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hooks for compositing native platform views with layer content.
//!
//! Platform views are not drawn by the compositor. During preroll each
//! [`PlatformViewLayer`](crate::layer::PlatformViewLayer) reports its view to
//! the [`ExternalViewEmbedder`] together with the accumulated
//! [`MutatorsStack`]: the clips, transforms, and opacities its ancestors
//! apply. The embedder positions the native view accordingly and, during
//! paint, gets a chance to punch a hole or draw a placeholder.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{BezPath, Rect, RoundedRect, Size};

use crate::canvas::Canvas;
use crate::transform::Transform3d;

/// Identifies a native platform view.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlatformViewId(pub i64);

impl fmt::Debug for PlatformViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlatformViewId({})", self.0)
    }
}

/// One ancestor effect that applies to a platform view.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutator {
    /// Rectangular clip in the mutator's local space.
    ClipRect(Rect),
    /// Rounded-rectangle clip.
    ClipRRect(RoundedRect),
    /// Arbitrary path clip.
    ClipPath(BezPath),
    /// Matrix applied to everything below.
    Transform(Transform3d),
    /// Group opacity in `[0, 1]`.
    Opacity(f32),
}

/// Ancestor effects from the root down to the current layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutatorsStack {
    stack: Vec<Mutator>,
}

impl MutatorsStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a mutator.
    pub fn push(&mut self, mutator: Mutator) {
        self.stack.push(mutator);
    }

    /// Pops the most recent mutator.
    pub fn pop(&mut self) -> Option<Mutator> {
        self.stack.pop()
    }

    /// Mutators from root to leaf.
    pub fn iter(&self) -> impl Iterator<Item = &Mutator> {
        self.stack.iter()
    }

    /// Number of mutators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if there are no mutators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Product of all opacity mutators.
    #[must_use]
    pub fn effective_opacity(&self) -> f32 {
        self.stack
            .iter()
            .filter_map(|m| match m {
                Mutator::Opacity(a) => Some(*a),
                _ => None,
            })
            .product()
    }
}

/// Where and how a platform view should appear this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedViewParams {
    /// Matrix from the view's local space to the frame, offset included.
    pub matrix: Transform3d,
    /// Size of the view in local units.
    pub size: Size,
    /// Ancestor effects.
    pub mutators: MutatorsStack,
    /// Device-space bounds of the view before clipping.
    pub final_bounding_rect: Rect,
}

/// What the compositor should do after preroll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostPrerollResult {
    /// Continue to paint.
    #[default]
    Success,
    /// Abandon this frame and draw the same tree again, typically after a
    /// thread merge.
    ResubmitFrame,
}

/// Positions native views alongside the layer tree.
pub trait ExternalViewEmbedder {
    /// A new frame is starting.
    fn begin_frame(&mut self, frame_size: Size, device_pixel_ratio: f64);

    /// A platform view is part of this frame with the given parameters.
    fn preroll_composite_embedded_view(&mut self, view: PlatformViewId, params: EmbeddedViewParams);

    /// Called once preroll is done.
    fn post_preroll_action(&mut self) -> PostPrerollResult {
        PostPrerollResult::Success
    }

    /// Paint-time hook for a platform view. Returns `false` if the view is
    /// unknown.
    fn composite_embedded_view(&mut self, view: PlatformViewId, canvas: &mut dyn Canvas) -> bool;

    /// The frame is done.
    fn end_frame(&mut self, should_resubmit: bool) {
        _ = should_resubmit;
    }
}
