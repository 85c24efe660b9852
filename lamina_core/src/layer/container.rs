// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use kurbo::Rect;

use super::{Layer, LayerBase, LayerId, PaintContext, PrerollContext};
use crate::geometry;
use crate::scene::SceneUpdateContext;
use crate::transform::Transform3d;

/// An ordered group of child layers.
///
/// Every modifier layer wraps one of these for its children.
#[derive(Debug, Default)]
pub struct ContainerLayer {
    pub(crate) base: LayerBase,
    children: Vec<Layer>,
}

impl ContainerLayer {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child, returning `self` for chaining.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Layer>) -> Self {
        self.add(child);
        self
    }

    /// Appends a child.
    pub fn add(&mut self, child: impl Into<Layer>) {
        self.children.push(child.into());
    }

    /// Child layers in paint order.
    #[must_use]
    pub fn children(&self) -> &[Layer] {
        &self.children
    }

    /// This layer's identity.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.base.id
    }

    /// Replaces the generated id.
    #[must_use]
    pub fn with_id(mut self, id: LayerId) -> Self {
        self.base.id = id;
        self
    }

    /// Prerolls every child under `matrix` and returns the union of their
    /// paint bounds.
    pub fn preroll_children(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) -> Rect {
        let mut bounds = geometry::EMPTY_RECT;
        for child in &mut self.children {
            child.preroll(ctx, matrix);
            bounds = geometry::join(bounds, child.paint_bounds());
        }
        bounds
    }

    /// Paints every child that needs painting, in order.
    pub fn paint_children(&self, ctx: &mut PaintContext<'_>) {
        for child in &self.children {
            if child.needs_painting() {
                child.paint(ctx);
            }
        }
    }

    pub(crate) fn update_scene_children(&self, scene: &mut dyn SceneUpdateContext) {
        for child in &self.children {
            child.update_scene(scene);
        }
    }

    /// Marks every child as culled so a later paint skips them.
    pub(crate) fn cull_children(&mut self) {
        for child in &mut self.children {
            child.base_mut().cull();
        }
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        self.base.paint_bounds = self.preroll_children(ctx, matrix);
    }
}
