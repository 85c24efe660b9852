// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{ContainerLayer, PaintContext, PrerollContext, impl_children};
use crate::embedder::Mutator;
use crate::geometry;
use crate::scene::SceneUpdateContext;
use crate::transform::Transform3d;

/// Applies a matrix to its children.
#[derive(Debug)]
pub struct TransformLayer {
    transform: Transform3d,
    pub(crate) container: ContainerLayer,
}

impl TransformLayer {
    /// Creates a transform layer with no children.
    #[must_use]
    pub fn new(transform: Transform3d) -> Self {
        Self {
            transform,
            container: ContainerLayer::new(),
        }
    }

    /// The layer's matrix.
    #[must_use]
    pub fn transform(&self) -> &Transform3d {
        &self.transform
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        if !self.transform.is_finite() {
            self.container.cull_children();
            self.container.base.paint_bounds = geometry::EMPTY_RECT;
            return;
        }
        let child_matrix = *matrix * self.transform;

        let previous_cull = ctx.cull_rect;
        ctx.cull_rect = match self.transform.invert() {
            Some(inverse) => {
                let mapped = inverse.map_rect(previous_cull);
                if geometry::is_empty(mapped) {
                    geometry::GIANT_RECT
                } else {
                    mapped
                }
            }
            None => geometry::GIANT_RECT,
        };
        ctx.mutators.push(Mutator::Transform(self.transform));
        let child_bounds = self.container.preroll_children(ctx, &child_matrix);
        ctx.mutators.pop();
        ctx.cull_rect = previous_cull;

        self.container.base.paint_bounds = self.transform.map_rect(child_bounds);
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        ctx.canvas.save();
        ctx.canvas.concat(&self.transform);
        self.container.paint_children(ctx);
        ctx.canvas.restore();
    }

    pub(crate) fn update_scene(&self, scene: &mut dyn SceneUpdateContext) {
        scene.push_transform(&self.transform);
        self.container.update_scene_children(scene);
        scene.pop();
    }
}

impl_children!(TransformLayer);
