// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Rect, Vec2};

use super::{ContainerLayer, PaintContext, PrerollContext, impl_children};
use crate::embedder::Mutator;
use crate::geometry;
use crate::paint::Paint;
use crate::scene::SceneUpdateContext;
use crate::transform::Transform3d;

/// Composites its children as a group with uniform opacity.
///
/// The children are positioned at `offset`. When the subtree contains no
/// platform view it is a raster cache candidate: once cached, paint blits
/// the image with the opacity applied instead of opening a save layer.
#[derive(Debug)]
pub struct OpacityLayer {
    opacity: f32,
    offset: Vec2,
    pub(crate) container: ContainerLayer,
}

impl OpacityLayer {
    /// Creates an opacity layer. `opacity` is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(opacity: f32, offset: Vec2) -> Self {
        Self {
            opacity: if opacity.is_nan() {
                0.0
            } else {
                opacity.clamp(0.0, 1.0)
            },
            offset,
            container: ContainerLayer::new(),
        }
    }

    /// Group opacity.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Offset applied to the children.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Children's extent in their own (unoffset) coordinates.
    fn child_bounds(&self) -> Rect {
        geometry::offset(self.container.base.paint_bounds, -self.offset)
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        let child_matrix = matrix.pre_translate(self.offset.x, self.offset.y);

        let previous_cull = ctx.cull_rect;
        let had_platform_view = ctx.has_platform_view;
        ctx.cull_rect = geometry::offset(previous_cull, -self.offset);
        ctx.has_platform_view = false;
        ctx.mutators
            .push(Mutator::Transform(Transform3d::from_translation(
                self.offset.x,
                self.offset.y,
            )));
        ctx.mutators.push(Mutator::Opacity(self.opacity));

        let child_bounds = self.container.preroll_children(ctx, &child_matrix);

        ctx.mutators.pop();
        ctx.mutators.pop();
        let subtree_has_platform_view = ctx.has_platform_view;
        ctx.has_platform_view = had_platform_view || subtree_has_platform_view;
        ctx.cull_rect = previous_cull;

        self.container.base.paint_bounds = geometry::offset(child_bounds, self.offset);

        if !subtree_has_platform_view
            && self.opacity > 0.0
            && geometry::intersects(previous_cull, self.container.base.paint_bounds)
        {
            let id = self.container.base.id;
            super::prepare_layer_cache(ctx, id, &self.container, child_bounds, &child_matrix);
        }
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        if self.opacity <= 0.0 {
            return;
        }
        let child_bounds = self.child_bounds();
        let paint = Paint::default().with_opacity(self.opacity);

        ctx.canvas.save();
        ctx.canvas.translate(self.offset);
        let cached = match ctx.raster_cache.as_deref_mut() {
            Some(cache) => cache.draw_layer(
                self.container.base.id,
                child_bounds,
                ctx.canvas,
                Some(&paint),
                &mut ctx.tracer,
            ),
            None => false,
        };
        if !cached {
            super::paint_in_save_layer(ctx, child_bounds, &paint, |ctx| {
                self.container.paint_children(ctx);
            });
        }
        ctx.canvas.restore();
    }

    pub(crate) fn update_scene(&self, scene: &mut dyn SceneUpdateContext) {
        scene.push_opacity(self.opacity, self.offset);
        self.container.update_scene_children(scene);
        scene.pop();
    }
}

impl_children!(OpacityLayer);
