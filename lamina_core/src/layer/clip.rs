// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip layers.
//!
//! The three clip variants differ only in their geometry, so they share one
//! generic [`ClipLayer`] parameterized by a [`ClipShape`].

use kurbo::{BezPath, Rect, RoundedRect, Shape};

use super::{ContainerLayer, Layer, LayerId, PaintContext, PrerollContext};
use crate::canvas::Canvas;
use crate::embedder::Mutator;
use crate::geometry;
use crate::paint::{Clip, Paint};
use crate::scene::{SceneClip, SceneUpdateContext};
use crate::transform::Transform3d;

/// Geometry a [`ClipLayer`] clips to.
pub trait ClipShape: core::fmt::Debug + Send {
    /// Axis-aligned bounds of the shape.
    fn clip_bounds(&self) -> Rect;

    /// Intersects the canvas clip with the shape.
    fn apply(&self, canvas: &mut dyn Canvas, anti_alias: bool);

    /// The shape as a platform view mutator.
    fn mutator(&self) -> Mutator;

    /// The shape as a scene clip.
    fn scene_clip(&self) -> SceneClip<'_>;
}

impl ClipShape for Rect {
    fn clip_bounds(&self) -> Rect {
        geometry::sanitize(*self)
    }

    fn apply(&self, canvas: &mut dyn Canvas, anti_alias: bool) {
        canvas.clip_rect(*self, anti_alias);
    }

    fn mutator(&self) -> Mutator {
        Mutator::ClipRect(*self)
    }

    fn scene_clip(&self) -> SceneClip<'_> {
        SceneClip::Rect(*self)
    }
}

impl ClipShape for RoundedRect {
    fn clip_bounds(&self) -> Rect {
        geometry::sanitize(self.rect())
    }

    fn apply(&self, canvas: &mut dyn Canvas, anti_alias: bool) {
        canvas.clip_rrect(*self, anti_alias);
    }

    fn mutator(&self) -> Mutator {
        Mutator::ClipRRect(*self)
    }

    fn scene_clip(&self) -> SceneClip<'_> {
        SceneClip::RRect(*self)
    }
}

impl ClipShape for BezPath {
    fn clip_bounds(&self) -> Rect {
        geometry::sanitize(self.bounding_box())
    }

    fn apply(&self, canvas: &mut dyn Canvas, anti_alias: bool) {
        canvas.clip_path(self, anti_alias);
    }

    fn mutator(&self) -> Mutator {
        Mutator::ClipPath(self.clone())
    }

    fn scene_clip(&self) -> SceneClip<'_> {
        SceneClip::Path(self)
    }
}

/// Restricts its children to a shape.
#[derive(Debug)]
pub struct ClipLayer<S> {
    shape: S,
    clip_behavior: Clip,
    pub(crate) container: ContainerLayer,
}

/// Clips to a rectangle.
pub type ClipRectLayer = ClipLayer<Rect>;
/// Clips to a rounded rectangle.
pub type ClipRRectLayer = ClipLayer<RoundedRect>;
/// Clips to a path.
pub type ClipPathLayer = ClipLayer<BezPath>;

impl<S: ClipShape> ClipLayer<S> {
    /// Creates a clip layer with no children.
    ///
    /// [`Clip::None`] is accepted but clips nothing; debug builds assert
    /// against it.
    #[must_use]
    pub fn new(shape: S, clip_behavior: Clip) -> Self {
        debug_assert!(
            clip_behavior != Clip::None,
            "clip layer created with Clip::None"
        );
        Self {
            shape,
            clip_behavior,
            container: ContainerLayer::new(),
        }
    }

    /// The clip geometry.
    #[must_use]
    pub fn shape(&self) -> &S {
        &self.shape
    }

    /// How edges are treated.
    #[must_use]
    pub fn clip_behavior(&self) -> Clip {
        self.clip_behavior
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        if self.clip_behavior == Clip::None {
            self.container.preroll(ctx, matrix);
            return;
        }
        let clip_bounds = self.shape.clip_bounds();
        if !geometry::intersects(ctx.cull_rect, clip_bounds) {
            self.container.cull_children();
            self.container.base.paint_bounds = geometry::EMPTY_RECT;
            return;
        }

        let previous_cull = ctx.cull_rect;
        ctx.cull_rect = geometry::intersect(previous_cull, clip_bounds);
        ctx.mutators.push(self.shape.mutator());
        let child_bounds = self.container.preroll_children(ctx, matrix);
        ctx.mutators.pop();
        ctx.cull_rect = previous_cull;

        self.container.base.paint_bounds = geometry::intersect(child_bounds, clip_bounds);
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        if self.clip_behavior == Clip::None {
            self.container.paint_children(ctx);
            return;
        }
        ctx.canvas.save();
        self.shape
            .apply(ctx.canvas, self.clip_behavior.is_anti_alias());
        if self.clip_behavior.needs_save_layer() {
            let bounds = self.container.base.paint_bounds;
            super::paint_in_save_layer(ctx, bounds, &Paint::default(), |ctx| {
                self.container.paint_children(ctx);
            });
        } else {
            self.container.paint_children(ctx);
        }
        ctx.canvas.restore();
    }

    pub(crate) fn update_scene(&self, scene: &mut dyn SceneUpdateContext) {
        if self.clip_behavior == Clip::None {
            self.container.update_scene_children(scene);
            return;
        }
        scene.push_clip(self.shape.scene_clip(), self.clip_behavior);
        self.container.update_scene_children(scene);
        scene.pop();
    }

    /// Appends a child, returning `self` for chaining.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Layer>) -> Self {
        self.container.add(child);
        self
    }

    /// Appends a child.
    pub fn add(&mut self, child: impl Into<Layer>) {
        self.container.add(child);
    }

    /// Child layers in paint order.
    #[must_use]
    pub fn children(&self) -> &[Layer] {
        self.container.children()
    }

    /// This layer's identity.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.container.base.id
    }
}
