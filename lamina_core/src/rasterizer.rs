// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The raster-thread loop body: take a tree, draw it to a surface.

use alloc::boxed::Box;
use core::fmt;

use kurbo::{Rect, Size};

use crate::compositor::{CompositorContext, RasterStatus, SurfaceFrame};
use crate::embedder::ExternalViewEmbedder;
use crate::layer_tree::LayerTree;
use crate::picture::Picture;
use crate::pipeline::Consumer;
use crate::trace::Tracer;
use crate::transform::Transform3d;

/// A window or offscreen target that hands out frames.
pub trait Surface {
    /// Acquires a frame of `size` physical pixels, or `None` if the surface
    /// cannot produce one right now.
    fn acquire_frame(&mut self, size: Size) -> Option<Box<dyn SurfaceFrame + '_>>;

    /// Transform from the layer tree's root space to the surface.
    ///
    /// The compositor applies it to the frame canvas itself; frames should
    /// hand out canvases with an identity matrix.
    fn root_transformation(&self) -> Transform3d {
        Transform3d::IDENTITY
    }
}

/// Draws layer trees from a pipeline onto a [`Surface`].
///
/// Owns the [`CompositorContext`], so the raster cache and texture registry
/// persist across frames. The most recently drawn tree is kept for
/// [`screenshot`](Self::screenshot).
pub struct Rasterizer<S: Surface> {
    compositor: CompositorContext,
    surface: S,
    view_embedder: Option<Box<dyn ExternalViewEmbedder>>,
    last_tree: Option<LayerTree>,
}

impl<S: Surface> fmt::Debug for Rasterizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rasterizer")
            .field("compositor", &self.compositor)
            .field("view_embedder", &self.view_embedder.is_some())
            .field(
                "last_tree",
                &self.last_tree.as_ref().map(LayerTree::scene_version),
            )
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Rasterizer<S> {
    /// Creates a rasterizer drawing to `surface`.
    #[must_use]
    pub fn new(compositor: CompositorContext, surface: S) -> Self {
        Self {
            compositor,
            surface,
            view_embedder: None,
            last_tree: None,
        }
    }

    /// Composites platform views through `embedder`.
    #[must_use]
    pub fn with_view_embedder(mut self, embedder: Box<dyn ExternalViewEmbedder>) -> Self {
        self.view_embedder = Some(embedder);
        self
    }

    /// The compositor context.
    #[must_use]
    pub fn compositor(&self) -> &CompositorContext {
        &self.compositor
    }

    /// The compositor context, mutably.
    pub fn compositor_mut(&mut self) -> &mut CompositorContext {
        &mut self.compositor
    }

    /// The surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The surface, mutably.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The most recently drawn tree.
    #[must_use]
    pub fn last_tree(&self) -> Option<&LayerTree> {
        self.last_tree.as_ref()
    }

    /// Draws the newest tree waiting in `consumer`.
    ///
    /// Drop events the pipeline recorded since the last call are forwarded
    /// to `tracer` first. Returns `None` if no tree was waiting.
    pub fn draw(&mut self, consumer: &Consumer, tracer: &mut Tracer<'_>) -> Option<RasterStatus> {
        for event in consumer.drain_dropped() {
            tracer.frame_dropped(&event);
        }
        let tree = consumer.take()?;
        Some(self.draw_tree(tree, tracer))
    }

    /// Draws `tree`, retrying once if the embedder asks for a resubmit.
    ///
    /// A successfully drawn tree replaces the one kept for screenshots.
    pub fn draw_tree(&mut self, mut tree: LayerTree, tracer: &mut Tracer<'_>) -> RasterStatus {
        self.compositor.ui_time_mut().set_lap_time(tree.build_time());
        let mut status = self.draw_once(&mut tree, tracer);
        if status == RasterStatus::Resubmit {
            status = self.draw_once(&mut tree, tracer);
        }
        if status == RasterStatus::Success {
            self.last_tree = Some(tree);
        }
        status
    }

    fn draw_once(&mut self, tree: &mut LayerTree, tracer: &mut Tracer<'_>) -> RasterStatus {
        let size = tree.frame_size();
        if !(size.width > 0.0 && size.height > 0.0 && size.is_finite()) {
            return RasterStatus::Discarded;
        }
        let root_transformation = self.surface.root_transformation();
        let Some(surface_frame) = self.surface.acquire_frame(size) else {
            return RasterStatus::Failed;
        };
        let mut frame = self
            .compositor
            .acquire_frame(surface_frame)
            .with_root_transformation(root_transformation)
            .with_tracer(tracer.reborrow());
        if let Some(embedder) = self.view_embedder.as_deref_mut() {
            frame = frame.with_view_embedder(embedder);
        }
        let status = frame.raster(tree, false);
        if status == RasterStatus::Success && !frame.submit() {
            return RasterStatus::Failed;
        }
        status
    }

    /// Records the last drawn tree into a picture covering its frame.
    pub fn screenshot(&mut self) -> Option<Picture> {
        let tree = self.last_tree.as_mut()?;
        let bounds = Rect::from_origin_size((0.0, 0.0), tree.frame_size());
        tree.flatten(bounds)
    }

    /// Forwards a new GPU context to the compositor.
    pub fn on_gr_context_created(&mut self) {
        self.compositor.on_gr_context_created();
    }

    /// Forwards GPU context loss to the compositor.
    pub fn on_gr_context_destroyed(&mut self) {
        self.compositor.on_gr_context_destroyed();
    }
}
