// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers that composite their children through a filter or mask.

use kurbo::Rect;
use peniko::{BlendMode, Brush};

use super::{ContainerLayer, PaintContext, PrerollContext, impl_children};
use crate::paint::{ColorFilter, ImageFilter, Paint};
use crate::transform::Transform3d;

// ---------------------------------------------------------------------------
// ColorFilterLayer
// ---------------------------------------------------------------------------

/// Applies a [`ColorFilter`] to its children as a group.
///
/// Like [`ImageFilterLayer`], the unfiltered children are a raster cache
/// candidate and the filter is applied when the cached image is drawn.
#[derive(Debug)]
pub struct ColorFilterLayer {
    filter: ColorFilter,
    pub(crate) container: ContainerLayer,
}

impl ColorFilterLayer {
    /// Creates a color filter layer with no children.
    #[must_use]
    pub fn new(filter: ColorFilter) -> Self {
        Self {
            filter,
            container: ContainerLayer::new(),
        }
    }

    /// The filter.
    #[must_use]
    pub fn filter(&self) -> &ColorFilter {
        &self.filter
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        let had_platform_view = ctx.has_platform_view;
        ctx.has_platform_view = false;
        let child_bounds = self.container.preroll_children(ctx, matrix);
        let subtree_has_platform_view = ctx.has_platform_view;
        ctx.has_platform_view = had_platform_view || subtree_has_platform_view;

        self.container.base.paint_bounds = child_bounds;

        if !subtree_has_platform_view && crate::geometry::intersects(ctx.cull_rect, child_bounds) {
            let id = self.container.base.id;
            super::prepare_layer_cache(ctx, id, &self.container, child_bounds, matrix);
        }
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        let paint = Paint::default().with_color_filter(self.filter.clone());
        if let Some(cache) = ctx.raster_cache.as_deref_mut()
            && cache.draw_layer(
                self.container.base.id,
                self.container.base.paint_bounds,
                ctx.canvas,
                Some(&paint),
                &mut ctx.tracer,
            )
        {
            return;
        }
        super::paint_in_save_layer(ctx, self.container.base.paint_bounds, &paint, |ctx| {
            self.container.paint_children(ctx);
        });
    }
}

impl_children!(ColorFilterLayer);

// ---------------------------------------------------------------------------
// ImageFilterLayer
// ---------------------------------------------------------------------------

/// Applies an [`ImageFilter`] to its children as a group.
///
/// Bounds grow by whatever the filter can reach (blur radius, shadow offset,
/// dilation). The unfiltered children are a raster cache candidate; the
/// filter is applied when the cached image is drawn.
#[derive(Debug)]
pub struct ImageFilterLayer {
    filter: ImageFilter,
    child_bounds: Rect,
    pub(crate) container: ContainerLayer,
}

impl ImageFilterLayer {
    /// Creates an image filter layer with no children.
    #[must_use]
    pub fn new(filter: ImageFilter) -> Self {
        Self {
            filter,
            child_bounds: Rect::ZERO,
            container: ContainerLayer::new(),
        }
    }

    /// The filter.
    #[must_use]
    pub fn filter(&self) -> &ImageFilter {
        &self.filter
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        let had_platform_view = ctx.has_platform_view;
        ctx.has_platform_view = false;
        self.child_bounds = self.container.preroll_children(ctx, matrix);
        let subtree_has_platform_view = ctx.has_platform_view;
        ctx.has_platform_view = had_platform_view || subtree_has_platform_view;

        self.container.base.paint_bounds = self.filter.filter_bounds(self.child_bounds);

        if !subtree_has_platform_view
            && crate::geometry::intersects(ctx.cull_rect, self.container.base.paint_bounds)
        {
            let id = self.container.base.id;
            super::prepare_layer_cache(ctx, id, &self.container, self.child_bounds, matrix);
        }
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        let paint = Paint::default().with_image_filter(self.filter.clone());
        if let Some(cache) = ctx.raster_cache.as_deref_mut()
            && cache.draw_layer(
                self.container.base.id,
                self.child_bounds,
                ctx.canvas,
                Some(&paint),
                &mut ctx.tracer,
            )
        {
            return;
        }
        super::paint_in_save_layer(ctx, self.container.base.paint_bounds, &paint, |ctx| {
            self.container.paint_children(ctx);
        });
    }
}

impl_children!(ImageFilterLayer);

// ---------------------------------------------------------------------------
// ShaderMaskLayer
// ---------------------------------------------------------------------------

/// Masks its children with a shader.
///
/// The children are drawn into a group, then `shader` is drawn over
/// `mask_rect` with `blend` (typically a destination-in mode) before the
/// group is composited.
#[derive(Debug)]
pub struct ShaderMaskLayer {
    shader: Brush,
    mask_rect: Rect,
    blend: BlendMode,
    pub(crate) container: ContainerLayer,
}

impl ShaderMaskLayer {
    /// Creates a shader mask layer with no children.
    #[must_use]
    pub fn new(shader: impl Into<Brush>, mask_rect: Rect, blend: BlendMode) -> Self {
        Self {
            shader: shader.into(),
            mask_rect,
            blend,
            container: ContainerLayer::new(),
        }
    }

    /// The mask shader.
    #[must_use]
    pub fn shader(&self) -> &Brush {
        &self.shader
    }

    /// Where the mask is drawn.
    #[must_use]
    pub fn mask_rect(&self) -> Rect {
        self.mask_rect
    }

    /// How the mask combines with the children.
    #[must_use]
    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        self.container.preroll(ctx, matrix);
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        super::paint_in_save_layer(
            ctx,
            self.container.base.paint_bounds,
            &Paint::default(),
            |ctx| {
                self.container.paint_children(ctx);
                let mask = Paint::default()
                    .with_brush(self.shader.clone())
                    .with_blend(self.blend);
                ctx.canvas.translate(self.mask_rect.origin().to_vec2());
                ctx.canvas
                    .draw_rect(Rect::from_origin_size((0.0, 0.0), self.mask_rect.size()), &mask);
            },
        );
    }
}

impl_children!(ShaderMaskLayer);

#[cfg(test)]
mod tests {
    use kurbo::Vec2;
    use peniko::{Color, Compose, Mix};

    use super::*;
    use crate::canvas::{CanvasOp, RecordingCanvas};
    use crate::gpu::SoftwareGpuContext;
    use crate::layer::test_support::{Env, op_names, picture};
    use crate::embedder::PlatformViewId;
    use crate::layer::{Layer, PictureLayer, PlatformViewLayer};
    use crate::raster_cache::{RasterCache, RasterCacheConfig};

    fn child() -> PictureLayer {
        PictureLayer::new(Vec2::ZERO, picture(Rect::new(0.0, 0.0, 10.0, 10.0)))
    }

    #[test]
    fn color_filter_wraps_children_in_save_layer() {
        let env = Env::default();
        let mut layer = Layer::from(
            ColorFilterLayer::new(ColorFilter::LinearToSrgbGamma).with_child(child()),
        );
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        assert_eq!(layer.paint_bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        layer.paint(&mut env.paint_ctx(&mut canvas));
        match &canvas.ops()[0] {
            CanvasOp::SaveLayer { paint, .. } => {
                assert_eq!(paint.color_filter, Some(ColorFilter::LinearToSrgbGamma));
            }
            other => panic!("expected SaveLayer, got {other:?}"),
        }
        assert_eq!(canvas.ops().last(), Some(&CanvasOp::Restore));
    }

    #[test]
    fn color_filter_blits_cached_children_with_filter() {
        let env = Env::default();
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let mut layer = Layer::from(
            ColorFilterLayer::new(ColorFilter::LinearToSrgbGamma).with_child(child()),
        );
        {
            let mut ctx = env.preroll_ctx();
            ctx.raster_cache = Some(&mut cache);
            ctx.gpu_context = Some(&mut gpu);
            layer.preroll(&mut ctx, &Transform3d::IDENTITY);
        }
        assert_eq!(cache.metrics().layer_images, 1);

        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        {
            let mut ctx = env.paint_ctx(&mut canvas);
            ctx.raster_cache = Some(&mut cache);
            layer.paint(&mut ctx);
        }
        assert_eq!(
            op_names(canvas.ops()),
            ["save", "set_matrix", "draw_image", "restore"]
        );
        match &canvas.ops()[2] {
            CanvasOp::DrawImage { paint, .. } => {
                let filter = paint.as_ref().and_then(|p| p.color_filter.clone());
                assert_eq!(filter, Some(ColorFilter::LinearToSrgbGamma));
            }
            other => panic!("expected DrawImage, got {other:?}"),
        }
    }

    #[test]
    fn blur_expands_bounds() {
        let env = Env::default();
        let mut layer =
            Layer::from(ImageFilterLayer::new(ImageFilter::blur(2.0)).with_child(child()));
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        assert_eq!(layer.paint_bounds(), Rect::new(-6.0, -6.0, 16.0, 16.0));
    }

    #[test]
    fn image_filter_uses_cached_children() {
        let env = Env::default();
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let mut layer =
            Layer::from(ImageFilterLayer::new(ImageFilter::offset(3.0, 0.0)).with_child(child()));
        {
            let mut ctx = env.preroll_ctx();
            ctx.raster_cache = Some(&mut cache);
            ctx.gpu_context = Some(&mut gpu);
            layer.preroll(&mut ctx, &Transform3d::IDENTITY);
        }
        assert_eq!(layer.paint_bounds(), Rect::new(3.0, 0.0, 13.0, 10.0));

        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        {
            let mut ctx = env.paint_ctx(&mut canvas);
            ctx.raster_cache = Some(&mut cache);
            layer.paint(&mut ctx);
        }
        let names = op_names(canvas.ops());
        assert_eq!(names, ["save", "set_matrix", "draw_image", "restore"]);
        match &canvas.ops()[2] {
            CanvasOp::DrawImage { paint, .. } => {
                let filter = paint.as_ref().and_then(|p| p.image_filter.clone());
                assert_eq!(filter, Some(ImageFilter::offset(3.0, 0.0)));
            }
            other => panic!("expected DrawImage, got {other:?}"),
        }
    }

    #[test]
    fn platform_view_subtree_is_not_cached() {
        let env = Env::default();
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let mut layer = Layer::from(
            ImageFilterLayer::new(ImageFilter::blur(1.0))
                .with_child(child())
                .with_child(PlatformViewLayer::new(
                    PlatformViewId(4),
                    Vec2::ZERO,
                    kurbo::Size::new(5.0, 5.0),
                )),
        );
        let mut ctx = env.preroll_ctx();
        ctx.raster_cache = Some(&mut cache);
        ctx.gpu_context = Some(&mut gpu);
        layer.preroll(&mut ctx, &Transform3d::IDENTITY);
        assert!(ctx.has_platform_view);
        drop(ctx);
        assert_eq!(cache.metrics().layer_entries, 0);
    }

    #[test]
    fn shader_mask_draws_mask_after_children() {
        let env = Env::default();
        let blend = BlendMode::new(Mix::Normal, Compose::DestIn);
        let mut layer = Layer::from(
            ShaderMaskLayer::new(Color::WHITE, Rect::new(2.0, 3.0, 8.0, 9.0), blend)
                .with_child(child()),
        );
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        layer.paint(&mut env.paint_ctx(&mut canvas));
        let names = op_names(canvas.ops());
        assert_eq!(
            names,
            [
                "save_layer",
                "save",
                "translate",
                "draw_picture",
                "restore",
                "translate",
                "draw_rect",
                "restore"
            ]
        );
        match &canvas.ops()[6] {
            CanvasOp::DrawRect { rect, paint } => {
                assert_eq!(*rect, Rect::new(0.0, 0.0, 6.0, 6.0));
                assert_eq!(paint.blend, blend);
            }
            other => panic!("expected DrawRect, got {other:?}"),
        }
    }
}
