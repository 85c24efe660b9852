// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Vec2;

use super::{LayerBase, LayerId, PaintContext, PrerollContext};
use crate::geometry;
use crate::picture::Picture;
use crate::transform::Transform3d;

/// Draws a recorded [`Picture`] at an offset.
#[derive(Debug)]
pub struct PictureLayer {
    pub(crate) base: LayerBase,
    offset: Vec2,
    picture: Picture,
    is_complex: bool,
    will_change: bool,
}

impl PictureLayer {
    /// Creates a picture layer with no caching hints.
    #[must_use]
    pub fn new(offset: Vec2, picture: Picture) -> Self {
        Self {
            base: LayerBase::new(),
            offset,
            picture,
            is_complex: false,
            will_change: false,
        }
    }

    /// Hints that the picture is expensive to draw, making it a cache
    /// candidate regardless of its op count.
    #[must_use]
    pub fn with_complex_hint(mut self, is_complex: bool) -> Self {
        self.is_complex = is_complex;
        self
    }

    /// Hints that the picture changes every frame, ruling out caching.
    #[must_use]
    pub fn with_will_change_hint(mut self, will_change: bool) -> Self {
        self.will_change = will_change;
        self
    }

    /// This layer's identity.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.base.id
    }

    /// The picture.
    #[must_use]
    pub fn picture(&self) -> &Picture {
        &self.picture
    }

    /// Where the picture is drawn.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        self.base.paint_bounds = geometry::offset(self.picture.cull_rect(), self.offset);
        if !geometry::intersects(ctx.cull_rect, self.base.paint_bounds) {
            return;
        }
        if let (Some(cache), Some(gpu)) = (
            ctx.raster_cache.as_deref_mut(),
            ctx.gpu_context.as_deref_mut(),
        ) {
            let ctm = matrix.pre_translate(self.offset.x, self.offset.y);
            cache.prepare_picture(
                gpu,
                &self.picture,
                &ctm,
                self.is_complex,
                self.will_change,
                &mut ctx.tracer,
            );
        }
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        ctx.canvas.save();
        ctx.canvas.translate(self.offset);
        let cached = match ctx.raster_cache.as_deref_mut() {
            Some(cache) => cache.draw_picture(&self.picture, ctx.canvas, &mut ctx.tracer),
            None => false,
        };
        if !cached {
            ctx.canvas.draw_picture(&self.picture);
        }
        ctx.canvas.restore();
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::canvas::{Canvas, RecordingCanvas};
    use crate::gpu::SoftwareGpuContext;
    use crate::layer::Layer;
    use crate::layer::test_support::{Env, op_names, picture};
    use crate::paint::Paint;
    use crate::raster_cache::RasterCache;

    fn busy_picture() -> Picture {
        let mut rec = RecordingCanvas::new(Rect::new(0.0, 0.0, 64.0, 64.0));
        for i in 0..8 {
            let x = f64::from(i) * 8.0;
            rec.draw_rect(Rect::new(x, 0.0, x + 4.0, 64.0), &Paint::default());
        }
        rec.finish()
    }

    /// Runs one frame: preroll, paint, sweep. Returns the recorded op names.
    fn frame(
        env: &Env,
        layer: &mut Layer,
        cache: &mut RasterCache,
        gpu: &mut SoftwareGpuContext,
    ) -> alloc::vec::Vec<&'static str> {
        {
            let mut ctx = env.preroll_ctx();
            ctx.raster_cache = Some(&mut *cache);
            ctx.gpu_context = Some(&mut *gpu);
            layer.preroll(&mut ctx, &Transform3d::IDENTITY);
        }
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        {
            let mut ctx = env.paint_ctx(&mut canvas);
            ctx.raster_cache = Some(&mut *cache);
            layer.paint(&mut ctx);
        }
        cache.sweep_after_frame(&mut crate::trace::Tracer::none());
        op_names(canvas.ops())
    }

    #[test]
    fn bounds_are_offset_cull_rect() {
        let env = Env::default();
        let mut layer = Layer::from(PictureLayer::new(
            Vec2::new(3.0, 4.0),
            picture(Rect::new(1.0, 1.0, 2.0, 2.0)),
        ));
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        assert_eq!(layer.paint_bounds(), Rect::new(4.0, 5.0, 5.0, 6.0));
    }

    #[test]
    fn cached_after_third_frame() {
        let env = Env::default();
        let mut cache = RasterCache::default();
        let mut gpu = SoftwareGpuContext::default();
        let mut layer = Layer::from(PictureLayer::new(Vec2::new(8.0, 8.0), busy_picture()));

        for _ in 0..2 {
            let ops = frame(&env, &mut layer, &mut cache, &mut gpu);
            assert!(ops.contains(&"draw_picture"));
        }
        let ops = frame(&env, &mut layer, &mut cache, &mut gpu);
        assert!(ops.contains(&"draw_image"));
        assert!(!ops.contains(&"draw_picture"));
        assert_eq!(gpu.images_created(), 1);
    }

    #[test]
    fn will_change_is_never_cached() {
        let env = Env::default();
        let mut cache = RasterCache::default();
        let mut gpu = SoftwareGpuContext::default();
        let mut layer = Layer::from(
            PictureLayer::new(Vec2::ZERO, busy_picture()).with_will_change_hint(true),
        );
        for _ in 0..5 {
            let ops = frame(&env, &mut layer, &mut cache, &mut gpu);
            assert!(ops.contains(&"draw_picture"));
        }
        assert_eq!(gpu.images_created(), 0);
    }

    #[test]
    fn offscreen_picture_is_not_prepared() {
        let env = Env::default();
        let mut cache = RasterCache::default();
        let mut gpu = SoftwareGpuContext::default();
        let mut layer = Layer::from(PictureLayer::new(Vec2::ZERO, busy_picture()));
        let mut ctx = env.preroll_ctx();
        ctx.raster_cache = Some(&mut cache);
        ctx.gpu_context = Some(&mut gpu);
        ctx.cull_rect = Rect::new(500.0, 500.0, 600.0, 600.0);
        layer.preroll(&mut ctx, &Transform3d::IDENTITY);
        drop(ctx);
        assert_eq!(cache.metrics().picture_entries, 0);
        assert!(layer.needs_painting());
    }
}
