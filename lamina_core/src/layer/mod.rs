// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layer tree: a frame's description as nested effects and content.
//!
//! A [`Layer`] is either a *modifier* that applies an effect to its children
//! (clip, transform, opacity, filters, shader mask), a plain
//! [`ContainerLayer`] group, or a *leaf* with content (picture, texture,
//! platform view, performance overlay).
//!
//! Every frame goes through two passes over the tree:
//!
//! 1. **Preroll** ([`Layer::preroll`]) walks the tree top-down with the
//!    accumulated matrix, computes each layer's paint bounds bottom-up,
//!    prepares raster cache entries, and reports platform views to the
//!    embedder. Bounds are in the layer's parent coordinate space.
//! 2. **Paint** ([`Layer::paint`]) walks the tree again in the same order
//!    and issues canvas calls. Layers whose bounds came out empty are
//!    skipped without visiting their subtree.
//!
//! Sibling order is render order. A parent sets up its effect before its
//! children in both passes and tears it down after them.
//!
//! Trees are plain owned values without parent links; they are rebuilt for
//! every frame and moved to the raster thread whole.

mod clip;
mod container;
mod filter;
mod id;
mod opacity;
mod performance_overlay;
mod picture;
mod platform_view;
mod texture;
mod transform;

pub use clip::{ClipLayer, ClipPathLayer, ClipRRectLayer, ClipRectLayer, ClipShape};
pub use container::ContainerLayer;
pub use filter::{ColorFilterLayer, ImageFilterLayer, ShaderMaskLayer};
pub use id::{LayerBase, LayerId, LayerKind};
pub use opacity::OpacityLayer;
pub use performance_overlay::{OverlayOptions, PerformanceOverlayLayer};
pub use picture::PictureLayer;
pub use platform_view::PlatformViewLayer;
pub use texture::TextureLayer;
pub use transform::TransformLayer;

use core::fmt;

use kurbo::{BezPath, Rect, Shape};
use peniko::Color;

use crate::canvas::Canvas;
use crate::embedder::{ExternalViewEmbedder, MutatorsStack};
use crate::geometry;
use crate::gpu::GpuContext;
use crate::paint::Paint;
use crate::raster_cache::RasterCache;
use crate::scene::SceneUpdateContext;
use crate::stopwatch::Stopwatch;
use crate::texture::TextureRegistry;
#[cfg(feature = "trace-rich")]
use crate::trace::LayerBoundsEvent;
use crate::trace::Tracer;
use crate::transform::Transform3d;

// ---------------------------------------------------------------------------
// Traversal contexts
// ---------------------------------------------------------------------------

/// State threaded through the preroll pass.
///
/// Layers that change `cull_rect`, `mutators`, or `has_platform_view` for
/// their subtree restore the previous value before returning.
pub struct PrerollContext<'a> {
    /// Cache to prepare entries in; `None` disables caching.
    pub raster_cache: Option<&'a mut RasterCache>,
    /// Context used to rasterize cache entries.
    pub gpu_context: Option<&'a mut dyn GpuContext>,
    /// Receives platform views.
    pub view_embedder: Option<&'a mut dyn ExternalViewEmbedder>,
    /// Ancestor effects of the layer being prerolled.
    pub mutators: MutatorsStack,
    /// Visible region in the current layer's coordinate space.
    pub cull_rect: Rect,
    /// Physical pixels per logical pixel.
    pub frame_device_pixel_ratio: f64,
    /// Raster-thread frame times.
    pub raster_time: &'a Stopwatch,
    /// UI-thread frame times.
    pub ui_time: &'a Stopwatch,
    /// External textures.
    pub texture_registry: &'a TextureRegistry,
    /// Overlay a checkerboard on every offscreen group.
    pub checkerboard_offscreen_layers: bool,
    /// Set when the subtree prerolled so far contains a platform view.
    pub has_platform_view: bool,
    /// Trace events.
    pub tracer: Tracer<'a>,
}

impl fmt::Debug for PrerollContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrerollContext")
            .field("raster_cache", &self.raster_cache.is_some())
            .field("gpu_context", &self.gpu_context.is_some())
            .field("view_embedder", &self.view_embedder.is_some())
            .field("mutators", &self.mutators)
            .field("cull_rect", &self.cull_rect)
            .field("frame_device_pixel_ratio", &self.frame_device_pixel_ratio)
            .field("has_platform_view", &self.has_platform_view)
            .finish_non_exhaustive()
    }
}

impl<'a> PrerollContext<'a> {
    /// A context with no cache, GPU context, or embedder and an unbounded
    /// cull rect.
    #[must_use]
    pub fn new(
        texture_registry: &'a TextureRegistry,
        raster_time: &'a Stopwatch,
        ui_time: &'a Stopwatch,
    ) -> Self {
        Self {
            raster_cache: None,
            gpu_context: None,
            view_embedder: None,
            mutators: MutatorsStack::new(),
            cull_rect: geometry::GIANT_RECT,
            frame_device_pixel_ratio: 1.0,
            raster_time,
            ui_time,
            texture_registry,
            checkerboard_offscreen_layers: false,
            has_platform_view: false,
            tracer: Tracer::none(),
        }
    }
}

/// State threaded through the paint pass.
pub struct PaintContext<'a> {
    /// Where draw calls go.
    pub canvas: &'a mut dyn Canvas,
    /// Cache consulted for prepared entries; `None` paints everything
    /// directly.
    pub raster_cache: Option<&'a mut RasterCache>,
    /// Handed to textures that upload frames.
    pub gpu_context: Option<&'a mut dyn GpuContext>,
    /// Composites platform views.
    pub view_embedder: Option<&'a mut dyn ExternalViewEmbedder>,
    /// External textures.
    pub texture_registry: &'a TextureRegistry,
    /// Raster-thread frame times.
    pub raster_time: &'a Stopwatch,
    /// UI-thread frame times.
    pub ui_time: &'a Stopwatch,
    /// Overlay a checkerboard on every offscreen group.
    pub checkerboard_offscreen_layers: bool,
    /// Trace events.
    pub tracer: Tracer<'a>,
}

impl fmt::Debug for PaintContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintContext")
            .field("raster_cache", &self.raster_cache.is_some())
            .field("gpu_context", &self.gpu_context.is_some())
            .field("view_embedder", &self.view_embedder.is_some())
            .field(
                "checkerboard_offscreen_layers",
                &self.checkerboard_offscreen_layers,
            )
            .finish_non_exhaustive()
    }
}

impl<'a> PaintContext<'a> {
    /// A context that paints everything directly into `canvas`.
    #[must_use]
    pub fn new(
        canvas: &'a mut dyn Canvas,
        texture_registry: &'a TextureRegistry,
        raster_time: &'a Stopwatch,
        ui_time: &'a Stopwatch,
    ) -> Self {
        Self {
            canvas,
            raster_cache: None,
            gpu_context: None,
            view_embedder: None,
            texture_registry,
            raster_time,
            ui_time,
            checkerboard_offscreen_layers: false,
            tracer: Tracer::none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// One node of a layer tree.
#[derive(Debug)]
pub enum Layer {
    /// Plain group.
    Container(ContainerLayer),
    /// Rectangular clip.
    ClipRect(ClipRectLayer),
    /// Rounded-rectangle clip.
    ClipRRect(ClipRRectLayer),
    /// Path clip.
    ClipPath(ClipPathLayer),
    /// Matrix transform.
    Transform(TransformLayer),
    /// Group opacity.
    Opacity(OpacityLayer),
    /// Color filter.
    ColorFilter(ColorFilterLayer),
    /// Image filter.
    ImageFilter(ImageFilterLayer),
    /// Shader mask.
    ShaderMask(ShaderMaskLayer),
    /// Recorded picture.
    Picture(PictureLayer),
    /// External texture.
    Texture(TextureLayer),
    /// Native platform view.
    PlatformView(PlatformViewLayer),
    /// Frame timing graphs.
    PerformanceOverlay(PerformanceOverlayLayer),
}

impl Layer {
    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Container(_) => LayerKind::Container,
            Self::ClipRect(_) => LayerKind::ClipRect,
            Self::ClipRRect(_) => LayerKind::ClipRRect,
            Self::ClipPath(_) => LayerKind::ClipPath,
            Self::Transform(_) => LayerKind::Transform,
            Self::Opacity(_) => LayerKind::Opacity,
            Self::ColorFilter(_) => LayerKind::ColorFilter,
            Self::ImageFilter(_) => LayerKind::ImageFilter,
            Self::ShaderMask(_) => LayerKind::ShaderMask,
            Self::Picture(_) => LayerKind::Picture,
            Self::Texture(_) => LayerKind::Texture,
            Self::PlatformView(_) => LayerKind::PlatformView,
            Self::PerformanceOverlay(_) => LayerKind::PerformanceOverlay,
        }
    }

    fn base(&self) -> &LayerBase {
        match self {
            Self::Container(l) => &l.base,
            Self::ClipRect(l) => &l.container.base,
            Self::ClipRRect(l) => &l.container.base,
            Self::ClipPath(l) => &l.container.base,
            Self::Transform(l) => &l.container.base,
            Self::Opacity(l) => &l.container.base,
            Self::ColorFilter(l) => &l.container.base,
            Self::ImageFilter(l) => &l.container.base,
            Self::ShaderMask(l) => &l.container.base,
            Self::Picture(l) => &l.base,
            Self::Texture(l) => &l.base,
            Self::PlatformView(l) => &l.base,
            Self::PerformanceOverlay(l) => &l.base,
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut LayerBase {
        match self {
            Self::Container(l) => &mut l.base,
            Self::ClipRect(l) => &mut l.container.base,
            Self::ClipRRect(l) => &mut l.container.base,
            Self::ClipPath(l) => &mut l.container.base,
            Self::Transform(l) => &mut l.container.base,
            Self::Opacity(l) => &mut l.container.base,
            Self::ColorFilter(l) => &mut l.container.base,
            Self::ImageFilter(l) => &mut l.container.base,
            Self::ShaderMask(l) => &mut l.container.base,
            Self::Picture(l) => &mut l.base,
            Self::Texture(l) => &mut l.base,
            Self::PlatformView(l) => &mut l.base,
            Self::PerformanceOverlay(l) => &mut l.base,
        }
    }

    /// This layer's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.base().id
    }

    /// Bounds computed by the last preroll, in the parent's coordinate
    /// space. Empty before the first preroll.
    #[inline]
    #[must_use]
    pub fn paint_bounds(&self) -> Rect {
        self.base().paint_bounds
    }

    /// Returns `true` if paint would draw anything.
    #[inline]
    #[must_use]
    pub fn needs_painting(&self) -> bool {
        !geometry::is_empty(self.base().paint_bounds)
    }

    /// Returns `true` once the layer has been prerolled.
    #[inline]
    #[must_use]
    pub fn is_prerolled(&self) -> bool {
        self.base().prerolled
    }

    /// Child layers; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self.container() {
            Some(c) => c.children(),
            None => &[],
        }
    }

    fn container(&self) -> Option<&ContainerLayer> {
        match self {
            Self::Container(l) => Some(l),
            Self::ClipRect(l) => Some(&l.container),
            Self::ClipRRect(l) => Some(&l.container),
            Self::ClipPath(l) => Some(&l.container),
            Self::Transform(l) => Some(&l.container),
            Self::Opacity(l) => Some(&l.container),
            Self::ColorFilter(l) => Some(&l.container),
            Self::ImageFilter(l) => Some(&l.container),
            Self::ShaderMask(l) => Some(&l.container),
            Self::Picture(_)
            | Self::Texture(_)
            | Self::PlatformView(_)
            | Self::PerformanceOverlay(_) => None,
        }
    }

    /// Computes paint bounds for this layer and its subtree under `matrix`
    /// (the accumulated transform from this layer's parent space to device
    /// space).
    pub fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        match self {
            Self::Container(l) => l.preroll(ctx, matrix),
            Self::ClipRect(l) => l.preroll(ctx, matrix),
            Self::ClipRRect(l) => l.preroll(ctx, matrix),
            Self::ClipPath(l) => l.preroll(ctx, matrix),
            Self::Transform(l) => l.preroll(ctx, matrix),
            Self::Opacity(l) => l.preroll(ctx, matrix),
            Self::ColorFilter(l) => l.preroll(ctx, matrix),
            Self::ImageFilter(l) => l.preroll(ctx, matrix),
            Self::ShaderMask(l) => l.preroll(ctx, matrix),
            Self::Picture(l) => l.preroll(ctx, matrix),
            Self::Texture(l) => l.preroll(ctx, matrix),
            Self::PlatformView(l) => l.preroll(ctx, matrix),
            Self::PerformanceOverlay(l) => l.preroll(ctx, matrix),
        }
        let base = self.base_mut();
        base.paint_bounds = geometry::sanitize(base.paint_bounds);
        base.prerolled = true;

        #[cfg(feature = "trace-rich")]
        {
            let b = self.paint_bounds();
            ctx.tracer.layer_bounds(&LayerBoundsEvent {
                layer_id: self.id().get(),
                kind: self.kind(),
                bounds: [b.x0, b.y0, b.x1, b.y1],
            });
        }
    }

    /// Issues this layer's draw calls.
    ///
    /// Does nothing if the layer does not need painting.
    ///
    /// # Panics
    ///
    /// Panics if the layer was never prerolled.
    pub fn paint(&self, ctx: &mut PaintContext<'_>) {
        assert!(
            self.is_prerolled(),
            "{:?} {:?} painted before preroll",
            self.kind(),
            self.id()
        );
        if !self.needs_painting() {
            return;
        }
        match self {
            Self::Container(l) => l.paint_children(ctx),
            Self::ClipRect(l) => l.paint(ctx),
            Self::ClipRRect(l) => l.paint(ctx),
            Self::ClipPath(l) => l.paint(ctx),
            Self::Transform(l) => l.paint(ctx),
            Self::Opacity(l) => l.paint(ctx),
            Self::ColorFilter(l) => l.paint(ctx),
            Self::ImageFilter(l) => l.paint(ctx),
            Self::ShaderMask(l) => l.paint(ctx),
            Self::Picture(l) => l.paint(ctx),
            Self::Texture(l) => l.paint(ctx),
            Self::PlatformView(l) => l.paint(ctx),
            Self::PerformanceOverlay(l) => l.paint(ctx),
        }
    }

    /// Emits this layer and its subtree into a scene graph.
    pub fn update_scene(&self, scene: &mut dyn SceneUpdateContext) {
        if !self.needs_painting() {
            return;
        }
        match self {
            Self::Container(l) => l.update_scene_children(scene),
            Self::ClipRect(l) => l.update_scene(scene),
            Self::ClipRRect(l) => l.update_scene(scene),
            Self::ClipPath(l) => l.update_scene(scene),
            Self::Transform(l) => l.update_scene(scene),
            Self::Opacity(l) => l.update_scene(scene),
            Self::Picture(l) => {
                scene.add_picture(l.picture(), l.offset(), self.paint_bounds());
            }
            Self::Texture(l) => {
                scene.add_texture(l.texture_id(), self.paint_bounds(), l.freeze());
            }
            Self::PlatformView(l) => scene.add_platform_view(l.view_id(), self.paint_bounds()),
            Self::ColorFilter(_)
            | Self::ImageFilter(_)
            | Self::ShaderMask(_)
            | Self::PerformanceOverlay(_) => scene.add_paint_layer(self),
        }
    }
}

macro_rules! impl_from_layer {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Layer {
                fn from(layer: $ty) -> Self {
                    Self::$variant(layer)
                }
            }
        )*
    };
}

impl_from_layer!(
    Container(ContainerLayer),
    ClipRect(ClipRectLayer),
    ClipRRect(ClipRRectLayer),
    ClipPath(ClipPathLayer),
    Transform(TransformLayer),
    Opacity(OpacityLayer),
    ColorFilter(ColorFilterLayer),
    ImageFilter(ImageFilterLayer),
    ShaderMask(ShaderMaskLayer),
    Picture(PictureLayer),
    Texture(TextureLayer),
    PlatformView(PlatformViewLayer),
    PerformanceOverlay(PerformanceOverlayLayer),
);

/// Child-list accessors for layers that wrap a [`ContainerLayer`].
macro_rules! impl_children {
    ($ty:ty) => {
        impl $ty {
            /// Appends a child, returning `self` for chaining.
            #[must_use]
            pub fn with_child(mut self, child: impl Into<$crate::layer::Layer>) -> Self {
                self.container.add(child);
                self
            }

            /// Appends a child.
            pub fn add(&mut self, child: impl Into<$crate::layer::Layer>) {
                self.container.add(child);
            }

            /// Child layers in paint order.
            #[must_use]
            pub fn children(&self) -> &[$crate::layer::Layer] {
                self.container.children()
            }

            /// This layer's identity.
            #[must_use]
            pub fn id(&self) -> $crate::layer::LayerId {
                self.container.base.id
            }

            /// Replaces the generated id, so a subtree rebuilt every frame
            /// keeps its raster cache entry.
            #[must_use]
            pub fn with_id(mut self, id: $crate::layer::LayerId) -> Self {
                self.container.base.id = id;
                self
            }
        }
    };
}
pub(crate) use impl_children;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Paints `body` inside a `save_layer` with `paint`, then overlays the
/// checkerboard if the context asks for it.
pub(crate) fn paint_in_save_layer(
    ctx: &mut PaintContext<'_>,
    bounds: Rect,
    paint: &Paint,
    body: impl FnOnce(&mut PaintContext<'_>),
) {
    ctx.canvas.save_layer(Some(bounds), paint);
    body(ctx);
    ctx.canvas.restore();
    if ctx.checkerboard_offscreen_layers {
        draw_checkerboard(ctx.canvas, bounds);
    }
}

const CHECKER_SIZE: f64 = 12.0;
const CHECKER_MAX_CELLS: f64 = 256.0;
const CHECKER_COLOR: Color = Color::from_rgba8(0xFF, 0x00, 0xFF, 0x40);

/// Marks `rect` with a translucent checkerboard.
pub(crate) fn draw_checkerboard(canvas: &mut dyn Canvas, rect: Rect) {
    let rect = geometry::sanitize(rect);
    if geometry::is_empty(rect) {
        return;
    }
    let cell = CHECKER_SIZE.max(rect.width().max(rect.height()) / CHECKER_MAX_CELLS);
    let mut squares = BezPath::new();
    let mut y = rect.y0;
    let mut odd_row = false;
    while y < rect.y1 {
        let mut x = if odd_row { rect.x0 + cell } else { rect.x0 };
        while x < rect.x1 {
            let square = Rect::new(x, y, (x + cell).min(rect.x1), (y + cell).min(rect.y1));
            squares.extend(square.path_elements(0.1));
            x += 2.0 * cell;
        }
        y += cell;
        odd_row = !odd_row;
    }
    canvas.save();
    canvas.clip_rect(rect, false);
    canvas.draw_path(&squares, &Paint::solid(CHECKER_COLOR));
    canvas.restore();
}

/// Prepares a layer cache entry holding `children` painted under `ctm`.
///
/// `bounds` is the children's extent in the space `ctm` maps from. Returns
/// `true` if an image is ready for the coming paint.
pub(crate) fn prepare_layer_cache(
    ctx: &mut PrerollContext<'_>,
    id: LayerId,
    children: &ContainerLayer,
    bounds: Rect,
    ctm: &Transform3d,
) -> bool {
    let (Some(cache), Some(gpu)) = (
        ctx.raster_cache.as_deref_mut(),
        ctx.gpu_context.as_deref_mut(),
    ) else {
        return false;
    };
    let registry = ctx.texture_registry;
    let raster_time = ctx.raster_time;
    let ui_time = ctx.ui_time;
    let checkerboard = ctx.checkerboard_offscreen_layers;
    cache.prepare_layer(
        gpu,
        id,
        bounds,
        ctm,
        &mut |canvas| {
            let mut offscreen = PaintContext::new(canvas, registry, raster_time, ui_time);
            offscreen.checkerboard_offscreen_layers = checkerboard;
            children.paint_children(&mut offscreen);
        },
        &mut ctx.tracer,
    )
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test_support {
    use alloc::vec::Vec;

    use kurbo::Rect;

    use super::{PaintContext, PrerollContext};
    use crate::canvas::{Canvas, CanvasOp, RecordingCanvas};
    use crate::paint::Paint;
    use crate::picture::Picture;
    use crate::stopwatch::Stopwatch;
    use crate::texture::TextureRegistry;

    /// Owns what the traversal contexts borrow.
    #[derive(Debug, Default)]
    pub(crate) struct Env {
        pub(crate) registry: TextureRegistry,
        pub(crate) raster_time: Stopwatch,
        pub(crate) ui_time: Stopwatch,
    }

    impl Env {
        pub(crate) fn preroll_ctx(&self) -> PrerollContext<'_> {
            PrerollContext::new(&self.registry, &self.raster_time, &self.ui_time)
        }

        pub(crate) fn paint_ctx<'a>(&'a self, canvas: &'a mut dyn Canvas) -> PaintContext<'a> {
            PaintContext::new(canvas, &self.registry, &self.raster_time, &self.ui_time)
        }
    }

    /// A picture with a single rect covering `rect`.
    pub(crate) fn picture(rect: Rect) -> Picture {
        let mut rec = RecordingCanvas::new(rect);
        rec.draw_rect(rect, &Paint::default());
        rec.finish()
    }

    /// Short labels for recorded ops, for order assertions.
    pub(crate) fn op_names(ops: &[CanvasOp]) -> Vec<&'static str> {
        ops.iter()
            .map(|op| match op {
                CanvasOp::Save => "save",
                CanvasOp::SaveLayer { .. } => "save_layer",
                CanvasOp::Restore => "restore",
                CanvasOp::Translate(_) => "translate",
                CanvasOp::Concat(_) => "concat",
                CanvasOp::SetMatrix(_) => "set_matrix",
                CanvasOp::ClipRect { .. } => "clip_rect",
                CanvasOp::ClipRRect { .. } => "clip_rrect",
                CanvasOp::ClipPath { .. } => "clip_path",
                CanvasOp::Clear(_) => "clear",
                CanvasOp::DrawRect { .. } => "draw_rect",
                CanvasOp::DrawPath { .. } => "draw_path",
                CanvasOp::DrawPicture(_) => "draw_picture",
                CanvasOp::DrawImage { .. } => "draw_image",
                CanvasOp::DrawImageRect { .. } => "draw_image_rect",
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Vec2;

    use super::test_support::{Env, op_names, picture};
    use super::*;
    use crate::canvas::{CanvasOp, RecordingCanvas};
    use crate::paint::Clip;
    use crate::picture::Picture;

    #[test]
    fn container_bounds_are_union_of_children() {
        let env = Env::default();
        let mut root = Layer::from(
            ContainerLayer::new()
                .with_child(PictureLayer::new(
                    Vec2::ZERO,
                    picture(Rect::new(0.0, 0.0, 10.0, 10.0)),
                ))
                .with_child(PictureLayer::new(
                    Vec2::new(20.0, 5.0),
                    picture(Rect::new(0.0, 0.0, 10.0, 10.0)),
                )),
        );
        root.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        assert_eq!(root.paint_bounds(), Rect::new(0.0, 0.0, 30.0, 15.0));
        assert!(root.needs_painting());
    }

    #[test]
    fn empty_child_is_skipped_at_paint() {
        let env = Env::default();
        let mut root = Layer::from(
            ContainerLayer::new()
                .with_child(PictureLayer::new(Vec2::ZERO, picture(Rect::ZERO)))
                .with_child(PictureLayer::new(
                    Vec2::ZERO,
                    picture(Rect::new(0.0, 0.0, 4.0, 4.0)),
                )),
        );
        root.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        assert!(!root.children()[0].needs_painting());

        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        root.paint(&mut env.paint_ctx(&mut canvas));
        let drawn: Vec<_> = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, CanvasOp::DrawPicture(_)))
            .collect();
        assert_eq!(drawn.len(), 1);
    }

    #[test]
    fn transform_clip_picture_scenario() {
        let env = Env::default();
        let pic = picture(Rect::new(0.0, 0.0, 200.0, 200.0));
        let mut root = Layer::from(
            TransformLayer::new(Transform3d::from_scale(2.0, 2.0)).with_child(
                ClipRectLayer::new(Rect::new(0.0, 0.0, 100.0, 100.0), Clip::HardEdge)
                    .with_child(PictureLayer::new(Vec2::ZERO, pic.clone())),
            ),
        );
        root.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);

        let clip = &root.children()[0];
        assert_eq!(clip.children()[0].paint_bounds(), pic.cull_rect());
        assert_eq!(clip.paint_bounds(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(root.paint_bounds(), Rect::new(0.0, 0.0, 200.0, 200.0));

        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        root.paint(&mut env.paint_ctx(&mut canvas));
        let names: Vec<_> = op_names(canvas.ops())
            .into_iter()
            .filter(|n| matches!(*n, "concat" | "clip_rect" | "draw_picture"))
            .collect();
        assert_eq!(names, ["concat", "clip_rect", "draw_picture"]);
        assert_eq!(canvas.save_count(), 1);
    }

    #[test]
    fn traversal_order_is_deterministic() {
        let env = Env::default();
        let pictures: Vec<_> = (0..4)
            .map(|i| picture(Rect::new(0.0, 0.0, 5.0 + f64::from(i), 5.0)))
            .collect();
        let build = || {
            let mut root = ContainerLayer::new();
            for p in &pictures {
                root.add(
                    OpacityLayer::new(0.5, Vec2::ZERO)
                        .with_child(PictureLayer::new(Vec2::ZERO, p.clone())),
                );
            }
            Layer::from(root)
        };
        let paint_once = || {
            let mut root = build();
            root.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
            let mut canvas = RecordingCanvas::new(Rect::ZERO);
            root.paint(&mut env.paint_ctx(&mut canvas));
            canvas.into_ops()
        };
        let first = paint_once();
        let order: Vec<_> = first
            .iter()
            .filter_map(|op| match op {
                CanvasOp::DrawPicture(p) => Some(p.id()),
                _ => None,
            })
            .collect();
        let expected: Vec<_> = pictures.iter().map(Picture::id).collect();
        assert_eq!(order, expected);
        assert_eq!(first, paint_once());
    }

    #[test]
    #[should_panic(expected = "painted before preroll")]
    fn paint_before_preroll_panics() {
        let env = Env::default();
        let layer = Layer::from(PictureLayer::new(
            Vec2::ZERO,
            picture(Rect::new(0.0, 0.0, 1.0, 1.0)),
        ));
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        layer.paint(&mut env.paint_ctx(&mut canvas));
    }

    #[test]
    fn checkerboard_covers_save_layers() {
        let env = Env::default();
        let mut root = Layer::from(
            OpacityLayer::new(0.5, Vec2::ZERO).with_child(PictureLayer::new(
                Vec2::ZERO,
                picture(Rect::new(0.0, 0.0, 30.0, 30.0)),
            )),
        );
        root.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        let mut ctx = env.paint_ctx(&mut canvas);
        ctx.checkerboard_offscreen_layers = true;
        root.paint(&mut ctx);
        assert!(op_names(canvas.ops()).contains(&"draw_path"));
    }

    #[test]
    fn huge_checkerboard_is_bounded() {
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        draw_checkerboard(&mut canvas, geometry::GIANT_RECT);
        match &canvas.ops()[2] {
            CanvasOp::DrawPath { path, .. } => {
                assert!(path.elements().len() <= 256 * 256 * 5);
            }
            other => panic!("expected DrawPath, got {other:?}"),
        }
    }
}
