// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Rect, Size, Vec2};

use super::{LayerBase, LayerId, PaintContext, PrerollContext};
use crate::embedder::{EmbeddedViewParams, PlatformViewId};
use crate::trace::{ResourceKind, ResourceMissEvent};
use crate::transform::Transform3d;

/// Reserves space for a native view composited by the
/// [`ExternalViewEmbedder`](crate::embedder::ExternalViewEmbedder).
///
/// The layer draws nothing itself. Its ancestors are reported to the
/// embedder as mutators, and any ancestor that could cache the subtree as an
/// image stops doing so.
#[derive(Debug)]
pub struct PlatformViewLayer {
    pub(crate) base: LayerBase,
    view_id: PlatformViewId,
    offset: Vec2,
    size: Size,
}

impl PlatformViewLayer {
    /// Creates a layer for `view_id` covering `size` at `offset`.
    #[must_use]
    pub fn new(view_id: PlatformViewId, offset: Vec2, size: Size) -> Self {
        Self {
            base: LayerBase::new(),
            view_id,
            offset,
            size,
        }
    }

    /// This layer's identity.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.base.id
    }

    /// The native view.
    #[must_use]
    pub fn view_id(&self) -> PlatformViewId {
        self.view_id
    }

    pub(crate) fn preroll(&mut self, ctx: &mut PrerollContext<'_>, matrix: &Transform3d) {
        let bounds = Rect::from_origin_size(self.offset.to_point(), self.size);
        self.base.paint_bounds = bounds;
        ctx.has_platform_view = true;
        if let Some(embedder) = ctx.view_embedder.as_deref_mut() {
            embedder.preroll_composite_embedded_view(
                self.view_id,
                EmbeddedViewParams {
                    matrix: matrix.pre_translate(self.offset.x, self.offset.y),
                    size: self.size,
                    mutators: ctx.mutators.clone(),
                    final_bounding_rect: matrix.map_rect(bounds),
                },
            );
        }
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        let kind = match ctx.view_embedder.as_deref_mut() {
            None => ResourceKind::ViewEmbedder,
            Some(embedder) => {
                if embedder.composite_embedded_view(self.view_id, ctx.canvas) {
                    return;
                }
                ResourceKind::PlatformView
            }
        };
        ctx.tracer.resource_miss(&ResourceMissEvent {
            kind,
            id: self.view_id.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::canvas::{Canvas, RecordingCanvas};
    use crate::embedder::ExternalViewEmbedder;
    use crate::layer::test_support::Env;
    use crate::layer::{Layer, TransformLayer};

    #[derive(Default)]
    struct Embedder {
        prerolled: Vec<(PlatformViewId, EmbeddedViewParams)>,
        composited: Vec<PlatformViewId>,
        known: Vec<PlatformViewId>,
    }

    impl ExternalViewEmbedder for Embedder {
        fn begin_frame(&mut self, _frame_size: Size, _device_pixel_ratio: f64) {}

        fn preroll_composite_embedded_view(
            &mut self,
            view: PlatformViewId,
            params: EmbeddedViewParams,
        ) {
            self.prerolled.push((view, params));
        }

        fn composite_embedded_view(&mut self, view: PlatformViewId, _canvas: &mut dyn Canvas) -> bool {
            self.composited.push(view);
            self.known.contains(&view)
        }
    }

    fn view(id: i64) -> PlatformViewLayer {
        PlatformViewLayer::new(PlatformViewId(id), Vec2::new(2.0, 3.0), Size::new(10.0, 5.0))
    }

    #[test]
    fn preroll_reports_device_geometry() {
        let env = Env::default();
        let mut embedder = Embedder::default();
        let mut layer = Layer::from(
            TransformLayer::new(Transform3d::from_translation(100.0, 0.0)).with_child(view(7)),
        );
        let mut ctx = env.preroll_ctx();
        ctx.view_embedder = Some(&mut embedder);
        layer.preroll(&mut ctx, &Transform3d::IDENTITY);
        assert!(ctx.has_platform_view);
        drop(ctx);

        assert_eq!(embedder.prerolled.len(), 1);
        let (id, params) = &embedder.prerolled[0];
        assert_eq!(*id, PlatformViewId(7));
        assert_eq!(params.size, Size::new(10.0, 5.0));
        assert_eq!(params.final_bounding_rect, Rect::new(102.0, 3.0, 112.0, 8.0));
        assert_eq!(params.matrix, Transform3d::from_translation(102.0, 3.0));
        assert_eq!(params.mutators.len(), 1);
    }

    #[test]
    fn paint_hands_view_to_embedder() {
        let env = Env::default();
        let mut embedder = Embedder {
            known: alloc::vec![PlatformViewId(1)],
            ..Embedder::default()
        };
        let mut layer = Layer::from(view(1));
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        {
            let mut ctx = env.paint_ctx(&mut canvas);
            ctx.view_embedder = Some(&mut embedder);
            layer.paint(&mut ctx);
        }
        assert_eq!(embedder.composited, [PlatformViewId(1)]);
        assert!(canvas.ops().is_empty());
    }

    #[test]
    fn paint_without_embedder_draws_nothing() {
        let env = Env::default();
        let mut layer = Layer::from(view(1));
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        assert_eq!(layer.paint_bounds(), Rect::new(2.0, 3.0, 12.0, 8.0));
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        layer.paint(&mut env.paint_ctx(&mut canvas));
        assert!(canvas.ops().is_empty());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn unknown_view_is_reported() {
        use crate::trace::{TraceSink, Tracer};

        #[derive(Default)]
        struct Misses(Vec<(ResourceKind, i64)>);
        impl TraceSink for Misses {
            fn on_resource_miss(&mut self, e: &ResourceMissEvent) {
                self.0.push((e.kind, e.id));
            }
        }

        let env = Env::default();
        let mut embedder = Embedder::default();
        let mut layer = Layer::from(view(3));
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        let mut sink = Misses::default();
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        {
            let mut ctx = env.paint_ctx(&mut canvas);
            ctx.view_embedder = Some(&mut embedder);
            ctx.tracer = Tracer::new(&mut sink);
            layer.paint(&mut ctx);
            ctx.view_embedder = None;
            layer.paint(&mut ctx);
        }
        assert_eq!(
            sink.0,
            [
                (ResourceKind::PlatformView, 3),
                (ResourceKind::ViewEmbedder, 3)
            ]
        );
    }
}
