// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Rect, Size, Vec2};

use super::{LayerBase, LayerId, PaintContext, PrerollContext};
use crate::gpu::GpuContext;
use crate::texture::{SamplingQuality, TextureId};
use crate::trace::{ResourceKind, ResourceMissEvent};
use crate::transform::Transform3d;

/// Draws the current frame of an external texture.
#[derive(Debug)]
pub struct TextureLayer {
    pub(crate) base: LayerBase,
    offset: Vec2,
    size: Size,
    texture_id: TextureId,
    freeze: bool,
    sampling: SamplingQuality,
}

impl TextureLayer {
    /// Creates a texture layer covering `size` at `offset`.
    #[must_use]
    pub fn new(texture_id: TextureId, offset: Vec2, size: Size) -> Self {
        Self {
            base: LayerBase::new(),
            offset,
            size,
            texture_id,
            freeze: false,
            sampling: SamplingQuality::default(),
        }
    }

    /// Keeps showing the last drawn frame.
    #[must_use]
    pub fn with_freeze(mut self, freeze: bool) -> Self {
        self.freeze = freeze;
        self
    }

    /// Sets the sampling quality.
    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingQuality) -> Self {
        self.sampling = sampling;
        self
    }

    /// This layer's identity.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.base.id
    }

    /// The texture drawn.
    #[must_use]
    pub fn texture_id(&self) -> TextureId {
        self.texture_id
    }

    /// Whether the texture is frozen.
    #[must_use]
    pub fn freeze(&self) -> bool {
        self.freeze
    }

    fn rect(&self) -> Rect {
        Rect::from_origin_size(self.offset.to_point(), self.size)
    }

    pub(crate) fn preroll(&mut self, _ctx: &mut PrerollContext<'_>, _matrix: &Transform3d) {
        self.base.paint_bounds = self.rect();
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        let Some(texture) = ctx.texture_registry.get_texture(self.texture_id) else {
            ctx.tracer.resource_miss(&ResourceMissEvent {
                kind: ResourceKind::Texture,
                id: self.texture_id.0,
            });
            return;
        };
        let gpu = ctx
            .gpu_context
            .as_deref_mut()
            .map(|gpu| gpu as &mut dyn GpuContext);
        texture.paint(ctx.canvas, self.rect(), self.freeze, gpu, self.sampling);
    }
}
