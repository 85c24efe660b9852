// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{BezPath, Point, Rect, RoundedRect, Vec2};
use peniko::Color;

use super::{Canvas, CanvasOp};
use crate::gpu::RasterImage;
use crate::paint::Paint;
use crate::picture::Picture;
use crate::transform::Transform3d;

/// A [`Canvas`] that records every call.
///
/// The matrix stack is tracked so that [`Canvas::total_matrix`] answers
/// correctly while recording. Clips are recorded but not evaluated.
#[derive(Clone, Debug)]
pub struct RecordingCanvas {
    cull_rect: Rect,
    ops: Vec<CanvasOp>,
    matrices: Vec<Transform3d>,
}

impl RecordingCanvas {
    /// Starts a recording whose content is expected to fit in `cull_rect`.
    #[must_use]
    pub fn new(cull_rect: Rect) -> Self {
        Self {
            cull_rect,
            ops: Vec::new(),
            matrices: vec![Transform3d::IDENTITY],
        }
    }

    /// Starts a recording whose base matrix is `matrix`.
    ///
    /// The base matrix is not recorded as an op; it only seeds
    /// [`Canvas::total_matrix`].
    #[must_use]
    pub fn with_matrix(cull_rect: Rect, matrix: Transform3d) -> Self {
        Self {
            cull_rect,
            ops: Vec::new(),
            matrices: vec![matrix],
        }
    }

    /// Operations recorded so far.
    #[must_use]
    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    /// Consumes the canvas, returning its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<CanvasOp> {
        self.ops
    }

    /// Consumes the canvas, producing a [`Picture`].
    #[must_use]
    pub fn finish(self) -> Picture {
        Picture::new(self.cull_rect, self.ops)
    }

    fn current(&mut self) -> &mut Transform3d {
        // The base entry is never popped.
        let last = self.matrices.len() - 1;
        &mut self.matrices[last]
    }
}

impl Canvas for RecordingCanvas {
    fn save(&mut self) -> usize {
        let before = self.save_count();
        let top = *self.current();
        self.matrices.push(top);
        self.ops.push(CanvasOp::Save);
        before
    }

    fn save_layer(&mut self, bounds: Option<Rect>, paint: &Paint) -> usize {
        let before = self.save_count();
        let top = *self.current();
        self.matrices.push(top);
        self.ops.push(CanvasOp::SaveLayer {
            bounds,
            paint: paint.clone(),
        });
        before
    }

    fn restore(&mut self) {
        if self.matrices.len() > 1 {
            self.matrices.pop();
            self.ops.push(CanvasOp::Restore);
        }
    }

    fn save_count(&self) -> usize {
        self.matrices.len()
    }

    fn translate(&mut self, by: Vec2) {
        let m = self.current();
        *m = m.pre_translate(by.x, by.y);
        self.ops.push(CanvasOp::Translate(by));
    }

    fn concat(&mut self, matrix: &Transform3d) {
        let m = self.current();
        *m = *m * *matrix;
        self.ops.push(CanvasOp::Concat(*matrix));
    }

    fn set_matrix(&mut self, matrix: &Transform3d) {
        *self.current() = *matrix;
        self.ops.push(CanvasOp::SetMatrix(*matrix));
    }

    fn total_matrix(&self) -> Transform3d {
        self.matrices
            .last()
            .copied()
            .unwrap_or(Transform3d::IDENTITY)
    }

    fn clip_rect(&mut self, rect: Rect, anti_alias: bool) {
        self.ops.push(CanvasOp::ClipRect { rect, anti_alias });
    }

    fn clip_rrect(&mut self, rrect: RoundedRect, anti_alias: bool) {
        self.ops.push(CanvasOp::ClipRRect { rrect, anti_alias });
    }

    fn clip_path(&mut self, path: &BezPath, anti_alias: bool) {
        self.ops.push(CanvasOp::ClipPath {
            path: path.clone(),
            anti_alias,
        });
    }

    fn clear(&mut self, color: Color) {
        self.ops.push(CanvasOp::Clear(color));
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.ops.push(CanvasOp::DrawRect {
            rect,
            paint: paint.clone(),
        });
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        self.ops.push(CanvasOp::DrawPath {
            path: path.clone(),
            paint: paint.clone(),
        });
    }

    fn draw_picture(&mut self, picture: &Picture) {
        self.ops.push(CanvasOp::DrawPicture(picture.clone()));
    }

    fn draw_image(&mut self, image: &RasterImage, at: Point, paint: Option<&Paint>) {
        self.ops.push(CanvasOp::DrawImage {
            image: image.clone(),
            at,
            paint: paint.cloned(),
        });
    }

    fn draw_image_rect(&mut self, image: &RasterImage, src: Rect, dst: Rect, paint: Option<&Paint>) {
        self.ops.push(CanvasOp::DrawImageRect {
            image: image.clone(),
            src,
            dst,
            paint: paint.cloned(),
        });
    }
}
