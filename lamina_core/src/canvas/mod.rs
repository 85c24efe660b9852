// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing surface the compositor paints into.
//!
//! [`Canvas`] is the contract between layers and whatever actually produces
//! pixels. It follows the save/restore model: every `save` or `save_layer`
//! pushes a state (matrix and clip) that the matching `restore` pops. A
//! `save_layer` additionally redirects drawing into an offscreen group that
//! is composited with its [`Paint`] when restored, which is how opacity and
//! filter layers apply their effect to a whole subtree at once.
//!
//! The save count starts at 1 for a fresh canvas; restoring past the base
//! level is a no-op.
//!
//! [`RecordingCanvas`] records calls as [`CanvasOp`]s. It backs
//! [`Picture`] recording, tree flattening, and the software GPU context.

mod recording;

pub use recording::RecordingCanvas;

use kurbo::{BezPath, Point, Rect, RoundedRect, Vec2};
use peniko::Color;

use crate::gpu::RasterImage;
use crate::paint::Paint;
use crate::picture::Picture;
use crate::transform::Transform3d;

/// A drawing surface.
pub trait Canvas {
    /// Pushes the current matrix and clip. Returns the save count *before*
    /// the push.
    fn save(&mut self) -> usize;

    /// Pushes state and starts an offscreen group composited with `paint` on
    /// the matching [`restore`](Self::restore). `bounds` is a hint for the
    /// group's extent in local coordinates.
    fn save_layer(&mut self, bounds: Option<Rect>, paint: &Paint) -> usize;

    /// Pops the most recent save.
    fn restore(&mut self);

    /// Current depth of the save stack, 1 when nothing is saved.
    fn save_count(&self) -> usize;

    /// Restores until the save count equals `count` (or the base level).
    fn restore_to_count(&mut self, count: usize) {
        let target = count.max(1);
        while self.save_count() > target {
            self.restore();
        }
    }

    /// Pre-multiplies the matrix by a translation.
    fn translate(&mut self, by: Vec2);

    /// Pre-multiplies the matrix by `matrix`.
    fn concat(&mut self, matrix: &Transform3d);

    /// Replaces the matrix.
    fn set_matrix(&mut self, matrix: &Transform3d);

    /// Replaces the matrix with identity.
    fn reset_matrix(&mut self) {
        self.set_matrix(&Transform3d::IDENTITY);
    }

    /// The current local-to-device matrix.
    fn total_matrix(&self) -> Transform3d;

    /// Intersects the clip with a rectangle.
    fn clip_rect(&mut self, rect: Rect, anti_alias: bool);

    /// Intersects the clip with a rounded rectangle.
    fn clip_rrect(&mut self, rrect: RoundedRect, anti_alias: bool);

    /// Intersects the clip with a path.
    fn clip_path(&mut self, path: &BezPath, anti_alias: bool);

    /// Fills the whole clip with `color`, ignoring the matrix.
    fn clear(&mut self, color: Color);

    /// Fills a rectangle.
    fn draw_rect(&mut self, rect: Rect, paint: &Paint);

    /// Fills a path.
    fn draw_path(&mut self, path: &BezPath, paint: &Paint);

    /// Replays a picture under the current state.
    fn draw_picture(&mut self, picture: &Picture);

    /// Draws an image with its top-left corner at `at`.
    fn draw_image(&mut self, image: &RasterImage, at: Point, paint: Option<&Paint>);

    /// Draws the `src` region of an image scaled into `dst`.
    fn draw_image_rect(&mut self, image: &RasterImage, src: Rect, dst: Rect, paint: Option<&Paint>);
}

/// One recorded canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasOp {
    /// [`Canvas::save`].
    Save,
    /// [`Canvas::save_layer`].
    SaveLayer {
        /// Bounds hint.
        bounds: Option<Rect>,
        /// Composite paint.
        paint: Paint,
    },
    /// [`Canvas::restore`].
    Restore,
    /// [`Canvas::translate`].
    Translate(Vec2),
    /// [`Canvas::concat`].
    Concat(Transform3d),
    /// [`Canvas::set_matrix`].
    SetMatrix(Transform3d),
    /// [`Canvas::clip_rect`].
    ClipRect {
        /// Clip rectangle.
        rect: Rect,
        /// Anti-aliased edges.
        anti_alias: bool,
    },
    /// [`Canvas::clip_rrect`].
    ClipRRect {
        /// Clip shape.
        rrect: RoundedRect,
        /// Anti-aliased edges.
        anti_alias: bool,
    },
    /// [`Canvas::clip_path`].
    ClipPath {
        /// Clip shape.
        path: BezPath,
        /// Anti-aliased edges.
        anti_alias: bool,
    },
    /// [`Canvas::clear`].
    Clear(Color),
    /// [`Canvas::draw_rect`].
    DrawRect {
        /// Filled rectangle.
        rect: Rect,
        /// Fill paint.
        paint: Paint,
    },
    /// [`Canvas::draw_path`].
    DrawPath {
        /// Filled path.
        path: BezPath,
        /// Fill paint.
        paint: Paint,
    },
    /// [`Canvas::draw_picture`].
    DrawPicture(Picture),
    /// [`Canvas::draw_image`].
    DrawImage {
        /// Source image.
        image: RasterImage,
        /// Top-left corner.
        at: Point,
        /// Optional paint.
        paint: Option<Paint>,
    },
    /// [`Canvas::draw_image_rect`].
    DrawImageRect {
        /// Source image.
        image: RasterImage,
        /// Source region in image pixels.
        src: Rect,
        /// Destination in local coordinates.
        dst: Rect,
        /// Optional paint.
        paint: Option<Paint>,
    },
}

impl CanvasOp {
    /// Replays this op onto `canvas`.
    pub fn apply(&self, canvas: &mut dyn Canvas) {
        match self {
            Self::Save => {
                canvas.save();
            }
            Self::SaveLayer { bounds, paint } => {
                canvas.save_layer(*bounds, paint);
            }
            Self::Restore => canvas.restore(),
            Self::Translate(by) => canvas.translate(*by),
            Self::Concat(m) => canvas.concat(m),
            Self::SetMatrix(m) => canvas.set_matrix(m),
            Self::ClipRect { rect, anti_alias } => canvas.clip_rect(*rect, *anti_alias),
            Self::ClipRRect { rrect, anti_alias } => canvas.clip_rrect(*rrect, *anti_alias),
            Self::ClipPath { path, anti_alias } => canvas.clip_path(path, *anti_alias),
            Self::Clear(color) => canvas.clear(*color),
            Self::DrawRect { rect, paint } => canvas.draw_rect(*rect, paint),
            Self::DrawPath { path, paint } => canvas.draw_path(path, paint),
            Self::DrawPicture(picture) => canvas.draw_picture(picture),
            Self::DrawImage { image, at, paint } => canvas.draw_image(image, *at, paint.as_ref()),
            Self::DrawImageRect {
                image,
                src,
                dst,
                paint,
            } => canvas.draw_image_rect(image, *src, *dst, paint.as_ref()),
        }
    }
}
